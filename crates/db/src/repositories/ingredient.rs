//! Ingredient repository.

use std::sync::Arc;

use super::{lower_like, prefix_pattern};
use crate::entities::{Ingredient, ingredient};
use foodgram_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Ingredient repository for database operations.
#[derive(Clone)]
pub struct IngredientRepository {
    db: Arc<DatabaseConnection>,
}

impl IngredientRepository {
    /// Create a new ingredient repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an ingredient by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<ingredient::Model>> {
        Ingredient::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an ingredient by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<ingredient::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ingredient {id}")))
    }

    /// Find ingredients by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<ingredient::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Ingredient::find()
            .filter(ingredient::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List ingredients ordered by name, optionally restricted to a
    /// case-insensitive name prefix.
    pub async fn list(&self, name_prefix: Option<&str>) -> AppResult<Vec<ingredient::Model>> {
        let mut query = Ingredient::find();

        if let Some(prefix) = name_prefix.filter(|p| !p.is_empty()) {
            query = query.filter(lower_like(ingredient::Column::Name, prefix_pattern(prefix)));
        }

        query
            .order_by_asc(ingredient::Column::Name)
            .order_by_asc(ingredient::Column::MeasurementUnit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
