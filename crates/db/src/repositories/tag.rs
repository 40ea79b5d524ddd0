//! Tag repository.

use std::sync::Arc;

use super::{contains_pattern, lower_like};
use crate::entities::{Tag, tag};
use foodgram_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    db: Arc<DatabaseConnection>,
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a tag by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<tag::Model>> {
        Tag::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a tag by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<tag::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {id}")))
    }

    /// Find tags by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<tag::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Tag::find()
            .filter(tag::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List tags ordered by name, optionally restricted to names containing
    /// `search` (case-insensitive).
    pub async fn list(&self, search: Option<&str>) -> AppResult<Vec<tag::Model>> {
        let mut query = Tag::find();

        if let Some(term) = search.filter(|t| !t.is_empty()) {
            query = query.filter(lower_like(tag::Column::Name, contains_pattern(term)));
        }

        query
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
