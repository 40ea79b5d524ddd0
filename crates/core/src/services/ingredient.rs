//! Ingredient lookup service.

use foodgram_common::AppResult;
use foodgram_db::{entities::ingredient, repositories::IngredientRepository};

/// Read-only access to the ingredient catalog.
#[derive(Clone)]
pub struct IngredientService {
    ingredient_repo: IngredientRepository,
}

impl IngredientService {
    /// Create a new ingredient service.
    #[must_use]
    pub const fn new(ingredient_repo: IngredientRepository) -> Self {
        Self { ingredient_repo }
    }

    /// List ingredients whose name starts with `name` (case-insensitive).
    pub async fn list(&self, name: Option<&str>) -> AppResult<Vec<ingredient::Model>> {
        self.ingredient_repo.list(name.map(str::trim)).await
    }

    /// Get an ingredient by ID.
    pub async fn get(&self, id: &str) -> AppResult<ingredient::Model> {
        self.ingredient_repo.get_by_id(id).await
    }
}
