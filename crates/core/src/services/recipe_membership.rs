//! Favorites and shopping cart service.

use foodgram_common::{AppResult, IdGenerator};
use foodgram_db::repositories::{MembershipKind, RecipeMembershipRepository, RecipeRepository};

use crate::services::recipe::RecipeSummary;

/// Adds and removes recipes from a user's favorites or shopping cart.
#[derive(Clone)]
pub struct RecipeMembershipService {
    membership_repo: RecipeMembershipRepository,
    recipe_repo: RecipeRepository,
    id_gen: IdGenerator,
}

impl RecipeMembershipService {
    /// Create a new membership service.
    #[must_use]
    pub const fn new(
        membership_repo: RecipeMembershipRepository,
        recipe_repo: RecipeRepository,
    ) -> Self {
        Self {
            membership_repo,
            recipe_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a recipe to the user's collection and return its summary.
    pub async fn add(
        &self,
        user_id: &str,
        recipe_id: &str,
        kind: MembershipKind,
    ) -> AppResult<RecipeSummary> {
        let recipe = self.recipe_repo.get_by_id(recipe_id).await?;

        self.membership_repo
            .add(self.id_gen.generate(), user_id, &recipe.id, kind)
            .await?;
        tracing::debug!(user_id, recipe_id, %kind, "Recipe added");

        Ok(recipe.into())
    }

    /// Remove a recipe from the user's collection.
    pub async fn remove(
        &self,
        user_id: &str,
        recipe_id: &str,
        kind: MembershipKind,
    ) -> AppResult<()> {
        self.recipe_repo.get_by_id(recipe_id).await?;
        self.membership_repo.remove(user_id, recipe_id, kind).await
    }

    /// Whether the recipe is in the user's collection.
    pub async fn contains(
        &self,
        user_id: &str,
        recipe_id: &str,
        kind: MembershipKind,
    ) -> AppResult<bool> {
        self.membership_repo.contains(user_id, recipe_id, kind).await
    }

    /// Recipe IDs in the user's collection, newest first.
    pub async fn list(&self, user_id: &str, kind: MembershipKind) -> AppResult<Vec<String>> {
        self.membership_repo.list_recipe_ids(user_id, kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use foodgram_common::AppError;
    use foodgram_db::entities::{recipe, shopping_cart};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_recipe(id: &str) -> recipe::Model {
        recipe::Model {
            id: id.to_string(),
            author_id: "author".to_string(),
            name: "Borscht".to_string(),
            text: "Simmer.".to_string(),
            cooking_time: 90,
            image: "recipes/images/borscht.png".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn service(db: DatabaseConnection) -> RecipeMembershipService {
        let db = Arc::new(db);
        RecipeMembershipService::new(
            RecipeMembershipRepository::new(db.clone()),
            RecipeRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_add_returns_summary() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_recipe("r1")]])
            .append_query_results([Vec::<shopping_cart::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let summary = service(db)
            .add("u1", "r1", MembershipKind::ShoppingCart)
            .await
            .unwrap();

        assert_eq!(
            summary,
            RecipeSummary {
                id: "r1".to_string(),
                name: "Borscht".to_string(),
                image: "recipes/images/borscht.png".to_string(),
                cooking_time: 90,
            }
        );
    }

    #[tokio::test]
    async fn test_add_twice_is_already_exists() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_recipe("r1")]])
            .append_query_results([[shopping_cart::Model {
                id: "c1".to_string(),
                user_id: "u1".to_string(),
                recipe_id: "r1".to_string(),
                created_at: Utc::now().into(),
            }]])
            .into_connection();

        let result = service(db)
            .add("u1", "r1", MembershipKind::ShoppingCart)
            .await;

        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_add_unknown_recipe() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<recipe::Model>::new()])
            .into_connection();

        let result = service(db).add("u1", "r404", MembershipKind::Favorite).await;

        assert!(matches!(result, Err(AppError::RecipeNotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_absent_favorite_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_recipe("r1")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let result = service(db)
            .remove("u1", "r1", MembershipKind::Favorite)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
