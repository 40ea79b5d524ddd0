//! Subscription (follow) service.

use foodgram_common::{AppError, AppResult, IdGenerator};
use foodgram_db::{
    Page,
    entities::{follow, user},
    repositories::{FollowRepository, RecipeRepository, UserRepository},
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::{recipe::RecipeSummary, user::UserView};

/// A followed author with a preview of their recipes.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserView,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: u64,
}

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    recipe_repo: RecipeRepository,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(
        follow_repo: FollowRepository,
        user_repo: UserRepository,
        recipe_repo: RecipeRepository,
    ) -> Self {
        Self {
            follow_repo,
            user_repo,
            recipe_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow an author.
    ///
    /// Self-subscription is rejected before any lookup.
    pub async fn subscribe(
        &self,
        follower: &user::Model,
        author_id: &str,
        recipes_limit: Option<u64>,
    ) -> AppResult<SubscriptionView> {
        if follower.id == author_id {
            return Err(AppError::SelfSubscription);
        }

        let author = self.user_repo.get_by_id(author_id).await?;

        if self.follow_repo.is_following(&follower.id, &author.id).await? {
            return Err(AppError::AlreadySubscribed);
        }

        let model = follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower.id.clone()),
            author_id: Set(author.id.clone()),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.follow_repo.create(model).await?;
        tracing::debug!(follower_id = %follower.id, author_id = %author.id, "Subscribed");

        self.subscription_view(author, recipes_limit).await
    }

    /// Stop following an author.
    pub async fn unsubscribe(&self, follower: &user::Model, author_id: &str) -> AppResult<()> {
        let author = self.user_repo.get_by_id(author_id).await?;

        if self.follow_repo.delete_by_pair(&follower.id, &author.id).await? == 0 {
            return Err(AppError::NotSubscribed);
        }
        Ok(())
    }

    /// Whether `follower_id` follows `author_id`.
    pub async fn is_subscribed(&self, follower_id: &str, author_id: &str) -> AppResult<bool> {
        self.follow_repo.is_following(follower_id, author_id).await
    }

    /// Authors followed by `user`, each with up to `recipes_limit` recipes.
    pub async fn subscriptions(
        &self,
        user: &user::Model,
        offset: u64,
        limit: u64,
        recipes_limit: Option<u64>,
    ) -> AppResult<Page<SubscriptionView>> {
        let page = self
            .user_repo
            .find_followed_by(&user.id, offset, limit)
            .await?;

        let mut items = Vec::with_capacity(page.items.len());
        for author in page.items {
            items.push(self.subscription_view(author, recipes_limit).await?);
        }

        Ok(Page {
            items,
            total: page.total,
        })
    }

    async fn subscription_view(
        &self,
        author: user::Model,
        recipes_limit: Option<u64>,
    ) -> AppResult<SubscriptionView> {
        let recipes = self
            .recipe_repo
            .find_by_author(&author.id, recipes_limit)
            .await?;
        let recipes_count = self.recipe_repo.count_by_author(&author.id).await?;

        Ok(SubscriptionView {
            author: UserView::new(author, true),
            recipes: recipes.into_iter().map(RecipeSummary::from).collect(),
            recipes_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use foodgram_db::entities::recipe;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            username: id.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password: "$argon2id$hash".to_string(),
            token: None,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_follow(follower_id: &str, author_id: &str) -> follow::Model {
        follow::Model {
            id: "f1".to_string(),
            follower_id: follower_id.to_string(),
            author_id: author_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_recipe(id: &str, author_id: &str) -> recipe::Model {
        recipe::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            name: format!("Recipe {id}"),
            text: "Cook.".to_string(),
            cooking_time: 10,
            image: format!("recipes/images/{id}.png"),
            created_at: Utc::now().into(),
        }
    }

    fn service(db: DatabaseConnection) -> FollowService {
        let db = Arc::new(db);
        FollowService::new(
            FollowRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            RecipeRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_self_subscription_is_rejected_without_queries() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let user = create_test_user("u1");

        let result = service.subscribe(&user, "u1", None).await;

        assert!(matches!(result, Err(AppError::SelfSubscription)));
    }

    #[tokio::test]
    async fn test_subscribe_unknown_author() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let result = service(db)
            .subscribe(&create_test_user("u1"), "ghost", None)
            .await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_subscribe_twice_is_already_subscribed() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("u2")]])
            .append_query_results([[create_test_follow("u1", "u2")]])
            .into_connection();

        let result = service(db)
            .subscribe(&create_test_user("u1"), "u2", None)
            .await;

        assert!(matches!(result, Err(AppError::AlreadySubscribed)));
    }

    #[tokio::test]
    async fn test_subscribe_returns_author_with_recipes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("u2")]])
            .append_query_results([Vec::<follow::Model>::new()])
            .append_query_results([[create_test_follow("u1", "u2")]])
            .append_query_results([[create_test_recipe("r1", "u2")]])
            .append_query_results([[maplit::btreemap! {
                "num_items" => sea_orm::Value::BigInt(Some(4))
            }]])
            .into_connection();

        let view = service(db)
            .subscribe(&create_test_user("u1"), "u2", Some(1))
            .await
            .unwrap();

        assert_eq!(view.author.id, "u2");
        assert!(view.author.is_subscribed);
        assert_eq!(view.recipes.len(), 1);
        assert_eq!(view.recipes_count, 4);
    }

    #[tokio::test]
    async fn test_unsubscribe_when_not_following() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("u2")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let result = service(db)
            .unsubscribe(&create_test_user("u1"), "u2")
            .await;

        assert!(matches!(result, Err(AppError::NotSubscribed)));
    }
}
