//! Follow repository.

use std::{collections::HashSet, sync::Arc};

use crate::{
    entities::{Follow, follow},
    map_write_err,
};
use foodgram_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Follow repository for database operations.
#[derive(Clone)]
pub struct FollowRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowRepository {
    /// Create a new follow repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a follow relationship by follower and author.
    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        author_id: &str,
    ) -> AppResult<Option<follow::Model>> {
        Follow::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user follows an author.
    pub async fn is_following(&self, follower_id: &str, author_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(follower_id, author_id).await?.is_some())
    }

    /// The subset of `author_ids` followed by `follower_id`.
    pub async fn followed_among(
        &self,
        follower_id: &str,
        author_ids: &[String],
    ) -> AppResult<HashSet<String>> {
        if author_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = Follow::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::AuthorId.is_in(author_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|f| f.author_id).collect())
    }

    /// Create a follow relationship. A duplicate pair is `AlreadySubscribed`.
    pub async fn create(&self, model: follow::ActiveModel) -> AppResult<follow::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_write_err(e, || AppError::AlreadySubscribed))
    }

    /// Delete a follow relationship by pair, returning the number of rows removed.
    pub async fn delete_by_pair(&self, follower_id: &str, author_id: &str) -> AppResult<u64> {
        let result = Follow::delete_many()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}
