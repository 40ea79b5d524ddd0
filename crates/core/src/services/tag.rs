//! Tag lookup service.

use foodgram_common::AppResult;
use foodgram_db::{entities::tag, repositories::TagRepository};

/// Read-only access to recipe tags.
#[derive(Clone)]
pub struct TagService {
    tag_repo: TagRepository,
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository) -> Self {
        Self { tag_repo }
    }

    /// List tags, optionally those whose name contains `search`.
    pub async fn list(&self, search: Option<&str>) -> AppResult<Vec<tag::Model>> {
        self.tag_repo.list(search.map(str::trim)).await
    }

    /// Get a tag by ID.
    pub async fn get(&self, id: &str) -> AppResult<tag::Model> {
        self.tag_repo.get_by_id(id).await
    }
}
