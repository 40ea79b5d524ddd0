//! Tag endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use foodgram_common::AppResult;
use foodgram_db::entities::tag;
use serde::Deserialize;

use crate::middleware::AppState;

/// Tag search.
#[derive(Debug, Deserialize)]
pub struct TagQuery {
    /// Case-insensitive name fragment.
    pub search: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<TagQuery>,
) -> AppResult<Json<Vec<tag::Model>>> {
    Ok(Json(state.tag_service.list(query.search.as_deref()).await?))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<tag::Model>> {
    Ok(Json(state.tag_service.get(&id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(show))
}
