//! Ingredient endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use foodgram_common::AppResult;
use foodgram_db::entities::ingredient;
use serde::Deserialize;

use crate::middleware::AppState;

/// Ingredient search.
#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    /// Case-insensitive name prefix.
    pub name: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> AppResult<Json<Vec<ingredient::Model>>> {
    let ingredients = state
        .ingredient_service
        .list(query.name.as_deref())
        .await?;
    Ok(Json(ingredients))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ingredient::Model>> {
    Ok(Json(state.ingredient_service.get(&id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(show))
}
