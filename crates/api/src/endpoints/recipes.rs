//! Recipe, favorite and shopping cart endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::Query;
use foodgram_common::AppResult;
use foodgram_core::{RecipeInput, RecipeListQuery, RecipeSummary, RecipeView};
use foodgram_db::repositories::MembershipKind;
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{Created, PageParams, Paginated, TextAttachment, no_content},
};

/// Recipe list filters. `tags` may repeat.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeFilterParams {
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// `1` and `true` switch a filter on; anything else leaves it off.
fn flag(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true"))
}

impl RecipeFilterParams {
    const fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    fn to_query(&self) -> RecipeListQuery {
        RecipeListQuery {
            author: self.author.clone().filter(|a| !a.is_empty()),
            tags: self.tags.clone(),
            is_favorited: flag(self.is_favorited.as_deref()),
            is_in_shopping_cart: flag(self.is_in_shopping_cart.as_deref()),
        }
    }
}

async fn list(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(params): Query<RecipeFilterParams>,
) -> AppResult<Paginated<RecipeView>> {
    let (offset, limit) = params
        .page_params()
        .resolve(&state.settings, state.settings.recipes_page_size);
    let page = state
        .recipe_service
        .list(viewer.as_ref(), params.to_query(), offset, limit)
        .await?;
    Ok(page.into())
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RecipeInput>,
) -> AppResult<Created<RecipeView>> {
    Ok(Created(state.recipe_service.create(&user, input).await?))
}

async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<RecipeView>> {
    Ok(Json(state.recipe_service.get(viewer.as_ref(), &id).await?))
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<RecipeInput>,
) -> AppResult<Json<RecipeView>> {
    Ok(Json(state.recipe_service.update(&user, &id, input).await?))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.recipe_service.delete(&user, &id).await?;
    Ok(no_content())
}

async fn add_favorite(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Created<RecipeSummary>> {
    add_member(&state, &user.id, &id, MembershipKind::Favorite).await
}

async fn remove_favorite(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    remove_member(&state, &user.id, &id, MembershipKind::Favorite).await
}

async fn add_to_cart(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Created<RecipeSummary>> {
    add_member(&state, &user.id, &id, MembershipKind::ShoppingCart).await
}

async fn remove_from_cart(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    remove_member(&state, &user.id, &id, MembershipKind::ShoppingCart).await
}

async fn add_member(
    state: &AppState,
    user_id: &str,
    recipe_id: &str,
    kind: MembershipKind,
) -> AppResult<Created<RecipeSummary>> {
    let summary = state
        .membership_service
        .add(user_id, recipe_id, kind)
        .await?;
    Ok(Created(summary))
}

async fn remove_member(
    state: &AppState,
    user_id: &str,
    recipe_id: &str,
    kind: MembershipKind,
) -> AppResult<impl IntoResponse + use<>> {
    state
        .membership_service
        .remove(user_id, recipe_id, kind)
        .await?;
    Ok(no_content())
}

/// Export the cart as a text file.
async fn download_shopping_cart(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<TextAttachment> {
    let export = state
        .shopping_list_service
        .export(&user.id, chrono::Utc::now())
        .await?;
    Ok(TextAttachment {
        file_name: export.file_name,
        content: export.content,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/download_shopping_cart", get(download_shopping_cart))
        .route("/{id}", get(show).patch(update).delete(delete))
        .route("/{id}/favorite", post(add_favorite).delete(remove_favorite))
        .route("/{id}/shopping_cart", post(add_to_cart).delete(remove_from_cart))
}
