//! User and subscription endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use foodgram_common::AppResult;
use foodgram_core::{RegisterInput, SetPasswordInput, SubscriptionView, UserView};
use foodgram_db::entities::user;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{Created, PageParams, Paginated, no_content},
};

/// Registered user, without the subscription flag.
#[derive(Serialize)]
pub struct RegisteredUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<user::Model> for RegisteredUser {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Username search.
#[derive(Debug, Default, Deserialize)]
pub struct UserSearch {
    pub search: Option<String>,
}

/// Recipe preview size for subscription responses.
#[derive(Debug, Default, Deserialize)]
pub struct RecipesLimit {
    pub recipes_limit: Option<u64>,
}

async fn list(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    Query(filter): Query<UserSearch>,
) -> AppResult<Paginated<UserView>> {
    let (offset, limit) = params.resolve(&state.settings, state.settings.users_page_size);
    let page = state
        .user_service
        .list(viewer.as_ref(), filter.search.as_deref(), offset, limit)
        .await?;
    Ok(page.into())
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<Created<RegisteredUser>> {
    let user = state.user_service.register(input).await?;
    Ok(Created(user.into()))
}

async fn me(AuthUser(user): AuthUser) -> Json<UserView> {
    Json(UserView::new(user, false))
}

async fn set_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SetPasswordInput>,
) -> AppResult<impl IntoResponse> {
    state.user_service.set_password(user, input).await?;
    Ok(no_content())
}

async fn subscriptions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    Query(recipes): Query<RecipesLimit>,
) -> AppResult<Paginated<SubscriptionView>> {
    let (offset, limit) = params.resolve(&state.settings, state.settings.users_page_size);
    let page = state
        .follow_service
        .subscriptions(&user, offset, limit, recipes.recipes_limit)
        .await?;
    Ok(page.into())
}

async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserView>> {
    Ok(Json(state.user_service.get(viewer.as_ref(), &id).await?))
}

async fn subscribe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(recipes): Query<RecipesLimit>,
) -> AppResult<Created<SubscriptionView>> {
    let view = state
        .follow_service
        .subscribe(&user, &id, recipes.recipes_limit)
        .await?;
    Ok(Created(view))
}

async fn unsubscribe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.follow_service.unsubscribe(&user, &id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(register))
        .route("/me", get(me))
        .route("/set_password", post(set_password))
        .route("/subscriptions", get(subscriptions))
        .route("/{id}", get(show))
        .route("/{id}/subscribe", post(subscribe).delete(unsubscribe))
}
