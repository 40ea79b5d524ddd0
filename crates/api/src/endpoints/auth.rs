//! Token authentication endpoints.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use foodgram_common::AppResult;
use foodgram_core::LoginInput;
use serde::Serialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{Created, no_content},
};

/// Issued token.
#[derive(Serialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

/// Exchange credentials for a token.
async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Created<TokenResponse>> {
    let auth_token = state.user_service.login(input).await?;
    Ok(Created(TokenResponse { auth_token }))
}

/// Revoke the current token.
async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let user_id = user.id.clone();
    state.user_service.logout(user).await?;
    tracing::debug!(user_id = %user_id, "Token revoked");
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}
