//! API middleware.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use foodgram_common::AppSettings;
use foodgram_core::{
    FollowService, IngredientService, RecipeMembershipService, RecipeService,
    ShoppingListService, TagService, UserService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub follow_service: FollowService,
    pub recipe_service: RecipeService,
    pub membership_service: RecipeMembershipService,
    pub shopping_list_service: ShoppingListService,
    pub ingredient_service: IngredientService,
    pub tag_service: TagService,
    pub settings: Arc<AppSettings>,
}

/// Accepted `Authorization` schemes.
const TOKEN_SCHEMES: [&str; 2] = ["Token ", "Bearer "];

/// Extract the token from an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    TOKEN_SCHEMES
        .iter()
        .find_map(|scheme| value.strip_prefix(scheme))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware.
///
/// Resolves the token to a user and stores it in the request extensions.
/// Requests without a valid token continue anonymously.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    if let Some(token) = token {
        match state.user_service.authenticate(&token).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => tracing::debug!("Unknown access token"),
            Err(e) => tracing::warn!(error = %e, "Token lookup failed"),
        }
    }

    next.run(req).await
}
