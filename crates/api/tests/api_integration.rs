//! API integration tests.
//!
//! Requests go through the full router, including the auth middleware,
//! against a mocked database.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware::from_fn_with_state,
};
use foodgram_api::{
    middleware::{AppState, auth_middleware},
    router as api_router,
};
use foodgram_common::AppSettings;
use foodgram_core::{
    FollowService, IngredientService, RecipeMembershipService, RecipeService,
    ShoppingListService, TagService, UserService,
};
use foodgram_db::{
    entities::{shopping_cart, tag, user},
    repositories::{
        FollowRepository, IngredientRepository, RecipeMembershipRepository, RecipeRepository,
        TagRepository, UserRepository,
    },
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};
use tower::ServiceExt;

const TOKEN: &str = "0123456789abcdef0123456789abcdef";

/// Create test app state over `db`.
fn create_test_state(db: DatabaseConnection) -> AppState {
    let db = Arc::new(db);
    let settings = AppSettings::default();

    let user_repo = UserRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));
    let recipe_repo = RecipeRepository::new(Arc::clone(&db));
    let ingredient_repo = IngredientRepository::new(Arc::clone(&db));
    let tag_repo = TagRepository::new(Arc::clone(&db));
    let membership_repo = RecipeMembershipRepository::new(Arc::clone(&db));

    AppState {
        user_service: UserService::new(user_repo.clone(), follow_repo.clone()),
        follow_service: FollowService::new(
            follow_repo.clone(),
            user_repo.clone(),
            recipe_repo.clone(),
        ),
        recipe_service: RecipeService::new(
            recipe_repo.clone(),
            ingredient_repo.clone(),
            tag_repo.clone(),
            user_repo,
            follow_repo,
            membership_repo.clone(),
        ),
        membership_service: RecipeMembershipService::new(
            membership_repo.clone(),
            recipe_repo.clone(),
        ),
        shopping_list_service: ShoppingListService::new(
            membership_repo,
            recipe_repo,
            settings.clone(),
        ),
        ingredient_service: IngredientService::new(ingredient_repo),
        tag_service: TagService::new(tag_repo),
        settings: Arc::new(settings),
    }
}

/// Create the test router, mounted the way the server mounts it.
fn create_test_router(db: MockDatabase) -> Router {
    let state = create_test_state(db.into_connection());
    Router::new()
        .nest("/api", api_router())
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

fn empty_db() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

fn alice() -> user::Model {
    user::Model {
        id: "u1".to_string(),
        email: "alice@example.com".to_string(),
        username: "alice".to_string(),
        first_name: "Alice".to_string(),
        last_name: "Smith".to_string(),
        password: "$argon2id$unused".to_string(),
        token: Some(TOKEN.to_string()),
        created_at: chrono::Utc::now().into(),
    }
}

/// Mock whose first query resolves the access token to alice.
fn authed_db() -> MockDatabase {
    empty_db().append_query_results([[alice()]])
}

fn authed(builder: axum::http::request::Builder) -> axum::http::request::Builder {
    builder.header(header::AUTHORIZATION, format!("Token {TOKEN}"))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_tags_list() {
    let app = create_test_router(empty_db().append_query_results([[tag::Model {
        id: "t1".to_string(),
        name: "Breakfast".to_string(),
        color: "#E26C2D".to_string(),
        slug: "breakfast".to_string(),
    }]]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/tags")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body[0]["slug"], "breakfast");
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_me_requires_auth() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_me_with_token() {
    let app = create_test_router(authed_db());

    let response = app
        .oneshot(
            authed(Request::builder().uri("/api/users/me"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["is_subscribed"], false);
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_create_recipe_requires_auth() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/recipes")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_recipe_rejects_zero_cooking_time() {
    let app = create_test_router(authed_db());

    let response = app
        .oneshot(
            authed(Request::builder().uri("/api/recipes").method("POST"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{
                        "ingredients": [{"id": "i1", "amount": 10}],
                        "tags": ["t1"],
                        "image": "data:image/png;base64,AAAA",
                        "name": "Tea",
                        "text": "Boil water",
                        "cooking_time": 0
                    }"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_self_subscription_is_rejected() {
    let app = create_test_router(authed_db());

    let response = app
        .oneshot(
            authed(Request::builder().uri("/api/users/u1/subscribe").method("POST"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "SELF_SUBSCRIPTION");
}

#[tokio::test]
async fn test_download_empty_shopping_cart() {
    let app = create_test_router(
        authed_db().append_query_results([Vec::<shopping_cart::Model>::new()]),
    );

    let response = app
        .oneshot(
            authed(Request::builder().uri("/api/recipes/download_shopping_cart"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"foodgram_shopping_cart_"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"FOODGRAM SHOPPING LIST\n\n");
}

#[tokio::test]
async fn test_anonymous_recipe_list_is_paginated() {
    let count: BTreeMap<&str, sea_orm::Value> =
        [("num_items", sea_orm::Value::BigInt(Some(0)))].into();
    let app = create_test_router(
        empty_db()
            .append_query_results([[count]])
            .append_query_results([Vec::<foodgram_db::entities::recipe::Model>::new()]),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/recipes?tags=breakfast&tags=lunch&is_favorited=1&page=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["results"], Value::Array(vec![]));
}

#[tokio::test]
async fn test_register_with_invalid_json_returns_error() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_tags_search_returns_matches() {
    let app = create_test_router(empty_db().append_query_results([[tag::Model {
        id: "t1".to_string(),
        name: "Breakfast".to_string(),
        color: "#E26C2D".to_string(),
        slug: "breakfast".to_string(),
    }]]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/tags?search=fast")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body[0]["name"], "Breakfast");
}

#[tokio::test]
async fn test_users_search_is_paginated() {
    let count: BTreeMap<&str, sea_orm::Value> =
        [("num_items", sea_orm::Value::BigInt(Some(1)))].into();
    let app = create_test_router(
        empty_db()
            .append_query_results([[count]])
            .append_query_results([[alice()]]),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users?search=ali&page=1&limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["username"], "alice");
}

#[tokio::test]
async fn test_login_returns_created_token() {
    let hash = Argon2::default()
        .hash_password(b"correct-horse", &SaltString::generate(&mut OsRng))
        .unwrap()
        .to_string();
    let user = user::Model {
        password: hash,
        ..alice()
    };
    let app = create_test_router(empty_db().append_query_results([[user]]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/token/login")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"email": "alice@example.com", "password": "correct-horse"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["auth_token"], TOKEN);
}
