//! Foodgram server entry point.

use std::sync::Arc;

use axum::{Router, middleware};
use foodgram_api::{
    middleware::{AppState, auth_middleware},
    router as api_router,
};
use foodgram_common::Config;
use foodgram_core::{
    FollowService, IngredientService, RecipeMembershipService, RecipeService,
    ShoppingListService, TagService, UserService,
};
use foodgram_db::repositories::{
    FollowRepository, IngredientRepository, RecipeMembershipRepository, RecipeRepository,
    TagRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Wire repositories and services over one connection pool.
fn build_state(db: sea_orm::DatabaseConnection, config: &Config) -> AppState {
    let db = Arc::new(db);

    let user_repo = UserRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));
    let recipe_repo = RecipeRepository::new(Arc::clone(&db));
    let ingredient_repo = IngredientRepository::new(Arc::clone(&db));
    let tag_repo = TagRepository::new(Arc::clone(&db));
    let membership_repo = RecipeMembershipRepository::new(Arc::clone(&db));

    let user_service = UserService::new(user_repo.clone(), follow_repo.clone());
    let follow_service =
        FollowService::new(follow_repo.clone(), user_repo.clone(), recipe_repo.clone());
    let recipe_service = RecipeService::new(
        recipe_repo.clone(),
        ingredient_repo.clone(),
        tag_repo.clone(),
        user_repo,
        follow_repo,
        membership_repo.clone(),
    );
    let membership_service =
        RecipeMembershipService::new(membership_repo.clone(), recipe_repo.clone());
    let shopping_list_service =
        ShoppingListService::new(membership_repo, recipe_repo, config.app.clone());

    AppState {
        user_service,
        follow_service,
        recipe_service,
        membership_service,
        shopping_list_service,
        ingredient_service: IngredientService::new(ingredient_repo),
        tag_service: TagService::new(tag_repo),
        settings: Arc::new(config.app.clone()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting foodgram server...");

    let config = Config::load()?;

    let db = foodgram_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    foodgram_db::migrate(&db).await?;
    info!("Migrations completed");

    let state = build_state(db, &config);

    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
