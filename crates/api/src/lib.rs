//! HTTP API layer for foodgram.
//!
//! - **Endpoints**: users and token auth, recipes, favorites, shopping cart,
//!   subscriptions, tags and ingredients
//! - **Extractors**: authenticated and optional users, pagination
//! - **Middleware**: token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
