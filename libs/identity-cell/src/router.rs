// libs/identity-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::post, Router};

use shared_config::AppConfig;

use crate::handlers;

pub fn identity_routes(state: Arc<AppConfig>) -> Router {
    // All identity endpoints are public; validate authenticates via the
    // token it inspects rather than the middleware.
    Router::new()
        .route("/login", post(handlers::login))
        .route("/register", post(handlers::register))
        .route("/validate", post(handlers::validate))
        .with_state(state)
}
