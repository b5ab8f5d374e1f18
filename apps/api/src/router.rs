use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use directory_cell::router::directory_routes;
use identity_cell::router::identity_routes;
use scheduling_cell::router::scheduling_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Hospital management API is running!" }))
        .nest("/auth", identity_routes(state.clone()))
        .nest("/directory", directory_routes(state.clone()))
        .nest("/scheduling", scheduling_routes(state.clone()))
}
