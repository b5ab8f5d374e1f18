// libs/directory-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn directory_routes(state: Arc<AppConfig>) -> Router {
    // Department and doctor listings back the public booking flow
    let public_routes = Router::new()
        .route("/departments", get(handlers::list_departments))
        .route("/doctors", get(handlers::list_doctors));

    let admin_routes = Router::new()
        .route("/doctors", post(handlers::add_doctor))
        .route("/users/{user_id}/active", patch(handlers::set_user_active))
        .route("/patients", get(handlers::list_patients))
        .route("/stats", get(handlers::dashboard_stats))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
