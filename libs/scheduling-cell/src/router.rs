// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    // Every scheduling operation requires an authenticated actor; handlers
    // apply the finer role checks against the target record.
    let protected_routes = Router::new()
        .route("/doctors/{doctor_id}/slots", get(handlers::get_doctor_slots))
        .route("/appointments", post(handlers::book_appointment))
        .route("/appointments", get(handlers::list_appointments))
        .route("/appointments/{app_id}/cancel", post(handlers::cancel_appointment))
        .route("/appointments/{app_id}/treatment", post(handlers::record_treatment))
        .route("/availability", post(handlers::declare_availability))
        .route("/availability", get(handlers::list_availability))
        .route("/availability/{avail_id}", delete(handlers::delete_availability))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
