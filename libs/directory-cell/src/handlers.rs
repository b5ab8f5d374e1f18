// libs/directory-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{AddDoctorRequest, DirectoryError, SetActiveRequest};
use crate::services::directory::DirectoryService;

#[derive(Debug, Deserialize)]
pub struct DoctorQueryParams {
    pub dept_id: Option<i64>,
}

fn map_error(e: DirectoryError) -> AppError {
    match e {
        DirectoryError::UsernameTaken => AppError::Conflict(e.to_string()),
        DirectoryError::DepartmentNotFound(_) | DirectoryError::UserNotFound(_) => {
            AppError::NotFound(e.to_string())
        }
        DirectoryError::SelfDeactivation => AppError::BadRequest(e.to_string()),
        DirectoryError::Hash(_) => AppError::Internal(e.to_string()),
        DirectoryError::Store(inner) => AppError::Store(inner.to_string()),
    }
}

fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Admin access required".to_string()));
    }
    Ok(())
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_departments(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let departments = service.list_departments().await.map_err(map_error)?;

    Ok(Json(json!({ "departments": departments })))
}

/// Doctor search for patients picking whom to book with.
#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<DoctorQueryParams>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);
    let doctors = service.list_doctors(params.dept_id).await.map_err(map_error)?;

    Ok(Json(json!({
        "total": doctors.len(),
        "doctors": doctors,
    })))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn add_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<AddDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DirectoryService::new(&state);
    let doctor = service
        .add_doctor(&request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
    })))
}

#[axum::debug_handler]
pub async fn set_user_active(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<i64>,
    Json(request): Json<SetActiveRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DirectoryService::new(&state);
    service
        .set_user_active(&user, user_id, request.active, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "user_id": user_id,
        "active": request.active,
    })))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DirectoryService::new(&state);
    let patients = service.list_patients(auth.token()).await.map_err(map_error)?;

    Ok(Json(json!({
        "total": patients.len(),
        "patients": patients,
    })))
}

#[axum::debug_handler]
pub async fn dashboard_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DirectoryService::new(&state);
    let stats = service.dashboard_stats(auth.token()).await.map_err(map_error)?;

    Ok(Json(json!({ "stats": stats })))
}
