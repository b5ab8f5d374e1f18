// libs/identity-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::HeaderMap,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::TokenResponse;
use shared_models::error::AppError;
use shared_utils::jwt;

use crate::models::{IdentityError, LoginRequest, RegisterPatientRequest};
use crate::services::account::AccountService;

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    Ok(auth_value[7..].to_string())
}

fn map_error(e: IdentityError) -> AppError {
    match e {
        IdentityError::InvalidCredentials => AppError::Auth(e.to_string()),
        IdentityError::UsernameTaken => AppError::Conflict(e.to_string()),
        IdentityError::Hash(_) | IdentityError::Token(_) => AppError::Internal(e.to_string()),
        IdentityError::Store(inner) => AppError::Store(inner.to_string()),
    }
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AccountService::new(&state);
    let response = service
        .login(&request.username, &request.password)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "token": response.token,
        "user": {
            "user_id": response.user_id,
            "role": response.role,
            "name": response.name,
        }
    })))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<RegisterPatientRequest>,
) -> Result<Json<Value>, AppError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let service = AccountService::new(&state);
    let response = service.register_patient(&request).await.map_err(map_error)?;

    Ok(Json(json!({
        "token": response.token,
        "user": {
            "user_id": response.user_id,
            "role": response.role,
            "name": response.name,
        }
    })))
}

/// Token introspection for other services and the frontend session check.
#[axum::debug_handler]
pub async fn validate(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    let user = jwt::validate_token(&token, &state.jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        role: Some(user.role),
        name: Some(user.name),
    }))
}
