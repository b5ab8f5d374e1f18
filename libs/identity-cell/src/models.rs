// libs/identity-cell/src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shared_database::StoreError;
use shared_models::auth::Role;

/// An account row as the store represents it. The password hash never
/// leaves this crate.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    pub user_id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    pub contact_info: Option<String>,
    pub is_active: bool,
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPatientRequest {
    pub name: String,
    pub username: String,
    pub password: String,
    pub contact_info: Option<String>,
    pub dob: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    pub role: Role,
    pub name: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Wrong username, wrong password, and a deactivated account all look
    /// the same to the caller.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Token minting failed: {0}")]
    Token(String),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}
