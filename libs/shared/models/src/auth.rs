use serde::{Deserialize, Serialize};
use std::fmt;

/// The three account roles the system knows. Stored verbatim in the `users`
/// table (`role` column check constraint) and carried in JWT claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::Doctor => write!(f, "Doctor"),
            Role::Patient => write!(f, "Patient"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a string, per JWT convention.
    pub sub: String,
    pub role: Role,
    pub name: String,
    pub exp: u64,
    pub iat: u64,
}

/// The authenticated actor, resolved from a validated token by the auth
/// middleware and passed explicitly into every operation. There is no
/// ambient session state anywhere in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
    pub name: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: i64,
    pub role: Option<Role>,
    pub name: Option<String>,
}
