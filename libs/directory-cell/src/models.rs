// libs/directory-cell/src/models.rs
use serde::{Deserialize, Serialize};

use shared_database::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub dept_id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// The store-side doctor row; display fields live on the user row and are
/// merged in by the roster queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRow {
    pub doctor_id: i64,
    pub dept_id: i64,
    pub specialization_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorListing {
    pub doctor_id: i64,
    pub name: String,
    pub dept_id: i64,
    pub specialization_name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientListing {
    pub patient_id: i64,
    pub name: String,
    pub contact_info: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub active_doctors: usize,
    pub active_patients: usize,
    pub booked_appointments: usize,
    pub total_appointments: usize,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddDoctorRequest {
    pub name: String,
    pub username: String,
    pub password: String,
    pub dept_id: i64,
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Username already taken")]
    UsernameTaken,

    #[error("Department {0} does not exist")]
    DepartmentNotFound(i64),

    #[error("User {0} does not exist")]
    UserNotFound(i64),

    /// Admins locking themselves out is always a mistake.
    #[error("Cannot change your own active status")]
    SelfDeactivation,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}
