// libs/directory-cell/src/services/directory.rs
use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{error, info};

use identity_cell::services::password::hash_password;
use shared_config::AppConfig;
use shared_database::{StoreClient, StoreError};
use shared_models::auth::{AuthUser, Role};

use crate::models::{
    AddDoctorRequest, DashboardStats, Department, DirectoryError, DoctorListing, DoctorRow,
    PatientListing,
};

/// Departments, rosters and account administration. Specialization is
/// denormalised from the department onto the doctor row at onboarding time,
/// matching the store schema.
pub struct DirectoryService {
    store: Arc<StoreClient>,
}

// Minimal user projection for roster merges.
#[derive(serde::Deserialize)]
struct UserRow {
    user_id: i64,
    name: String,
    contact_info: Option<String>,
    is_active: bool,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
        }
    }

    pub fn with_store(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>, DirectoryError> {
        let result: Vec<Value> = self
            .store
            .request(Method::GET, "/rest/v1/departments?order=name.asc", None, None)
            .await?;

        let departments = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Department>, _>>()
            .map_err(StoreError::Decode)?;

        Ok(departments)
    }

    /// Doctors with their display names merged in from the user rows,
    /// optionally filtered to one department.
    pub async fn list_doctors(
        &self,
        dept_id: Option<i64>,
    ) -> Result<Vec<DoctorListing>, DirectoryError> {
        let path = match dept_id {
            Some(dept) => format!("/rest/v1/doctors?dept_id=eq.{}&order=doctor_id.asc", dept),
            None => "/rest/v1/doctors?order=doctor_id.asc".to_string(),
        };

        let result: Vec<Value> = self.store.request(Method::GET, &path, None, None).await?;
        let doctors = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<DoctorRow>, _>>()
            .map_err(StoreError::Decode)?;

        let users = self.fetch_users_by_role(Role::Doctor, None).await?;
        let by_id: HashMap<i64, UserRow> =
            users.into_iter().map(|u| (u.user_id, u)).collect();

        let listings = doctors
            .into_iter()
            .filter_map(|d| {
                by_id.get(&d.doctor_id).map(|u| DoctorListing {
                    doctor_id: d.doctor_id,
                    name: u.name.clone(),
                    dept_id: d.dept_id,
                    specialization_name: d.specialization_name,
                    is_active: u.is_active,
                })
            })
            .collect();

        Ok(listings)
    }

    pub async fn list_patients(
        &self,
        auth_token: &str,
    ) -> Result<Vec<PatientListing>, DirectoryError> {
        let users = self.fetch_users_by_role(Role::Patient, Some(auth_token)).await?;

        Ok(users
            .into_iter()
            .map(|u| PatientListing {
                patient_id: u.user_id,
                name: u.name,
                contact_info: u.contact_info,
                is_active: u.is_active,
            })
            .collect())
    }

    /// Admin onboarding: one user row, one doctor row, rollback on the
    /// second insert failing.
    pub async fn add_doctor(
        &self,
        request: &AddDoctorRequest,
        auth_token: &str,
    ) -> Result<DoctorListing, DirectoryError> {
        let department = self
            .get_department(request.dept_id)
            .await?
            .ok_or(DirectoryError::DepartmentNotFound(request.dept_id))?;

        let password_hash =
            hash_password(&request.password).map_err(|e| DirectoryError::Hash(e.to_string()))?;

        let user_row = json!({
            "username": request.username,
            "password_hash": password_hash,
            "role": Role::Doctor,
            "name": request.name,
            "contact_info": request.contact_info,
            "is_active": true,
        });

        let created = match self
            .store
            .insert_returning("/rest/v1/users", Some(auth_token), user_row)
            .await
        {
            Ok(value) => value,
            Err(StoreError::UniqueViolation(_)) => return Err(DirectoryError::UsernameTaken),
            Err(e) => return Err(e.into()),
        };

        let user: UserRow = serde_json::from_value(created).map_err(StoreError::Decode)?;

        let doctor_row = json!({
            "doctor_id": user.user_id,
            "dept_id": department.dept_id,
            "specialization_name": department.name,
        });

        if let Err(e) = self
            .store
            .insert_returning("/rest/v1/doctors", Some(auth_token), doctor_row)
            .await
        {
            error!(
                "Doctor insert failed for new user {}, rolling the account back: {}",
                user.user_id, e
            );
            self.delete_user(user.user_id, auth_token).await;
            return Err(e.into());
        }

        info!(
            "Doctor {} onboarded into department {} ({})",
            user.user_id, department.dept_id, department.name
        );

        Ok(DoctorListing {
            doctor_id: user.user_id,
            name: user.name,
            dept_id: department.dept_id,
            specialization_name: department.name,
            is_active: true,
        })
    }

    /// Flip an account's active flag. Admins cannot change their own.
    pub async fn set_user_active(
        &self,
        actor: &AuthUser,
        user_id: i64,
        active: bool,
        auth_token: &str,
    ) -> Result<(), DirectoryError> {
        if actor.id == user_id {
            return Err(DirectoryError::SelfDeactivation);
        }

        let path = format!("/rest/v1/users?user_id=eq.{}", user_id);
        let updated = self
            .store
            .update_returning(&path, Some(auth_token), json!({ "is_active": active }))
            .await?;

        if updated.is_empty() {
            return Err(DirectoryError::UserNotFound(user_id));
        }

        info!("User {} set {} by admin {}", user_id, if active { "active" } else { "inactive" }, actor.id);
        Ok(())
    }

    pub async fn dashboard_stats(&self, auth_token: &str) -> Result<DashboardStats, DirectoryError> {
        let active_doctors = self
            .count_rows("/rest/v1/users?role=eq.Doctor&is_active=eq.true&select=user_id", auth_token)
            .await?;
        let active_patients = self
            .count_rows("/rest/v1/users?role=eq.Patient&is_active=eq.true&select=user_id", auth_token)
            .await?;
        let booked_appointments = self
            .count_rows("/rest/v1/appointments?status=eq.Booked&select=app_id", auth_token)
            .await?;
        let total_appointments = self
            .count_rows("/rest/v1/appointments?select=app_id", auth_token)
            .await?;

        Ok(DashboardStats {
            active_doctors,
            active_patients,
            booked_appointments,
            total_appointments,
        })
    }

    async fn get_department(&self, dept_id: i64) -> Result<Option<Department>, DirectoryError> {
        let path = format!("/rest/v1/departments?dept_id=eq.{}", dept_id);
        let result: Vec<Value> = self.store.request(Method::GET, &path, None, None).await?;

        match result.into_iter().next() {
            Some(value) => {
                let department = serde_json::from_value(value).map_err(StoreError::Decode)?;
                Ok(Some(department))
            }
            None => Ok(None),
        }
    }

    async fn fetch_users_by_role(
        &self,
        role: Role,
        auth_token: Option<&str>,
    ) -> Result<Vec<UserRow>, DirectoryError> {
        let path = format!("/rest/v1/users?role=eq.{}&order=user_id.asc", role);
        let result: Vec<Value> = self.store.request(Method::GET, &path, auth_token, None).await?;

        let users = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<UserRow>, _>>()
            .map_err(StoreError::Decode)?;

        Ok(users)
    }

    async fn count_rows(&self, path: &str, auth_token: &str) -> Result<usize, DirectoryError> {
        let result: Vec<Value> = self
            .store
            .request(Method::GET, path, Some(auth_token), None)
            .await?;
        Ok(result.len())
    }

    // Rollback half of add_doctor. Best effort; failures are logged for
    // manual cleanup.
    async fn delete_user(&self, user_id: i64, auth_token: &str) {
        let path = format!("/rest/v1/users?user_id=eq.{}", user_id);
        let result: Result<Vec<Value>, _> = self
            .store
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await;
        if let Err(e) = result {
            error!("Failed to roll back user {}: {}", user_id, e);
        }
    }
}
