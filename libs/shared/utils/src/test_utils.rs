use std::sync::Arc;

use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub store_url: String,
    pub store_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            store_url: "http://localhost:54321".to_string(),
            store_api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_store_url(url: &str) -> Self {
        Self {
            store_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_url: self.store_url.clone(),
            store_api_key: self.store_api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            token_ttl_hours: 12,
            booking_window_days: 7,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: i64,
    pub role: Role,
    pub name: String,
}

impl TestUser {
    pub fn admin(id: i64) -> Self {
        Self { id, role: Role::Admin, name: format!("Admin {}", id) }
    }

    pub fn doctor(id: i64) -> Self {
        Self { id, role: Role::Doctor, name: format!("Dr. {}", id) }
    }

    pub fn patient(id: i64) -> Self {
        Self { id, role: Role::Patient, name: format!("Patient {}", id) }
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            role: self.role,
            name: self.name.clone(),
        }
    }

    pub fn token(&self, secret: &str) -> String {
        issue_token(self.id, self.role, &self.name, secret, 1)
            .expect("test token should always mint")
    }
}

/// Canned store rows matching the PostgREST representations the cells parse.
pub struct MockStoreRows;

impl MockStoreRows {
    pub fn doctor(doctor_id: i64, dept_id: i64, specialization: &str) -> Value {
        json!({
            "doctor_id": doctor_id,
            "dept_id": dept_id,
            "specialization_name": specialization
        })
    }

    pub fn department(dept_id: i64, name: &str) -> Value {
        json!({
            "dept_id": dept_id,
            "name": name,
            "description": "test department"
        })
    }

    pub fn availability(avail_id: i64, doctor_id: i64, date: &str, start: &str, end: &str) -> Value {
        json!({
            "avail_id": avail_id,
            "doctor_id": doctor_id,
            "date": date,
            "start_time": start,
            "end_time": end
        })
    }

    pub fn appointment(
        app_id: i64,
        patient_id: i64,
        doctor_id: i64,
        date: &str,
        time: &str,
        status: &str,
    ) -> Value {
        json!({
            "app_id": app_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": date,
            "time": time,
            "status": status
        })
    }

    pub fn treatment(treatment_id: i64, app_id: i64) -> Value {
        json!({
            "treatment_id": treatment_id,
            "app_id": app_id,
            "diagnosis": "test diagnosis",
            "prescription": "test prescription",
            "notes": null
        })
    }
}
