// libs/identity-cell/src/services/account.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use shared_config::AppConfig;
use shared_database::{StoreClient, StoreError};
use shared_models::auth::Role;
use shared_utils::jwt::issue_token;

use crate::models::{IdentityError, LoginResponse, RegisterPatientRequest, UserAccount};
use crate::services::password::{hash_password, verify_password};

/// Account lifecycle: credential checks, token minting, and patient
/// self-registration. Runs against the store with the service key only; no
/// caller token exists yet on these paths.
pub struct AccountService {
    store: Arc<StoreClient>,
    jwt_secret: String,
    token_ttl_hours: i64,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
            jwt_secret: config.jwt_secret.clone(),
            token_ttl_hours: config.token_ttl_hours,
        }
    }

    /// Check credentials and mint a token.
    ///
    /// The active-account filter sits in the store query, so an unknown
    /// username, a wrong password and a deactivated account all fall out as
    /// the same `InvalidCredentials`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, IdentityError> {
        let path = format!(
            "/rest/v1/users?username=eq.{}&is_active=eq.true",
            urlencoding::encode(username)
        );

        let result: Vec<Value> = self.store.request(Method::GET, &path, None, None).await?;

        let account: UserAccount = match result.into_iter().next() {
            Some(row) => serde_json::from_value(row).map_err(StoreError::Decode)?,
            None => {
                warn!("Login attempt for unknown or inactive username");
                return Err(IdentityError::InvalidCredentials);
            }
        };

        let matches = verify_password(password, &account.password_hash)
            .map_err(|e| IdentityError::Hash(e.to_string()))?;
        if !matches {
            warn!("Failed login for user {}", account.user_id);
            return Err(IdentityError::InvalidCredentials);
        }

        let token = issue_token(
            account.user_id,
            account.role,
            &account.name,
            &self.jwt_secret,
            self.token_ttl_hours,
        )
        .map_err(IdentityError::Token)?;

        info!("User {} logged in as {}", account.user_id, account.role);
        Ok(LoginResponse {
            token,
            user_id: account.user_id,
            role: account.role,
            name: account.name,
        })
    }

    /// Self-service patient registration: one user row, one patient row.
    ///
    /// The store cannot wrap the two inserts in a transaction, so a failed
    /// patient insert deletes the freshly created user row again.
    pub async fn register_patient(
        &self,
        request: &RegisterPatientRequest,
    ) -> Result<LoginResponse, IdentityError> {
        let password_hash =
            hash_password(&request.password).map_err(|e| IdentityError::Hash(e.to_string()))?;

        let user_row = json!({
            "username": request.username,
            "password_hash": password_hash,
            "role": Role::Patient,
            "name": request.name,
            "contact_info": request.contact_info,
            "is_active": true,
        });

        let created = match self
            .store
            .insert_returning("/rest/v1/users", None, user_row)
            .await
        {
            Ok(value) => value,
            Err(StoreError::UniqueViolation(_)) => {
                return Err(IdentityError::UsernameTaken);
            }
            Err(e) => return Err(e.into()),
        };

        let account: UserAccount =
            serde_json::from_value(created).map_err(StoreError::Decode)?;

        let patient_row = json!({
            "patient_id": account.user_id,
            "dob": request.dob,
        });

        if let Err(e) = self
            .store
            .insert_returning("/rest/v1/patients", None, patient_row)
            .await
        {
            error!(
                "Patient insert failed for new user {}, rolling the account back: {}",
                account.user_id, e
            );
            self.delete_user(account.user_id).await;
            return Err(e.into());
        }

        info!("Registered patient {} ({})", account.user_id, account.username);

        let token = issue_token(
            account.user_id,
            account.role,
            &account.name,
            &self.jwt_secret,
            self.token_ttl_hours,
        )
        .map_err(IdentityError::Token)?;

        Ok(LoginResponse {
            token,
            user_id: account.user_id,
            role: account.role,
            name: account.name,
        })
    }

    // Rollback half of register_patient. Best effort; a failure leaves an
    // orphan user row and is logged for manual cleanup.
    async fn delete_user(&self, user_id: i64) {
        let path = format!("/rest/v1/users?user_id=eq.{}", user_id);
        let result: Result<Vec<Value>, _> =
            self.store.request(Method::DELETE, &path, None, None).await;
        if let Err(e) = result {
            error!("Failed to roll back user {}: {}", user_id, e);
        }
    }
}
