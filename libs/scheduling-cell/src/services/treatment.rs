// libs/scheduling-cell/src/services/treatment.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use shared_config::AppConfig;
use shared_database::{StoreClient, StoreError};

use crate::models::{AppointmentStatus, RecordTreatmentRequest, SchedulingError, Treatment};
use crate::services::booking::BookingService;

/// Records treatment outcomes and closes out the visit. One treatment per
/// appointment, enforced by the store's unique index on app_id.
pub struct TreatmentService {
    store: Arc<StoreClient>,
}

impl TreatmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
        }
    }

    pub fn with_store(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    /// Record a treatment against a Booked appointment the doctor owns and
    /// mark the appointment Completed.
    ///
    /// The two writes are not atomic in the store, so if the status update
    /// fails after the treatment insert succeeded, the treatment row is
    /// deleted again to keep the pair consistent.
    pub async fn record_treatment(
        &self,
        doctor_id: i64,
        app_id: i64,
        request: &RecordTreatmentRequest,
        auth_token: &str,
    ) -> Result<Treatment, SchedulingError> {
        let booking = BookingService::with_store(self.store.clone());
        let appointment = booking
            .get_appointment(app_id, auth_token)
            .await?
            .ok_or(SchedulingError::NotFoundOrUnauthorized)?;

        if appointment.doctor_id != doctor_id
            || appointment.status != AppointmentStatus::Booked
        {
            return Err(SchedulingError::NotFoundOrUnauthorized);
        }

        let row = json!({
            "app_id": app_id,
            "diagnosis": request.diagnosis,
            "prescription": request.prescription,
            "notes": request.notes,
        });

        let created = match self
            .store
            .insert_returning("/rest/v1/treatments", Some(auth_token), row)
            .await
        {
            Ok(value) => value,
            Err(StoreError::UniqueViolation(_)) => {
                warn!("Treatment already recorded for appointment {}", app_id);
                return Err(SchedulingError::TreatmentAlreadyRecorded);
            }
            Err(e) => return Err(e.into()),
        };

        let treatment: Treatment =
            serde_json::from_value(created).map_err(StoreError::Decode)?;

        if let Err(e) = booking
            .set_status(app_id, AppointmentStatus::Completed, auth_token)
            .await
        {
            error!(
                "Failed to complete appointment {} after recording treatment {}: {}",
                app_id, treatment.treatment_id, e
            );
            self.delete_treatment(treatment.treatment_id, auth_token).await;
            return Err(e);
        }

        info!(
            "Treatment {} recorded for appointment {} by doctor {}",
            treatment.treatment_id, app_id, doctor_id
        );
        Ok(treatment)
    }

    // Compensating delete after a failed status update. Best effort only;
    // a failure here leaves an orphan treatment row and is logged for manual
    // cleanup.
    async fn delete_treatment(&self, treatment_id: i64, auth_token: &str) {
        let path = format!("/rest/v1/treatments?treatment_id=eq.{}", treatment_id);
        let result: Result<Vec<Value>, _> = self
            .store
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await;
        if let Err(e) = result {
            error!("Failed to roll back treatment {}: {}", treatment_id, e);
        }
    }
}
