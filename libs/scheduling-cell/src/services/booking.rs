// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Timelike, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::{StoreClient, StoreError};
use shared_models::auth::{AuthUser, Role};

use crate::models::{Appointment, AppointmentStatus, SchedulingError, SLOT_MINUTES};

/// Commits and revokes bookings.
///
/// The booking path is a two-phase check-then-insert. The pre-check exists
/// for a fast, well-worded failure; the store's unique index on
/// (doctor_id, date, time) is the only thing that actually prevents double
/// booking, and a lost race surfaces from the insert itself.
pub struct BookingService {
    store: Arc<StoreClient>,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
        }
    }

    pub fn with_store(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    /// Attempt to create a Booked appointment at the given slot.
    pub async fn book_slot(
        &self,
        patient_id: i64,
        doctor_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        // Everything here is rejected before any store access.
        if time.second() != 0 || time.nanosecond() != 0 || time.minute() as i64 % SLOT_MINUTES != 0 {
            return Err(SchedulingError::InvalidWindow(format!(
                "slot time {} does not fall on the {}-minute grid",
                time, SLOT_MINUTES
            )));
        }

        let requested = date.and_time(time).and_utc();
        if requested < Utc::now() {
            return Err(SchedulingError::InvalidWindow(
                "slot is in the past".to_string(),
            ));
        }

        // Phase 1: optimistic pre-check. Purely a fast path for a better
        // error; a concurrent committer can still slip in after it.
        if self.booked_appointment_exists(doctor_id, date, time, auth_token).await? {
            debug!(
                "Slot ({}, {}, {}) already booked at pre-check",
                doctor_id, date, time
            );
            return Err(SchedulingError::SlotAlreadyTaken);
        }

        // Phase 2: the insert is atomic with respect to other inserts on the
        // same triple; losing the race comes back as a unique violation.
        let row = json!({
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": date,
            "time": time.format("%H:%M:%S").to_string(),
            "status": AppointmentStatus::Booked,
        });

        let created = match self
            .store
            .insert_returning("/rest/v1/appointments", Some(auth_token), row)
            .await
        {
            Ok(value) => value,
            Err(StoreError::UniqueViolation(_)) => {
                warn!(
                    "Lost booking race for doctor {} at {} {}",
                    doctor_id, date, time
                );
                return Err(SchedulingError::SlotAlreadyTaken);
            }
            Err(e) => return Err(e.into()),
        };

        let appointment: Appointment =
            serde_json::from_value(created).map_err(StoreError::Decode)?;

        info!(
            "Appointment {} booked: patient {} with doctor {} at {} {}",
            appointment.app_id, patient_id, doctor_id, date, time
        );
        Ok(appointment)
    }

    /// Cancel a Booked appointment on behalf of an explicit actor.
    ///
    /// Only the appointment's patient, its doctor, or an admin may cancel;
    /// everything else (including a missing row or one already terminal)
    /// collapses into `NotFoundOrUnauthorized`.
    pub async fn cancel_appointment(
        &self,
        actor: &AuthUser,
        app_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self
            .get_appointment(app_id, auth_token)
            .await?
            .ok_or(SchedulingError::NotFoundOrUnauthorized)?;

        let permitted = match actor.role {
            Role::Patient => appointment.patient_id == actor.id,
            Role::Doctor => appointment.doctor_id == actor.id,
            Role::Admin => true,
        };
        if !permitted || appointment.status != AppointmentStatus::Booked {
            return Err(SchedulingError::NotFoundOrUnauthorized);
        }

        let cancelled = self
            .set_status(app_id, AppointmentStatus::Cancelled, auth_token)
            .await?;

        info!("Appointment {} cancelled by {} {}", app_id, actor.role, actor.id);
        Ok(cancelled)
    }

    pub async fn get_appointment(
        &self,
        app_id: i64,
        auth_token: &str,
    ) -> Result<Option<Appointment>, SchedulingError> {
        let path = format!("/rest/v1/appointments?app_id=eq.{}", app_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        match result.into_iter().next() {
            Some(value) => {
                let appointment = serde_json::from_value(value).map_err(StoreError::Decode)?;
                Ok(Some(appointment))
            }
            None => Ok(None),
        }
    }

    /// Upcoming Booked appointments for a doctor over the next `window_days`
    /// days, ordered by date then time.
    pub async fn upcoming_for_doctor(
        &self,
        doctor_id: i64,
        window_days: u32,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let today = Utc::now().date_naive();
        let to = today + Duration::days(window_days as i64);
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&status=eq.Booked&date=gte.{}&date=lte.{}&order=date.asc,time.asc",
            doctor_id, today, to
        );
        self.fetch_appointments(&path, auth_token).await
    }

    /// A patient's live bookings, ordered by date then time.
    pub async fn upcoming_for_patient(
        &self,
        patient_id: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&status=eq.Booked&order=date.asc,time.asc",
            patient_id
        );
        self.fetch_appointments(&path, auth_token).await
    }

    /// A patient's completed visit history, most recent first.
    pub async fn history_for_patient(
        &self,
        patient_id: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&status=eq.Completed&order=date.desc,time.desc",
            patient_id
        );
        self.fetch_appointments(&path, auth_token).await
    }

    /// Admin overview: every live booking, soonest first.
    pub async fn upcoming_all(
        &self,
        limit: i64,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?status=eq.Booked&order=date.asc,time.asc&limit={}",
            limit
        );
        self.fetch_appointments(&path, auth_token).await
    }

    pub(crate) async fn set_status(
        &self,
        app_id: i64,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?app_id=eq.{}", app_id);
        let updated = self
            .store
            .update_returning(&path, Some(auth_token), json!({ "status": status }))
            .await?;

        let row = updated
            .into_iter()
            .next()
            .ok_or(SchedulingError::NotFoundOrUnauthorized)?;
        let appointment = serde_json::from_value(row).map_err(StoreError::Decode)?;
        Ok(appointment)
    }

    async fn booked_appointment_exists(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        let time_str = time.format("%H:%M:%S").to_string();
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&time=eq.{}&status=eq.Booked",
            doctor_id,
            date,
            urlencoding::encode(&time_str)
        );

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(!result.is_empty())
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let result: Vec<Value> = self
            .store
            .request(Method::GET, path, Some(auth_token), None)
            .await?;

        let appointments = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(StoreError::Decode)?;

        Ok(appointments)
    }
}
