// libs/scheduling-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{info, warn};

use shared_config::AppConfig;
use shared_database::{StoreClient, StoreError};

use crate::models::{AvailabilityWindow, DeclareWindowRequest, SchedulingError};

/// Manages the availability windows doctors declare. Windows are the raw
/// material the slot resolver dices up; they are created and deleted whole.
pub struct AvailabilityService {
    store: Arc<StoreClient>,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
        }
    }

    pub fn with_store(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    /// Declare a new window for a doctor. The store's unique index on
    /// (doctor_id, date, start_time) rejects a second declaration at the
    /// same start.
    pub async fn declare_window(
        &self,
        doctor_id: i64,
        request: &DeclareWindowRequest,
        auth_token: &str,
    ) -> Result<AvailabilityWindow, SchedulingError> {
        validate_window(request.date, request.start_time, request.end_time)?;

        let row = json!({
            "doctor_id": doctor_id,
            "date": request.date,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
        });

        let created = match self
            .store
            .insert_returning("/rest/v1/doctor_availability", Some(auth_token), row)
            .await
        {
            Ok(value) => value,
            Err(StoreError::UniqueViolation(_)) => {
                warn!(
                    "Doctor {} re-declared window at {} {}",
                    doctor_id, request.date, request.start_time
                );
                return Err(SchedulingError::DuplicateWindow);
            }
            Err(e) => return Err(e.into()),
        };

        let window: AvailabilityWindow =
            serde_json::from_value(created).map_err(StoreError::Decode)?;

        info!(
            "Doctor {} declared window {} {}..{}",
            doctor_id, window.date, window.start_time, window.end_time
        );
        Ok(window)
    }

    /// Delete a window the doctor owns. A missing row and someone else's row
    /// are indistinguishable to the caller.
    pub async fn delete_window(
        &self,
        doctor_id: i64,
        avail_id: i64,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let path = format!(
            "/rest/v1/doctor_availability?avail_id=eq.{}&doctor_id=eq.{}",
            avail_id, doctor_id
        );

        let existing: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        if existing.is_empty() {
            return Err(SchedulingError::NotFoundOrUnauthorized);
        }

        let _: Vec<Value> = self
            .store
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await?;

        info!("Doctor {} deleted availability window {}", doctor_id, avail_id);
        Ok(())
    }

    /// A doctor's windows over the next `window_days` days, ordered by date
    /// and start.
    pub async fn list_windows(
        &self,
        doctor_id: i64,
        window_days: u32,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityWindow>, SchedulingError> {
        let today = Utc::now().date_naive();
        let to = today + chrono::Duration::days(window_days as i64);
        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&date=gte.{}&date=lte.{}&order=date.asc,start_time.asc",
            doctor_id, today, to
        );

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let windows = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilityWindow>, _>>()
            .map_err(StoreError::Decode)?;

        Ok(windows)
    }
}

/// A window must sit on a future-or-today date and span a positive interval.
pub fn validate_window(
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<(), SchedulingError> {
    if start_time >= end_time {
        return Err(SchedulingError::InvalidWindow(format!(
            "start_time {} is not before end_time {}",
            start_time, end_time
        )));
    }
    if date < Utc::now().date_naive() {
        return Err(SchedulingError::InvalidWindow(format!(
            "date {} is in the past",
            date
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn rejects_inverted_window() {
        let tomorrow = Utc::now().date_naive() + Duration::days(1);
        assert_matches!(
            validate_window(tomorrow, t(12, 0), t(9, 0)),
            Err(SchedulingError::InvalidWindow(_))
        );
    }

    #[test]
    fn rejects_empty_window() {
        let tomorrow = Utc::now().date_naive() + Duration::days(1);
        assert_matches!(
            validate_window(tomorrow, t(9, 0), t(9, 0)),
            Err(SchedulingError::InvalidWindow(_))
        );
    }

    #[test]
    fn rejects_past_date() {
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        assert_matches!(
            validate_window(yesterday, t(9, 0), t(12, 0)),
            Err(SchedulingError::InvalidWindow(_))
        );
    }

    #[test]
    fn accepts_future_window() {
        let tomorrow = Utc::now().date_naive() + Duration::days(1);
        assert!(validate_window(tomorrow, t(9, 0), t(12, 0)).is_ok());
    }
}
