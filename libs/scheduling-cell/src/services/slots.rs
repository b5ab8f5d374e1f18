// libs/scheduling-cell/src/services/slots.rs
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::{Appointment, AvailabilityWindow, SchedulingError, Slot, SLOT_MINUTES};

/// Derives the bookable slots for a doctor over a forward-looking date
/// window by combining declared availability with booking occupancy.
///
/// Read-only: two resolutions with no intervening writes produce identical
/// output.
pub struct SlotResolver {
    store: Arc<StoreClient>,
}

impl SlotResolver {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
        }
    }

    pub fn with_store(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    /// Resolve slots for `window_days` consecutive calendar days starting
    /// tomorrow, grouped by date in chronological order.
    ///
    /// A doctor with no declared windows yields an empty map. Overlapping
    /// windows on one date yield duplicate slots at the overlapping times;
    /// that degenerate input is not deduplicated here.
    pub async fn resolve_slots(
        &self,
        doctor_id: i64,
        window_days: u32,
        auth_token: &str,
    ) -> Result<BTreeMap<NaiveDate, Vec<Slot>>, SchedulingError> {
        if window_days == 0 {
            return Err(SchedulingError::InvalidWindow(
                "window must cover at least one day".to_string(),
            ));
        }

        let from = Utc::now().date_naive() + Duration::days(1);
        let to = from + Duration::days(window_days as i64 - 1);
        debug!("Resolving slots for doctor {} over {}..={}", doctor_id, from, to);

        let mut windows = self.fetch_windows(doctor_id, from, to, auth_token).await?;

        // The walk below depends on ascending (date, start_time) order;
        // never trust the store's return order for that.
        windows.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));

        let occupied = self.fetch_booked_times(doctor_id, from, to, auth_token).await?;

        let mut by_date: BTreeMap<NaiveDate, Vec<Slot>> = BTreeMap::new();
        for window in &windows {
            by_date
                .entry(window.date)
                .or_default()
                .extend(slots_for_window(window, &occupied));
        }

        debug!(
            "Resolved {} slots across {} days for doctor {}",
            by_date.values().map(Vec::len).sum::<usize>(),
            by_date.len(),
            doctor_id
        );
        Ok(by_date)
    }

    async fn fetch_windows(
        &self,
        doctor_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityWindow>, SchedulingError> {
        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&date=gte.{}&date=lte.{}&order=date.asc,start_time.asc",
            doctor_id, from, to
        );

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let windows = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilityWindow>, _>>()
            .map_err(shared_database::StoreError::Decode)?;

        Ok(windows)
    }

    async fn fetch_booked_times(
        &self,
        doctor_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<HashSet<(NaiveDate, NaiveTime)>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=gte.{}&date=lte.{}&status=eq.Booked",
            doctor_id, from, to
        );

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let appointments = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(shared_database::StoreError::Decode)?;

        Ok(appointments
            .into_iter()
            .map(|apt| (apt.date, apt.time))
            .collect())
    }
}

/// Walk one availability window in fixed 30-minute steps.
///
/// A slot is emitted only when it fits entirely inside the window: a
/// 25-minute window yields nothing, and an 08:00-12:00 window ends with the
/// 11:30 slot. The booked flag is a membership test against the occupied
/// `(date, time)` set.
pub fn slots_for_window(
    window: &AvailabilityWindow,
    occupied: &HashSet<(NaiveDate, NaiveTime)>,
) -> Vec<Slot> {
    let mut slots = Vec::new();
    let mut start = window.start_time;

    loop {
        // overflowing_add keeps a midnight-spanning window from wrapping
        // into an infinite walk.
        let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(SLOT_MINUTES));
        if wrapped != 0 || end > window.end_time {
            break;
        }

        slots.push(Slot {
            date: window.date,
            start_time: start,
            end_time: end,
            is_booked: occupied.contains(&(window.date, start)),
        });
        start = end;
    }

    slots
}
