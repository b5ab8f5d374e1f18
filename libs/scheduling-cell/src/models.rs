// libs/scheduling-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use shared_database::StoreError;

/// Fixed slot granularity. Availability windows are diced into slots of this
/// length; appointment times always fall on this grid.
pub const SLOT_MINUTES: i64 = 30;

// ==============================================================================
// STORE-BACKED MODELS
// ==============================================================================

/// A contiguous open interval a doctor has declared on one calendar date.
/// Unique per (doctor_id, date, start_time); created and deleted wholesale,
/// never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub avail_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub app_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
}

/// Appointment lifecycle. `Booked` is the only live state; `Completed` and
/// `Cancelled` are terminal and unreachable from each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Booked,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "Booked"),
            AppointmentStatus::Completed => write!(f, "Completed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub treatment_id: i64,
    pub app_id: i64,
    pub diagnosis: String,
    pub prescription: String,
    pub notes: Option<String>,
}

// ==============================================================================
// DERIVED MODELS
// ==============================================================================

/// A bookable 30-minute unit, recomputed on every resolution request and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_booked: bool,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclareWindowRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordTreatmentRequest {
    pub diagnosis: String,
    pub prescription: String,
    pub notes: Option<String>,
}

// ==============================================================================
// ERROR TAXONOMY
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    /// Recoverable and expected under concurrency: the caller should
    /// re-resolve slots and offer a fresh set.
    #[error("Slot already taken")]
    SlotAlreadyTaken,

    /// Malformed date/time input, rejected before touching the store.
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// Collapses "no such record" and "not yours to act on" so responses
    /// never leak whether the record exists.
    #[error("Appointment not found or not authorized")]
    NotFoundOrUnauthorized,

    #[error("Availability window already declared for this start time")]
    DuplicateWindow,

    #[error("Treatment already recorded for this appointment")]
    TreatmentAlreadyRecorded,

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}
