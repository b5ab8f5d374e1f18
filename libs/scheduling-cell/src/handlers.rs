// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;

use crate::models::{
    BookSlotRequest, DeclareWindowRequest, RecordTreatmentRequest, SchedulingError,
};
use crate::services::availability::AvailabilityService;
use crate::services::booking::BookingService;
use crate::services::slots::SlotResolver;
use crate::services::treatment::TreatmentService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct WindowQueryParams {
    pub days: Option<u32>,
}

fn map_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::SlotAlreadyTaken => AppError::Conflict(e.to_string()),
        SchedulingError::DuplicateWindow => AppError::Conflict(e.to_string()),
        SchedulingError::TreatmentAlreadyRecorded => AppError::Conflict(e.to_string()),
        SchedulingError::InvalidWindow(_) => AppError::BadRequest(e.to_string()),
        SchedulingError::NotFoundOrUnauthorized => AppError::NotFound(e.to_string()),
        SchedulingError::Store(inner) => AppError::Store(inner.to_string()),
    }
}

// ==============================================================================
// SLOT HANDLERS
// ==============================================================================

/// Open slots for one doctor over the coming days, grouped by date.
#[axum::debug_handler]
pub async fn get_doctor_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
    Path(doctor_id): Path<i64>,
    Query(params): Query<WindowQueryParams>,
) -> Result<Json<Value>, AppError> {
    let days = params.days.unwrap_or(state.booking_window_days);

    let resolver = SlotResolver::new(&state);
    let slots = resolver
        .resolve_slots(doctor_id, days, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "days": days,
        "slots": slots,
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    // Patients book for themselves; admins may book on a patient's behalf.
    let permitted = match user.role {
        Role::Patient => request.patient_id == user.id,
        Role::Admin => true,
        Role::Doctor => false,
    };
    if !permitted {
        return Err(AppError::Auth(
            "Not authorized to book for this patient".to_string(),
        ));
    }

    let booking = BookingService::new(&state);
    let appointment = booking
        .book_slot(
            request.patient_id,
            request.doctor_id,
            request.date,
            request.time,
            auth.token(),
        )
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

/// Role-scoped listing: doctors see their upcoming schedule, patients their
/// own bookings, admins the global overview.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);
    let token = auth.token();

    let (upcoming, history) = match user.role {
        Role::Doctor => {
            let upcoming = booking
                .upcoming_for_doctor(user.id, state.booking_window_days, token)
                .await
                .map_err(map_error)?;
            (upcoming, Vec::new())
        }
        Role::Patient => {
            let upcoming = booking
                .upcoming_for_patient(user.id, token)
                .await
                .map_err(map_error)?;
            let history = booking
                .history_for_patient(user.id, token)
                .await
                .map_err(map_error)?;
            (upcoming, history)
        }
        Role::Admin => {
            let upcoming = booking
                .upcoming_all(100, token)
                .await
                .map_err(map_error)?;
            (upcoming, Vec::new())
        }
    };

    Ok(Json(json!({
        "upcoming": upcoming,
        "history": history,
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Path(app_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);
    let appointment = booking
        .cancel_appointment(&user, app_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

// ==============================================================================
// TREATMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn record_treatment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Path(app_id): Path<i64>,
    Json(request): Json<RecordTreatmentRequest>,
) -> Result<Json<Value>, AppError> {
    if user.role != Role::Doctor {
        return Err(AppError::Auth(
            "Only doctors can record treatments".to_string(),
        ));
    }

    let service = TreatmentService::new(&state);
    let treatment = service
        .record_treatment(user.id, app_id, &request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "treatment": treatment,
    })))
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn declare_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<DeclareWindowRequest>,
) -> Result<Json<Value>, AppError> {
    if user.role != Role::Doctor {
        return Err(AppError::Auth(
            "Only doctors can declare availability".to_string(),
        ));
    }

    let service = AvailabilityService::new(&state);
    let window = service
        .declare_window(user.id, &request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "window": window,
    })))
}

#[axum::debug_handler]
pub async fn list_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<WindowQueryParams>,
) -> Result<Json<Value>, AppError> {
    if user.role != Role::Doctor {
        return Err(AppError::Auth(
            "Only doctors can list their availability".to_string(),
        ));
    }

    let days = params.days.unwrap_or(state.booking_window_days);
    let service = AvailabilityService::new(&state);
    let windows = service
        .list_windows(user.id, days, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "windows": windows,
    })))
}

#[axum::debug_handler]
pub async fn delete_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Path(avail_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if user.role != Role::Doctor {
        return Err(AppError::Auth(
            "Only doctors can delete availability".to_string(),
        ));
    }

    let service = AvailabilityService::new(&state);
    service
        .delete_window(user.id, avail_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
    })))
}
