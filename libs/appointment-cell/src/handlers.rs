// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::error::AppError;
use clinic_discovery_cell::models::FacilityKey;

use crate::models::{BookingError, BookingForm, BookingRequest, FacilitySelection, SelectFacilityRequest};
use crate::state::BookingState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Select a facility from a search session. Registered clinics get a booking
/// draft (201); any other source gets a contact action (200).
#[axum::debug_handler]
pub async fn open_booking(
    State(state): State<Arc<BookingState>>,
    Json(request): Json<SelectFacilityRequest>,
) -> Result<(StatusCode, Json<FacilitySelection>), AppError> {
    let session = state
        .discovery
        .sessions
        .get(request.session_id)
        .await
        .ok_or(BookingError::SessionNotFound)?;

    let key = FacilityKey {
        source: request.source,
        id: request.id,
    };
    let record = session
        .read()
        .await
        .find_record(&key)
        .cloned()
        .ok_or(BookingError::FacilityNotFound)?;

    let selection = state.bookings.open(&record).await;
    let status = match selection {
        FacilitySelection::Book { .. } => StatusCode::CREATED,
        FacilitySelection::Contact { .. } => StatusCode::OK,
    };

    Ok((status, Json(selection)))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<BookingState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingRequest>, AppError> {
    let booking = state.bookings.get(booking_id).await?;
    Ok(Json(booking))
}

#[axum::debug_handler]
pub async fn update_booking(
    State(state): State<Arc<BookingState>>,
    Path(booking_id): Path<Uuid>,
    Json(form): Json<BookingForm>,
) -> Result<Json<BookingRequest>, AppError> {
    let booking = state.bookings.update(booking_id, form).await?;
    Ok(Json(booking))
}

/// Gateway failures come back as 200 with `status: failed` and the upstream
/// message in `last_error`; only validation and state errors are HTTP errors.
#[axum::debug_handler]
pub async fn submit_booking(
    State(state): State<Arc<BookingState>>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<BookingRequest>, AppError> {
    debug!("Submitting booking {}", booking_id);
    let booking = state.bookings.submit(booking_id, bearer_token(&headers)).await?;
    Ok(Json(booking))
}

#[axum::debug_handler]
pub async fn close_booking(
    State(state): State<Arc<BookingState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.bookings.close(booking_id).await?;

    Ok(Json(json!({
        "success": true,
        "booking_id": booking_id
    })))
}
