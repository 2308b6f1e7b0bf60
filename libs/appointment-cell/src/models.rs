// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use clinic_discovery_cell::models::{FacilityRecord, FacilitySource};

/// Where the client is sent once an appointment is confirmed.
pub const CONFIRMED_REDIRECT: &str = "/dashboard";

// ==============================================================================
// BOOKING REQUEST
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Draft,
    Submitting,
    Confirmed,
    Failed,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Draft => write!(f, "draft"),
            BookingStatus::Submitting => write!(f, "submitting"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Failed => write!(f, "failed"),
        }
    }
}

impl BookingStatus {
    /// A failed request goes back through `Draft` before it is resubmitted.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Draft, Submitting) | (Submitting, Confirmed) | (Submitting, Failed) | (Failed, Draft)
        )
    }
}

/// One in-progress appointment request against a registered clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingRequest {
    pub id: Uuid,
    pub facility_id: String,
    pub facility_name: String,
    pub specialty: String,
    pub requested_date: String,
    pub requested_time: String,
    pub reason_text: String,
    pub status: BookingStatus,
    /// Message of the last failed submission, exactly as the backend sent it.
    pub last_error: Option<String>,
    pub confirmation: Option<BookingConfirmation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingRequest {
    pub fn draft_for(record: &FacilityRecord) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            facility_id: record.id.clone(),
            facility_name: record.name.clone(),
            specialty: record.specialty.clone(),
            requested_date: String::new(),
            requested_time: String::new(),
            reason_text: String::new(),
            status: BookingStatus::Draft,
            last_error: None,
            confirmation: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingConfirmation {
    pub appointment_id: String,
    pub redirect_to: String,
}

impl BookingConfirmation {
    pub fn new(appointment_id: impl Into<String>) -> Self {
        Self {
            appointment_id: appointment_id.into(),
            redirect_to: CONFIRMED_REDIRECT.to_string(),
        }
    }
}

/// Partial form edit; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingForm {
    pub requested_date: Option<String>,
    pub requested_time: Option<String>,
    pub reason_text: Option<String>,
}

// ==============================================================================
// FACILITY SELECTION
// ==============================================================================

/// Direct-contact affordance for facilities that cannot be booked in-app.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContactAction {
    pub facility_name: String,
    pub source: FacilitySource,
    pub phone_uri: Option<String>,
    pub directions_url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FacilitySelection {
    Book { booking: BookingRequest },
    Contact { contact: ContactAction },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectFacilityRequest {
    pub session_id: Uuid,
    pub source: FacilitySource,
    pub id: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking not found")]
    NotFound,

    #[error("Search session not found")]
    SessionNotFound,

    #[error("Facility is not part of the current search results")]
    FacilityNotFound,

    #[error("{0} facilities cannot be booked in-app")]
    NotBookable(FacilitySource),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Booking cannot move from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    #[error("Booking is being submitted and cannot be closed")]
    StillSubmitting,

    #[error("{0}")]
    Gateway(String),

    #[error("Booking request timed out after {0}s")]
    Timeout(u64),
}

impl From<BookingError> for shared_models::error::AppError {
    fn from(err: BookingError) -> Self {
        use shared_models::error::AppError;
        match err {
            BookingError::NotFound | BookingError::SessionNotFound | BookingError::FacilityNotFound => {
                AppError::NotFound(err.to_string())
            }
            BookingError::NotBookable(_) => AppError::BadRequest(err.to_string()),
            BookingError::Validation(msg) => AppError::ValidationError(msg),
            BookingError::InvalidTransition { .. } | BookingError::StillSubmitting => {
                AppError::Conflict(err.to_string())
            }
            BookingError::Gateway(msg) => AppError::ExternalService(msg),
            BookingError::Timeout(_) => AppError::ExternalService(err.to_string()),
        }
    }
}
