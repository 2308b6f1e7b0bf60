use serde::Serialize;
use thiserror::Error;

use shared_models::error::AppError;

/// Failures of the platform geolocation capability. Each maps to its own
/// user-facing message so the front end can tell the user what to do.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationError {
    #[error("Location services are not supported by this browser. Enter an area to search instead.")]
    Unsupported,

    #[error("Location access was denied. Allow location access in your browser settings to find nearby clinics.")]
    PermissionDenied,

    #[error("Your location could not be determined. Check your connection or GPS and try again.")]
    PositionUnavailable,

    #[error("Locating you took too long. Try again from an area with better signal.")]
    Timeout,
}

impl LocationError {
    pub fn code(&self) -> &'static str {
        match self {
            LocationError::Unsupported => "unsupported",
            LocationError::PermissionDenied => "permission_denied",
            LocationError::PositionUnavailable => "position_unavailable",
            LocationError::Timeout => "timeout",
        }
    }

    /// Denied is a user decision and must not be retried behind their back.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LocationError::PositionUnavailable)
    }
}

impl From<LocationError> for AppError {
    fn from(err: LocationError) -> Self {
        AppError::Unprocessable {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("{0} source is not configured")]
    NotConfigured(&'static str),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Places search returned status {status}: {message}")]
    PlacesStatus { status: String, message: String },

    #[error("Could not decode upstream response: {0}")]
    Decode(String),

    #[error("An area to search is required")]
    MissingArea,

    #[error("This source needs the device location")]
    NoLocation,

    #[error("Search session not found")]
    SessionNotFound,
}

impl From<reqwest::Error> for DiscoveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DiscoveryError::Decode(err.to_string())
        } else {
            DiscoveryError::Upstream(err.to_string())
        }
    }
}

impl From<DiscoveryError> for AppError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::MissingArea | DiscoveryError::NoLocation => {
                AppError::BadRequest(err.to_string())
            }
            DiscoveryError::SessionNotFound => AppError::NotFound(err.to_string()),
            _ => AppError::ExternalService(err.to_string()),
        }
    }
}
