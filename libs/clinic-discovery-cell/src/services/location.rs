// libs/clinic-discovery-cell/src/services/location.rs
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::error::LocationError;
use crate::models::Position;

/// Anything that can answer "where is the user right now".
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Position, LocationError>;
}

/// Position (or failure) reported by the browser's geolocation API.
///
/// Error codes follow `GeolocationPositionError`: 1 = permission denied,
/// 2 = position unavailable, 3 = timeout.
#[derive(Debug, Clone)]
pub struct ClientReportedLocation {
    supported: bool,
    position: Option<Position>,
    error_code: Option<u16>,
}

impl ClientReportedLocation {
    pub fn new(supported: bool, position: Option<Position>, error_code: Option<u16>) -> Self {
        Self {
            supported,
            position,
            error_code,
        }
    }

    pub fn at(position: Position) -> Self {
        Self::new(true, Some(position), None)
    }

    pub fn failed(error_code: u16) -> Self {
        Self::new(true, None, Some(error_code))
    }

    pub fn unsupported() -> Self {
        Self::new(false, None, None)
    }
}

#[async_trait]
impl GeolocationProvider for ClientReportedLocation {
    async fn current_position(&self) -> Result<Position, LocationError> {
        if !self.supported {
            return Err(LocationError::Unsupported);
        }

        if let Some(code) = self.error_code {
            return Err(match code {
                1 => LocationError::PermissionDenied,
                3 => LocationError::Timeout,
                _ => LocationError::PositionUnavailable,
            });
        }

        match self.position {
            Some(position) if position.coordinates.is_valid() => Ok(position),
            Some(position) => {
                warn!("Rejecting out-of-range coordinates {:?}", position.coordinates);
                Err(LocationError::PositionUnavailable)
            }
            None => Err(LocationError::PositionUnavailable),
        }
    }
}

pub struct LocationService {
    timeout: Duration,
    max_retries: u32,
}

impl LocationService {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Duration::from_secs(config.geolocation_timeout_secs),
            config.geolocation_max_retries,
        )
    }

    /// Ask the provider for a position with a bounded wait. Only
    /// `PositionUnavailable` is retried.
    pub async fn acquire(&self, provider: &dyn GeolocationProvider) -> Result<Position, LocationError> {
        let mut attempt = 0;

        loop {
            let result = match tokio::time::timeout(self.timeout, provider.current_position()).await {
                Ok(result) => result,
                Err(_) => Err(LocationError::Timeout),
            };

            match result {
                Ok(position) => {
                    info!(
                        "Location acquired ({:.4}, {:.4}) ±{:.0}m",
                        position.coordinates.latitude,
                        position.coordinates.longitude,
                        position.accuracy_m
                    );
                    return Ok(position);
                }
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!("Location unavailable, retry {}/{}", attempt, self.max_retries);
                }
                Err(err) => {
                    warn!("Location acquisition failed: {}", err.code());
                    return Err(err);
                }
            }
        }
    }
}
