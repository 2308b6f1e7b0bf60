use std::sync::Arc;

use shared_config::AppConfig;
use clinic_discovery_cell::DiscoveryState;

use crate::services::booking::BookingService;

/// Booking routes read selected facilities out of the discovery sessions.
pub struct BookingState {
    pub discovery: Arc<DiscoveryState>,
    pub bookings: BookingService,
}

impl BookingState {
    pub fn new(config: Arc<AppConfig>, discovery: Arc<DiscoveryState>) -> Self {
        Self {
            bookings: BookingService::new(&config),
            discovery,
        }
    }
}
