use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::{booking_routes, BookingState};
use clinic_discovery_cell::{clinic_discovery_routes, DiscoveryState};
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let discovery = Arc::new(DiscoveryState::new(config.clone()));
    let bookings = Arc::new(BookingState::new(config, discovery.clone()));

    Router::new()
        .route("/", get(|| async { "Clinic discovery API is running!" }))
        .nest("/clinics", clinic_discovery_routes(discovery))
        .nest("/bookings", booking_routes(bookings))
}
