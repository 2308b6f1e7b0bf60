use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers;
use crate::state::DiscoveryState;

pub fn clinic_discovery_routes(state: Arc<DiscoveryState>) -> Router {
    Router::new()
        .route("/search", post(handlers::search_clinics))
        .route("/search/{session_id}", get(handlers::get_search).delete(handlers::close_search))
        .route("/search/{session_id}/filters", put(handlers::update_filters))
        .route("/search/{session_id}/area", post(handlers::search_area))
        .route("/search/{session_id}/reset", post(handlers::reset_search))
        .with_state(state)
}
