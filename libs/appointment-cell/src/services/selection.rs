// libs/appointment-cell/src/services/selection.rs
use tracing::debug;

use clinic_discovery_cell::models::FacilityRecord;

use crate::models::{BookingRequest, ContactAction, FacilitySelection};

const DIRECTIONS_BASE_URL: &str = "https://www.google.com/maps/dir/?api=1&destination=";

/// Only registered clinics open a booking draft. Everything else gets a
/// call/directions affordance and no draft is created.
pub fn select_facility(record: &FacilityRecord) -> FacilitySelection {
    if record.is_bookable() {
        debug!("Opening booking draft for {}", record.id);
        return FacilitySelection::Book {
            booking: BookingRequest::draft_for(record),
        };
    }

    debug!("Facility {} ({}) routed to direct contact", record.id, record.source());
    FacilitySelection::Contact {
        contact: contact_action(record),
    }
}

pub fn contact_action(record: &FacilityRecord) -> ContactAction {
    ContactAction {
        facility_name: record.name.clone(),
        source: record.source(),
        phone_uri: phone_uri(&record.phone),
        directions_url: directions_url(record),
    }
}

fn phone_uri(phone: &str) -> Option<String> {
    let dialable: String = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if dialable.trim_start_matches('+').is_empty() {
        None
    } else {
        Some(format!("tel:{}", dialable))
    }
}

/// Coordinates when known, otherwise the name and address as a text query.
fn directions_url(record: &FacilityRecord) -> String {
    let destination = match record.coordinates() {
        Some(c) => format!("{},{}", c.latitude, c.longitude),
        None if record.address.trim().is_empty() => record.name.clone(),
        None => format!("{}, {}", record.name, record.address.trim()),
    };

    format!("{}{}", DIRECTIONS_BASE_URL, urlencoding::encode(&destination))
}
