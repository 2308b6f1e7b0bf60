use std::sync::Arc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub places_base_url: String,
    pub places_api_key: String,
    pub ai_search_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            places_base_url: "http://localhost:54322".to_string(),
            places_api_key: "test-places-key".to_string(),
            ai_search_url: "http://localhost:54323/search".to_string(),
        }
    }
}

impl TestConfig {
    /// Point every upstream at one mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            places_base_url: uri.to_string(),
            ai_search_url: format!("{}/ai/search", uri),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            google_places_base_url: self.places_base_url.clone(),
            google_places_api_key: self.places_api_key.clone(),
            ai_search_url: self.ai_search_url.clone(),
            adapter_timeout_secs: 2,
            booking_timeout_secs: 2,
            geolocation_timeout_secs: 1,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Canned upstream payloads shaped like the real collaborators.
pub struct MockUpstreamResponses;

impl MockUpstreamResponses {
    pub fn registry_clinic(id: &str, name: &str, specialty: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "specialty": specialty,
            "address": "14 Admiralty Way, Lekki",
            "phone": "+2348012345678",
            "hours": "Mon-Fri 8am-6pm",
            "rating": "4.6",
            "review_count": 27,
            "latitude": 6.4474,
            "longitude": 3.4720,
            "insurance_accepted": ["AXA Mansard", "Hygeia HMO"],
            "services": ["Consultation", "Lab tests"],
            "next_available": "Tomorrow, 10:00",
            "is_active": true
        })
    }

    pub fn places_result(place_id: &str, name: &str) -> Value {
        json!({
            "place_id": place_id,
            "name": name,
            "vicinity": "Admiralty Road, Lekki Phase 1",
            "rating": 4.2,
            "user_ratings_total": 128,
            "geometry": { "location": { "lat": 6.4490, "lng": 3.4700 } },
            "photos": [{ "photo_reference": format!("photo-{}", place_id) }],
            "opening_hours": { "open_now": true },
            "business_status": "OPERATIONAL"
        })
    }

    pub fn places_response(results: Vec<Value>) -> Value {
        let status = if results.is_empty() { "ZERO_RESULTS" } else { "OK" };
        json!({
            "results": results,
            "status": status
        })
    }

    pub fn places_error(status: &str, message: &str) -> Value {
        json!({
            "results": [],
            "status": status,
            "error_message": message
        })
    }

    pub fn ai_guess(name: &str) -> Value {
        json!({
            "name": name,
            "address": "Somewhere in the requested area",
            "phone": "+2348098765432",
            "services": "General consultation, Pharmacy"
        })
    }

    pub fn ai_response(guesses: Vec<Value>) -> Value {
        json!({ "clinics": guesses })
    }

    pub fn appointment_created(facility_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_id": facility_id,
            "status": "pending",
            "created_at": "2024-05-20T09:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
