// libs/clinic-discovery-cell/src/services/normalize.rs
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    AiFacilityGuess, FacilityRecord, FacilitySource, LooseNumber, PlacesResult,
    RawFacility, RegistryRow, SearchFilters,
};

pub const HOURS_NOT_LISTED: &str = "Hours not listed";
pub const CALL_FOR_AVAILABILITY: &str = "Call to check availability";
pub const AI_HOURS_PLACEHOLDER: &str = "Hours not verified";
pub const AI_AVAILABILITY_PLACEHOLDER: &str = "Contact clinic for availability";
pub const DEFAULT_PLACES_SPECIALTY: &str = "Medical Clinic";

const PLACES_PHOTO_MAX_WIDTH: u32 = 400;

/// Everything the normalizer needs beyond the raw payload itself.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    pub places_base_url: String,
    pub places_api_key: String,
    pub placeholder_image_url: String,
    /// Specialty the Places keyword was built from, if any.
    pub specialty_hint: Option<String>,
}

impl NormalizeContext {
    pub fn new(config: &AppConfig, filters: &SearchFilters) -> Self {
        Self {
            places_base_url: config.google_places_base_url.trim_end_matches('/').to_string(),
            places_api_key: config.google_places_api_key.clone(),
            placeholder_image_url: config.placeholder_image_url.clone(),
            specialty_hint: filters.active_specialty().map(String::from),
        }
    }

    fn photo_url(&self, photo_reference: &str) -> String {
        format!(
            "{}/maps/api/place/photo?maxwidth={}&photo_reference={}&key={}",
            self.places_base_url,
            PLACES_PHOTO_MAX_WIDTH,
            urlencoding::encode(photo_reference),
            urlencoding::encode(&self.places_api_key),
        )
    }
}

/// Turn any upstream shape into a `FacilityRecord`. The record's source is
/// fixed here and nowhere else.
pub fn normalize(raw: RawFacility, ctx: &NormalizeContext) -> FacilityRecord {
    match raw {
        RawFacility::Registry(row) => from_registry(row, ctx),
        RawFacility::Places(place) => from_places(place, ctx),
        RawFacility::AiSearch(guess) => from_ai_guess(guess, ctx),
    }
}

fn from_registry(row: RegistryRow, ctx: &NormalizeContext) -> FacilityRecord {
    let mut record = FacilityRecord::new(FacilitySource::Registered, row.id.to_string(), row.name.trim());

    record.specialty = text_or(row.specialty, "");
    record.address = text_or(row.address, "");
    record.phone = text_or(row.phone, "");
    record.hours_text = text_or(row.hours, HOURS_NOT_LISTED);
    record.rating = clamp_rating(row.rating.as_ref());
    record.review_count = review_count(row.review_count.as_ref());
    record.latitude = row.latitude;
    record.longitude = row.longitude;
    record.insurance_accepted = clean_list(row.insurance_accepted.unwrap_or_default());
    record.services_offered = clean_list(row.services_offered.unwrap_or_default());
    record.next_available_text = text_or(row.next_available, CALL_FOR_AVAILABILITY);
    record.image_url = text_or(row.image_url, &ctx.placeholder_image_url);
    record.website = non_blank(row.website);

    record
}

fn from_places(place: PlacesResult, ctx: &NormalizeContext) -> FacilityRecord {
    let mut record = FacilityRecord::new(FacilitySource::PlacesSearch, place.place_id, place.name.trim());

    record.specialty = ctx
        .specialty_hint
        .clone()
        .unwrap_or_else(|| DEFAULT_PLACES_SPECIALTY.to_string());
    record.address = non_blank(place.vicinity)
        .or_else(|| non_blank(place.formatted_address))
        .unwrap_or_default();
    record.phone = text_or(place.formatted_phone_number, "");

    // Provider ratings are passed through as-is
    record.rating = place
        .rating
        .as_ref()
        .and_then(LooseNumber::as_f64)
        .map(|r| r as f32)
        .unwrap_or(0.0);
    record.review_count = place.user_ratings_total.unwrap_or(0);

    if let Some(geometry) = place.geometry {
        record.latitude = Some(geometry.location.lat);
        record.longitude = Some(geometry.location.lng);
    }

    record.open_now = place.opening_hours.and_then(|h| h.open_now);
    record.hours_text = match record.open_now {
        Some(true) => "Open now".to_string(),
        Some(false) => "Closed now".to_string(),
        None => HOURS_NOT_LISTED.to_string(),
    };
    record.next_available_text = CALL_FOR_AVAILABILITY.to_string();
    record.image_url = place
        .photos
        .first()
        .filter(|_| !ctx.places_api_key.is_empty())
        .map(|photo| ctx.photo_url(&photo.photo_reference))
        .unwrap_or_else(|| ctx.placeholder_image_url.clone());

    record
}

fn from_ai_guess(guess: AiFacilityGuess, ctx: &NormalizeContext) -> FacilityRecord {
    let name = text_or(guess.name, "Unnamed clinic");
    let mut record = FacilityRecord::new(FacilitySource::AiSearch, format!("ai-{}", Uuid::new_v4()), name);

    record.specialty = non_blank(guess.specialty)
        .or_else(|| ctx.specialty_hint.clone())
        .unwrap_or_default();
    record.address = text_or(guess.address, "");
    record.phone = text_or(guess.phone, "");
    record.hours_text = text_or(guess.hours, AI_HOURS_PLACEHOLDER);
    record.rating = clamp_rating(guess.rating.as_ref());
    record.services_offered = guess.services.map(|l| l.into_vec()).unwrap_or_default();
    record.insurance_accepted = guess.insurance.map(|l| l.into_vec()).unwrap_or_default();
    record.next_available_text = AI_AVAILABILITY_PLACEHOLDER.to_string();
    record.image_url = ctx.placeholder_image_url.clone();
    record.website = non_blank(guess.website);

    record
}

fn clamp_rating(raw: Option<&LooseNumber>) -> f32 {
    raw.and_then(LooseNumber::as_f64)
        .map(|r| r.clamp(0.0, 5.0) as f32)
        .unwrap_or(0.0)
}

fn review_count(raw: Option<&LooseNumber>) -> u32 {
    raw.and_then(LooseNumber::as_f64)
        .filter(|n| *n > 0.0)
        .map(|n| n.min(u32::MAX as f64) as u32)
        .unwrap_or(0)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn text_or(value: Option<String>, fallback: &str) -> String {
    non_blank(value).unwrap_or_else(|| fallback.to_string())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(specialty: Option<&str>) -> NormalizeContext {
        NormalizeContext {
            places_base_url: "https://maps.example.com".to_string(),
            places_api_key: "k3y".to_string(),
            placeholder_image_url: "/placeholder.png".to_string(),
            specialty_hint: specialty.map(String::from),
        }
    }

    #[test]
    fn test_registry_rating_string_is_normalized() {
        let row: RegistryRow = serde_json::from_value(json!({
            "id": 42,
            "name": " Amae Heart Centre ",
            "specialty": "Cardiology",
            "rating": "4.7",
            "review_count": "18",
            "latitude": 6.45,
            "longitude": 3.39,
            "insurance_accepted": ["AXA Mansard", " Hygeia "],
            "services": ["ECG", "Echo"]
        }))
        .unwrap();

        let record = normalize(RawFacility::Registry(row), &ctx(None));

        assert_eq!(record.source(), FacilitySource::Registered);
        assert_eq!(record.id, "42");
        assert_eq!(record.name, "Amae Heart Centre");
        assert_eq!(record.rating, 4.7);
        assert_eq!(record.review_count, 18);
        assert_eq!(record.insurance_accepted, vec!["AXA Mansard", "Hygeia"]);
        assert_eq!(record.services_offered, vec!["ECG", "Echo"]);
        assert_eq!(record.next_available_text, CALL_FOR_AVAILABILITY);
        assert_eq!(record.image_url, "/placeholder.png");
    }

    #[test]
    fn test_registry_out_of_range_rating_is_clamped() {
        let row: RegistryRow = serde_json::from_value(json!({
            "id": "c-1", "name": "X", "rating": 9, "review_count": -3
        }))
        .unwrap();

        let record = normalize(RawFacility::Registry(row), &ctx(None));
        assert_eq!(record.rating, 5.0);
        assert_eq!(record.review_count, 0);
    }

    #[test]
    fn test_places_result_resolves_photo_and_passes_rating_through() {
        let place: PlacesResult = serde_json::from_value(json!({
            "place_id": "ChIJ123",
            "name": "Reddington Hospital",
            "vicinity": "12 Idowu Martins St",
            "rating": 4.1,
            "user_ratings_total": 311,
            "geometry": {"location": {"lat": 6.43, "lng": 3.42}},
            "photos": [{"photo_reference": "ref/abc"}],
            "opening_hours": {"open_now": true}
        }))
        .unwrap();

        let record = normalize(RawFacility::Places(place), &ctx(Some("Cardiology")));

        assert_eq!(record.source(), FacilitySource::PlacesSearch);
        assert_eq!(record.id, "ChIJ123");
        assert_eq!(record.rating, 4.1);
        assert_eq!(record.review_count, 311);
        assert_eq!(record.specialty, "Cardiology");
        assert_eq!(record.hours_text, "Open now");
        assert_eq!(record.latitude, Some(6.43));
        assert_eq!(
            record.image_url,
            "https://maps.example.com/maps/api/place/photo?maxwidth=400&photo_reference=ref%2Fabc&key=k3y"
        );
    }

    #[test]
    fn test_places_without_photo_uses_placeholder() {
        let place: PlacesResult = serde_json::from_value(json!({
            "place_id": "p-2", "name": "Corner Clinic"
        }))
        .unwrap();

        let record = normalize(RawFacility::Places(place), &ctx(None));
        assert_eq!(record.image_url, "/placeholder.png");
        assert_eq!(record.specialty, DEFAULT_PLACES_SPECIALTY);
        assert_eq!(record.hours_text, HOURS_NOT_LISTED);
        assert_eq!(record.review_count, 0);
    }

    #[test]
    fn test_ai_guess_gets_placeholders_and_unique_ids() {
        let guess = AiFacilityGuess {
            name: Some("Lekki Family Clinic".to_string()),
            phone: Some("+234 800 000".to_string()),
            ..AiFacilityGuess::default()
        };

        let first = normalize(RawFacility::AiSearch(guess.clone()), &ctx(Some("Pediatrics")));
        let second = normalize(RawFacility::AiSearch(guess), &ctx(Some("Pediatrics")));

        assert_eq!(first.source(), FacilitySource::AiSearch);
        assert!(first.id.starts_with("ai-"));
        assert_ne!(first.id, second.id);
        assert_eq!(first.latitude, None);
        assert_eq!(first.specialty, "Pediatrics");
        assert_eq!(first.hours_text, AI_HOURS_PLACEHOLDER);
        assert_eq!(first.next_available_text, AI_AVAILABILITY_PLACEHOLDER);
    }
}
