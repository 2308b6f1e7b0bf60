use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LocationError;

// ==============================================================================
// GEOGRAPHY
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(flatten)]
    pub coordinates: Coordinates,
    /// Accuracy radius in meters as reported by the device.
    #[serde(default)]
    pub accuracy_m: f64,
}

// ==============================================================================
// FACILITY RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilitySource {
    Registered,
    PlacesSearch,
    AiSearch,
}

impl FacilitySource {
    /// Only clinics from our own registry can be booked in-app.
    pub fn is_bookable(&self) -> bool {
        matches!(self, FacilitySource::Registered)
    }

    pub fn badge(&self) -> &'static str {
        match self {
            FacilitySource::Registered => "Verified Partner",
            FacilitySource::PlacesSearch => "Nearby",
            FacilitySource::AiSearch => "AI Found",
        }
    }

    pub fn display_group(&self) -> DisplayGroup {
        match self {
            FacilitySource::Registered => DisplayGroup::PartnerVerified,
            _ => DisplayGroup::OtherNearby,
        }
    }
}

impl fmt::Display for FacilitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FacilitySource::Registered => "registry",
            FacilitySource::PlacesSearch => "places",
            FacilitySource::AiSearch => "ai_search",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayGroup {
    PartnerVerified,
    OtherNearby,
}

/// The unified, source-tagged representation of one healthcare facility.
///
/// `id` is only unique within `source`; two records from different sources
/// may describe the same clinic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityRecord {
    pub id: String,
    source: FacilitySource,
    pub name: String,
    pub specialty: String,
    pub address: String,
    pub phone: String,
    pub hours_text: String,
    pub rating: f32,
    pub review_count: u32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub insurance_accepted: Vec<String>,
    pub services_offered: Vec<String>,
    pub next_available_text: String,
    pub image_url: String,
    pub open_now: Option<bool>,
    pub website: Option<String>,
}

impl FacilityRecord {
    pub fn new(source: FacilitySource, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source,
            name: name.into(),
            specialty: String::new(),
            address: String::new(),
            phone: String::new(),
            hours_text: String::new(),
            rating: 0.0,
            review_count: 0,
            latitude: None,
            longitude: None,
            insurance_accepted: Vec::new(),
            services_offered: Vec::new(),
            next_available_text: String::new(),
            image_url: String::new(),
            open_now: None,
            website: None,
        }
    }

    pub fn source(&self) -> FacilitySource {
        self.source
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                let coords = Coordinates::new(latitude, longitude);
                coords.is_valid().then_some(coords)
            }
            _ => None,
        }
    }

    pub fn is_bookable(&self) -> bool {
        self.source.is_bookable()
    }

    pub fn key(&self) -> FacilityKey {
        FacilityKey {
            source: self.source,
            id: self.id.clone(),
        }
    }
}

/// Globally unique handle for a record: the source plus its source-local id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacilityKey {
    pub source: FacilitySource,
    pub id: String,
}

// ==============================================================================
// RAW UPSTREAM SHAPES
// ==============================================================================

/// Number that some upstreams send as a JSON string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            LooseNumber::Number(n) => *n,
            LooseNumber::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseId {
    Text(String),
    Number(i64),
}

impl fmt::Display for LooseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LooseId::Text(s) => f.write_str(s),
            LooseId::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A list that AI output sometimes collapses into one comma-separated string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseList {
    List(Vec<String>),
    Text(String),
}

impl LooseList {
    pub fn into_vec(self) -> Vec<String> {
        let items = match self {
            LooseList::List(items) => items,
            LooseList::Text(text) => text.split(',').map(String::from).collect(),
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Row from the internal `clinics` table.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryRow {
    pub id: LooseId,
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "hours_text")]
    pub hours: Option<String>,
    #[serde(default)]
    pub rating: Option<LooseNumber>,
    #[serde(default)]
    pub review_count: Option<LooseNumber>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub insurance_accepted: Option<Vec<String>>,
    #[serde(default, alias = "services")]
    pub services_offered: Option<Vec<String>>,
    #[serde(default)]
    pub next_available: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesNearbyResponse {
    #[serde(default)]
    pub results: Vec<PlacesResult>,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesResult {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub formatted_phone_number: Option<String>,
    #[serde(default)]
    pub rating: Option<LooseNumber>,
    #[serde(default)]
    pub user_ratings_total: Option<u32>,
    #[serde(default)]
    pub geometry: Option<PlacesGeometry>,
    #[serde(default)]
    pub photos: Vec<PlacesPhoto>,
    #[serde(default)]
    pub opening_hours: Option<PlacesOpeningHours>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesGeometry {
    pub location: PlacesLatLng,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlacesLatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesPhoto {
    pub photo_reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesOpeningHours {
    #[serde(default)]
    pub open_now: Option<bool>,
}

/// Loosely structured facility guess returned by the AI web search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AiFacilityGuess {
    #[serde(alias = "clinic_name", alias = "title")]
    pub name: Option<String>,
    pub address: Option<String>,
    #[serde(alias = "phone_number", alias = "contact")]
    pub phone: Option<String>,
    #[serde(alias = "type", alias = "category")]
    pub specialty: Option<String>,
    #[serde(alias = "services_offered")]
    pub services: Option<LooseList>,
    #[serde(alias = "insurance_accepted")]
    pub insurance: Option<LooseList>,
    pub rating: Option<LooseNumber>,
    #[serde(alias = "hours_text", alias = "opening_hours")]
    pub hours: Option<String>,
    pub website: Option<String>,
}

/// One upstream result, still in its source's shape.
#[derive(Debug, Clone)]
pub enum RawFacility {
    Registry(RegistryRow),
    Places(PlacesResult),
    AiSearch(AiFacilityGuess),
}

impl RawFacility {
    pub fn source(&self) -> FacilitySource {
        match self {
            RawFacility::Registry(_) => FacilitySource::Registered,
            RawFacility::Places(_) => FacilitySource::PlacesSearch,
            RawFacility::AiSearch(_) => FacilitySource::AiSearch,
        }
    }
}

// ==============================================================================
// FILTERS AND RESULTS
// ==============================================================================

pub const ALL_OPTION: &str = "All";
pub const DEFAULT_PLACES_KEYWORD: &str = "medical clinic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default = "default_all")]
    pub specialty: String,
    #[serde(default = "default_all")]
    pub insurance: String,
    #[serde(default)]
    pub sort_by_distance: bool,
}

fn default_all() -> String {
    ALL_OPTION.to_string()
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            specialty: default_all(),
            insurance: default_all(),
            sort_by_distance: false,
        }
    }
}

impl SearchFilters {
    /// `None` when the selection means "everything".
    pub fn active_specialty(&self) -> Option<&str> {
        active_option(&self.specialty, &["all", "all specialties"])
    }

    pub fn active_insurance(&self) -> Option<&str> {
        active_option(&self.insurance, &["all", "all insurance", "all insurances"])
    }

    pub fn places_keyword(&self) -> String {
        self.active_specialty()
            .map(String::from)
            .unwrap_or_else(|| DEFAULT_PLACES_KEYWORD.to_string())
    }
}

fn active_option<'a>(value: &'a str, catch_all: &[&str]) -> Option<&'a str> {
    let trimmed = value.trim();
    let lowered = trimmed.to_lowercase();
    if trimmed.is_empty() || catch_all.contains(&lowered.as_str()) {
        None
    } else {
        Some(trimmed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFacility {
    #[serde(flatten)]
    pub record: FacilityRecord,
    pub group: DisplayGroup,
    pub badge: &'static str,
    pub bookable: bool,
    pub mappable: bool,
    pub distance_km: Option<f64>,
    pub distance_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedResults {
    pub partners: Vec<RankedFacility>,
    pub others: Vec<RankedFacility>,
    pub total_count: usize,
}

impl AggregatedResults {
    /// Rendering order: partners first, then everything else.
    pub fn iter(&self) -> impl Iterator<Item = &RankedFacility> {
        self.partners.iter().chain(self.others.iter())
    }
}

// ==============================================================================
// SEARCH SESSION VIEW
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    NotSearched,
    Searching,
    Ready,
    LocationFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Succeeded { count: usize },
    Failed { reason: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: FacilitySource,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFailure {
    pub code: &'static str,
    pub message: String,
}

impl From<LocationError> for LocationFailure {
    fn from(err: LocationError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchView {
    pub session_id: Uuid,
    pub phase: SearchPhase,
    pub request_id: RequestId,
    pub location: Option<Coordinates>,
    pub filters: SearchFilters,
    pub partners: Vec<RankedFacility>,
    pub others: Vec<RankedFacility>,
    pub total_count: usize,
    /// True only when a search finished and nothing survived the filters.
    pub no_matches: bool,
    pub pending_sources: Vec<FacilitySource>,
    pub sources: Vec<SourceReport>,
    pub areas_searched: Vec<String>,
    pub location_error: Option<LocationFailure>,
}

// ==============================================================================
// API REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub session_id: Option<Uuid>,
    pub location: Option<Position>,
    /// W3C `GeolocationPositionError.code` reported by the browser.
    pub location_error: Option<u16>,
    #[serde(default = "default_true")]
    pub geolocation_supported: bool,
    pub filters: Option<SearchFilters>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AreaSearchRequest {
    pub area: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub wait: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_number_accepts_string_and_number() {
        let from_text: LooseNumber = serde_json::from_str("\"4.5\"").unwrap();
        let from_num: LooseNumber = serde_json::from_str("3.2").unwrap();
        let garbage: LooseNumber = serde_json::from_str("\"n/a\"").unwrap();

        assert_eq!(from_text.as_f64(), Some(4.5));
        assert_eq!(from_num.as_f64(), Some(3.2));
        assert_eq!(garbage.as_f64(), None);
    }

    #[test]
    fn test_loose_list_splits_comma_text() {
        let list: LooseList = serde_json::from_str("\"X-ray, Lab tests ,, Vaccines\"").unwrap();
        assert_eq!(list.into_vec(), vec!["X-ray", "Lab tests", "Vaccines"]);
    }

    #[test]
    fn test_all_specialties_is_inactive() {
        let filters = SearchFilters {
            specialty: "All Specialties".to_string(),
            ..SearchFilters::default()
        };
        assert_eq!(filters.active_specialty(), None);
        assert_eq!(filters.places_keyword(), DEFAULT_PLACES_KEYWORD);

        let cardiology = SearchFilters {
            specialty: " Cardiology ".to_string(),
            ..SearchFilters::default()
        };
        assert_eq!(cardiology.active_specialty(), Some("Cardiology"));
        assert_eq!(cardiology.places_keyword(), "Cardiology");
    }

    #[test]
    fn test_ai_guess_tolerates_aliases_and_missing_fields() {
        let guess: AiFacilityGuess = serde_json::from_str(
            r#"{"clinic_name":"Lekki Family Clinic","phone_number":"0800","services":"GP, Lab"}"#,
        )
        .unwrap();

        assert_eq!(guess.name.as_deref(), Some("Lekki Family Clinic"));
        assert_eq!(guess.phone.as_deref(), Some("0800"));
        assert_eq!(guess.address, None);
        assert_eq!(guess.services.unwrap().into_vec(), vec!["GP", "Lab"]);
    }

    #[test]
    fn test_record_without_coordinates_is_not_mappable() {
        let mut record = FacilityRecord::new(FacilitySource::AiSearch, "ai-1", "Guess");
        assert_eq!(record.coordinates(), None);

        record.latitude = Some(6.5);
        record.longitude = Some(3.4);
        assert_eq!(record.coordinates(), Some(Coordinates::new(6.5, 3.4)));
        assert!(!record.is_bookable());
    }
}
