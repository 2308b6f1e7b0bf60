// libs/clinic-discovery-cell/src/services/aggregator.rs
use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::models::{
    AggregatedResults, Coordinates, DisplayGroup, FacilityRecord, FacilitySource,
    RankedFacility, SearchFilters,
};

const EARTH_RADIUS_KM: f64 = 6371.0;
/// Two same-named facilities closer than this are treated as one clinic.
const DEDUPE_DISTANCE_KM: f64 = 0.15;
pub const DISTANCE_UNAVAILABLE: &str = "Distance unavailable";

/// Inputs for one aggregation pass, already split by source.
pub struct AggregateInput<'a> {
    pub registry: &'a [FacilityRecord],
    pub places: &'a [FacilityRecord],
    pub ai_results: &'a [FacilityRecord],
    pub filters: &'a SearchFilters,
    pub origin: Option<Coordinates>,
    pub dedupe: bool,
}

/// Merge the three source lists into the ordered, filtered display view.
pub fn aggregate(input: AggregateInput<'_>) -> AggregatedResults {
    let merged = input
        .registry
        .iter()
        .chain(input.places.iter())
        .chain(input.ai_results.iter());

    let specialty = input.filters.active_specialty().map(str::to_lowercase);
    let insurance = input.filters.active_insurance().map(str::to_lowercase);

    let mut kept: Vec<&FacilityRecord> = merged
        .filter(|r| matches_specialty(r, specialty.as_deref()))
        .filter(|r| matches_insurance(r, insurance.as_deref()))
        .collect();

    if input.dedupe {
        kept = dedupe_against_registry(kept);
    }

    let mut results = AggregatedResults::default();
    for record in kept {
        let ranked = rank(record, input.origin);
        match ranked.group {
            DisplayGroup::PartnerVerified => results.partners.push(ranked),
            DisplayGroup::OtherNearby => results.others.push(ranked),
        }
    }

    if input.filters.sort_by_distance {
        sort_by_distance(&mut results.partners);
        sort_by_distance(&mut results.others);
    }

    results.total_count = results.partners.len() + results.others.len();

    debug!(
        "Aggregated {} facilities ({} partners, {} others)",
        results.total_count,
        results.partners.len(),
        results.others.len()
    );

    results
}

/// Case-insensitive equality. Places results always pass: the provider
/// already matched on the keyword.
fn matches_specialty(record: &FacilityRecord, specialty: Option<&str>) -> bool {
    let Some(wanted) = specialty else {
        return true;
    };

    if record.source() == FacilitySource::PlacesSearch {
        return true;
    }

    record.specialty.trim().to_lowercase() == wanted
}

fn matches_insurance(record: &FacilityRecord, insurance: Option<&str>) -> bool {
    let Some(wanted) = insurance else {
        return true;
    };

    record
        .insurance_accepted
        .iter()
        .any(|plan| plan.to_lowercase().contains(wanted))
}

fn rank(record: &FacilityRecord, origin: Option<Coordinates>) -> RankedFacility {
    let source = record.source();
    let coordinates = record.coordinates();
    let distance_km = match (origin, coordinates) {
        (Some(from), Some(to)) => Some(haversine_km(from, to)),
        _ => None,
    };

    RankedFacility {
        record: record.clone(),
        group: source.display_group(),
        badge: source.badge(),
        bookable: source.is_bookable(),
        mappable: coordinates.is_some(),
        distance_km,
        distance_text: distance_km
            .map(format_distance)
            .unwrap_or_else(|| DISTANCE_UNAVAILABLE.to_string()),
    }
}

/// Stable sort; entries without a distance keep their relative order at the end.
fn sort_by_distance(entries: &mut [RankedFacility]) {
    entries.sort_by(|a, b| match (a.distance_km, b.distance_km) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lng = (to.longitude - from.longitude).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{:.1} km", km)
    }
}

fn name_key(name: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let re = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));
    re.replace_all(&name.to_lowercase(), " ").trim().to_string()
}

/// Opt-in: drop non-registry entries that name-match a nearby registry entry.
fn dedupe_against_registry(records: Vec<&FacilityRecord>) -> Vec<&FacilityRecord> {
    let partners: Vec<(String, Coordinates)> = records
        .iter()
        .filter(|r| r.source() == FacilitySource::Registered)
        .filter_map(|r| r.coordinates().map(|c| (name_key(&r.name), c)))
        .collect();

    records
        .into_iter()
        .filter(|r| {
            if r.source() == FacilitySource::Registered {
                return true;
            }
            let Some(coords) = r.coordinates() else {
                return true;
            };
            let key = name_key(&r.name);
            let duplicate = partners
                .iter()
                .any(|(name, at)| *name == key && haversine_km(*at, coords) <= DEDUPE_DISTANCE_KM);
            if duplicate {
                debug!("Dropping {} result '{}' duplicated by a partner clinic", r.source(), r.name);
            }
            !duplicate
        })
        .collect()
}
