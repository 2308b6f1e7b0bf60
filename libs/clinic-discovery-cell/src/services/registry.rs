// libs/clinic-discovery-cell/src/services/registry.rs
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::DiscoveryError;
use crate::models::{Coordinates, FacilitySource, RawFacility, RegistryRow};
use crate::services::adapter::{AdapterQuery, FacilityAdapter};

const KM_PER_DEGREE_LATITUDE: f64 = 111.32;

/// Verified partner clinics from our own `clinics` table.
pub struct RegistryAdapter {
    supabase: SupabaseClient,
    radius_km: f64,
    configured: bool,
}

impl RegistryAdapter {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            radius_km: config.registry_search_radius_km,
            configured: config.is_configured(),
        }
    }

    fn search_path(&self, center: Coordinates) -> String {
        let bounds = bounding_box(center, self.radius_km);
        let mut path = format!(
            "/rest/v1/clinics?select=*&is_active=eq.true\
             &latitude=gte.{:.6}&latitude=lte.{:.6}",
            bounds.min_lat, bounds.max_lat
        );
        match bounds.longitude {
            LongitudeRange::Span { west, east } => {
                path.push_str(&format!("&longitude=gte.{:.6}&longitude=lte.{:.6}", west, east));
            }
            LongitudeRange::Wrapped { west, east } => {
                path.push_str(&format!("&or=(longitude.gte.{:.6},longitude.lte.{:.6})", west, east));
            }
            LongitudeRange::All => {}
        }
        path
    }
}

#[async_trait]
impl FacilityAdapter for RegistryAdapter {
    fn source(&self) -> FacilitySource {
        FacilitySource::Registered
    }

    async fn fetch(&self, query: &AdapterQuery) -> Result<Vec<RawFacility>, DiscoveryError> {
        if !self.configured {
            return Err(DiscoveryError::NotConfigured("registry"));
        }

        let center = query.coordinates.ok_or(DiscoveryError::NoLocation)?;
        let path = self.search_path(center);
        debug!("Querying clinic registry near {:?}", center);

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| DiscoveryError::Upstream(e.to_string()))?;

        let facilities = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<RegistryRow>(row) {
                Ok(parsed) => Some(RawFacility::Registry(parsed)),
                Err(e) => {
                    warn!("Skipping malformed registry row: {}", e);
                    None
                }
            })
            .collect();

        Ok(facilities)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LongitudeRange {
    Span { west: f64, east: f64 },
    /// Crosses the antimeridian: `longitude >= west OR longitude <= east`.
    Wrapped { west: f64, east: f64 },
    All,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundingBox {
    min_lat: f64,
    max_lat: f64,
    longitude: LongitudeRange,
}

/// Degree box that contains the circle of `radius_km` around `center`.
fn bounding_box(center: Coordinates, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / KM_PER_DEGREE_LATITUDE;
    let cos_lat = center.latitude.to_radians().cos().abs().max(0.01);
    let lng_delta = radius_km / (KM_PER_DEGREE_LATITUDE * cos_lat);

    let west = center.longitude - lng_delta;
    let east = center.longitude + lng_delta;
    let longitude = if lng_delta >= 180.0 {
        LongitudeRange::All
    } else if west < -180.0 {
        LongitudeRange::Wrapped { west: west + 360.0, east }
    } else if east > 180.0 {
        LongitudeRange::Wrapped { west, east: east - 360.0 }
    } else {
        LongitudeRange::Span { west, east }
    };

    BoundingBox {
        min_lat: (center.latitude - lat_delta).max(-90.0),
        max_lat: (center.latitude + lat_delta).min(90.0),
        longitude,
    }
}
