// libs/clinic-discovery-cell/src/services/places.rs
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::DiscoveryError;
use crate::models::{FacilitySource, PlacesNearbyResponse, RawFacility};
use crate::services::adapter::{AdapterQuery, FacilityAdapter};

const NEARBY_SEARCH_PATH: &str = "/maps/api/place/nearbysearch/json";

/// Google Places nearby search around the user's position.
pub struct PlacesAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    radius_meters: u32,
    configured: bool,
}

impl PlacesAdapter {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.google_places_base_url.trim_end_matches('/').to_string(),
            api_key: config.google_places_api_key.clone(),
            radius_meters: config.places_radius_meters,
            configured: config.is_places_configured(),
        }
    }
}

#[async_trait]
impl FacilityAdapter for PlacesAdapter {
    fn source(&self) -> FacilitySource {
        FacilitySource::PlacesSearch
    }

    async fn fetch(&self, query: &AdapterQuery) -> Result<Vec<RawFacility>, DiscoveryError> {
        if !self.configured {
            return Err(DiscoveryError::NotConfigured("places"));
        }
        let center = query.coordinates.ok_or(DiscoveryError::NoLocation)?;

        let keyword = query.filters.places_keyword();
        let location = format!("{},{}", center.latitude, center.longitude);
        let radius = self.radius_meters.to_string();
        debug!("Places nearby search '{}' within {}m of {}", keyword, radius, location);

        let response = self.client
            .get(format!("{}{}", self.base_url, NEARBY_SEARCH_PATH))
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("keyword", keyword.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Places API error ({}): {}", status, body);
            return Err(DiscoveryError::Upstream(format!("Places API returned {}", status)));
        }

        let payload: PlacesNearbyResponse = response.json().await?;

        match payload.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(payload
                .results
                .into_iter()
                .map(RawFacility::Places)
                .collect()),
            other => Err(DiscoveryError::PlacesStatus {
                status: other.to_string(),
                message: payload.error_message.unwrap_or_default(),
            }),
        }
    }
}
