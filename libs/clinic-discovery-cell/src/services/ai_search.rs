// libs/clinic-discovery-cell/src/services/ai_search.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::error::DiscoveryError;
use crate::models::{AiFacilityGuess, FacilitySource, RawFacility};
use crate::services::adapter::{AdapterQuery, FacilityAdapter};

/// AI-driven web search scoped to an area the user typed in.
///
/// Results are unverified guesses: no coordinates, no booking.
pub struct AiSearchAdapter {
    client: Client,
    url: String,
    api_key: String,
    configured: bool,
}

impl AiSearchAdapter {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.ai_search_url.clone(),
            api_key: config.ai_search_api_key.clone(),
            configured: config.is_ai_search_configured(),
        }
    }
}

#[async_trait]
impl FacilityAdapter for AiSearchAdapter {
    fn source(&self) -> FacilitySource {
        FacilitySource::AiSearch
    }

    async fn fetch(&self, query: &AdapterQuery) -> Result<Vec<RawFacility>, DiscoveryError> {
        let area = query
            .area
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(DiscoveryError::MissingArea)?;

        if !self.configured {
            return Err(DiscoveryError::NotConfigured("ai_search"));
        }

        debug!("AI area search for '{}' ({})", area, query.filters.places_keyword());

        let body = json!({
            "latitude": query.coordinates.map(|c| c.latitude),
            "longitude": query.coordinates.map(|c| c.longitude),
            "area": area,
            "specialty": query.filters.active_specialty(),
        });

        let mut request = self.client.post(&self.url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("AI search error ({}): {}", status, text);
            return Err(DiscoveryError::Upstream(format!("AI search returned {}", status)));
        }

        let payload: Value = response.json().await?;
        Ok(coerce_guesses(payload)
            .into_iter()
            .map(RawFacility::AiSearch)
            .collect())
    }
}

/// Pull facility guesses out of whatever shape the model produced. Entries
/// that don't look like a facility at all are dropped.
fn coerce_guesses(payload: Value) -> Vec<AiFacilityGuess> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => ["clinics", "results", "facilities"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<AiFacilityGuess>(item) {
            Ok(guess) if guess.name.as_deref().is_some_and(|n| !n.trim().is_empty()) => Some(guess),
            Ok(_) => None,
            Err(e) => {
                warn!("Dropping unparseable AI search entry: {}", e);
                None
            }
        })
        .collect()
}
