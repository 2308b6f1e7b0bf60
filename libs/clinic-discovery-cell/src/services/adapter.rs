// libs/clinic-discovery-cell/src/services/adapter.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::DiscoveryError;
use crate::models::{
    Coordinates, FacilityRecord, FacilitySource, RawFacility, SearchFilters, SourceOutcome,
};
use crate::services::normalize::{normalize, NormalizeContext};

#[derive(Debug, Clone)]
pub struct AdapterQuery {
    /// Absent only for area searches made without a device location.
    pub coordinates: Option<Coordinates>,
    pub filters: SearchFilters,
    /// Free-text sub-region typed by the user. Only the AI search reads it.
    pub area: Option<String>,
}

impl AdapterQuery {
    pub fn new(coordinates: Coordinates, filters: SearchFilters) -> Self {
        Self {
            coordinates: Some(coordinates),
            filters,
            area: None,
        }
    }

    pub fn without_location(filters: SearchFilters) -> Self {
        Self {
            coordinates: None,
            filters,
            area: None,
        }
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }
}

/// One upstream facility source.
#[async_trait]
pub trait FacilityAdapter: Send + Sync {
    fn source(&self) -> FacilitySource;

    async fn fetch(&self, query: &AdapterQuery) -> Result<Vec<RawFacility>, DiscoveryError>;
}

#[derive(Debug, Clone)]
pub struct SourceResult {
    pub source: FacilitySource,
    pub outcome: SourceOutcome,
    pub records: Vec<FacilityRecord>,
}

/// Run one adapter to completion. Never fails: errors and timeouts degrade
/// to an empty result with a `Failed` outcome so other sources still render.
pub async fn collect_source(
    adapter: Arc<dyn FacilityAdapter>,
    query: AdapterQuery,
    ctx: NormalizeContext,
    timeout: Duration,
) -> SourceResult {
    let source = adapter.source();

    let fetched = match tokio::time::timeout(timeout, adapter.fetch(&query)).await {
        Ok(result) => result,
        Err(_) => Err(DiscoveryError::Upstream(format!(
            "timed out after {}s",
            timeout.as_secs_f32()
        ))),
    };

    match fetched {
        Ok(raw) => {
            let records: Vec<FacilityRecord> = raw
                .into_iter()
                .filter(|r| r.source() == source)
                .map(|r| normalize(r, &ctx))
                .collect();

            debug!("{} source returned {} facilities", source, records.len());

            SourceResult {
                source,
                outcome: SourceOutcome::Succeeded { count: records.len() },
                records,
            }
        }
        Err(DiscoveryError::NotConfigured(name)) => {
            warn!("Skipping {} source: not configured", name);
            SourceResult {
                source,
                outcome: SourceOutcome::Skipped {
                    reason: format!("{} source is not configured", name),
                },
                records: Vec::new(),
            }
        }
        Err(e) => {
            warn!("{} source failed, continuing without it: {}", source, e);
            SourceResult {
                source,
                outcome: SourceOutcome::Failed { reason: e.to_string() },
                records: Vec::new(),
            }
        }
    }
}
