// libs/clinic-discovery-cell/src/services/orchestrator.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::{DiscoveryError, LocationError};
use crate::models::{Coordinates, FacilitySource, RequestId, SearchFilters, SearchView};
use crate::services::adapter::{collect_source, AdapterQuery, FacilityAdapter};
use crate::services::ai_search::AiSearchAdapter;
use crate::services::location::{GeolocationProvider, LocationService};
use crate::services::normalize::NormalizeContext;
use crate::services::places::PlacesAdapter;
use crate::services::registry::RegistryAdapter;
use crate::services::search_state::{SearchAction, SearchState};

pub type SearchSession = Arc<RwLock<SearchState>>;

struct SessionEntry {
    session: SearchSession,
    last_used: Instant,
}

/// In-memory search sessions, one per open search screen. Sessions idle for
/// longer than `idle_ttl` are dropped whenever a new one is opened.
#[derive(Clone)]
pub struct SearchSessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    dedupe: bool,
    idle_ttl: Duration,
}

impl SearchSessionStore {
    pub fn new(dedupe: bool, idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            dedupe,
            idle_ttl,
        }
    }

    /// Returns the existing session for `id`, or opens a new one.
    pub async fn open(&self, id: Option<Uuid>) -> SearchSession {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();

        if let Some(entry) = id.and_then(|id| sessions.get_mut(&id)) {
            entry.last_used = now;
            return entry.session.clone();
        }

        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_used) < self.idle_ttl);
        if sessions.len() < before {
            info!("Evicted {} idle search sessions", before - sessions.len());
        }

        let session_id = id.unwrap_or_else(Uuid::new_v4);
        let session = Arc::new(RwLock::new(SearchState::new(
            session_id,
            SearchFilters::default(),
            self.dedupe,
        )));
        sessions.insert(session_id, SessionEntry {
            session: session.clone(),
            last_used: now,
        });
        debug!("Opened search session {}", session_id);
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<SearchSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_used = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }
}

/// Drives location → adapters → aggregation for a session.
pub struct SearchOrchestrator {
    config: Arc<AppConfig>,
    location: LocationService,
    registry: Arc<dyn FacilityAdapter>,
    places: Arc<dyn FacilityAdapter>,
    ai_search: Arc<dyn FacilityAdapter>,
    adapter_timeout: Duration,
}

impl SearchOrchestrator {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let registry = Arc::new(RegistryAdapter::new(&config));
        let places = Arc::new(PlacesAdapter::new(&config));
        let ai_search = Arc::new(AiSearchAdapter::new(&config));
        Self::with_adapters(config, registry, places, ai_search)
    }

    pub fn with_adapters(
        config: Arc<AppConfig>,
        registry: Arc<dyn FacilityAdapter>,
        places: Arc<dyn FacilityAdapter>,
        ai_search: Arc<dyn FacilityAdapter>,
    ) -> Self {
        Self {
            location: LocationService::from_config(&config),
            adapter_timeout: Duration::from_secs(config.adapter_timeout_secs),
            config,
            registry,
            places,
            ai_search,
        }
    }

    /// Acquire the user's position and run a full search, returning once
    /// every source has answered (or been given up on).
    pub async fn search(
        &self,
        session: &SearchSession,
        provider: &dyn GeolocationProvider,
    ) -> Result<SearchView, LocationError> {
        let (request_id, coordinates) = self.begin_search(session, provider).await?;
        self.fetch_sources(session, request_id, coordinates).await;
        Ok(session.read().await.view())
    }

    /// Locate the user and register a new search. No adapter is called when
    /// location fails.
    pub async fn begin_search(
        &self,
        session: &SearchSession,
        provider: &dyn GeolocationProvider,
    ) -> Result<(RequestId, Coordinates), LocationError> {
        let position = match self.location.acquire(provider).await {
            Ok(position) => position,
            Err(err) => {
                session.write().await.apply(SearchAction::LocationFailed(err));
                return Err(err);
            }
        };

        let coordinates = position.coordinates;
        let mut state = session.write().await;
        let request_id = state.issue_request_id();
        state.apply(SearchAction::SearchStarted {
            request_id,
            coordinates,
            sources: vec![FacilitySource::Registered, FacilitySource::PlacesSearch],
        });

        info!("Session {} search {:?} started", state.session_id(), request_id);
        Ok((request_id, coordinates))
    }

    /// Query registry and places concurrently, folding each result into the
    /// session as soon as it arrives.
    pub async fn fetch_sources(&self, session: &SearchSession, request_id: RequestId, coordinates: Coordinates) {
        let filters = session.read().await.filters().clone();
        let ctx = NormalizeContext::new(&self.config, &filters);
        let query = AdapterQuery::new(coordinates, filters);

        let mut in_flight: FuturesUnordered<_> = [self.registry.clone(), self.places.clone()]
            .into_iter()
            .map(|adapter| collect_source(adapter, query.clone(), ctx.clone(), self.adapter_timeout))
            .collect();

        while let Some(result) = in_flight.next().await {
            session.write().await.apply(SearchAction::SourceResolved {
                request_id,
                source: result.source,
                outcome: result.outcome,
                records: result.records,
            });
        }
    }

    /// Run an AI search for a user-typed area and append its results. Works
    /// without a device location, which is the fallback when geolocation is
    /// unsupported or denied.
    pub async fn search_area(&self, session: &SearchSession, area: &str) -> Result<SearchView, DiscoveryError> {
        let area = area.trim();
        if area.is_empty() {
            return Err(DiscoveryError::MissingArea);
        }

        let (request_id, query, ctx) = {
            let mut state = session.write().await;
            let filters = state.filters().clone();
            let request_id = state.issue_request_id();
            state.apply(SearchAction::AreaSearchStarted {
                request_id,
                area: area.to_string(),
            });
            let ctx = NormalizeContext::new(&self.config, &filters);
            let query = match state.location() {
                Some(coordinates) => AdapterQuery::new(coordinates, filters),
                None => AdapterQuery::without_location(filters),
            };
            (request_id, query.with_area(area), ctx)
        };

        let result = collect_source(self.ai_search.clone(), query, ctx, self.adapter_timeout).await;

        let mut state = session.write().await;
        state.apply(SearchAction::AreaSearchResolved {
            request_id,
            outcome: result.outcome,
            records: result.records,
        });
        Ok(state.view())
    }

    /// Apply new filters. A specialty change re-runs the search because the
    /// Places keyword depends on it.
    pub async fn update_filters(&self, session: &SearchSession, filters: SearchFilters) -> SearchView {
        let rerun = {
            let mut state = session.write().await;
            let specialty_changed = state.filters().active_specialty() != filters.active_specialty();
            state.apply(SearchAction::FiltersChanged(filters));

            match state.location() {
                Some(coordinates) if specialty_changed => {
                    let request_id = state.issue_request_id();
                    state.apply(SearchAction::SearchStarted {
                        request_id,
                        coordinates,
                        sources: vec![FacilitySource::Registered, FacilitySource::PlacesSearch],
                    });
                    Some((request_id, coordinates))
                }
                _ => None,
            }
        };

        if let Some((request_id, coordinates)) = rerun {
            self.fetch_sources(session, request_id, coordinates).await;
        }

        session.read().await.view()
    }
}
