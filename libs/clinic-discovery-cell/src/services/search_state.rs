// libs/clinic-discovery-cell/src/services/search_state.rs
use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::LocationError;
use crate::models::{
    Coordinates, FacilityKey, FacilityRecord, FacilitySource, LocationFailure, RequestId,
    SearchFilters, SearchPhase, SearchView, SourceOutcome, SourceReport,
};
use crate::services::aggregator::{aggregate, AggregateInput};

#[derive(Debug, Clone)]
pub enum SearchAction {
    LocationFailed(LocationError),
    SearchStarted {
        request_id: RequestId,
        coordinates: Coordinates,
        sources: Vec<FacilitySource>,
    },
    SourceResolved {
        request_id: RequestId,
        source: FacilitySource,
        outcome: SourceOutcome,
        records: Vec<FacilityRecord>,
    },
    AreaSearchStarted {
        request_id: RequestId,
        area: String,
    },
    AreaSearchResolved {
        request_id: RequestId,
        outcome: SourceOutcome,
        records: Vec<FacilityRecord>,
    },
    FiltersChanged(SearchFilters),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The action was stale or did not apply to the current state.
    Ignored,
}

/// All state behind one clinic search screen.
///
/// Registry and Places results belong to exactly one location search and are
/// replaced by the next one. AI results accumulate across area searches until
/// the session is reset.
#[derive(Debug, Clone)]
pub struct SearchState {
    session_id: Uuid,
    dedupe: bool,
    next_id: u64,
    current_request: RequestId,
    /// Area searches issued before this id were cut off by a reset.
    area_floor: RequestId,
    phase: SearchPhase,
    location: Option<Coordinates>,
    location_error: Option<LocationError>,
    filters: SearchFilters,
    registry: Vec<FacilityRecord>,
    places: Vec<FacilityRecord>,
    ai_results: Vec<FacilityRecord>,
    pending: BTreeSet<SourceKey>,
    pending_areas: BTreeSet<RequestId>,
    outcomes: HashMap<FacilitySource, SourceOutcome>,
    areas_searched: Vec<String>,
}

/// `FacilitySource` ordered for stable `pending_sources` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SourceKey(u8);

impl From<FacilitySource> for SourceKey {
    fn from(source: FacilitySource) -> Self {
        SourceKey(match source {
            FacilitySource::Registered => 0,
            FacilitySource::PlacesSearch => 1,
            FacilitySource::AiSearch => 2,
        })
    }
}

impl SourceKey {
    fn source(self) -> FacilitySource {
        match self.0 {
            0 => FacilitySource::Registered,
            1 => FacilitySource::PlacesSearch,
            _ => FacilitySource::AiSearch,
        }
    }
}

impl SearchState {
    pub fn new(session_id: Uuid, filters: SearchFilters, dedupe: bool) -> Self {
        Self {
            session_id,
            dedupe,
            next_id: 0,
            current_request: RequestId(0),
            area_floor: RequestId(0),
            phase: SearchPhase::NotSearched,
            location: None,
            location_error: None,
            filters,
            registry: Vec::new(),
            places: Vec::new(),
            ai_results: Vec::new(),
            pending: BTreeSet::new(),
            pending_areas: BTreeSet::new(),
            outcomes: HashMap::new(),
            areas_searched: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn location(&self) -> Option<Coordinates> {
        self.location
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    pub fn current_request(&self) -> RequestId {
        self.current_request
    }

    /// Hand out the next id. Ids are never reused within a session.
    pub fn issue_request_id(&mut self) -> RequestId {
        self.next_id += 1;
        RequestId(self.next_id)
    }

    pub fn apply(&mut self, action: SearchAction) -> Transition {
        match action {
            SearchAction::LocationFailed(err) => {
                // Anything still in flight belongs to a location we no longer trust
                self.current_request = self.issue_request_id();
                self.location = None;
                self.location_error = Some(err);
                self.registry.clear();
                self.places.clear();
                self.pending.clear();
                self.phase = SearchPhase::LocationFailed;
                info!("Session {} location failed: {}", self.session_id, err.code());
                Transition::Applied
            }

            SearchAction::SearchStarted { request_id, coordinates, sources } => {
                if request_id <= self.current_request {
                    warn!("Ignoring out-of-order search start {:?}", request_id);
                    return Transition::Ignored;
                }

                self.current_request = request_id;
                self.location = Some(coordinates);
                self.location_error = None;
                self.registry.clear();
                self.places.clear();
                self.pending = sources.iter().copied().map(SourceKey::from).collect();
                for source in &sources {
                    self.outcomes.remove(source);
                }
                self.refresh_phase();
                debug!("Session {} started search {:?}", self.session_id, request_id);
                Transition::Applied
            }

            SearchAction::SourceResolved { request_id, source, outcome, records } => {
                if request_id != self.current_request {
                    warn!(
                        "Discarding stale {} response for {:?} (current {:?})",
                        source, request_id, self.current_request
                    );
                    return Transition::Ignored;
                }
                if !self.pending.remove(&SourceKey::from(source)) {
                    return Transition::Ignored;
                }

                match source {
                    FacilitySource::Registered => self.registry = records,
                    FacilitySource::PlacesSearch => self.places = records,
                    FacilitySource::AiSearch => self.ai_results.extend(records),
                }
                self.outcomes.insert(source, outcome);
                self.refresh_phase();
                Transition::Applied
            }

            SearchAction::AreaSearchStarted { request_id, area } => {
                if request_id <= self.area_floor {
                    return Transition::Ignored;
                }
                self.pending_areas.insert(request_id);
                self.areas_searched.push(area);
                self.refresh_phase();
                Transition::Applied
            }

            SearchAction::AreaSearchResolved { request_id, outcome, records } => {
                if request_id <= self.area_floor || !self.pending_areas.remove(&request_id) {
                    warn!("Discarding AI results for cancelled area search {:?}", request_id);
                    return Transition::Ignored;
                }

                self.ai_results.extend(records);
                self.outcomes.insert(FacilitySource::AiSearch, outcome);
                self.refresh_phase();
                Transition::Applied
            }

            SearchAction::FiltersChanged(filters) => {
                if filters == self.filters {
                    return Transition::Ignored;
                }
                self.filters = filters;
                Transition::Applied
            }

            SearchAction::Reset => {
                let floor = self.issue_request_id();
                *self = Self {
                    next_id: self.next_id,
                    current_request: floor,
                    area_floor: floor,
                    ..Self::new(self.session_id, self.filters.clone(), self.dedupe)
                };
                info!("Session {} reset", self.session_id);
                Transition::Applied
            }
        }
    }

    fn refresh_phase(&mut self) {
        if self.location.is_none() && self.areas_searched.is_empty() {
            return;
        }
        self.phase = if self.pending.is_empty() && self.pending_areas.is_empty() {
            SearchPhase::Ready
        } else {
            SearchPhase::Searching
        };
    }

    pub fn find_record(&self, key: &FacilityKey) -> Option<&FacilityRecord> {
        let pool = match key.source {
            FacilitySource::Registered => &self.registry,
            FacilitySource::PlacesSearch => &self.places,
            FacilitySource::AiSearch => &self.ai_results,
        };
        pool.iter().find(|r| r.id == key.id)
    }

    pub fn view(&self) -> SearchView {
        let results = if self.location.is_some() || !self.ai_results.is_empty() {
            aggregate(AggregateInput {
                registry: &self.registry,
                places: &self.places,
                ai_results: &self.ai_results,
                filters: &self.filters,
                origin: self.location,
                dedupe: self.dedupe,
            })
        } else {
            Default::default()
        };

        let mut sources: Vec<SourceReport> = self
            .outcomes
            .iter()
            .map(|(source, outcome)| SourceReport {
                source: *source,
                outcome: outcome.clone(),
            })
            .collect();
        sources.sort_by_key(|r| SourceKey::from(r.source));

        let mut pending_sources: Vec<FacilitySource> =
            self.pending.iter().map(|k| k.source()).collect();
        if !self.pending_areas.is_empty() {
            pending_sources.push(FacilitySource::AiSearch);
        }

        SearchView {
            session_id: self.session_id,
            phase: self.phase,
            request_id: self.current_request,
            location: self.location,
            filters: self.filters.clone(),
            no_matches: self.phase == SearchPhase::Ready && results.total_count == 0,
            total_count: results.total_count,
            partners: results.partners,
            others: results.others,
            pending_sources,
            sources,
            areas_searched: self.areas_searched.clone(),
            location_error: self.location_error.map(LocationFailure::from),
        }
    }
}
