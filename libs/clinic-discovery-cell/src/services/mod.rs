pub mod adapter;
pub mod ai_search;
pub mod aggregator;
pub mod location;
pub mod normalize;
pub mod orchestrator;
pub mod places;
pub mod registry;
pub mod search_state;

pub use adapter::{collect_source, AdapterQuery, FacilityAdapter, SourceResult};
pub use ai_search::AiSearchAdapter;
pub use aggregator::{aggregate, haversine_km, AggregateInput};
pub use location::{ClientReportedLocation, GeolocationProvider, LocationService};
pub use normalize::{normalize, NormalizeContext};
pub use orchestrator::{SearchOrchestrator, SearchSession, SearchSessionStore};
pub use places::PlacesAdapter;
pub use registry::RegistryAdapter;
pub use search_state::{SearchAction, SearchState, Transition};
