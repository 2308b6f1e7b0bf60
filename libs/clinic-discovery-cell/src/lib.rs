pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use error::*;
pub use models::*;
pub use services::*;
pub use router::clinic_discovery_routes;
pub use state::DiscoveryState;
