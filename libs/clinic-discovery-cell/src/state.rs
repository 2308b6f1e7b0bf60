use std::sync::Arc;
use std::time::Duration;

use shared_config::AppConfig;

use crate::services::orchestrator::{SearchOrchestrator, SearchSessionStore};

/// Shared handler state for the discovery routes.
pub struct DiscoveryState {
    pub sessions: SearchSessionStore,
    pub orchestrator: Arc<SearchOrchestrator>,
}

impl DiscoveryState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            sessions: SearchSessionStore::new(
                config.dedupe_enabled,
                Duration::from_secs(config.idle_ttl_secs),
            ),
            orchestrator: Arc::new(SearchOrchestrator::new(config)),
        }
    }
}
