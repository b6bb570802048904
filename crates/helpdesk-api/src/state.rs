//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use helpdesk_agent::SupportAgent;
use helpdesk_core::config::HelpdeskConfig;
use helpdesk_knowledge::KnowledgeBase;
use helpdesk_storage::SupportStore;

/// Shared handles for the handlers. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HelpdeskConfig>,
    pub agent: Arc<SupportAgent>,
    pub store: Arc<dyn SupportStore>,
    pub knowledge: Arc<KnowledgeBase>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: HelpdeskConfig,
        agent: Arc<SupportAgent>,
        store: Arc<dyn SupportStore>,
        knowledge: Arc<KnowledgeBase>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            agent,
            store,
            knowledge,
            start_time: Instant::now(),
        }
    }
}
