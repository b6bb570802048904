//! Capability handlers registered with the loop.

mod documents;
mod lookup;
mod tickets;

pub use documents::{DocumentRetrieval, NO_DOCUMENT_MATCH};
pub use lookup::{StructuredLookup, NO_INFO_FOUND};
pub use tickets::{CreateTicket, TicketStatusCheck};

use std::sync::Arc;

use helpdesk_knowledge::RetrievalAnswerer;
use helpdesk_llm::ChatModel;
use helpdesk_storage::SupportStore;

use crate::capability::CapabilityRegistry;

/// A registry holding all four capabilities.
pub fn default_registry(
    store: Arc<dyn SupportStore>,
    answerer: Arc<RetrievalAnswerer>,
    model: Arc<dyn ChatModel>,
) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(StructuredLookup::new(store.clone()).with_model(model)));
    registry.register(Arc::new(DocumentRetrieval::new(answerer)));
    registry.register(Arc::new(CreateTicket::new(store.clone())));
    registry.register(Arc::new(TicketStatusCheck::new(store)));
    registry
}
