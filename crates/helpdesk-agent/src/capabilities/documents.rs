use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use helpdesk_knowledge::RetrievalAnswerer;

use crate::capability::{string_arg, Capability, CapabilityKind, TurnContext};

/// Returned when the documentation does not cover the question.
pub const NO_DOCUMENT_MATCH: &str = "No relevant information found in documentation.";

/// Answers from the indexed product documentation.
pub struct DocumentRetrieval {
    answerer: Arc<RetrievalAnswerer>,
}

impl DocumentRetrieval {
    pub fn new(answerer: Arc<RetrievalAnswerer>) -> Self {
        Self { answerer }
    }
}

#[async_trait]
impl Capability for DocumentRetrieval {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::DocumentRetrieval
    }

    async fn invoke(&self, arguments: &Value, _context: &TurnContext) -> String {
        let question = match string_arg(arguments, "question", self.kind()) {
            Ok(q) => q,
            Err(msg) => return msg,
        };

        match self.answerer.answer(question).await {
            Ok(Some(answer)) => answer,
            Ok(None) => NO_DOCUMENT_MATCH.to_string(),
            Err(e) => {
                warn!(error = %e, "Document retrieval failed");
                format!("Document search error: {e}")
            }
        }
    }
}
