//! Retrieval-augmented answering over the knowledge base.

use std::sync::Arc;

use tracing::debug;

use helpdesk_core::error::Result;
use helpdesk_llm::{ChatMessage, ChatModel};

use crate::sync::KnowledgeBase;

const SYSTEM_PROMPT: &str = "You are a customer support assistant. Answer the question using \
only the documentation excerpts provided. If the excerpts do not contain the answer, say \
politely that you couldn't find the information. Never make up answers or add information \
that is not in the documentation.";

/// Phrases that mark a reply as "the documentation doesn't cover this".
///
/// This is a heuristic over free text: a model that phrases a refusal
/// differently slips through, and an answer that quotes one of these
/// phrases is discarded.
pub const NOT_FOUND_PHRASES: &[&str] = &[
    "not in the documentation",
    "couldn't find",
    "could not find",
    "don't have that information",
    "not contained",
];

/// Answers questions strictly from the top-k most similar chunks.
pub struct RetrievalAnswerer {
    knowledge: Arc<KnowledgeBase>,
    model: Arc<dyn ChatModel>,
    top_k: usize,
}

impl RetrievalAnswerer {
    pub fn new(knowledge: Arc<KnowledgeBase>, model: Arc<dyn ChatModel>, top_k: usize) -> Self {
        Self {
            knowledge,
            model,
            top_k: top_k.max(1),
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// `Ok(None)` when the index is empty or the model reports that the
    /// excerpts don't answer the question. Provider failures are errors.
    pub async fn answer(&self, question: &str) -> Result<Option<String>> {
        let hits = self.knowledge.query(question, self.top_k).await?;
        if hits.is_empty() {
            debug!("Knowledge base empty, skipping model call");
            return Ok(None);
        }

        let context = hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        debug!(chunks = hits.len(), top_score = hits[0].score, "Answering from documentation");

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Documentation excerpts:\n{context}\n\nQuestion: {question}"
            )),
        ];
        let reply = self.model.complete(&messages, &[]).await?;
        let answer = reply.text.trim();

        if answer.is_empty() || is_not_found(answer) {
            return Ok(None);
        }
        Ok(Some(answer.to_string()))
    }
}

fn is_not_found(answer: &str) -> bool {
    let lowered = answer.to_lowercase().replace('\u{2019}', "'");
    NOT_FOUND_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}
