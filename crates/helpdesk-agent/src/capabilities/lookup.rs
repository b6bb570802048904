use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use helpdesk_core::error::Result;
use helpdesk_core::types::FaqEntry;
use helpdesk_llm::ChatModel;
use helpdesk_storage::SupportStore;

use crate::capability::{string_arg, Capability, CapabilityKind, TurnContext};
use crate::query::{extract_keywords, extract_name, is_general_question};

/// Returned when the database holds nothing relevant.
pub const NO_INFO_FOUND: &str = "___NO_INFO_FOUND___";

/// Answers from past tickets, the FAQ table, and the team directory.
///
/// A resolved ticket with the identical issue text always wins. General
/// questions then try the FAQ before the team directory; anything else
/// tries the team directory first.
pub struct StructuredLookup {
    store: Arc<dyn SupportStore>,
    model: Option<Arc<dyn ChatModel>>,
}

impl StructuredLookup {
    pub fn new(store: Arc<dyn SupportStore>) -> Self {
        Self { store, model: None }
    }

    /// Use `model` to choose between several FAQ candidates.
    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub async fn lookup(&self, question: &str) -> Result<Option<String>> {
        if let Some(answer) = self.store.past_ticket_answer(question)? {
            debug!("Answered from a resolved ticket");
            return Ok(Some(answer));
        }

        if is_general_question(question) {
            if let Some(answer) = self.faq(question).await? {
                return Ok(Some(answer));
            }
            self.team(question)
        } else {
            if let Some(answer) = self.team(question)? {
                return Ok(Some(answer));
            }
            self.faq(question).await
        }
    }

    fn team(&self, question: &str) -> Result<Option<String>> {
        let Some(name) = extract_name(question) else {
            return Ok(None);
        };
        debug!(name = %name, "Team directory lookup");
        Ok(self.store.team_member(&name)?.map(|m| m.to_string()))
    }

    async fn faq(&self, question: &str) -> Result<Option<String>> {
        let keywords = extract_keywords(question);
        let candidates = self.store.faq_by_keywords(&keywords, question)?;

        match candidates.len() {
            0 => Ok(self.store.faq_by_phrase(question)?.map(|e| e.answer)),
            1 => Ok(candidates.into_iter().next().map(|e| e.answer)),
            _ => Ok(Some(self.pick(question, candidates).await)),
        }
    }

    /// Ask the model which candidate fits best; any failure keeps the
    /// first (most relevant) one.
    async fn pick(&self, question: &str, mut candidates: Vec<FaqEntry>) -> String {
        let chosen = match &self.model {
            Some(model) => match model.prompt(&disambiguation_prompt(question, &candidates)).await {
                Ok(reply) => parse_choice(&reply, candidates.len()),
                Err(e) => {
                    warn!(error = %e, "FAQ disambiguation failed, using top match");
                    None
                }
            },
            None => None,
        };
        candidates.swap_remove(chosen.unwrap_or(0)).answer
    }
}

fn disambiguation_prompt(question: &str, candidates: &[FaqEntry]) -> String {
    let mut prompt = format!(
        "The user asked: \"{question}\"\n\nWhich of these FAQ entries answers it best?\n"
    );
    for (i, entry) in candidates.iter().enumerate() {
        let preview: String = entry.answer.chars().take(100).collect();
        prompt.push_str(&format!("{}. Q: {} - A: {}...\n", i + 1, entry.question, preview));
    }
    prompt.push_str("\nReply with the number of the best entry only.");
    prompt
}

/// Zero-based index for a 1-based numeric reply within `1..=count`.
fn parse_choice(reply: &str, count: usize) -> Option<usize> {
    let n: usize = reply.trim().trim_end_matches('.').parse().ok()?;
    (1..=count).contains(&n).then(|| n - 1)
}

#[async_trait]
impl Capability for StructuredLookup {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::StructuredLookup
    }

    async fn invoke(&self, arguments: &Value, _context: &TurnContext) -> String {
        let question = match string_arg(arguments, "question", self.kind()) {
            Ok(q) => q,
            Err(msg) => return msg,
        };

        match self.lookup(question).await {
            Ok(Some(answer)) => answer,
            Ok(None) => NO_INFO_FOUND.to_string(),
            Err(e) => {
                warn!(error = %e, "Structured lookup failed");
                format!("Database query error: {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use helpdesk_core::types::{TeamMember, TicketStatus};
    use helpdesk_llm::{ModelReply, ScriptedModel};
    use helpdesk_storage::{Database, SqliteSupportStore};
    use serde_json::json;

    use crate::confirmation::PresetConfirmer;

    fn seeded_store() -> Arc<SqliteSupportStore> {
        let store = SqliteSupportStore::new(Arc::new(Database::in_memory().unwrap()));
        store
            .teams()
            .insert(&TeamMember {
                name: "Alice".into(),
                bio: "Head of customer success".into(),
            })
            .unwrap();
        store
            .faq()
            .insert(&FaqEntry {
                question: "What are your opening hours?".into(),
                answer: "We are open 9am to 5pm, Monday to Friday.".into(),
            })
            .unwrap();
        Arc::new(store)
    }

    fn ctx() -> TurnContext {
        TurnContext::new(Arc::new(PresetConfirmer::new(false)))
    }

    #[tokio::test]
    async fn test_team_member_by_name() {
        let lookup = StructuredLookup::new(seeded_store());
        let out = lookup.invoke(&json!({"question": "who is alice"}), &ctx()).await;
        assert_eq!(out, "Alice: Head of customer success");
    }

    #[tokio::test]
    async fn test_faq_for_general_question() {
        let lookup = StructuredLookup::new(seeded_store());
        let out = lookup
            .invoke(&json!({"question": "What are your opening hours?"}), &ctx())
            .await;
        assert_eq!(out, "We are open 9am to 5pm, Monday to Friday.");
    }

    #[tokio::test]
    async fn test_past_ticket_answer_takes_priority() {
        let store = seeded_store();
        let ticket = store.create_ticket("sam", "who is alice").unwrap();
        store
            .respond_to_ticket(&ticket.ticket_id, "Alice left last month.", TicketStatus::Closed)
            .unwrap();

        let lookup = StructuredLookup::new(store);
        let out = lookup.invoke(&json!({"question": "who is alice"}), &ctx()).await;
        assert_eq!(out, "Alice left last month.");
    }

    #[tokio::test]
    async fn test_no_info_sentinel() {
        let lookup = StructuredLookup::new(seeded_store());
        let out = lookup
            .invoke(&json!({"question": "zebra xylophone"}), &ctx())
            .await;
        assert_eq!(out, NO_INFO_FOUND);
    }

    #[tokio::test]
    async fn test_missing_question_argument() {
        let lookup = StructuredLookup::new(seeded_store());
        let out = lookup.invoke(&json!({"query": "hours"}), &ctx()).await;
        assert!(out.contains("missing required argument 'question'"));
    }

    fn store_with_shipping_faqs() -> Arc<SqliteSupportStore> {
        let store = seeded_store();
        for (q, a) in [
            ("Is international shipping available?", "Yes, to 40 countries."),
            ("How long does shipping take?", "Three to five days."),
        ] {
            store
                .faq()
                .insert(&FaqEntry {
                    question: q.into(),
                    answer: a.into(),
                })
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_model_picks_among_candidates() {
        let model = Arc::new(ScriptedModel::new(vec![ModelReply::text("2")]));
        let lookup = StructuredLookup::new(store_with_shipping_faqs()).with_model(model.clone());

        let out = lookup.invoke(&json!({"question": "shipping"}), &ctx()).await;

        assert_eq!(model.call_count(), 1);
        let prompt = &model.requests()[0][0].content;
        assert!(prompt.contains("1. Q: "));
        assert!(prompt.contains("2. Q: "));
        // Candidates are ordered by question length, so "2" is the longer one.
        assert_eq!(out, "Yes, to 40 countries.");
    }

    #[tokio::test]
    async fn test_unparseable_choice_falls_back_to_first() {
        let model = Arc::new(ScriptedModel::new(vec![ModelReply::text("the second one")]));
        let lookup = StructuredLookup::new(store_with_shipping_faqs()).with_model(model);

        let out = lookup.invoke(&json!({"question": "shipping"}), &ctx()).await;
        assert_eq!(out, "Three to five days.");
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_to_first() {
        let model = Arc::new(ScriptedModel::failing("offline"));
        let lookup = StructuredLookup::new(store_with_shipping_faqs()).with_model(model);

        let out = lookup.invoke(&json!({"question": "shipping"}), &ctx()).await;
        assert_eq!(out, "Three to five days.");
    }

    #[test]
    fn test_parse_choice_bounds() {
        assert_eq!(parse_choice("1", 3), Some(0));
        assert_eq!(parse_choice(" 3.\n", 3), Some(2));
        assert_eq!(parse_choice("0", 3), None);
        assert_eq!(parse_choice("4", 3), None);
        assert_eq!(parse_choice("two", 3), None);
    }
}
