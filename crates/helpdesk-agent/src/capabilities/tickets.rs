use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use helpdesk_storage::SupportStore;

use crate::capability::{string_arg, Capability, CapabilityKind, TurnContext};
use crate::confirmation::TICKET_CONFIRMATION_PROMPT;

const ANONYMOUS: &str = "anonymous";

/// Opens a support ticket once the user agrees.
pub struct CreateTicket {
    store: Arc<dyn SupportStore>,
}

impl CreateTicket {
    pub fn new(store: Arc<dyn SupportStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Capability for CreateTicket {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::CreateTicket
    }

    async fn invoke(&self, arguments: &Value, context: &TurnContext) -> String {
        let issue = match string_arg(arguments, "user_question", self.kind()) {
            Ok(q) => q,
            Err(msg) => return msg,
        };
        let user_name = arguments
            .get("user_name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or(context.user_name.as_deref())
            .unwrap_or(ANONYMOUS);

        if !context.confirmer.confirm(TICKET_CONFIRMATION_PROMPT).await {
            info!("User declined ticket creation");
            return "Okay, no ticket was created.".to_string();
        }

        match self.store.create_ticket(user_name, issue) {
            Ok(ticket) => format!(
                "Support ticket #{} created successfully. Our team will respond soon.",
                ticket.ticket_id
            ),
            Err(e) => {
                warn!(error = %e, "Ticket creation failed");
                "Failed to create a support ticket. Please try again later.".to_string()
            }
        }
    }
}

/// Reports the state of an existing ticket.
pub struct TicketStatusCheck {
    store: Arc<dyn SupportStore>,
}

impl TicketStatusCheck {
    pub fn new(store: Arc<dyn SupportStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Capability for TicketStatusCheck {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::TicketStatus
    }

    async fn invoke(&self, arguments: &Value, _context: &TurnContext) -> String {
        let ticket_id = match string_arg(arguments, "ticket_id", self.kind()) {
            Ok(id) => id.to_uppercase(),
            Err(msg) => return msg,
        };

        match self.store.ticket(&ticket_id) {
            Ok(Some(ticket)) => format!(
                "Ticket {} ({})\nIssue: {}\nResponse: {}",
                ticket.ticket_id,
                ticket.status,
                ticket.issue,
                ticket.response.as_deref().unwrap_or("Pending from support.")
            ),
            Ok(None) => format!("Ticket {ticket_id} not found."),
            Err(e) => {
                warn!(error = %e, ticket_id = %ticket_id, "Ticket status check failed");
                format!("Error checking ticket status: {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use helpdesk_core::types::{TicketStatus, TICKET_PREFIX};
    use helpdesk_storage::{Database, SqliteSupportStore};
    use serde_json::json;

    use crate::confirmation::{PresetConfirmer, ScriptedConfirmer};

    fn store() -> Arc<SqliteSupportStore> {
        Arc::new(SqliteSupportStore::new(Arc::new(Database::in_memory().unwrap())))
    }

    #[tokio::test]
    async fn test_create_ticket_after_confirmation() {
        let store = store();
        let confirmer = Arc::new(ScriptedConfirmer::new(["yes"]));
        let ctx = TurnContext::new(confirmer.clone());

        let out = CreateTicket::new(store.clone())
            .invoke(
                &json!({"user_question": "Can I pay in bitcoin?", "user_name": "Priya"}),
                &ctx,
            )
            .await;

        assert!(out.starts_with(&format!("Support ticket #{TICKET_PREFIX}")));
        assert!(out.ends_with("created successfully. Our team will respond soon."));
        assert_eq!(confirmer.prompts(), vec![TICKET_CONFIRMATION_PROMPT]);

        let tickets = store.list_tickets(None, 10).unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].user_name, "Priya");
        assert_eq!(tickets[0].issue, "Can I pay in bitcoin?");
        assert_eq!(tickets[0].status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn test_declined_ticket_is_not_created() {
        let store = store();
        let ctx = TurnContext::new(Arc::new(PresetConfirmer::new(false)));

        let out = CreateTicket::new(store.clone())
            .invoke(&json!({"user_question": "Can I pay in bitcoin?"}), &ctx)
            .await;

        assert_eq!(out, "Okay, no ticket was created.");
        assert!(store.list_tickets(None, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_name_falls_back_to_context_then_anonymous() {
        let store = store();
        let yes = Arc::new(PresetConfirmer::new(true));
        let create = CreateTicket::new(store.clone());

        let ctx = TurnContext::new(yes.clone()).with_user_name(Some("Mo".into()));
        create.invoke(&json!({"user_question": "first"}), &ctx).await;
        let ctx = TurnContext::new(yes);
        create.invoke(&json!({"user_question": "second"}), &ctx).await;

        let mut names: Vec<String> = store
            .list_tickets(None, 10)
            .unwrap()
            .into_iter()
            .map(|t| t.user_name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Mo", "anonymous"]);
    }

    #[tokio::test]
    async fn test_status_of_pending_and_answered_ticket() {
        let store = store();
        let ticket = store.create_ticket("sam", "Where is my order?").unwrap();
        let check = TicketStatusCheck::new(store.clone());
        let ctx = TurnContext::new(Arc::new(PresetConfirmer::new(false)));

        let out = check
            .invoke(&json!({"ticket_id": ticket.ticket_id.to_lowercase()}), &ctx)
            .await;
        assert_eq!(
            out,
            format!(
                "Ticket {} (open)\nIssue: Where is my order?\nResponse: Pending from support.",
                ticket.ticket_id
            )
        );

        store
            .respond_to_ticket(&ticket.ticket_id, "It shipped today.", TicketStatus::Closed)
            .unwrap();
        let out = check
            .invoke(&json!({"ticket_id": ticket.ticket_id}), &ctx)
            .await;
        assert!(out.contains("(closed)"));
        assert!(out.ends_with("Response: It shipped today."));
    }

    #[tokio::test]
    async fn test_unknown_ticket() {
        let check = TicketStatusCheck::new(store());
        let ctx = TurnContext::new(Arc::new(PresetConfirmer::new(false)));

        let out = check.invoke(&json!({"ticket_id": "TKT-NOPE"}), &ctx).await;
        assert_eq!(out, "Ticket TKT-NOPE not found.");
    }
}
