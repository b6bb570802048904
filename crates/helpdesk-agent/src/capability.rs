//! Capability trait, kinds, and the registry the loop dispatches through.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use helpdesk_llm::ToolSpec;

use crate::confirmation::Confirmer;
use crate::error::AgentError;

/// The closed set of capabilities the model may invoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityKind {
    StructuredLookup,
    DocumentRetrieval,
    CreateTicket,
    TicketStatus,
}

impl CapabilityKind {
    pub fn all() -> [CapabilityKind; 4] {
        [
            CapabilityKind::StructuredLookup,
            CapabilityKind::DocumentRetrieval,
            CapabilityKind::CreateTicket,
            CapabilityKind::TicketStatus,
        ]
    }

    /// Name the model uses to request this capability.
    pub fn tool_name(&self) -> &'static str {
        match self {
            CapabilityKind::StructuredLookup => "query_database_tool",
            CapabilityKind::DocumentRetrieval => "query_rag_tool",
            CapabilityKind::CreateTicket => "create_support_ticket_tool",
            CapabilityKind::TicketStatus => "check_ticket_status_tool",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CapabilityKind::StructuredLookup => {
                "Look up the support database: answers to previously resolved tickets, \
                 FAQ entries, and team member profiles. Try this first."
            }
            CapabilityKind::DocumentRetrieval => {
                "Search the product documentation for an answer. Use this when the \
                 database has no information."
            }
            CapabilityKind::CreateTicket => {
                "Open a support ticket for a question neither the database nor the \
                 documentation can answer. The user is asked to confirm first."
            }
            CapabilityKind::TicketStatus => {
                "Check the status of an existing support ticket by its ID (e.g. TKT-1A2B3C4D)."
            }
        }
    }

    /// Tool declaration with a JSON-schema parameter block.
    pub fn spec(&self) -> ToolSpec {
        let parameters = match self {
            CapabilityKind::StructuredLookup | CapabilityKind::DocumentRetrieval => json!({
                "type": "object",
                "properties": {
                    "question": { "type": "string", "description": "The user's question" }
                },
                "required": ["question"]
            }),
            CapabilityKind::CreateTicket => json!({
                "type": "object",
                "properties": {
                    "user_question": {
                        "type": "string",
                        "description": "The question that could not be answered"
                    },
                    "user_name": { "type": "string", "description": "Name of the user, if known" }
                },
                "required": ["user_question"]
            }),
            CapabilityKind::TicketStatus => json!({
                "type": "object",
                "properties": {
                    "ticket_id": { "type": "string", "description": "Ticket ID such as TKT-1A2B3C4D" }
                },
                "required": ["ticket_id"]
            }),
        };

        ToolSpec {
            name: self.tool_name().to_string(),
            description: self.description().to_string(),
            parameters,
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

impl FromStr for CapabilityKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CapabilityKind::all()
            .into_iter()
            .find(|kind| kind.tool_name() == s.trim())
            .ok_or_else(|| AgentError::UnknownCapability(s.to_string()))
    }
}

/// Per-turn state handed to every invocation.
#[derive(Clone)]
pub struct TurnContext {
    pub confirmer: Arc<dyn Confirmer>,
    pub user_name: Option<String>,
}

impl TurnContext {
    pub fn new(confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            confirmer,
            user_name: None,
        }
    }

    pub fn with_user_name(mut self, name: Option<String>) -> Self {
        self.user_name = name.filter(|n| !n.trim().is_empty());
        self
    }
}

impl fmt::Debug for TurnContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnContext")
            .field("user_name", &self.user_name)
            .finish_non_exhaustive()
    }
}

/// A named operation the model can invoke.
///
/// Invocations always produce text. Failures are reported in that text so
/// the model can read them and decide what to do next.
#[async_trait]
pub trait Capability: Send + Sync {
    fn kind(&self) -> CapabilityKind;

    async fn invoke(&self, arguments: &Value, context: &TurnContext) -> String;
}

/// Maps each [`CapabilityKind`] to its handler.
#[derive(Default)]
pub struct CapabilityRegistry {
    handlers: BTreeMap<CapabilityKind, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same kind.
    pub fn register(&mut self, handler: Arc<dyn Capability>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn get(&self, kind: CapabilityKind) -> Option<&Arc<dyn Capability>> {
        self.handlers.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Tool declarations for every registered capability.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.handlers.keys().map(CapabilityKind::spec).collect()
    }

    /// Resolve `name` and run the matching handler.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: &Value,
        context: &TurnContext,
    ) -> Result<String, AgentError> {
        let kind: CapabilityKind = name.parse()?;
        let handler = self
            .get(kind)
            .ok_or_else(|| AgentError::UnknownCapability(name.to_string()))?;
        Ok(handler.invoke(arguments, context).await)
    }

    /// Like [`dispatch`](Self::dispatch), but an unknown name becomes a
    /// rejection text the model can recover from.
    pub async fn invoke_or_reject(&self, name: &str, arguments: &Value, context: &TurnContext) -> String {
        match self.dispatch(name, arguments, context).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %name, error = %e, "Rejected capability request");
                let known: Vec<String> = self.specs().into_iter().map(|s| s.name).collect();
                format!(
                    "Error: '{name}' is not an available tool. Available tools: {}.",
                    known.join(", ")
                )
            }
        }
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

/// Fetch a required string argument.
pub(crate) fn string_arg<'a>(
    arguments: &'a Value,
    key: &str,
    kind: CapabilityKind,
) -> Result<&'a str, String> {
    match arguments.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(Value::String(_)) => Err(format!(
            "Invalid arguments for {kind}: '{key}' must not be empty."
        )),
        Some(_) => Err(format!(
            "Invalid arguments for {kind}: '{key}' must be a string."
        )),
        None => Err(format!(
            "Invalid arguments for {kind}: missing required argument '{key}'."
        )),
    }
}
