//! The reason/act loop.
//!
//! Each round sends the conversation plus the scratchpad of earlier tool
//! calls to the model. A reply with tool calls runs them in order and starts
//! another round; a reply without tool calls is the answer.

use std::sync::Arc;

use tracing::{debug, info, warn};

use helpdesk_core::config::AgentConfig;
use helpdesk_core::error::HelpdeskError;
use helpdesk_core::types::{Message, Role};
use helpdesk_llm::{ChatMessage, ChatModel, ToolCall};

use crate::capability::{CapabilityRegistry, TurnContext};
use crate::error::AgentError;
use crate::prompt::SYSTEM_PROMPT;

/// Result of one completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Incoming history plus this turn's user message and answer.
    pub history: Vec<Message>,
    pub answer: String,
    /// Tool names in the order the model requested them.
    pub tools_used: Vec<String>,
    /// Number of model calls made.
    pub iterations: usize,
}

/// Tool calls and their results from earlier rounds of the current turn.
#[derive(Debug, Default)]
struct Scratchpad {
    entries: Vec<ChatMessage>,
}

impl Scratchpad {
    fn record(&mut self, text: String, calls: Vec<ToolCall>, results: Vec<(String, String)>) {
        self.entries.push(ChatMessage::assistant_with_calls(text, calls));
        for (call_id, result) in results {
            self.entries.push(ChatMessage::tool_result(call_id, result));
        }
    }

    fn messages(&self) -> &[ChatMessage] {
        &self.entries
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Drives the model through bounded rounds of capability calls.
pub struct OrchestrationLoop {
    model: Arc<dyn ChatModel>,
    registry: Arc<CapabilityRegistry>,
    max_iterations: usize,
}

impl OrchestrationLoop {
    pub fn new(model: Arc<dyn ChatModel>, registry: Arc<CapabilityRegistry>) -> Self {
        let defaults = AgentConfig::default();
        Self {
            model,
            registry,
            max_iterations: defaults.max_iterations,
        }
    }

    pub fn from_config(
        model: Arc<dyn ChatModel>,
        registry: Arc<CapabilityRegistry>,
        config: &AgentConfig,
    ) -> Self {
        Self::new(model, registry).with_max_iterations(config.max_iterations)
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run one user turn to a final answer.
    ///
    /// `history` is sent to the model as given; callers pass a session
    /// window, not the full conversation.
    pub async fn run_turn(
        &self,
        history: &[Message],
        user_input: &str,
        context: &TurnContext,
    ) -> Result<TurnOutcome, AgentError> {
        let conversation = self.conversation(history, user_input);
        let tools = self.registry.specs();
        let mut scratchpad = Scratchpad::default();
        let mut tools_used = Vec::new();

        for iteration in 1..=self.max_iterations {
            let mut messages = conversation.clone();
            messages.extend_from_slice(scratchpad.messages());

            let reply = self
                .model
                .complete(&messages, &tools)
                .await
                .map_err(model_error)?;

            if reply.tool_calls.is_empty() {
                scratchpad.clear();
                info!(
                    iterations = iteration,
                    tools = ?tools_used,
                    "Turn complete"
                );

                let mut updated = history.to_vec();
                updated.push(Message::user(user_input));
                updated.push(Message::assistant(reply.text.clone()));
                return Ok(TurnOutcome {
                    history: updated,
                    answer: reply.text,
                    tools_used,
                    iterations: iteration,
                });
            }

            let mut results = Vec::with_capacity(reply.tool_calls.len());
            for call in &reply.tool_calls {
                debug!(tool = %call.name, iteration, "Invoking capability");
                let result = self
                    .registry
                    .invoke_or_reject(&call.name, &call.arguments, context)
                    .await;
                tools_used.push(call.name.clone());
                results.push((call.id.clone(), result));
            }
            scratchpad.record(reply.text, reply.tool_calls, results);
        }

        warn!(
            max_iterations = self.max_iterations,
            tools = ?tools_used,
            "Turn abandoned at iteration cap"
        );
        Err(AgentError::IterationLimit(self.max_iterations))
    }

    /// System prompt, the history, and the new user message.
    fn conversation(&self, history: &[Message], user_input: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend(history.iter().map(|m| match m.role {
            Role::User => ChatMessage::user(m.content.clone()),
            Role::Assistant => ChatMessage::assistant(m.content.clone()),
        }));
        messages.push(ChatMessage::user(user_input));
        messages
    }
}

fn model_error(err: HelpdeskError) -> AgentError {
    match err {
        HelpdeskError::Model(msg) => AgentError::Model(msg),
        other => AgentError::Model(other.to_string()),
    }
}
