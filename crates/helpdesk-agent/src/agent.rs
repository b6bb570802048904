//! Transport-facing entry point wrapping the orchestration loop.

use tracing::{debug, info};

use helpdesk_core::config::AgentConfig;
use helpdesk_core::types::Message;

use crate::capability::TurnContext;
use crate::error::AgentError;
use crate::orchestrator::OrchestrationLoop;
use crate::session::ConversationSession;
use crate::smalltalk::SmallTalk;

/// A reply to one user message.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub answer: String,
    pub tools_used: Vec<String>,
    /// True when the user said goodbye.
    pub farewell: bool,
}

/// Validates input, answers small talk, and hands everything else to the
/// loop.
pub struct SupportAgent {
    orchestrator: OrchestrationLoop,
    max_message_length: usize,
    history_window: usize,
    smalltalk: bool,
}

impl SupportAgent {
    pub fn new(orchestrator: OrchestrationLoop, config: &AgentConfig) -> Self {
        Self {
            orchestrator,
            max_message_length: config.max_message_length,
            history_window: config.history_window,
            smalltalk: config.smalltalk,
        }
    }

    pub fn orchestrator(&self) -> &OrchestrationLoop {
        &self.orchestrator
    }

    /// An empty session using the configured history window.
    pub fn new_session(&self) -> ConversationSession {
        ConversationSession::new(self.history_window)
    }

    /// A session continuing a history supplied by a client.
    pub fn resume_session(&self, history: Vec<Message>) -> ConversationSession {
        ConversationSession::from_history(history, self.history_window)
    }

    /// Answer one message. The model sees only the session's window; the
    /// exchange is recorded in the session on success.
    pub async fn respond(
        &self,
        session: &mut ConversationSession,
        message: &str,
        context: &TurnContext,
    ) -> Result<AgentReply, AgentError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AgentError::EmptyMessage);
        }
        if message.chars().count() > self.max_message_length {
            return Err(AgentError::MessageTooLong(self.max_message_length));
        }

        if self.smalltalk {
            if let Some(kind) = SmallTalk::detect(message) {
                debug!(kind = ?kind, "Answering small talk");
                session.record_exchange(message, kind.reply());
                return Ok(AgentReply {
                    answer: kind.reply().to_string(),
                    tools_used: Vec::new(),
                    farewell: kind.is_goodbye(),
                });
            }
        }

        let outcome = self
            .orchestrator
            .run_turn(session.window(), message, context)
            .await?;
        info!(
            session = %session.id,
            iterations = outcome.iterations,
            tool_count = outcome.tools_used.len(),
            "Agent answered"
        );
        session.record_exchange(message, outcome.answer.clone());
        Ok(AgentReply {
            answer: outcome.answer,
            tools_used: outcome.tools_used,
            farewell: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use helpdesk_llm::{ModelReply, ScriptedModel};

    use crate::capability::CapabilityRegistry;
    use crate::confirmation::PresetConfirmer;

    fn agent(model: Arc<ScriptedModel>) -> SupportAgent {
        let config = AgentConfig::default();
        let orchestrator = OrchestrationLoop::from_config(
            model,
            Arc::new(CapabilityRegistry::new()),
            &config,
        );
        SupportAgent::new(orchestrator, &config)
    }

    fn ctx() -> TurnContext {
        TurnContext::new(Arc::new(PresetConfirmer::new(false)))
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let agent = agent(Arc::new(ScriptedModel::default()));
        let mut session = agent.new_session();
        let err = agent.respond(&mut session, "   ", &ctx()).await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyMessage));
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_too_long_message_rejected() {
        let agent = agent(Arc::new(ScriptedModel::default()));
        let long = "x".repeat(2001);
        let err = agent
            .respond(&mut agent.new_session(), &long, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MessageTooLong(2000)));
    }

    #[tokio::test]
    async fn test_message_at_limit_accepted() {
        let model = Arc::new(ScriptedModel::new(vec![ModelReply::text("fine")]));
        let agent = agent(model);
        let exact = "x".repeat(2000);
        let mut session = agent.new_session();
        assert!(agent.respond(&mut session, &exact, &ctx()).await.is_ok());
        assert_eq!(session.len(), 2);
    }

    #[tokio::test]
    async fn test_greeting_skips_the_model() {
        let model = Arc::new(ScriptedModel::default());
        let agent = agent(model.clone());

        let mut session = agent.new_session();
        let reply = agent.respond(&mut session, "Hello!", &ctx()).await.unwrap();

        assert!(reply.answer.starts_with("Hello! I'm your autonomous customer support agent."));
        assert!(!reply.farewell);
        assert_eq!(session.len(), 2);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_goodbye_sets_farewell() {
        let agent = agent(Arc::new(ScriptedModel::default()));
        let reply = agent
            .respond(&mut agent.new_session(), "bye", &ctx())
            .await
            .unwrap();
        assert!(reply.farewell);
    }

    #[tokio::test]
    async fn test_smalltalk_can_be_disabled() {
        let model = Arc::new(ScriptedModel::new(vec![ModelReply::text("Hi from the model")]));
        let config = AgentConfig {
            smalltalk: false,
            ..AgentConfig::default()
        };
        let orchestrator =
            OrchestrationLoop::from_config(model.clone(), Arc::new(CapabilityRegistry::new()), &config);
        let agent = SupportAgent::new(orchestrator, &config);

        let reply = agent
            .respond(&mut agent.new_session(), "hello", &ctx())
            .await
            .unwrap();
        assert_eq!(reply.answer, "Hi from the model");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_model_sees_only_the_session_window() {
        let model = Arc::new(ScriptedModel::new(vec![ModelReply::text("ok")]));
        let config = AgentConfig {
            history_window: 2,
            ..AgentConfig::default()
        };
        let orchestrator =
            OrchestrationLoop::from_config(model.clone(), Arc::new(CapabilityRegistry::new()), &config);
        let agent = SupportAgent::new(orchestrator, &config);

        let mut session = agent.resume_session(vec![
            Message::user("q0"),
            Message::assistant("a0"),
            Message::user("q1"),
            Message::assistant("a1"),
        ]);
        agent
            .respond(&mut session, "what about returns?", &ctx())
            .await
            .unwrap();

        // system + 2 windowed messages + user
        let sent = &model.requests()[0];
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[1].content, "q1");
        assert_eq!(sent[2].content, "a1");
        // The session keeps everything.
        assert_eq!(session.len(), 6);
        assert_eq!(session.messages()[5], Message::assistant("ok"));
    }
}
