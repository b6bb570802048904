//! Chat-completion types and the [`ChatModel`] trait.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use helpdesk_core::error::HelpdeskError;

/// Speaker of a chat-completion message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A capability invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id echoed back with the result.
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A capability advertised to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// One message of a chat-completion request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::Assistant, content)
    }

    /// An assistant turn that requested capability invocations.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::plain(ChatRole::Assistant, content)
        }
    }

    /// The result of the invocation identified by `call_id`.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::plain(ChatRole::Tool, content)
        }
    }
}

/// What the model produced for one request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelReply {
    pub text: String,
    /// Empty when the model answered directly.
    pub tool_calls: Vec<ToolCall>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: String::new(),
            tool_calls: calls,
        }
    }
}

/// A chat-completion provider.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion over `messages`, offering `tools` to the model.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelReply, HelpdeskError>;

    /// Single-prompt completion without tools.
    async fn prompt(&self, prompt: &str) -> Result<String, HelpdeskError> {
        let reply = self.complete(&[ChatMessage::user(prompt)], &[]).await?;
        Ok(reply.text)
    }

    fn name(&self) -> &str;
}

/// A [`ChatModel`] that replays queued replies and records every request.
///
/// When the queue runs dry the fallback reply is used; without one the call
/// fails, which is how tests simulate an unreachable provider.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply, String>>>,
    fallback: Option<ModelReply>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// A model that answers every request with `reply`.
    pub fn repeating(reply: ModelReply) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::default()
        }
    }

    /// A model whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let model = Self::default();
        model.push_error(message);
        model
    }

    pub fn push(&self, reply: ModelReply) {
        if let Ok(mut queue) = self.replies.lock() {
            queue.push_back(Ok(reply));
        }
    }

    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut queue) = self.replies.lock() {
            queue.push_back(Err(message.into()));
        }
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> Result<ModelReply, HelpdeskError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }

        let next = self
            .replies
            .lock()
            .map_err(|e| HelpdeskError::Model(format!("script lock poisoned: {e}")))?
            .pop_front();

        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(HelpdeskError::Model(message)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| HelpdeskError::Model("scripted model has no reply left".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
