//! Conversation history owned by an interactive session.

use uuid::Uuid;

use helpdesk_core::types::Message;

/// Ordered history for one conversation.
///
/// Everything is kept; only the last `window` messages are shown to the
/// model.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub id: Uuid,
    messages: Vec<Message>,
    window: usize,
}

impl ConversationSession {
    pub fn new(window: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            window,
        }
    }

    /// Start from an existing history, e.g. one sent by a client.
    pub fn from_history(messages: Vec<Message>, window: usize) -> Self {
        Self {
            messages,
            ..Self::new(window)
        }
    }

    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push(Message::user(user));
        self.messages.push(Message::assistant(assistant));
    }

    /// The last `window` messages, oldest first.
    pub fn window(&self) -> &[Message] {
        let start = self.messages.len().saturating_sub(self.window);
        &self.messages[start..]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
