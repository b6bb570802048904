//! Asking the user before side-effecting capabilities run.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

/// Prompt shown before a support ticket is opened.
pub const TICKET_CONFIRMATION_PROMPT: &str =
    "I don't have an answer for this. Should I create a support ticket? (yes/no): ";

/// Source of yes/no answers for confirmation prompts.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// `yes` or `y`, any case, surrounding whitespace ignored.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}

/// Gives the same answer to every prompt.
///
/// Used by request/response transports where the caller states its decision
/// up front.
#[derive(Debug, Clone, Copy)]
pub struct PresetConfirmer {
    answer: bool,
}

impl PresetConfirmer {
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }
}

#[async_trait]
impl Confirmer for PresetConfirmer {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.answer
    }
}

/// Replays queued replies and records the prompts it was shown.
///
/// An exhausted queue declines.
#[derive(Debug, Default)]
pub struct ScriptedConfirmer {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let reply = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        reply.is_some_and(|r| is_affirmative(&r))
    }
}
