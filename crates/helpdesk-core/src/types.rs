use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HelpdeskError;

// =============================================================================
// Conversation
// =============================================================================

/// Author of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The customer. Transports may also call this "human".
    #[serde(alias = "human")]
    User,
    /// The support agent. Transports may also call this "ai".
    #[serde(alias = "ai")]
    Assistant,
}

/// One entry in a conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// =============================================================================
// Tickets
// =============================================================================

/// Lifecycle state of a support ticket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(TicketStatus::Open),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(HelpdeskError::InvalidInput(format!(
                "unknown ticket status: {other}"
            ))),
        }
    }
}

/// A customer issue escalated to the human support team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Public identifier, e.g. `TKT-1A2B3C4D`.
    pub ticket_id: String,
    pub user_name: String,
    pub issue: String,
    /// Human-provided answer, `None` until someone responds.
    pub response: Option<String>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

/// Prefix shared by every ticket identifier.
pub const TICKET_PREFIX: &str = "TKT-";

/// Generate a fresh ticket identifier: `TKT-` plus 8 uppercase hex characters.
pub fn new_ticket_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{TICKET_PREFIX}{}", hex[..8].to_ascii_uppercase())
}

// =============================================================================
// Directory
// =============================================================================

/// A row of the team directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub bio: String,
}

impl fmt::Display for TeamMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.bio)
    }
}

/// A frequently asked question with its canned answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}
