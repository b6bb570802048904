//! Route handler functions for all API endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use helpdesk_agent::{PresetConfirmer, TurnContext};
use helpdesk_core::types::{Message, Role, Ticket, TicketStatus};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_TICKET_LIMIT: u64 = 50;
const MAX_TICKET_LIMIT: u64 = 500;

// =============================================================================
// Chat
// =============================================================================

/// Speaker tag on the wire. Accepts both naming schemes, emits `human`/`ai`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    #[serde(rename = "human", alias = "user")]
    Human,
    #[serde(rename = "ai", alias = "assistant")]
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
}

impl From<HistoryEntry> for Message {
    fn from(entry: HistoryEntry) -> Self {
        match entry.kind {
            EntryType::Human => Message::user(entry.content),
            EntryType::Ai => Message::assistant(entry.content),
        }
    }
}

impl From<Message> for HistoryEntry {
    fn from(message: Message) -> Self {
        let kind = match message.role {
            Role::User => EntryType::Human,
            Role::Assistant => EntryType::Ai,
        };
        Self {
            content: message.content,
            kind,
        }
    }
}

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_input: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
    pub user_name: Option<String>,
    /// Answer to the ticket-creation prompt, should the agent ask it.
    #[serde(default)]
    pub confirm_ticket: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub agent_response: String,
    pub updated_conversation_history: Vec<HistoryEntry>,
}

/// POST /chat - run one agent turn over the supplied history.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let mut session = state.agent.resume_session(
        req.conversation_history
            .into_iter()
            .map(Message::from)
            .collect(),
    );
    let context = TurnContext::new(Arc::new(PresetConfirmer::new(req.confirm_ticket)))
        .with_user_name(req.user_name);

    let reply = state
        .agent
        .respond(&mut session, &req.user_input, &context)
        .await
        .map_err(|e| {
            warn!(error = %e, "Chat turn failed");
            ApiError::from(e)
        })?;

    Ok(Json(ChatResponse {
        agent_response: reply.answer,
        updated_conversation_history: session
            .messages()
            .iter()
            .cloned()
            .map(HistoryEntry::from)
            .collect(),
    }))
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" when the database answers, "degraded" otherwise.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub database: bool,
    pub knowledge_chunks: usize,
    pub collection: String,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.store.ping() {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Health check: database unreachable");
            false
        }
    };

    Json(HealthResponse {
        status: if database { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        database,
        knowledge_chunks: state.knowledge.count(),
        collection: state.knowledge.index().collection().to_string(),
    })
}

// =============================================================================
// Tickets
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TicketListParams {
    pub status: Option<String>,
    pub limit: Option<u64>,
}

/// GET /tickets - newest first, optionally filtered by status.
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(params): Query<TicketListParams>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<TicketStatus>)
        .transpose()?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_TICKET_LIMIT)
        .clamp(1, MAX_TICKET_LIMIT);

    Ok(Json(state.store.list_tickets(status, limit)?))
}

/// GET /tickets/{id}
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let id = id.trim().to_uppercase();
    state
        .store
        .ticket(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Ticket {id} not found")))
}

/// Request body for POST /tickets/{id}/response.
#[derive(Debug, Deserialize)]
pub struct TicketResponseRequest {
    pub response: String,
    /// Defaults to closed.
    pub status: Option<TicketStatus>,
}

/// POST /tickets/{id}/response - a support agent answers a ticket.
pub async fn respond_to_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TicketResponseRequest>,
) -> Result<Json<Ticket>, ApiError> {
    let id = id.trim().to_uppercase();
    let response = req.response.trim();
    if response.is_empty() {
        return Err(ApiError::BadRequest("response must not be empty".into()));
    }
    let status = req.status.unwrap_or(TicketStatus::Closed);

    if !state.store.respond_to_ticket(&id, response, status)? {
        return Err(ApiError::NotFound(format!("Ticket {id} not found")));
    }
    info!(ticket_id = %id, status = %status, "Ticket answered");

    state
        .store
        .ticket(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Ticket {id} not found")))
}
