//! Support agent: the reason/act loop and the capabilities it can call.
//!
//! [`OrchestrationLoop`] drives a tool-calling model through bounded rounds
//! of capability invocations. [`SupportAgent`] wraps it for transports with
//! input validation and canned small-talk replies.

pub mod agent;
pub mod capabilities;
pub mod capability;
pub mod confirmation;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod query;
pub mod session;
pub mod smalltalk;

pub use agent::{AgentReply, SupportAgent};
pub use capabilities::{
    default_registry, CreateTicket, DocumentRetrieval, StructuredLookup, TicketStatusCheck,
    NO_DOCUMENT_MATCH, NO_INFO_FOUND,
};
pub use capability::{Capability, CapabilityKind, CapabilityRegistry, TurnContext};
pub use confirmation::{
    is_affirmative, Confirmer, PresetConfirmer, ScriptedConfirmer, TICKET_CONFIRMATION_PROMPT,
};
pub use error::AgentError;
pub use orchestrator::{OrchestrationLoop, TurnOutcome};
pub use session::ConversationSession;
pub use smalltalk::SmallTalk;
