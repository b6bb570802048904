//! Language-model and embedding provider boundary.
//!
//! The rest of the system sees providers only through [`ChatModel`] and
//! [`EmbeddingService`]. [`openai`] implements both against any
//! OpenAI-compatible HTTP endpoint; [`ScriptedModel`] and [`HashEmbedding`]
//! are deterministic stand-ins for tests and offline runs.

pub mod chat;
pub mod embedding;
pub mod openai;

pub use chat::{ChatMessage, ChatModel, ChatRole, ModelReply, ScriptedModel, ToolCall, ToolSpec};
pub use embedding::{DynEmbeddingService, EmbeddingService, HashEmbedding};
pub use openai::{OpenAiChatModel, OpenAiEmbedding};
