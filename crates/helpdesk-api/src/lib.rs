//! HTTP transport for the support agent.
//!
//! Exposes the chat endpoint, a health check, and ticket endpoints for the
//! human support team.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
