//! Helpdesk storage crate - SQLite persistence for tickets, the team
//! directory and the FAQ.
//!
//! All access goes through parameterized statements on a mutex-guarded
//! connection. [`SupportStore`] is the contract the assistant's
//! capabilities depend on; [`SqliteSupportStore`] implements it on top of
//! the repositories.

pub mod db;
pub mod directory;
pub mod migrations;
pub mod store;
pub mod tickets;

pub use db::Database;
pub use directory::{FaqRepository, TeamRepository};
pub use store::{SqliteSupportStore, SupportStore};
pub use tickets::TicketRepository;
