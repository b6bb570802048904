//! The relational query contract used by the assistant.

use std::sync::Arc;

use helpdesk_core::error::HelpdeskError;
use helpdesk_core::types::{FaqEntry, TeamMember, Ticket, TicketStatus};

use crate::db::Database;
use crate::directory::{FaqRepository, TeamRepository};
use crate::tickets::TicketRepository;

/// Parameterized queries over tickets, the team directory and the FAQ.
///
/// Implementations must be shareable across tasks; every call is a short
/// blocking round-trip.
pub trait SupportStore: Send + Sync {
    /// Confirm the store is reachable.
    fn ping(&self) -> Result<(), HelpdeskError>;

    /// Most recent answered ticket whose issue text equals `issue`.
    fn past_ticket_answer(&self, issue: &str) -> Result<Option<String>, HelpdeskError>;

    /// FAQ candidates for the given keywords, best first.
    fn faq_by_keywords(
        &self,
        keywords: &[String],
        question: &str,
    ) -> Result<Vec<FaqEntry>, HelpdeskError>;

    /// FAQ entry containing the whole question text.
    fn faq_by_phrase(&self, question: &str) -> Result<Option<FaqEntry>, HelpdeskError>;

    /// Team member by exact, then partial, case-insensitive name.
    fn team_member(&self, name: &str) -> Result<Option<TeamMember>, HelpdeskError>;

    fn create_ticket(&self, user_name: &str, issue: &str) -> Result<Ticket, HelpdeskError>;

    fn ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, HelpdeskError>;

    /// Attach a human response. `false` when the ticket does not exist.
    fn respond_to_ticket(
        &self,
        ticket_id: &str,
        response: &str,
        status: TicketStatus,
    ) -> Result<bool, HelpdeskError>;

    fn list_tickets(
        &self,
        status: Option<TicketStatus>,
        limit: u64,
    ) -> Result<Vec<Ticket>, HelpdeskError>;
}

/// SQLite-backed [`SupportStore`].
pub struct SqliteSupportStore {
    db: Arc<Database>,
    tickets: TicketRepository,
    teams: TeamRepository,
    faq: FaqRepository,
}

impl SqliteSupportStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            tickets: TicketRepository::new(db.clone()),
            teams: TeamRepository::new(db.clone()),
            faq: FaqRepository::new(db.clone()),
            db,
        }
    }

    pub fn teams(&self) -> &TeamRepository {
        &self.teams
    }

    pub fn faq(&self) -> &FaqRepository {
        &self.faq
    }
}

impl SupportStore for SqliteSupportStore {
    fn ping(&self) -> Result<(), HelpdeskError> {
        self.db.ping()
    }

    fn past_ticket_answer(&self, issue: &str) -> Result<Option<String>, HelpdeskError> {
        self.tickets.latest_answer_for_issue(issue)
    }

    fn faq_by_keywords(
        &self,
        keywords: &[String],
        question: &str,
    ) -> Result<Vec<FaqEntry>, HelpdeskError> {
        self.faq.search_keywords(keywords, question)
    }

    fn faq_by_phrase(&self, question: &str) -> Result<Option<FaqEntry>, HelpdeskError> {
        self.faq.search_phrase(question)
    }

    fn team_member(&self, name: &str) -> Result<Option<TeamMember>, HelpdeskError> {
        self.teams.find(name)
    }

    fn create_ticket(&self, user_name: &str, issue: &str) -> Result<Ticket, HelpdeskError> {
        self.tickets.create(user_name, issue)
    }

    fn ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, HelpdeskError> {
        self.tickets.find_by_id(ticket_id)
    }

    fn respond_to_ticket(
        &self,
        ticket_id: &str,
        response: &str,
        status: TicketStatus,
    ) -> Result<bool, HelpdeskError> {
        self.tickets.respond(ticket_id, response, status)
    }

    fn list_tickets(
        &self,
        status: Option<TicketStatus>,
        limit: u64,
    ) -> Result<Vec<Ticket>, HelpdeskError> {
        self.tickets.list(status, limit)
    }
}
