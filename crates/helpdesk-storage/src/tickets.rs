//! Ticket persistence.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use tracing::info;

use helpdesk_core::error::HelpdeskError;
use helpdesk_core::types::{new_ticket_id, Ticket, TicketStatus};

use crate::db::Database;

const TICKET_COLUMNS: &str = "ticket_id, user_name, issue, response, status, created_at";

/// Repository for support tickets.
pub struct TicketRepository {
    db: Arc<Database>,
}

impl TicketRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Open a new ticket with a freshly generated identifier.
    pub fn create(&self, user_name: &str, issue: &str) -> Result<Ticket, HelpdeskError> {
        let ticket = Ticket {
            ticket_id: new_ticket_id(),
            user_name: user_name.to_string(),
            issue: issue.to_string(),
            response: None,
            status: TicketStatus::Open,
            created_at: Utc::now(),
        };
        self.save(&ticket)?;
        info!(ticket_id = %ticket.ticket_id, user = %ticket.user_name, "Ticket created");
        Ok(ticket)
    }

    /// Store a ticket as-is.
    pub fn save(&self, ticket: &Ticket) -> Result<(), HelpdeskError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tickets (ticket_id, user_name, issue, response, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    ticket.ticket_id,
                    ticket.user_name,
                    ticket.issue,
                    ticket.response,
                    ticket.status.as_str(),
                    ticket.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| HelpdeskError::Storage(format!("Failed to save ticket: {}", e)))?;
            Ok(())
        })
    }

    pub fn find_by_id(&self, ticket_id: &str) -> Result<Option<Ticket>, HelpdeskError> {
        self.db.with_conn(|conn| {
            let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?1");
            let row = conn
                .query_row(&sql, rusqlite::params![ticket_id], |row| {
                    Ok(row_to_ticket(row))
                })
                .optional()
                .map_err(|e| HelpdeskError::Storage(e.to_string()))?;
            row.transpose()
        })
    }

    /// The response of the most recent ticket whose issue text is identical
    /// to `issue` and that has been answered.
    pub fn latest_answer_for_issue(&self, issue: &str) -> Result<Option<String>, HelpdeskError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT response FROM tickets
                 WHERE issue = ?1 AND response IS NOT NULL
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                rusqlite::params![issue],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| HelpdeskError::Storage(e.to_string()))
        })
    }

    /// Record a human response. Returns `false` when no such ticket exists.
    pub fn respond(
        &self,
        ticket_id: &str,
        response: &str,
        status: TicketStatus,
    ) -> Result<bool, HelpdeskError> {
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE tickets SET response = ?1, status = ?2 WHERE ticket_id = ?3",
                rusqlite::params![response, status.as_str(), ticket_id],
            )
            .map_err(|e| HelpdeskError::Storage(format!("Failed to update ticket: {}", e)))
        })?;
        if updated > 0 {
            info!(ticket_id, status = %status, "Ticket response recorded");
        }
        Ok(updated > 0)
    }

    /// Most recent tickets first, optionally filtered by status.
    pub fn list(
        &self,
        status: Option<TicketStatus>,
        limit: u64,
    ) -> Result<Vec<Ticket>, HelpdeskError> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {TICKET_COLUMNS} FROM tickets
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2"
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| HelpdeskError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(
                    rusqlite::params![status.map(|s| s.as_str()), limit],
                    |row| Ok(row_to_ticket(row)),
                )
                .map_err(|e| HelpdeskError::Storage(e.to_string()))?;

            let mut tickets = Vec::new();
            for row in rows {
                tickets.push(row.map_err(|e| HelpdeskError::Storage(e.to_string()))??);
            }
            Ok(tickets)
        })
    }

    pub fn count(&self) -> Result<u64, HelpdeskError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0))
                .map_err(|e| HelpdeskError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

fn row_to_ticket(row: &rusqlite::Row<'_>) -> Result<Ticket, HelpdeskError> {
    let status: String = row.get(4).map_err(|e| HelpdeskError::Storage(e.to_string()))?;
    let created_ms: i64 = row.get(5).map_err(|e| HelpdeskError::Storage(e.to_string()))?;
    let created_at: DateTime<Utc> = Utc
        .timestamp_millis_opt(created_ms)
        .single()
        .ok_or_else(|| HelpdeskError::Storage(format!("Invalid ticket timestamp: {created_ms}")))?;

    Ok(Ticket {
        ticket_id: row.get(0).map_err(|e| HelpdeskError::Storage(e.to_string()))?,
        user_name: row.get(1).map_err(|e| HelpdeskError::Storage(e.to_string()))?,
        issue: row.get(2).map_err(|e| HelpdeskError::Storage(e.to_string()))?,
        response: row.get(3).map_err(|e| HelpdeskError::Storage(e.to_string()))?,
        status: status.parse()?,
        created_at,
    })
}
