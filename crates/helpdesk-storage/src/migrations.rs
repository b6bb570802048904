//! Database schema migrations.
//!
//! Version 1 creates the tickets, teams and faq tables alongside the
//! schema_migrations bookkeeping table.

use rusqlite::Connection;
use tracing::info;

use helpdesk_core::error::HelpdeskError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), HelpdeskError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| HelpdeskError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| HelpdeskError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: support_schema");
    }

    Ok(())
}

/// Version 1: tickets, team directory and FAQ.
fn apply_v1(conn: &Connection) -> Result<(), HelpdeskError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tickets (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            ticket_id   TEXT NOT NULL UNIQUE,
            user_name   TEXT NOT NULL,
            issue       TEXT NOT NULL,
            response    TEXT,
            status      TEXT NOT NULL DEFAULT 'open'
                        CHECK (status IN ('open', 'closed')),
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tickets_issue
            ON tickets (issue, created_at DESC);

        CREATE TABLE IF NOT EXISTS teams (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            name    TEXT NOT NULL,
            bio     TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS faq (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            question    TEXT NOT NULL,
            answer      TEXT NOT NULL
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'support_schema');
        ",
    )
    .map_err(|e| HelpdeskError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_ticket_status_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO tickets (ticket_id, user_name, issue, status, created_at)
             VALUES ('TKT-1', 'bob', 'x', 'pending', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ticket_id_unique() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let insert = "INSERT INTO tickets (ticket_id, user_name, issue, created_at)
                      VALUES ('TKT-AAAAAAAA', 'bob', 'x', 0)";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
