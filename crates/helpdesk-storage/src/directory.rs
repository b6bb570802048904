//! Team directory and FAQ lookups.

use std::sync::Arc;

use rusqlite::OptionalExtension;

use helpdesk_core::error::HelpdeskError;
use helpdesk_core::types::{FaqEntry, TeamMember};

use crate::db::Database;

/// FAQ rows returned by a keyword search.
pub const FAQ_CANDIDATE_LIMIT: usize = 3;

/// Repository for the `teams` table.
pub struct TeamRepository {
    db: Arc<Database>,
}

impl TeamRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn insert(&self, member: &TeamMember) -> Result<(), HelpdeskError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO teams (name, bio) VALUES (?1, ?2)",
                rusqlite::params![member.name, member.bio],
            )
            .map_err(|e| HelpdeskError::Storage(format!("Failed to save team member: {}", e)))?;
            Ok(())
        })
    }

    /// Case-insensitive exact name match.
    pub fn find_exact(&self, name: &str) -> Result<Option<TeamMember>, HelpdeskError> {
        self.find_one(
            "SELECT name, bio FROM teams WHERE LOWER(name) = LOWER(?1) LIMIT 1",
            name.to_string(),
        )
    }

    /// Case-insensitive substring match.
    pub fn find_partial(&self, name: &str) -> Result<Option<TeamMember>, HelpdeskError> {
        self.find_one(
            "SELECT name, bio FROM teams WHERE LOWER(name) LIKE ?1 ORDER BY LENGTH(name) LIMIT 1",
            format!("%{}%", name.to_lowercase()),
        )
    }

    /// Exact match first, then partial.
    pub fn find(&self, name: &str) -> Result<Option<TeamMember>, HelpdeskError> {
        match self.find_exact(name)? {
            Some(member) => Ok(Some(member)),
            None => self.find_partial(name),
        }
    }

    fn find_one(&self, sql: &str, param: String) -> Result<Option<TeamMember>, HelpdeskError> {
        self.db.with_conn(|conn| {
            conn.query_row(sql, rusqlite::params![param], |row| {
                Ok(TeamMember {
                    name: row.get(0)?,
                    bio: row.get(1)?,
                })
            })
            .optional()
            .map_err(|e| HelpdeskError::Storage(e.to_string()))
        })
    }
}

/// Repository for the `faq` table.
pub struct FaqRepository {
    db: Arc<Database>,
}

impl FaqRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn insert(&self, entry: &FaqEntry) -> Result<(), HelpdeskError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO faq (question, answer) VALUES (?1, ?2)",
                rusqlite::params![entry.question, entry.answer],
            )
            .map_err(|e| HelpdeskError::Storage(format!("Failed to save FAQ entry: {}", e)))?;
            Ok(())
        })
    }

    /// Entries where any keyword appears in the question or the answer.
    ///
    /// Ranked by where the full `question` text appears (inside a stored
    /// question first, then inside an answer, then neither), then by the
    /// length of the stored question. At most [`FAQ_CANDIDATE_LIMIT`] rows.
    pub fn search_keywords(
        &self,
        keywords: &[String],
        question: &str,
    ) -> Result<Vec<FaqEntry>, HelpdeskError> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        // ?1 is the whole question; keywords start at ?2.
        let conditions: Vec<String> = (0..keywords.len())
            .map(|i| {
                let p = i + 2;
                format!("LOWER(question) LIKE ?{p} OR LOWER(answer) LIKE ?{p}")
            })
            .collect();
        let sql = format!(
            "SELECT question, answer,
                    CASE WHEN LOWER(question) LIKE ?1 THEN 1
                         WHEN LOWER(answer) LIKE ?1 THEN 2
                         ELSE 3 END AS relevance
             FROM faq
             WHERE {}
             ORDER BY relevance, LENGTH(question)
             LIMIT {FAQ_CANDIDATE_LIMIT}",
            conditions.join(" OR ")
        );

        let mut params = Vec::with_capacity(keywords.len() + 1);
        params.push(like_pattern(question));
        params.extend(keywords.iter().map(|k| like_pattern(k)));

        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| HelpdeskError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    Ok(FaqEntry {
                        question: row.get(0)?,
                        answer: row.get(1)?,
                    })
                })
                .map_err(|e| HelpdeskError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| HelpdeskError::Storage(e.to_string()))
        })
    }

    /// Shortest entry whose question or answer contains the whole `question`.
    pub fn search_phrase(&self, question: &str) -> Result<Option<FaqEntry>, HelpdeskError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT question, answer FROM faq
                 WHERE LOWER(question) LIKE ?1 OR LOWER(answer) LIKE ?1
                 ORDER BY LENGTH(question)
                 LIMIT 1",
                rusqlite::params![like_pattern(question)],
                |row| {
                    Ok(FaqEntry {
                        question: row.get(0)?,
                        answer: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(|e| HelpdeskError::Storage(e.to_string()))
        })
    }
}

fn like_pattern(text: &str) -> String {
    format!("%{}%", text.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_db() -> Arc<Database> {
        Arc::new(Database::in_memory().unwrap())
    }

    fn seed_faq(repo: &FaqRepository) {
        for (q, a) in [
            ("What are your business hours?", "We are open 9am to 5pm, Monday to Friday."),
            ("How do I reset my password?", "Use the 'Forgot password' link on the login page."),
            ("Where is your office?", "Our office is at 1 Harbour Street."),
            ("Do you offer any refunds?", "Refunds are available within 30 days of purchase."),
        ] {
            repo.insert(&FaqEntry {
                question: q.to_string(),
                answer: a.to_string(),
            })
            .unwrap();
        }
    }

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_team_exact_match_is_case_insensitive() {
        let repo = TeamRepository::new(make_db());
        repo.insert(&TeamMember {
            name: "Alice".to_string(),
            bio: "Support lead".to_string(),
        })
        .unwrap();

        let found = repo.find_exact("alice").unwrap().unwrap();
        assert_eq!(found.name, "Alice");
        assert_eq!(found.to_string(), "Alice: Support lead");
    }

    #[test]
    fn test_team_partial_match_after_exact_miss() {
        let repo = TeamRepository::new(make_db());
        repo.insert(&TeamMember {
            name: "Alice Johnson".to_string(),
            bio: "Billing".to_string(),
        })
        .unwrap();

        assert!(repo.find_exact("alice").unwrap().is_none());
        let found = repo.find("alice").unwrap().unwrap();
        assert_eq!(found.name, "Alice Johnson");
    }

    #[test]
    fn test_team_no_match() {
        let repo = TeamRepository::new(make_db());
        assert!(repo.find("nobody").unwrap().is_none());
    }

    #[test]
    fn test_faq_keyword_search_ranks_and_limits() {
        let repo = FaqRepository::new(make_db());
        seed_faq(&repo);

        let results = repo
            .search_keywords(&kw(&["hours", "password", "office", "refunds"]), "anything")
            .unwrap();
        assert_eq!(results.len(), FAQ_CANDIDATE_LIMIT);
        // Same relevance tier, so shortest question first.
        assert_eq!(results[0].question, "Where is your office?");
    }

    #[test]
    fn test_faq_keyword_search_prefers_full_question_in_question() {
        let repo = FaqRepository::new(make_db());
        seed_faq(&repo);

        let results = repo
            .search_keywords(&kw(&["office", "password"]), "reset my password")
            .unwrap();
        assert_eq!(results[0].question, "How do I reset my password?");
    }

    #[test]
    fn test_faq_keyword_search_matches_answers() {
        let repo = FaqRepository::new(make_db());
        seed_faq(&repo);

        let results = repo.search_keywords(&kw(&["harbour"]), "harbour").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].question, "Where is your office?");
    }

    #[test]
    fn test_faq_keyword_search_empty_keywords() {
        let repo = FaqRepository::new(make_db());
        seed_faq(&repo);
        assert!(repo.search_keywords(&[], "hours").unwrap().is_empty());
    }

    #[test]
    fn test_faq_phrase_search() {
        let repo = FaqRepository::new(make_db());
        seed_faq(&repo);

        let found = repo.search_phrase("offer any refunds").unwrap().unwrap();
        assert!(found.answer.contains("30 days"));
        assert!(repo.search_phrase("quantum teleportation").unwrap().is_none());
    }
}
