//! Runtime log of review sessions.
//!
//! Every run opens a session in a SQLite file (`logs.db` by default) and
//! records the agents it creates and each chat completion they make. The
//! session is closed when its [`SessionGuard`] is dropped, whichever way
//! the run ends.

use crate::llm::{ChatCompletion, ChatRequest};
use crate::models::RoleKind;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        started_at TEXT NOT NULL,
        ended_at TEXT
    );

    CREATE TABLE IF NOT EXISTS agents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (session_id) REFERENCES sessions(id)
    );

    CREATE TABLE IF NOT EXISTS chat_completions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        source_name TEXT NOT NULL,
        request TEXT NOT NULL,
        response TEXT NOT NULL,
        cost REAL NOT NULL,
        is_cached INTEGER NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        FOREIGN KEY (session_id) REFERENCES sessions(id)
    );
"#;

/// One chat completion as it goes into the log.
pub struct CompletionRecord<'a> {
    pub source_name: &'a str,
    pub request: &'a ChatRequest,
    pub completion: &'a ChatCompletion,
    pub cost: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

pub struct RuntimeLogger {
    conn: Mutex<Connection>,
    session: Mutex<Option<String>>,
}

impl RuntimeLogger {
    /// Open or create the log database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open runtime log at {}", path.display()))?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create runtime log schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
            session: Mutex::new(None),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current(&self) -> MutexGuard<'_, Option<String>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new session. It stays open until the guard is dropped.
    pub fn start(&self) -> Result<SessionGuard<'_>> {
        let id = Uuid::new_v4().to_string();

        self.conn()
            .execute(
                "INSERT INTO sessions (id, started_at) VALUES (?1, ?2)",
                (&id, Utc::now().to_rfc3339()),
            )
            .context("Failed to start logging session")?;

        let previous = self.current().replace(id.clone());
        if let Some(previous) = previous {
            warn!("Logging session {} replaced before it was stopped", previous);
        }

        debug!("Started logging session {}", id);
        Ok(SessionGuard {
            logger: self,
            session_id: id,
        })
    }

    /// Id of the open session, if any.
    pub fn session_id(&self) -> Option<String> {
        self.current().clone()
    }

    /// Record a reviewer agent. No-op without an open session.
    pub fn log_agent(&self, name: &str, role: RoleKind) -> Result<()> {
        let Some(session_id) = self.session_id() else {
            return Ok(());
        };

        self.conn()
            .execute(
                "INSERT INTO agents (session_id, name, role, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (&session_id, name, role.to_string(), Utc::now().to_rfc3339()),
            )
            .context("Failed to log agent")?;
        Ok(())
    }

    /// Record a chat completion. No-op without an open session.
    pub fn log_chat_completion(&self, record: &CompletionRecord<'_>) -> Result<()> {
        let Some(session_id) = self.session_id() else {
            return Ok(());
        };

        let request = serde_json::to_string(record.request)?;
        let response = serde_json::to_string(record.completion)?;

        self.conn()
            .execute(
                "INSERT INTO chat_completions
                 (session_id, source_name, request, response, cost, is_cached, start_time, end_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                (
                    &session_id,
                    record.source_name,
                    &request,
                    &response,
                    record.cost,
                    record.completion.cached,
                    record.start_time.to_rfc3339(),
                    record.end_time.to_rfc3339(),
                ),
            )
            .context("Failed to log chat completion")?;
        Ok(())
    }

    /// Close `session_id`. Calling it again is a no-op. It stops being the
    /// open session only if it still is.
    pub fn stop_session(&self, session_id: &str) -> Result<()> {
        {
            let mut current = self.current();
            if current.as_deref() == Some(session_id) {
                *current = None;
            }
        }

        let updated = self
            .conn()
            .execute(
                "UPDATE sessions SET ended_at = ?1 WHERE id = ?2 AND ended_at IS NULL",
                (Utc::now().to_rfc3339(), session_id),
            )
            .context("Failed to stop logging session")?;

        if updated > 0 {
            debug!("Stopped logging session {}", session_id);
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn session_ended_at(&self, session_id: &str) -> Option<String> {
        self.conn()
            .query_row(
                "SELECT ended_at FROM sessions WHERE id = ?1",
                [session_id],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[cfg(test)]
    pub fn completion_sources(&self, session_id: &str) -> Vec<String> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT source_name FROM chat_completions WHERE session_id = ?1 ORDER BY id")
            .unwrap();
        stmt.query_map([session_id], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap()
    }

    #[cfg(test)]
    pub fn agent_names(&self, session_id: &str) -> Vec<String> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM agents WHERE session_id = ?1 ORDER BY id")
            .unwrap();
        stmt.query_map([session_id], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap()
    }
}

/// Keeps a logging session open; stops it on drop.
pub struct SessionGuard<'a> {
    logger: &'a RuntimeLogger,
    session_id: String,
}

impl SessionGuard<'_> {
    pub fn id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.logger.stop_session(&self.session_id) {
            warn!("Failed to stop logging session {}: {:#}", self.session_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, Usage};

    fn sample_request() -> ChatRequest {
        ChatRequest {
            model: "llama3.2".to_string(),
            messages: vec![ChatMessage::user("review this")],
            temperature: 0.0,
            stream: false,
        }
    }

    fn sample_completion() -> ChatCompletion {
        ChatCompletion {
            id: Some("c1".to_string()),
            content: "LGTM TERMINATE".to_string(),
            usage: Usage::default(),
            cached: false,
        }
    }

    #[test]
    fn test_guard_drop_stops_session() {
        let logger = RuntimeLogger::in_memory().unwrap();
        let id = {
            let guard = logger.start().unwrap();
            assert_eq!(logger.session_id().as_deref(), Some(guard.id()));
            assert!(logger.session_ended_at(guard.id()).is_none());
            guard.id().to_string()
        };

        assert!(logger.session_id().is_none());
        assert!(logger.session_ended_at(&id).is_some());
    }

    #[test]
    fn test_overlapping_guards_stop_their_own_sessions() {
        let logger = RuntimeLogger::in_memory().unwrap();
        let first = logger.start().unwrap();
        let second = logger.start().unwrap();
        let (first_id, second_id) = (first.id().to_string(), second.id().to_string());

        drop(first);
        assert!(logger.session_ended_at(&first_id).is_some());
        assert!(logger.session_ended_at(&second_id).is_none());
        assert_eq!(logger.session_id(), Some(second_id.clone()));

        drop(second);
        assert!(logger.session_ended_at(&second_id).is_some());
        assert!(logger.session_id().is_none());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let logger = RuntimeLogger::in_memory().unwrap();
        let guard = logger.start().unwrap();
        let id = guard.id().to_string();
        logger.stop_session(&id).unwrap();
        let ended_at = logger.session_ended_at(&id);
        assert!(ended_at.is_some());

        logger.stop_session(&id).unwrap();
        drop(guard);
        assert_eq!(logger.session_ended_at(&id), ended_at);
    }

    #[test]
    fn test_records_agents_and_completions() {
        let logger = RuntimeLogger::in_memory().unwrap();
        let guard = logger.start().unwrap();

        logger
            .log_agent("code_review_agent", RoleKind::Review)
            .unwrap();

        let request = sample_request();
        let completion = sample_completion();
        let now = Utc::now();
        logger
            .log_chat_completion(&CompletionRecord {
                source_name: "code_review_agent",
                request: &request,
                completion: &completion,
                cost: 0.0,
                start_time: now,
                end_time: now,
            })
            .unwrap();

        assert_eq!(logger.agent_names(guard.id()), vec!["code_review_agent"]);
        assert_eq!(
            logger.completion_sources(guard.id()),
            vec!["code_review_agent"]
        );
    }

    #[test]
    fn test_logging_without_session_is_noop() {
        let logger = RuntimeLogger::in_memory().unwrap();
        logger
            .log_agent("static_analyzer_agent", RoleKind::StaticAnalysis)
            .unwrap();
        logger.stop_session("no-such-session").unwrap();
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("logs.db");
        let logger = RuntimeLogger::open(&path).unwrap();
        drop(logger.start().unwrap());
        assert!(path.exists());
    }
}
