//! Database module for Companion Tutor
//!
//! Provides persistence for companions and session history.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Companion not found: {0}")]
    CompanionNotFound(String),
    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

const COMPANION_COLUMNS: &str =
    "c.id, c.name, c.subject, c.topic, c.title, c.duration, c.voice, c.style, c.author, c.created_at";

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // ==================== Companion Operations ====================

    /// Create a companion owned by `author`
    pub fn create_companion(&self, author: &str, new: &NewCompanion) -> DbResult<Companion> {
        let conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO companions (id, name, subject, topic, title, duration, voice, style, author, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                new.name,
                new.subject,
                new.topic,
                new.title,
                new.duration,
                new.voice,
                new.style,
                author,
                now.to_rfc3339()
            ],
        )?;

        Ok(Companion {
            id,
            name: new.name.clone(),
            subject: new.subject.clone(),
            topic: new.topic.clone(),
            title: new.title.clone(),
            duration: new.duration,
            voice: new.voice.clone(),
            style: new.style.clone(),
            author: author.to_string(),
            created_at: now,
        })
    }

    /// Get companion by ID
    pub fn get_companion(&self, id: &str) -> DbResult<Companion> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPANION_COLUMNS} FROM companions c WHERE c.id = ?1"
        ))?;

        stmt.query_row(params![id], companion_from_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::CompanionNotFound(id.to_string()),
                other => DbError::Sqlite(other),
            })
    }

    /// List companions matching `filter`, one page at a time
    pub fn list_companions(&self, filter: &CompanionFilter) -> DbResult<Vec<Companion>> {
        let conn = self.conn()?;
        let mut clauses = Vec::new();
        let mut args: Vec<String> = Vec::new();

        for (column, value) in [("subject", &filter.subject), ("topic", &filter.topic)] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                args.push(like_pattern(value));
                clauses.push(format!("c.{column} LIKE ?{} ESCAPE '\\'", args.len()));
            }
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT {COMPANION_COLUMNS} FROM companions c {where_clause}
             ORDER BY c.created_at ASC, c.rowid ASC
             LIMIT {} OFFSET {}",
            filter.page_size(),
            filter.offset()
        );

        let mut stmt = conn.prepare(&sql)?;
        let companions = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), companion_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(companions)
    }

    /// Companions created by `author`
    pub fn user_companions(&self, author: &str) -> DbResult<Vec<Companion>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPANION_COLUMNS} FROM companions c WHERE c.author = ?1
             ORDER BY c.created_at DESC, c.rowid DESC"
        ))?;
        let companions = stmt
            .query_map(params![author], companion_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(companions)
    }

    // ==================== Session History Operations ====================

    /// Record a completed session; returns the new row id
    pub fn add_session_history(&self, companion_id: &str, user_id: &str) -> DbResult<i64> {
        let conn = self.conn()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM companions WHERE id = ?1)",
            params![companion_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(DbError::CompanionNotFound(companion_id.to_string()));
        }

        conn.execute(
            "INSERT INTO session_history (companion_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![companion_id, user_id, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Companions of the most recent sessions across all users, newest first
    pub fn recent_sessions(&self, limit: u32) -> DbResult<Vec<Companion>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPANION_COLUMNS} FROM session_history h
             JOIN companions c ON c.id = h.companion_id
             ORDER BY h.created_at DESC, h.id DESC
             LIMIT ?1"
        ))?;
        let companions = stmt
            .query_map(params![limit.min(MAX_LIMIT)], companion_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(companions)
    }

    /// Companions of `user_id`'s most recent sessions, newest first
    pub fn user_sessions(&self, user_id: &str, limit: u32) -> DbResult<Vec<Companion>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPANION_COLUMNS} FROM session_history h
             JOIN companions c ON c.id = h.companion_id
             WHERE h.user_id = ?1
             ORDER BY h.created_at DESC, h.id DESC
             LIMIT ?2"
        ))?;
        let companions = stmt
            .query_map(params![user_id, limit.min(MAX_LIMIT)], companion_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(companions)
    }
}

fn companion_from_row(row: &Row<'_>) -> rusqlite::Result<Companion> {
    Ok(Companion {
        id: row.get(0)?,
        name: row.get(1)?,
        subject: row.get(2)?,
        topic: row.get(3)?,
        title: row.get(4)?,
        duration: row.get(5)?,
        voice: row.get(6)?,
        style: row.get(7)?,
        author: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

/// `%value%` with LIKE wildcards in `value` escaped
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
