//! Database schema and types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS companions (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    subject TEXT NOT NULL,
    topic TEXT NOT NULL,
    title TEXT,
    duration INTEGER NOT NULL,
    voice TEXT NOT NULL,
    style TEXT NOT NULL,
    author TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_companions_author ON companions(author);

CREATE TABLE IF NOT EXISTS session_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    companion_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (companion_id) REFERENCES companions(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_session_history_created ON session_history(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_session_history_user ON session_history(user_id, created_at DESC);
";

/// A tutoring companion profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Companion {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub topic: String,
    pub title: Option<String>,
    /// Planned session length in minutes
    pub duration: i64,
    pub voice: String,
    pub style: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the companion builder form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCompanion {
    pub name: String,
    pub subject: String,
    pub topic: String,
    #[serde(default)]
    pub title: Option<String>,
    pub duration: i64,
    pub voice: String,
    pub style: String,
}

impl NewCompanion {
    /// Every text field is required and a session lasts at least a minute
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("name", &self.name),
            ("subject", &self.subject),
            ("topic", &self.topic),
            ("voice", &self.voice),
            ("style", &self.style),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }
        if self.duration < 1 {
            return Err("duration must be at least 1 minute".to_string());
        }
        Ok(())
    }
}

/// Largest page any listing query returns
pub const MAX_LIMIT: u32 = 100;

/// Library filter; `subject` and `topic` match case-insensitively anywhere
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionFilter {
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub limit: u32,
    /// 1-based
    pub page: u32,
}

impl Default for CompanionFilter {
    fn default() -> Self {
        Self {
            subject: None,
            topic: None,
            limit: 10,
            page: 1,
        }
    }
}

impl CompanionFilter {
    /// Requested limit, capped at `MAX_LIMIT`
    pub fn page_size(&self) -> u32 {
        self.limit.min(MAX_LIMIT)
    }

    pub fn offset(&self) -> u32 {
        self.page
            .max(1)
            .saturating_sub(1)
            .saturating_mul(self.page_size())
    }
}
