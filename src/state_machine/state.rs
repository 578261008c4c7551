//! Call session state types

use crate::transcript::TranscriptLog;
use serde::{Deserialize, Serialize};

/// Lifecycle of the voice call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// No call yet for this session view
    #[default]
    Idle,

    /// Start requested, waiting for the SDK to confirm
    Connecting,

    /// SDK confirmed the call is live
    Active,

    /// Call ended; a new start request supersedes this
    Finished,
}

impl CallState {
    /// Whether a call is connecting or live
    pub fn is_in_call(self) -> bool {
        matches!(self, CallState::Connecting | CallState::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Connecting => "connecting",
            CallState::Active => "active",
            CallState::Finished => "finished",
        }
    }
}

/// Everything the session view renders from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub call: CallState,
    /// Last mute intent issued to the SDK
    pub muted: bool,
    /// Driven by SDK speech-start/speech-end only
    pub speaking: bool,
    pub transcript: TranscriptLog,
    /// Failure to surface in the view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_call(mut self, call: CallState) -> Self {
        self.call = call;
        self
    }
}

/// Per-session configuration, fixed when the session view mounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub companion_id: String,
    pub companion_name: String,
    pub subject: String,
    pub topic: String,
    pub style: String,
    pub voice: String,
    /// Planned session length in minutes
    pub duration: i64,
    pub user_id: String,
    pub user_name: String,
    pub user_image: String,
}

impl SessionContext {
    /// First word of the companion's name, without trailing punctuation
    pub fn companion_first_name(&self) -> String {
        self.companion_name
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .replace(['.', ','], "")
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> SessionContext {
    SessionContext {
        session_id: "session-1".to_string(),
        companion_id: "companion-1".to_string(),
        companion_name: "Neura the Brainy Explorer".to_string(),
        subject: "science".to_string(),
        topic: "Neural networks".to_string(),
        style: "casual".to_string(),
        voice: "female".to_string(),
        duration: 15,
        user_id: "user-1".to_string(),
        user_name: "Ada".to_string(),
        user_image: "https://img.example/ada.png".to_string(),
    }
}
