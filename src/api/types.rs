//! API request and response types

use crate::db::Companion;
use crate::state_machine::{Intent, SessionContext};
use crate::view::SessionView;
use serde::{Deserialize, Serialize};

/// Request to dispatch a user intent to a session
#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub intent: Intent,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

/// Response with a list of companions
#[derive(Debug, Serialize)]
pub struct CompanionListResponse {
    pub companions: Vec<Companion>,
}

/// Response with a single companion
#[derive(Debug, Serialize)]
pub struct CompanionResponse {
    pub companion: Companion,
}

/// A mounted session and how it currently renders
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub context: SessionContext,
    pub view: SessionView,
}

/// Response for intents and SDK events; results arrive over SSE
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
