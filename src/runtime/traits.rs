//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the runtime with mock implementations.

use crate::assistant::{AssistantConfig, AssistantOverrides};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SdkError {
    #[error("No client is connected to host the call")]
    NoClient,
    #[error("Call SDK rejected the request: {0}")]
    #[allow(dead_code)] // Raised by in-process SDKs and test doubles
    Rejected(String),
}

/// The real-time voice call SDK
#[async_trait]
pub trait CallSdk: Send + Sync {
    /// Request a call start; confirmation arrives later as a `call-start` event
    async fn start(
        &self,
        assistant: &AssistantConfig,
        overrides: &AssistantOverrides,
    ) -> Result<(), SdkError>;

    /// Request the call to stop
    async fn stop(&self) -> Result<(), SdkError>;

    /// SDK's view of the microphone
    fn is_muted(&self) -> bool;

    async fn set_muted(&self, muted: bool) -> Result<(), SdkError>;
}

/// Session history persistence
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    async fn record_session(&self, companion_id: &str, user_id: &str) -> Result<(), String>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: CallSdk + ?Sized> CallSdk for Arc<T> {
    async fn start(
        &self,
        assistant: &AssistantConfig,
        overrides: &AssistantOverrides,
    ) -> Result<(), SdkError> {
        (**self).start(assistant, overrides).await
    }

    async fn stop(&self) -> Result<(), SdkError> {
        (**self).stop().await
    }

    fn is_muted(&self) -> bool {
        (**self).is_muted()
    }

    async fn set_muted(&self, muted: bool) -> Result<(), SdkError> {
        (**self).set_muted(muted).await
    }
}

#[async_trait]
impl<T: HistoryRecorder + ?Sized> HistoryRecorder for Arc<T> {
    async fn record_session(&self, companion_id: &str, user_id: &str) -> Result<(), String> {
        (**self).record_session(companion_id, user_id).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::db::Database;

/// Adapter to use Database as `HistoryRecorder`
#[derive(Clone)]
pub struct DatabaseHistory {
    db: Database,
}

impl DatabaseHistory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HistoryRecorder for DatabaseHistory {
    async fn record_session(&self, companion_id: &str, user_id: &str) -> Result<(), String> {
        self.db
            .add_session_history(companion_id, user_id)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
