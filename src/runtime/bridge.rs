//! Call SDK bridge to the browser
//!
//! The vendor voice SDK runs in the user's browser. The server drives it by
//! pushing commands down the session's SSE stream; the browser reports SDK
//! events back through `POST /api/sessions/:id/events`.

use super::traits::{CallSdk, SdkError};
use super::SseEvent;
use crate::assistant::{AssistantConfig, AssistantOverrides};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Instructions for the browser-hosted SDK
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SdkCommand {
    Start {
        assistant: Box<AssistantConfig>,
        overrides: AssistantOverrides,
    },
    Stop,
    SetMuted {
        muted: bool,
    },
}

pub struct ClientBridgeSdk {
    broadcast_tx: broadcast::Sender<SseEvent>,
    muted: AtomicBool,
}

impl ClientBridgeSdk {
    pub fn new(broadcast_tx: broadcast::Sender<SseEvent>) -> Self {
        Self {
            broadcast_tx,
            muted: AtomicBool::new(false),
        }
    }

    fn send(&self, command: SdkCommand) -> Result<(), SdkError> {
        self.broadcast_tx
            .send(SseEvent::SdkCommand { command })
            .map(|receivers| {
                tracing::debug!(receivers, "Forwarded SDK command");
            })
            .map_err(|_| SdkError::NoClient)
    }
}

#[async_trait]
impl CallSdk for ClientBridgeSdk {
    async fn start(
        &self,
        assistant: &AssistantConfig,
        overrides: &AssistantOverrides,
    ) -> Result<(), SdkError> {
        self.send(SdkCommand::Start {
            assistant: Box::new(assistant.clone()),
            overrides: overrides.clone(),
        })?;
        // A fresh call starts unmuted
        self.muted.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), SdkError> {
        self.send(SdkCommand::Stop)
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    async fn set_muted(&self, muted: bool) -> Result<(), SdkError> {
        self.send(SdkCommand::SetMuted { muted })?;
        self.muted.store(muted, Ordering::SeqCst);
        Ok(())
    }
}
