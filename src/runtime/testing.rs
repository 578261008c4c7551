//! Mock implementations for testing
//!
//! These mocks enable runtime testing without a browser or database.

use super::traits::*;
use super::{spawn_session, SessionHandle, SseEvent};
use crate::assistant::{AssistantConfig, AssistantOverrides};
use crate::state_machine::state::test_context;
use crate::state_machine::{SessionContext, SessionState};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Mock Call SDK
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SdkCall {
    Start { voice_id: String, topic: String },
    Stop,
    SetMuted(bool),
}

/// Mock call SDK that records every request
#[derive(Default)]
pub struct MockCallSdk {
    calls: Mutex<Vec<SdkCall>>,
    muted: AtomicBool,
    fail_start: Option<String>,
    fail_mute: bool,
}

impl MockCallSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `start` is rejected with `message`
    pub fn failing_start(message: impl Into<String>) -> Self {
        Self {
            fail_start: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn failing_mute() -> Self {
        Self {
            fail_mute: true,
            ..Self::default()
        }
    }

    pub fn recorded_calls(&self) -> Vec<SdkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.recorded_calls()
            .iter()
            .filter(|c| **c == SdkCall::Stop)
            .count()
    }
}

#[async_trait]
impl CallSdk for MockCallSdk {
    async fn start(
        &self,
        assistant: &AssistantConfig,
        overrides: &AssistantOverrides,
    ) -> Result<(), SdkError> {
        self.calls.lock().unwrap().push(SdkCall::Start {
            voice_id: assistant.voice.voice_id.clone(),
            topic: overrides
                .variable_values
                .get("topic")
                .cloned()
                .unwrap_or_default(),
        });
        match &self.fail_start {
            Some(message) => Err(SdkError::Rejected(message.clone())),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> Result<(), SdkError> {
        self.calls.lock().unwrap().push(SdkCall::Stop);
        Ok(())
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    async fn set_muted(&self, muted: bool) -> Result<(), SdkError> {
        self.calls.lock().unwrap().push(SdkCall::SetMuted(muted));
        if self.fail_mute {
            return Err(SdkError::Rejected("microphone busy".to_string()));
        }
        self.muted.store(muted, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// In-memory history
// ============================================================================

#[derive(Default)]
pub struct InMemoryHistory {
    rows: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<(String, String)> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryRecorder for InMemoryHistory {
    async fn record_session(&self, companion_id: &str, user_id: &str) -> Result<(), String> {
        if self.fail {
            return Err("database is locked".to_string());
        }
        self.rows
            .lock()
            .unwrap()
            .push((companion_id.to_string(), user_id.to_string()));
        Ok(())
    }
}

// ============================================================================
// Session builder
// ============================================================================

pub struct TestSession {
    context: SessionContext,
    sdk: MockCallSdk,
    history: InMemoryHistory,
}

pub struct RunningSession {
    pub handle: SessionHandle,
    pub sdk: Arc<MockCallSdk>,
    pub history: Arc<InMemoryHistory>,
    pub events: broadcast::Receiver<SseEvent>,
}

impl TestSession {
    pub fn new() -> Self {
        Self {
            context: test_context(),
            sdk: MockCallSdk::new(),
            history: InMemoryHistory::new(),
        }
    }

    pub fn with_sdk(mut self, sdk: MockCallSdk) -> Self {
        self.sdk = sdk;
        self
    }

    pub fn with_history(mut self, history: InMemoryHistory) -> Self {
        self.history = history;
        self
    }

    pub fn spawn(self) -> RunningSession {
        let sdk = Arc::new(self.sdk);
        let history = Arc::new(self.history);
        let (broadcast_tx, events) = broadcast::channel(64);
        let handle = spawn_session(self.context, sdk.clone(), history.clone(), broadcast_tx);
        RunningSession {
            handle,
            sdk,
            history,
            events,
        }
    }
}

impl RunningSession {
    /// Poll the published state until `pred` holds
    pub async fn wait_for(&self, pred: impl Fn(&SessionState) -> bool) -> SessionState {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let state = self.handle.state();
            if pred(&state) {
                return state;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "Timed out waiting for state, last: {state:?}"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub async fn wait_for_history(&self, rows: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.history.rows().len() < rows {
            assert!(
                tokio::time::Instant::now() < deadline,
                "Timed out waiting for {rows} history rows"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Next error message on the SSE stream, skipping other events
    pub async fn next_error(&mut self) -> String {
        let wait = async {
            loop {
                match self.events.recv().await {
                    Ok(SseEvent::Error { message }) => return message,
                    Ok(_) => {}
                    Err(e) => panic!("SSE stream closed: {e}"),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(2), wait)
            .await
            .expect("no error event")
    }

    /// Let in-flight events drain
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

// ============================================================================
// Runtime tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{CallState, Intent, SdkWireEvent};
    use serde_json::json;

    fn wire(value: serde_json::Value) -> SdkWireEvent {
        serde_json::from_value(value).unwrap()
    }

    async fn connect(session: &RunningSession) {
        session.handle.dispatch_intent(Intent::StartCall).await.unwrap();
        session.wait_for(|s| s.call == CallState::Connecting).await;
        session
            .handle
            .handle_event(wire(json!({ "type": "call-start" })))
            .await
            .unwrap();
        session.wait_for(|s| s.call == CallState::Active).await;
    }

    #[tokio::test]
    async fn start_issues_configured_assistant() {
        let session = TestSession::new().spawn();

        connect(&session).await;

        assert_eq!(
            session.sdk.recorded_calls(),
            vec![SdkCall::Start {
                voice_id: "ZIlrSGI4jZqobxRKprJz".to_string(),
                topic: "Neural networks".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn failed_start_returns_to_idle_without_retry() {
        let mut session = TestSession::new()
            .with_sdk(MockCallSdk::failing_start("permission denied"))
            .spawn();

        session.handle.dispatch_intent(Intent::StartCall).await.unwrap();

        let error = session.next_error().await;
        assert!(error.contains("permission denied"), "got {error}");
        let state = session.wait_for(|s| s.call == CallState::Idle).await;
        assert!(state.last_error.is_some());

        session.settle().await;
        let starts = session
            .sdk
            .recorded_calls()
            .iter()
            .filter(|c| matches!(c, SdkCall::Start { .. }))
            .count();
        assert_eq!(starts, 1);
    }

    #[tokio::test]
    async fn user_end_stops_once_and_records_history_once() {
        let session = TestSession::new().spawn();
        connect(&session).await;

        session.handle.dispatch_intent(Intent::EndCall).await.unwrap();
        session.wait_for(|s| s.call == CallState::Finished).await;
        // The SDK still reports the hangup afterwards
        session
            .handle
            .handle_event(wire(json!({ "type": "call-end" })))
            .await
            .unwrap();
        session.wait_for_history(1).await;
        session.settle().await;

        assert_eq!(session.sdk.stop_count(), 1);
        assert_eq!(
            session.history.rows(),
            vec![("companion-1".to_string(), "user-1".to_string())]
        );
    }

    #[tokio::test]
    async fn remote_hangup_records_history() {
        let session = TestSession::new().spawn();
        connect(&session).await;

        session
            .handle
            .handle_event(wire(json!({ "type": "call-end" })))
            .await
            .unwrap();

        session.wait_for(|s| s.call == CallState::Finished).await;
        session.wait_for_history(1).await;
        assert_eq!(session.sdk.stop_count(), 0);
    }

    #[tokio::test]
    async fn end_while_connecting_stops_after_start() {
        let session = TestSession::new().spawn();

        // Queued back-to-back before the runtime gets a turn
        session.handle.dispatch_intent(Intent::StartCall).await.unwrap();
        session.handle.dispatch_intent(Intent::EndCall).await.unwrap();

        session.wait_for(|s| s.call == CallState::Finished).await;
        session.settle().await;

        let calls = session.sdk.recorded_calls();
        assert!(
            matches!(calls.as_slice(), [SdkCall::Start { .. }, SdkCall::Stop]),
            "got {calls:?}"
        );
        assert!(session.history.rows().is_empty());
    }

    #[tokio::test]
    async fn late_call_start_after_cancel_is_ignored() {
        let session = TestSession::new().spawn();

        session.handle.dispatch_intent(Intent::StartCall).await.unwrap();
        session.handle.dispatch_intent(Intent::EndCall).await.unwrap();
        session.wait_for(|s| s.call == CallState::Finished).await;

        session
            .handle
            .handle_event(wire(json!({ "type": "call-start" })))
            .await
            .unwrap();
        session.settle().await;

        assert_eq!(session.handle.state().call, CallState::Finished);
        assert_eq!(session.sdk.stop_count(), 1);
    }

    #[tokio::test]
    async fn history_failure_keeps_call_finished() {
        let session = TestSession::new()
            .with_history(InMemoryHistory::failing())
            .spawn();
        connect(&session).await;

        session.handle.dispatch_intent(Intent::EndCall).await.unwrap();
        session.settle().await;

        assert_eq!(session.handle.state().call, CallState::Finished);
    }

    #[tokio::test]
    async fn transcript_messages_build_the_log() {
        let session = TestSession::new().spawn();
        connect(&session).await;

        for (text, kind) in [("Hel", "partial"), ("Hello", "partial"), ("Hello there", "final")] {
            session
                .handle
                .handle_event(wire(json!({
                    "type": "message",
                    "message": {
                        "type": "transcript",
                        "role": "assistant",
                        "transcript": text,
                        "transcriptType": kind,
                    }
                })))
                .await
                .unwrap();
        }

        let state = session
            .wait_for(|s| s.transcript.head().is_some_and(|m| m.content == "Hello there"))
            .await;
        assert_eq!(state.transcript.len(), 1);

        let view = session.handle.view();
        assert_eq!(view.transcript[0].speaker, "Neura");
    }

    #[tokio::test]
    async fn toggle_mic_flips_after_request() {
        let session = TestSession::new().spawn();
        connect(&session).await;

        session.handle.dispatch_intent(Intent::ToggleMic).await.unwrap();
        session.wait_for(|s| s.muted).await;
        session.handle.dispatch_intent(Intent::ToggleMic).await.unwrap();
        session.wait_for(|s| !s.muted).await;

        let mutes: Vec<_> = session
            .sdk
            .recorded_calls()
            .into_iter()
            .filter(|c| matches!(c, SdkCall::SetMuted(_)))
            .collect();
        assert_eq!(mutes, vec![SdkCall::SetMuted(true), SdkCall::SetMuted(false)]);
    }

    #[tokio::test]
    async fn failed_mute_request_leaves_flag() {
        let mut session = TestSession::new()
            .with_sdk(MockCallSdk::failing_mute())
            .spawn();
        connect(&session).await;

        session.handle.dispatch_intent(Intent::ToggleMic).await.unwrap();

        let error = session.next_error().await;
        assert!(error.contains("microphone"), "got {error}");
        assert!(!session.handle.state().muted);
    }

    #[tokio::test]
    async fn duplicate_start_is_reported() {
        let mut session = TestSession::new().spawn();
        connect(&session).await;

        session.handle.dispatch_intent(Intent::StartCall).await.unwrap();

        assert_eq!(session.next_error().await, "A call is already in progress");
        assert_eq!(session.handle.state().call, CallState::Active);
    }

    #[tokio::test]
    async fn unmount_ends_active_call() {
        let session = TestSession::new().spawn();
        connect(&session).await;

        session.handle.close();
        session.wait_for_history(1).await;

        assert!(session.handle.is_closed());
        assert_eq!(session.sdk.stop_count(), 1);
        session.settle().await;
        assert_eq!(
            session.handle.dispatch_intent(Intent::StartCall).await,
            Err(crate::runtime::SessionError::Closed)
        );
    }

    #[tokio::test]
    async fn unmount_while_idle_issues_nothing() {
        let session = TestSession::new().spawn();

        session.handle.close();
        session.settle().await;

        assert!(session.sdk.recorded_calls().is_empty());
        assert!(session.history.rows().is_empty());
    }
}
