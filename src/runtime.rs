//! Runtime for live call sessions
//!
//! Each mounted session view gets one `CallRuntime` task that owns the
//! session state. Handlers talk to it through a `SessionHandle`.

mod bridge;
mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use bridge::{ClientBridgeSdk, SdkCommand};
pub use executor::CallRuntime;
pub use traits::*;

use crate::db::Database;
use crate::state_machine::{Event, Intent, SdkWireEvent, SessionContext, SessionState};
use crate::view::{render, SessionView};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio_util::sync::CancellationToken;

/// Events sent to SSE clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SseEvent {
    Init { view: Box<SessionView> },
    View { view: Box<SessionView> },
    /// Instruction for the browser hosting the vendor call SDK
    SdkCommand { command: SdkCommand },
    Error { message: String },
}

impl SseEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SseEvent::Init { .. } => "init",
            SseEvent::View { .. } => "view",
            SseEvent::SdkCommand { .. } => "sdk_command",
            SseEvent::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session runtime has stopped")]
    Closed,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    context: Arc<SessionContext>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    state_rx: watch::Receiver<SessionState>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub async fn dispatch_intent(&self, intent: Intent) -> Result<(), SessionError> {
        self.send(Event::Intent(intent)).await
    }

    /// Forward an event reported by the vendor SDK
    pub async fn handle_event(&self, wire: SdkWireEvent) -> Result<(), SessionError> {
        match wire.into_sdk_event() {
            Some(event) => self.send(Event::Sdk(event)).await,
            None => Ok(()),
        }
    }

    async fn send(&self, event: Event) -> Result<(), SessionError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Latest published state
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    pub fn view(&self) -> SessionView {
        render(&self.context, &self.state_rx.borrow())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SseEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Unmount: stop the runtime, ending any call in progress
    pub fn close(&self) {
        self.cancel.cancel();
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Start a runtime task for `context` and return its handle
pub fn spawn_session<C, H>(
    context: SessionContext,
    sdk: C,
    history: H,
    broadcast_tx: broadcast::Sender<SseEvent>,
) -> SessionHandle
where
    C: CallSdk + 'static,
    H: HistoryRecorder + 'static,
{
    let context = Arc::new(context);
    let (event_tx, event_rx) = mpsc::channel(32);
    let (state_tx, state_rx) = watch::channel(SessionState::new());
    let cancel = CancellationToken::new();

    let runtime = CallRuntime::new(
        context.clone(),
        sdk,
        history,
        event_rx,
        broadcast_tx.clone(),
        state_tx,
        cancel.clone(),
    );

    let session_id = context.session_id.clone();
    tokio::spawn(async move {
        runtime.run().await;
        tracing::info!(session_id = %session_id, "Session runtime finished");
    });

    SessionHandle {
        context,
        event_tx,
        broadcast_tx,
        state_rx,
        cancel,
    }
}

/// Manager for all mounted sessions
pub struct SessionManager {
    db: Database,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Mount a session view, spawning its runtime.
    ///
    /// A user owns at most one mounted view, so any earlier session of the
    /// same user is closed first (ending its call if one is in progress).
    pub async fn open(&self, context: SessionContext) -> SessionHandle {
        let (broadcast_tx, _) = broadcast::channel(128);
        let sdk = ClientBridgeSdk::new(broadcast_tx.clone());
        let history = DatabaseHistory::new(self.db.clone());

        tracing::info!(
            session_id = %context.session_id,
            companion_id = %context.companion_id,
            user_id = %context.user_id,
            "Opening session"
        );

        let session_id = context.session_id.clone();
        let user_id = context.user_id.clone();
        let handle = spawn_session(context, sdk, history, broadcast_tx);

        let mut sessions = self.sessions.write().await;
        sessions.retain(|id, existing| {
            if existing.context.user_id != user_id {
                return true;
            }
            existing.close();
            tracing::info!(session_id = %id, user_id = %user_id, "Replaced by a newer session");
            false
        });
        sessions.insert(session_id, handle.clone());
        handle
    }

    pub async fn get(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Unmount a session. Returns false if it was not open.
    pub async fn close(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id);
        match removed {
            Some(handle) => {
                handle.close();
                tracing::info!(session_id = %session_id, "Closed session");
                true
            }
            None => false,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub async fn open_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
