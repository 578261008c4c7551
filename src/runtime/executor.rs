//! Call session runtime executor

use super::traits::{CallSdk, HistoryRecorder};
use super::SseEvent;

use crate::state_machine::{transition, Effect, Event, Intent, SessionContext, SessionState};
use crate::view::render;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Generic session runtime that can work with any call SDK and history store
pub struct CallRuntime<C, H>
where
    C: CallSdk + 'static,
    H: HistoryRecorder + 'static,
{
    context: Arc<SessionContext>,
    state: SessionState,
    sdk: Arc<C>,
    history: Arc<H>,
    event_rx: mpsc::Receiver<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    state_tx: watch::Sender<SessionState>,
    /// Cancelled when the session view unmounts
    cancel: CancellationToken,
}

impl<C, H> CallRuntime<C, H>
where
    C: CallSdk + 'static,
    H: HistoryRecorder + 'static,
{
    pub fn new(
        context: Arc<SessionContext>,
        sdk: C,
        history: H,
        event_rx: mpsc::Receiver<Event>,
        broadcast_tx: broadcast::Sender<SseEvent>,
        state_tx: watch::Sender<SessionState>,
        cancel: CancellationToken,
    ) -> Self {
        let state = state_tx.borrow().clone();
        Self {
            context,
            state,
            sdk: Arc::new(sdk),
            history: Arc::new(history),
            event_rx,
            broadcast_tx,
            state_tx,
            cancel,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    self.shutdown().await;
                    break;
                }

                Some(event) = self.event_rx.recv() => {
                    self.process_event(event).await;
                }

                else => break,
            }
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    /// End any call still in progress when the view goes away
    async fn shutdown(&mut self) {
        if self.state.call.is_in_call() {
            tracing::info!(
                session_id = %self.context.session_id,
                call = self.state.call.as_str(),
                "Unmounting with call in progress, ending it"
            );
            self.process_event(Event::Intent(Intent::EndCall)).await;
        }
    }

    async fn process_event(&mut self, event: Event) {
        // Effects may feed events straight back in
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let is_intent = current_event.is_intent();

            let result = match transition(&self.state, &self.context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    if is_intent {
                        // Rejected intents are user-facing (e.g. "call already in progress")
                        tracing::warn!(session_id = %self.context.session_id, error = %e, "Intent rejected");
                        let _ = self.broadcast_tx.send(SseEvent::Error {
                            message: e.to_string(),
                        });
                    } else {
                        tracing::debug!(session_id = %self.context.session_id, error = %e, "Ignoring stale event");
                    }
                    continue;
                }
            };

            let changed = result.new_state != self.state;
            let old_state = std::mem::replace(&mut self.state, result.new_state);

            if old_state.call != self.state.call {
                tracing::info!(
                    session_id = %self.context.session_id,
                    from = old_state.call.as_str(),
                    to = self.state.call.as_str(),
                    "Call state changed"
                );
            }

            if changed {
                self.publish();
            }

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
        let _ = self.broadcast_tx.send(SseEvent::View {
            view: Box::new(render(&self.context, &self.state)),
        });
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::StartCall {
                assistant,
                overrides,
            } => {
                // Issued inline so a following stop can never overtake it.
                // Confirmation arrives later as an SDK call-start event.
                tracing::info!(session_id = %self.context.session_id, "Requesting call start");
                match self.sdk.start(&assistant, &overrides).await {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::warn!(session_id = %self.context.session_id, error = %e, "Call start failed");
                        Some(Event::StartFailed {
                            message: e.to_string(),
                        })
                    }
                }
            }

            Effect::StopCall => {
                if let Err(e) = self.sdk.stop().await {
                    tracing::error!(session_id = %self.context.session_id, error = %e, "Failed to stop call");
                    let _ = self.broadcast_tx.send(SseEvent::Error {
                        message: format!("Failed to stop call: {e}"),
                    });
                }
                None
            }

            Effect::ToggleMute => {
                let muted = !self.sdk.is_muted();
                match self.sdk.set_muted(muted).await {
                    // Optimistic: the SDK never confirms
                    Ok(()) => Some(Event::MuteApplied { muted }),
                    Err(e) => {
                        tracing::warn!(session_id = %self.context.session_id, error = %e, "Failed to toggle microphone");
                        let _ = self.broadcast_tx.send(SseEvent::Error {
                            message: format!("Failed to toggle microphone: {e}"),
                        });
                        None
                    }
                }
            }

            Effect::PersistSession => {
                let history = self.history.clone();
                let companion_id = self.context.companion_id.clone();
                let user_id = self.context.user_id.clone();

                tokio::spawn(async move {
                    match history.record_session(&companion_id, &user_id).await {
                        Ok(()) => {
                            tracing::info!(companion_id = %companion_id, user_id = %user_id, "Recorded session history");
                        }
                        Err(e) => {
                            tracing::error!(
                                companion_id = %companion_id,
                                user_id = %user_id,
                                error = %e,
                                "Failed to record session history"
                            );
                        }
                    }
                });
                None
            }

            Effect::ReportError { message } => {
                tracing::error!(session_id = %self.context.session_id, error = %message, "Call error");
                let _ = self.broadcast_tx.send(SseEvent::Error { message });
                None
            }
        }
    }
}
