//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects; all I/O is expressed as effects for the runtime.

use super::{CallState, Effect, Event, Intent, SdkEvent, SessionContext, SessionState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A call is already in progress")]
    CallInProgress,
    #[error("There is no call to end")]
    NoActiveCall,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state.call, event) {
        // ============================================================
        // Starting a call
        // ============================================================
        (CallState::Idle | CallState::Finished, Event::Intent(Intent::StartCall)) => {
            let mut next = state.clone();
            next.call = CallState::Connecting;
            next.transcript.clear();
            next.muted = false;
            next.last_error = None;
            Ok(TransitionResult::new(next).with_effect(Effect::start_call(context)))
        }

        (CallState::Connecting | CallState::Active, Event::Intent(Intent::StartCall)) => {
            Err(TransitionError::CallInProgress)
        }

        (CallState::Connecting, Event::Sdk(SdkEvent::CallStarted)) => {
            Ok(TransitionResult::new(state.clone().with_call(CallState::Active)))
        }

        (CallState::Connecting, Event::StartFailed { message }) => {
            let mut next = state.clone().with_call(CallState::Idle);
            next.last_error = Some(format!("Failed to start call: {message}"));
            Ok(TransitionResult::new(next)
                .with_effect(Effect::report_error(format!("Failed to start call: {message}"))))
        }

        // ============================================================
        // Ending a call
        // ============================================================

        // User hangs up: stop immediately, no confirmation needed
        (CallState::Active, Event::Intent(Intent::EndCall)) => {
            Ok(TransitionResult::new(state.clone().with_call(CallState::Finished))
                .with_effect(Effect::StopCall)
                .with_effect(Effect::PersistSession))
        }

        // Cancel while connecting: nothing happened worth recording
        (CallState::Connecting, Event::Intent(Intent::EndCall)) => {
            Ok(TransitionResult::new(state.clone().with_call(CallState::Finished))
                .with_effect(Effect::StopCall))
        }

        (CallState::Idle | CallState::Finished, Event::Intent(Intent::EndCall)) => {
            Err(TransitionError::NoActiveCall)
        }

        // Remote hangup
        (CallState::Active, Event::Sdk(SdkEvent::CallEnded)) => {
            Ok(TransitionResult::new(state.clone().with_call(CallState::Finished))
                .with_effect(Effect::PersistSession))
        }

        (CallState::Connecting, Event::Sdk(SdkEvent::CallEnded)) => {
            Ok(TransitionResult::new(state.clone().with_call(CallState::Finished)))
        }

        // ============================================================
        // SDK errors
        // ============================================================
        (CallState::Active, Event::Sdk(SdkEvent::Error { message, fatal: true })) => {
            let mut next = state.clone().with_call(CallState::Finished);
            next.last_error = Some(message.clone());
            Ok(TransitionResult::new(next)
                .with_effect(Effect::report_error(message))
                .with_effect(Effect::PersistSession))
        }

        (CallState::Connecting, Event::Sdk(SdkEvent::Error { message, fatal: true })) => {
            let mut next = state.clone().with_call(CallState::Finished);
            next.last_error = Some(message.clone());
            Ok(TransitionResult::new(next).with_effect(Effect::report_error(message)))
        }

        // Non-fatal, or nothing in progress: report only
        (_, Event::Sdk(SdkEvent::Error { message, .. })) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::report_error(message)))
        }

        // ============================================================
        // Microphone
        // ============================================================
        (CallState::Active, Event::Intent(Intent::ToggleMic)) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::ToggleMute))
        }

        // Mic toggle outside an active call is a no-op
        (_, Event::Intent(Intent::ToggleMic)) => Ok(TransitionResult::new(state.clone())),

        (_, Event::MuteApplied { muted }) => {
            let mut next = state.clone();
            next.muted = muted;
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Transcript and speech, independent of call state
        // ============================================================
        (_, Event::Sdk(SdkEvent::Transcript(transcript))) => {
            let mut next = state.clone();
            next.transcript.apply(&transcript);
            Ok(TransitionResult::new(next))
        }

        (_, Event::Sdk(SdkEvent::SpeechStarted)) => {
            let mut next = state.clone();
            next.speaking = true;
            Ok(TransitionResult::new(next))
        }

        (_, Event::Sdk(SdkEvent::SpeechEnded)) => {
            let mut next = state.clone();
            next.speaking = false;
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (call, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {call:?} with event {event:?}"
        ))),
    }
}
