//! Events that drive a call session

use crate::transcript::{Role, TranscriptEvent, TranscriptKind};
use serde::{Deserialize, Serialize};

/// User intents forwarded by the session view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    StartCall,
    EndCall,
    ToggleMic,
}

/// Lifecycle and transcript events reported by the call SDK
#[derive(Debug, Clone, PartialEq)]
pub enum SdkEvent {
    CallStarted,
    CallEnded,
    Transcript(TranscriptEvent),
    SpeechStarted,
    SpeechEnded,
    Error { message: String, fatal: bool },
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Intent(Intent),
    Sdk(SdkEvent),

    // Runtime feedback
    /// Issuing the start request to the SDK failed
    StartFailed { message: String },
    /// A mute request was issued to the SDK
    MuteApplied { muted: bool },
}

impl Event {
    /// User intents are rejected loudly; SDK events and runtime feedback
    /// can arrive late, after the state has moved on
    pub fn is_intent(&self) -> bool {
        matches!(self, Event::Intent(_))
    }
}

impl From<Intent> for Event {
    fn from(intent: Intent) -> Self {
        Event::Intent(intent)
    }
}

impl From<SdkEvent> for Event {
    fn from(event: SdkEvent) -> Self {
        Event::Sdk(event)
    }
}

// ============================================================================
// SDK wire format
// ============================================================================

/// An event as emitted by the vendor voice SDK in the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SdkWireEvent {
    CallStart,
    CallEnd,
    SpeechStart,
    SpeechEnd,
    Message {
        message: SdkMessage,
    },
    Error {
        #[serde(default)]
        message: String,
        #[serde(default)]
        fatal: bool,
    },
}

/// Payload of an SDK `message` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SdkMessage {
    #[serde(rename_all = "camelCase")]
    Transcript {
        role: Role,
        transcript: String,
        transcript_type: TranscriptKind,
    },
    /// Function calls, status updates and the like
    #[serde(other)]
    Other,
}

impl SdkWireEvent {
    /// Convert to a state machine event; `None` for messages this core ignores
    pub fn into_sdk_event(self) -> Option<SdkEvent> {
        match self {
            SdkWireEvent::CallStart => Some(SdkEvent::CallStarted),
            SdkWireEvent::CallEnd => Some(SdkEvent::CallEnded),
            SdkWireEvent::SpeechStart => Some(SdkEvent::SpeechStarted),
            SdkWireEvent::SpeechEnd => Some(SdkEvent::SpeechEnded),
            SdkWireEvent::Error { message, fatal } => Some(SdkEvent::Error { message, fatal }),
            SdkWireEvent::Message {
                message:
                    SdkMessage::Transcript {
                        role,
                        transcript,
                        transcript_type,
                    },
            } => Some(SdkEvent::Transcript(match transcript_type {
                TranscriptKind::Partial => TranscriptEvent::partial(role, transcript),
                TranscriptKind::Final => TranscriptEvent::final_text(role, transcript),
            })),
            SdkWireEvent::Message {
                message: SdkMessage::Other,
            } => None,
        }
    }
}
