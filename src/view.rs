//! Session view model
//!
//! A pure function from session state to what the page renders. Intents
//! flow back through the API as `Intent` values; nothing here mutates.

use crate::state_machine::{CallState, Intent, SessionContext, SessionState};
use crate::transcript::Role;
use serde::Serialize;

/// Accent colours per subject, used for the avatar and badges
const SUBJECT_COLORS: &[(&str, &str)] = &[
    ("science", "#E5D0FF"),
    ("maths", "#FFDA6E"),
    ("language", "#BDE7FF"),
    ("coding", "#FFC8E4"),
    ("history", "#FFECC8"),
    ("economics", "#C8FFDF"),
];

const FALLBACK_COLOR: &str = "#E5E7EB";

pub fn subject_color(subject: &str) -> &'static str {
    let subject = subject.trim().to_lowercase();
    SUBJECT_COLORS
        .iter()
        .find(|(name, _)| *name == subject)
        .map_or(FALLBACK_COLOR, |(_, color)| color)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Neutral,
    Pending,
    Live,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: &'static str,
    pub tone: StatusTone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AvatarAnimation {
    /// Subject icon, no call
    Static,
    /// Waiting for the call to connect
    Pulsing,
    /// Soundwave animation; plays while someone is speaking
    Soundwaves { playing: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallControl {
    pub label: &'static str,
    /// What pressing the control dispatches
    pub intent: Option<Intent>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MicControl {
    pub label: &'static str,
    pub muted: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptLine {
    pub role: Role,
    pub speaker: String,
    pub content: String,
    /// Still being transcribed
    pub partial: bool,
}

/// Everything the session page needs to render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub call_state: CallState,
    pub status: StatusBadge,
    pub avatar: AvatarAnimation,
    pub accent_color: &'static str,
    pub call_control: CallControl,
    pub mic_control: MicControl,
    pub live: bool,
    /// Oldest first
    pub transcript: Vec<TranscriptLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typing_indicator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn render(context: &SessionContext, state: &SessionState) -> SessionView {
    let call = state.call;
    let active = call == CallState::Active;
    let companion = context.companion_first_name();

    let status = match call {
        CallState::Idle => StatusBadge {
            label: "Offline",
            tone: StatusTone::Neutral,
        },
        CallState::Connecting => StatusBadge {
            label: "Connecting",
            tone: StatusTone::Pending,
        },
        CallState::Active => StatusBadge {
            label: "Active",
            tone: StatusTone::Live,
        },
        CallState::Finished => StatusBadge {
            label: "Ended",
            tone: StatusTone::Ended,
        },
    };

    let avatar = match call {
        CallState::Idle | CallState::Finished => AvatarAnimation::Static,
        CallState::Connecting => AvatarAnimation::Pulsing,
        CallState::Active => AvatarAnimation::Soundwaves {
            playing: state.speaking,
        },
    };

    let call_control = match call {
        CallState::Idle => CallControl {
            label: "Start Learning",
            intent: Some(Intent::StartCall),
            enabled: true,
        },
        CallState::Connecting => CallControl {
            label: "Connecting...",
            intent: None,
            enabled: false,
        },
        CallState::Active => CallControl {
            label: "End Session",
            intent: Some(Intent::EndCall),
            enabled: true,
        },
        CallState::Finished => CallControl {
            label: "Start New Session",
            intent: Some(Intent::StartCall),
            enabled: true,
        },
    };

    let mic_control = MicControl {
        label: if state.muted { "Mic Off" } else { "Mic On" },
        muted: state.muted,
        enabled: active,
    };

    let stored = state.transcript.len();
    let transcript: Vec<TranscriptLine> = state
        .transcript
        .chronological()
        .into_iter()
        .enumerate()
        .map(|(i, message)| TranscriptLine {
            partial: state.transcript.is_live(stored - 1 - i),
            speaker: match message.role {
                Role::Assistant => companion.clone(),
                Role::User => context.user_name.clone(),
            },
            role: message.role,
            content: message.content,
        })
        .collect();

    let placeholder = match (transcript.is_empty(), active) {
        (true, true) => Some("Ready to start learning! Your conversation will appear here..."),
        (true, false) => Some("Start a session to begin chatting"),
        (false, _) => None,
    };

    let typing_indicator = (active && state.speaking).then(|| format!("{companion} is thinking..."));

    SessionView {
        call_state: call,
        status,
        avatar,
        accent_color: subject_color(&context.subject),
        call_control,
        mic_control,
        live: active,
        transcript,
        placeholder,
        typing_indicator,
        error: state.last_error.clone(),
    }
}
