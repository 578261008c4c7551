//! Voice assistant configuration handed to the call SDK
//!
//! Builds the `start(assistant, overrides)` arguments for a tutoring call.
//! The prompt uses `{{subject}}`, `{{topic}}` and `{{style}}` placeholders
//! that the SDK fills from the overrides' variable values.

use crate::state_machine::SessionContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Voice id used when the (voice, style) pair is not in the table
pub const DEFAULT_VOICE_ID: &str = "sarah";

/// Voice ids keyed by (voice, style)
const VOICES: &[(&str, &str, &str)] = &[
    ("male", "casual", "2BJW5coyhAzSr8STdHbE"),
    ("male", "formal", "c6SfcYrb2t09NHXiT80T"),
    ("female", "casual", "ZIlrSGI4jZqobxRKprJz"),
    ("female", "formal", "sarah"),
];

const FIRST_MESSAGE: &str =
    "Hello, let's start the session. Today we'll be talking about {{topic}}.";

const TUTOR_PROMPT: &str = r"You are a highly knowledgeable tutor teaching a real-time voice session with a student. Your goal is to teach the student about the topic and subject.

Tutor Guidelines:
Stick to the given topic - {{ topic }} and subject - {{ subject }} and teach the student about it.
Keep the conversation flowing smoothly while maintaining control.
From time to time make sure that the student is following you and understands you.
Break down the topic into smaller parts and teach the student one part at a time.
Keep your style of conversation {{ style }}.
Keep your responses short, like in a real voice conversation.
Do not include any special characters in your responses - this is a voice conversation.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriberConfig {
    pub provider: String,
    pub model: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub provider: String,
    pub voice_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub speed: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub messages: Vec<PromptMessage>,
}

/// Assistant definition passed as the first `start` argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    pub name: String,
    pub first_message: String,
    pub transcriber: TranscriberConfig,
    pub voice: VoiceConfig,
    pub model: ModelConfig,
    pub client_messages: Vec<String>,
    pub server_messages: Vec<String>,
}

/// Per-call overrides passed as the second `start` argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantOverrides {
    pub variable_values: BTreeMap<String, String>,
    pub client_messages: Vec<String>,
    pub server_messages: Vec<String>,
}

/// Look up the SDK voice id for a voice/style pair
pub fn voice_id(voice: &str, style: &str) -> &'static str {
    let voice = voice.trim().to_lowercase();
    let style = style.trim().to_lowercase();
    VOICES
        .iter()
        .find(|(v, s, _)| *v == voice && *s == style)
        .map_or(DEFAULT_VOICE_ID, |(_, _, id)| id)
}

pub fn configure_assistant(voice: &str, style: &str) -> AssistantConfig {
    AssistantConfig {
        name: "Companion".to_string(),
        first_message: FIRST_MESSAGE.to_string(),
        transcriber: TranscriberConfig {
            provider: "deepgram".to_string(),
            model: "nova-3".to_string(),
            language: "en".to_string(),
        },
        voice: VoiceConfig {
            provider: "11labs".to_string(),
            voice_id: voice_id(voice, style).to_string(),
            stability: 0.4,
            similarity_boost: 0.8,
            speed: 1.0,
            style: 0.5,
            use_speaker_boost: true,
        },
        model: ModelConfig {
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            messages: vec![PromptMessage {
                role: "system".to_string(),
                content: TUTOR_PROMPT.to_string(),
            }],
        },
        client_messages: Vec::new(),
        server_messages: Vec::new(),
    }
}

/// Overrides carrying the session's subject, topic and style.
/// Only transcript messages are requested from the SDK.
pub fn assistant_overrides(context: &SessionContext) -> AssistantOverrides {
    let variable_values = BTreeMap::from([
        ("subject".to_string(), context.subject.clone()),
        ("topic".to_string(), context.topic.clone()),
        ("style".to_string(), context.style.clone()),
    ]);

    AssistantOverrides {
        variable_values,
        client_messages: vec!["transcript".to_string()],
        server_messages: Vec::new(),
    }
}
