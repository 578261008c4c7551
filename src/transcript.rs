//! Transcript reconciliation
//!
//! Folds the stream of partial/final speech-to-text updates coming from the
//! call SDK into a rolling conversation log. The log is stored most-recent
//! first; the view reverses it for display.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Who is speaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
}

/// Whether the SDK has committed the utterance's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    Partial,
    Final,
}

/// A speech-to-text update from the call SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    pub role: Role,
    pub text: String,
    pub is_final: bool,
}

impl TranscriptEvent {
    pub fn partial(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            is_final: true,
        }
    }
}

/// One line of the rolling transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Entry {
    message: Message,
    /// Still being updated by partial transcripts
    live: bool,
}

/// Most-recent-first conversation log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLog {
    entries: VecDeque<Entry>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one transcript event into the log.
    ///
    /// Returns `false` when the event was ignored (blank text).
    pub fn apply(&mut self, event: &TranscriptEvent) -> bool {
        let content = event.text.trim();
        if content.is_empty() {
            return false;
        }

        let message = Message {
            role: event.role,
            content: content.to_string(),
        };

        let head_is_live_same_role = self
            .entries
            .front()
            .is_some_and(|head| head.live && head.message.role == event.role);

        if event.is_final {
            // A final supersedes the live partial it completes
            if head_is_live_same_role {
                self.entries.pop_front();
            }
            self.entries.push_front(Entry {
                message,
                live: false,
            });
        } else if head_is_live_same_role {
            if let Some(head) = self.entries.front_mut() {
                head.message = message;
            }
        } else {
            self.entries.push_front(Entry {
                message,
                live: true,
            });
        }

        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent message
    #[allow(dead_code)] // Used in tests
    pub fn head(&self) -> Option<&Message> {
        self.entries.front().map(|e| &e.message)
    }

    /// Messages oldest first, for rendering
    pub fn chronological(&self) -> Vec<Message> {
        self.entries.iter().rev().map(|e| e.message.clone()).collect()
    }

    /// Whether the message at `index` (storage order) is still partial
    pub fn is_live(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|e| e.live)
    }
}

impl FromIterator<TranscriptEvent> for TranscriptLog {
    fn from_iter<I: IntoIterator<Item = TranscriptEvent>>(iter: I) -> Self {
        let mut log = Self::new();
        for event in iter {
            log.apply(&event);
        }
        log
    }
}
