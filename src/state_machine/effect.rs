//! Effects produced by state transitions

use crate::assistant::{assistant_overrides, configure_assistant, AssistantConfig, AssistantOverrides};
use crate::state_machine::state::SessionContext;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the call SDK to start a call (does not wait for confirmation)
    StartCall {
        assistant: Box<AssistantConfig>,
        overrides: AssistantOverrides,
    },

    /// Ask the call SDK to stop the call
    StopCall,

    /// Flip the SDK mute state; the runtime reports back what it issued
    ToggleMute,

    /// Record the finished session in history (fire-and-forget)
    PersistSession,

    /// Log and surface an error
    ReportError { message: String },
}

impl Effect {
    pub fn start_call(context: &SessionContext) -> Self {
        Effect::StartCall {
            assistant: Box::new(configure_assistant(&context.voice, &context.style)),
            overrides: assistant_overrides(context),
        }
    }

    pub fn report_error(message: impl Into<String>) -> Self {
        Effect::ReportError {
            message: message.into(),
        }
    }
}
