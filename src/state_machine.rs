//! Call session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! The runtime feeds it user intents and call SDK events and executes the
//! effects it returns.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, Intent, SdkEvent, SdkWireEvent};
pub use state::{CallState, SessionContext, SessionState};
pub use transition::{transition, TransitionError};
