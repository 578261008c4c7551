//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::test_context;
use super::*;
use crate::transcript::{Role, TranscriptEvent};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_call_state() -> impl Strategy<Value = CallState> {
    prop_oneof![
        Just(CallState::Idle),
        Just(CallState::Connecting),
        Just(CallState::Active),
        Just(CallState::Finished),
    ]
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Assistant), Just(Role::User)]
}

fn arb_transcript_event() -> impl Strategy<Value = TranscriptEvent> {
    (arb_role(), "[a-z ]{0,10}", any::<bool>()).prop_map(|(role, text, is_final)| {
        TranscriptEvent {
            role,
            text,
            is_final,
        }
    })
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    (
        arb_call_state(),
        any::<bool>(),
        any::<bool>(),
        proptest::collection::vec(arb_transcript_event(), 0..8),
    )
        .prop_map(|(call, muted, speaking, events)| SessionState {
            call,
            muted,
            speaking,
            transcript: events.into_iter().collect(),
            last_error: None,
        })
}

fn arb_intent() -> impl Strategy<Value = Intent> {
    prop_oneof![
        Just(Intent::StartCall),
        Just(Intent::EndCall),
        Just(Intent::ToggleMic),
    ]
}

fn arb_sdk_event() -> impl Strategy<Value = SdkEvent> {
    prop_oneof![
        Just(SdkEvent::CallStarted),
        Just(SdkEvent::CallEnded),
        Just(SdkEvent::SpeechStarted),
        Just(SdkEvent::SpeechEnded),
        arb_transcript_event().prop_map(SdkEvent::Transcript),
        ("[a-z ]{1,20}", any::<bool>())
            .prop_map(|(message, fatal)| SdkEvent::Error { message, fatal }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_intent().prop_map(Event::Intent),
        arb_sdk_event().prop_map(Event::Sdk),
        "[a-z ]{1,20}".prop_map(|message| Event::StartFailed { message }),
        any::<bool>().prop_map(|muted| Event::MuteApplied { muted }),
    ]
}

/// Run a sequence, skipping rejected events the way the runtime does
fn run(events: Vec<Event>) -> (SessionState, Vec<Effect>) {
    let ctx = test_context();
    let mut state = SessionState::new();
    let mut effects = Vec::new();
    for event in events {
        if let Ok(result) = transition(&state, &ctx, event) {
            state = result.new_state;
            effects.extend(result.effects);
        }
    }
    (state, effects)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn start_always_clears_transcript(state in arb_state()) {
        prop_assume!(matches!(state.call, CallState::Idle | CallState::Finished));
        let result = transition(&state, &test_context(), Event::Intent(Intent::StartCall)).unwrap();
        prop_assert_eq!(result.new_state.call, CallState::Connecting);
        prop_assert!(result.new_state.transcript.is_empty());
    }

    #[test]
    fn toggle_outside_active_is_noop(state in arb_state()) {
        prop_assume!(state.call != CallState::Active);
        let result = transition(&state, &test_context(), Event::Intent(Intent::ToggleMic)).unwrap();
        prop_assert!(result.effects.is_empty());
        prop_assert_eq!(result.new_state, state);
    }

    #[test]
    fn user_end_from_active_stops_and_persists_exactly_once(state in arb_state()) {
        let state = SessionState { call: CallState::Active, ..state };
        let result = transition(&state, &test_context(), Event::Intent(Intent::EndCall)).unwrap();
        prop_assert_eq!(result.new_state.call, CallState::Finished);
        let stops = result.effects.iter().filter(|e| **e == Effect::StopCall).count();
        let persists = result.effects.iter().filter(|e| **e == Effect::PersistSession).count();
        prop_assert_eq!(stops, 1);
        prop_assert_eq!(persists, 1);
    }

    #[test]
    fn failed_start_ends_idle(message in "[a-z ]{1,20}") {
        let (state, _) = run(vec![
            Event::Intent(Intent::StartCall),
            Event::StartFailed { message },
        ]);
        prop_assert_eq!(state.call, CallState::Idle);
    }

    #[test]
    fn transcript_and_speech_never_change_call_state(
        state in arb_state(),
        event in prop_oneof![
            arb_transcript_event().prop_map(SdkEvent::Transcript),
            Just(SdkEvent::SpeechStarted),
            Just(SdkEvent::SpeechEnded),
        ],
    ) {
        let result = transition(&state, &test_context(), Event::Sdk(event)).unwrap();
        prop_assert_eq!(result.new_state.call, state.call);
        prop_assert!(result.effects.is_empty());
    }

    #[test]
    fn mute_only_changes_through_mute_applied(events in proptest::collection::vec(arb_event(), 0..40)) {
        let ctx = test_context();
        let mut state = SessionState::new();
        for event in events {
            let is_mute_feedback = matches!(event, Event::MuteApplied { .. });
            let is_start = event == Event::Intent(Intent::StartCall);
            let before = state.muted;
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
            }
            if !is_mute_feedback && !is_start {
                prop_assert_eq!(state.muted, before);
            }
        }
    }

    #[test]
    fn history_persisted_at_most_once_per_start(events in proptest::collection::vec(arb_event(), 0..60)) {
        let (_, effects) = run(events);
        let starts = effects.iter().filter(|e| matches!(e, Effect::StartCall { .. })).count();
        let persists = effects.iter().filter(|e| **e == Effect::PersistSession).count();
        prop_assert!(persists <= starts, "persists={} starts={}", persists, starts);
    }

    #[test]
    fn persist_only_follows_active(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, &test_context(), event) {
            if result.effects.contains(&Effect::PersistSession) {
                prop_assert_eq!(state.call, CallState::Active);
                prop_assert_eq!(result.new_state.call, CallState::Finished);
            }
        }
    }
}
