//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::UnmatchedPolicy;
use super::transition::transition;
use super::{ConvContext, ConvState, Effect, Event};
use crate::ai::DocumentHandle;
use crate::telegram::ChatId;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_handle() -> impl Strategy<Value = DocumentHandle> {
    "[a-z0-9]{6}".prop_map(|id| DocumentHandle {
        name: format!("files/{id}"),
        uri: format!("https://generativelanguage.googleapis.com/v1beta/files/{id}"),
    })
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        Just(ConvState::AwaitingDocument),
        arb_handle().prop_map(|handle| ConvState::DocumentReady { handle }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::StartCommand),
        ("[a-zA-Z0-9]{1,16}", "[a-z]{1,8}\\.pdf").prop_map(|(file_id, file_name)| {
            Event::DocumentReceived { file_id, file_name }
        }),
        "[a-zA-Z0-9 ?]{1,40}".prop_map(|text| Event::TextReceived { text }),
        Just(Event::Unmatched),
        (arb_handle(), "[a-zA-Z0-9 .]{1,40}")
            .prop_map(|(handle, summary)| Event::DocumentIngested { handle, summary }),
        "[a-zA-Z0-9 .]{1,40}".prop_map(|answer| Event::QuestionAnswered { answer }),
        Just(Event::IngestFailed),
        Just(Event::AnswerFailed),
    ]
}

fn arb_policy() -> impl Strategy<Value = UnmatchedPolicy> {
    prop_oneof![Just(UnmatchedPolicy::Ignore), Just(UnmatchedPolicy::Hint)]
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    /// The transition function is total: any (state, event, policy) combination
    /// produces a result without panicking.
    #[test]
    fn transition_is_total(state in arb_state(), event in arb_event(), policy in arb_policy()) {
        let context = ConvContext::new(ChatId(1), policy);
        let _ = transition(&state, &context, event);
    }

    /// Only a start command or a completed ingest may change the state.
    #[test]
    fn only_start_and_ingest_change_state(
        state in arb_state(),
        event in arb_event(),
        policy in arb_policy(),
    ) {
        let context = ConvContext::new(ChatId(1), policy);
        let structural = matches!(
            event,
            Event::StartCommand | Event::DocumentIngested { .. }
        );
        let result = transition(&state, &context, event);
        if !structural {
            prop_assert_eq!(result.new_state, state);
        }
    }

    /// A completed ingest always ends in `DocumentReady` holding exactly the
    /// ingested handle.
    #[test]
    fn ingest_stores_the_ingested_handle(
        state in arb_state(),
        handle in arb_handle(),
        summary in "[a-zA-Z0-9 .]{1,40}",
    ) {
        let context = ConvContext::new(ChatId(1), UnmatchedPolicy::Ignore);
        let result = transition(
            &state,
            &context,
            Event::DocumentIngested { handle: handle.clone(), summary },
        );
        prop_assert_eq!(result.new_state, ConvState::DocumentReady { handle });
    }

    /// Every question effect carries the handle currently stored in the state.
    #[test]
    fn questions_reference_the_stored_handle(
        handle in arb_handle(),
        text in "[a-zA-Z0-9 ?]{1,40}",
    ) {
        let context = ConvContext::new(ChatId(1), UnmatchedPolicy::Ignore);
        let state = ConvState::DocumentReady { handle: handle.clone() };
        let result = transition(&state, &context, Event::TextReceived { text: text.clone() });
        prop_assert_eq!(
            result.effects,
            vec![Effect::AnswerQuestion { handle, question: text }]
        );
    }

    /// Under the ignore policy, unmatched messages produce no effects at all.
    #[test]
    fn unmatched_is_silent_when_ignored(state in arb_state()) {
        let context = ConvContext::new(ChatId(1), UnmatchedPolicy::Ignore);
        let result = transition(&state, &context, Event::Unmatched);
        prop_assert!(result.effects.is_empty());
    }
}
