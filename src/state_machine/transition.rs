//! Pure state transition function
//!
//! Given the current state and an event, produces the next state plus the
//! effects to execute. No I/O happens here; the runtime executes effects and
//! feeds their results back in as events.

use super::state::UnmatchedPolicy;
use super::{ConvContext, ConvState, Effect, Event};

pub const GREETING: &str =
    "Send me a PDF document and I will summarize it. Afterwards you can ask me questions about it.";
pub const INVITE_QUESTIONS: &str = "Now you can ask me anything about the document.";
pub const ASK_FOR_DOCUMENT: &str = "Please send a PDF document.";
pub const INGEST_FAILED: &str =
    "Sorry, something went wrong while processing your document. Please try sending it again.";
pub const ANSWER_FAILED: &str = "Sorry, I could not answer that. Please try again.";
pub const UNMATCHED_HINT: &str =
    "I only understand PDF documents and text messages. Send /start for instructions.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
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

/// Pure transition function
///
/// Total over all (state, event) pairs: every combination maps to a result,
/// so the caller never sees a rejected event.
pub fn transition(state: &ConvState, context: &ConvContext, event: Event) -> TransitionResult {
    match (state, event) {
        // /start resets any conversation and repeats the instructions
        (_, Event::StartCommand) => TransitionResult::new(ConvState::AwaitingDocument)
            .with_effect(Effect::reply(GREETING)),

        // A PDF arrived: hand it to the runtime for download, upload and
        // summarization. State only changes once the result comes back, so
        // a failed ingest leaves any previous document usable.
        (_, Event::DocumentReceived { file_id, file_name }) => {
            TransitionResult::new(state.clone())
                .with_effect(Effect::IngestDocument { file_id, file_name })
        }

        // Ingest finished: latest upload wins
        (_, Event::DocumentIngested { handle, summary }) => {
            TransitionResult::new(ConvState::DocumentReady { handle })
                .with_effect(Effect::reply(summary))
                .with_effect(Effect::reply(INVITE_QUESTIONS))
        }

        // Free text before any document: ask for one
        (ConvState::AwaitingDocument, Event::TextReceived { .. }) => {
            TransitionResult::new(ConvState::AwaitingDocument)
                .with_effect(Effect::reply(ASK_FOR_DOCUMENT))
        }

        // Free text with a document loaded: ask the AI service
        (ConvState::DocumentReady { handle }, Event::TextReceived { text }) => {
            TransitionResult::new(state.clone()).with_effect(Effect::AnswerQuestion {
                handle: handle.clone(),
                question: text,
            })
        }

        (_, Event::QuestionAnswered { answer }) => {
            TransitionResult::new(state.clone()).with_effect(Effect::reply(answer))
        }

        (_, Event::IngestFailed) => {
            TransitionResult::new(state.clone()).with_effect(Effect::reply(INGEST_FAILED))
        }

        (_, Event::AnswerFailed) => {
            TransitionResult::new(state.clone()).with_effect(Effect::reply(ANSWER_FAILED))
        }

        (_, Event::Unmatched) => {
            let result = TransitionResult::new(state.clone());
            match context.unmatched_policy {
                UnmatchedPolicy::Ignore => result,
                UnmatchedPolicy::Hint => result.with_effect(Effect::reply(UNMATCHED_HINT)),
            }
        }
    }
}
