//! Events that can occur in a conversation

use crate::ai::DocumentHandle;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Inbound message events (classified by the dispatcher)
    /// `/start` command received
    StartCommand,
    /// A PDF document arrived (mime type already checked)
    DocumentReceived { file_id: String, file_name: String },
    /// Free text arrived
    TextReceived { text: String },
    /// Any message shape with no handler
    Unmatched,

    // AI interaction results (fed back by the runtime)
    /// Download, upload and summarization completed
    DocumentIngested {
        handle: DocumentHandle,
        summary: String,
    },
    /// The AI service answered a question
    QuestionAnswered { answer: String },
    /// Download/upload/summarization failed; details already logged
    IngestFailed,
    /// Question answering failed; details already logged
    AnswerFailed,
}
