//! Effects produced by state transitions

use crate::ai::DocumentHandle;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a plain-text reply to the conversation
    Reply { text: String },

    /// Download a document from the chat platform, upload it to the AI
    /// service and request a summary
    IngestDocument { file_id: String, file_name: String },

    /// Ask the AI service a question about the current document
    AnswerQuestion {
        handle: DocumentHandle,
        question: String,
    },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply { text: text.into() }
    }
}
