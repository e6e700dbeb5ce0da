//! Conversation state types

use crate::ai::DocumentHandle;
use crate::telegram::ChatId;
use serde::{Deserialize, Serialize};

/// Conversation state
///
/// The handle is a field of `DocumentReady`, so a handle exists exactly when
/// a document is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// No document uploaded yet; waiting for one
    #[default]
    AwaitingDocument,

    /// A document is uploaded; free text is answered against `handle`
    DocumentReady { handle: DocumentHandle },
}

impl ConvState {
    /// Handle of the currently loaded document, if any
    pub fn handle(&self) -> Option<&DocumentHandle> {
        match self {
            ConvState::AwaitingDocument => None,
            ConvState::DocumentReady { handle } => Some(handle),
        }
    }
}

/// What to do with message shapes the bot has no handler for
/// (non-PDF documents, photos, stickers, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedPolicy {
    /// Drop the message without replying
    #[default]
    Ignore,
    /// Reply with a short usage hint
    Hint,
}

/// Context for a conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub chat_id: ChatId,
    pub unmatched_policy: UnmatchedPolicy,
}

impl ConvContext {
    pub fn new(chat_id: ChatId, unmatched_policy: UnmatchedPolicy) -> Self {
        Self {
            chat_id,
            unmatched_policy,
        }
    }
}
