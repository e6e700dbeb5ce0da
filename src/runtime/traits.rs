//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::ai::{AiError, DocumentAi, DocumentHandle};
use crate::state_machine::ConvState;
use crate::store::ConversationStore;
use crate::telegram::{ChatError, ChatId, TelegramApi};
use async_trait::async_trait;
use std::sync::Arc;

/// Chat platform operations the runtime needs
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send a plain-text message to a conversation
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), ChatError>;

    /// Download the raw bytes of a platform-hosted file
    async fn download_document(&self, file_id: &str) -> Result<Vec<u8>, ChatError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatApi + ?Sized> ChatApi for Arc<T> {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), ChatError> {
        (**self).send_text(chat_id, text).await
    }

    async fn download_document(&self, file_id: &str) -> Result<Vec<u8>, ChatError> {
        (**self).download_document(file_id).await
    }
}

#[async_trait]
impl<T: DocumentAi + ?Sized> DocumentAi for Arc<T> {
    async fn upload_document(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
    ) -> Result<DocumentHandle, AiError> {
        (**self).upload_document(bytes, display_name).await
    }

    async fn summarize(&self, handle: &DocumentHandle) -> Result<String, AiError> {
        (**self).summarize(handle).await
    }

    async fn answer_question(
        &self,
        handle: &DocumentHandle,
        question: &str,
    ) -> Result<String, AiError> {
        (**self).answer_question(handle, question).await
    }
}

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn get(&self, id: ChatId) -> ConvState {
        (**self).get(id).await
    }

    async fn set(&self, id: ChatId, state: ConvState) {
        (**self).set(id, state).await;
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

#[async_trait]
impl ChatApi for TelegramApi {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), ChatError> {
        self.send_message(chat_id, text).await
    }

    async fn download_document(&self, file_id: &str) -> Result<Vec<u8>, ChatError> {
        self.download_document(file_id).await
    }
}
