//! AI document service abstraction
//!
//! Provides a common interface for uploading documents to a generative-AI
//! service and running inference against them.

mod error;
mod gemini;

pub use error::{AiError, AiErrorKind, AiOp};
pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Opaque reference to a document previously uploaded to the AI service.
///
/// Only valid for the service that issued it; treated as valid until a
/// request against it fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle {
    /// Service-side resource name (e.g. `files/abc123`)
    pub name: String,
    /// URI used to reference the document in inference requests
    pub uri: String,
}

/// Common interface for AI document services
#[async_trait]
pub trait DocumentAi: Send + Sync {
    /// Upload raw document bytes, returning the handle the service assigns
    async fn upload_document(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
    ) -> Result<DocumentHandle, AiError>;

    /// Produce a point-by-point summary of an uploaded document
    async fn summarize(&self, handle: &DocumentHandle) -> Result<String, AiError>;

    /// Answer a free-form question about an uploaded document
    async fn answer_question(
        &self,
        handle: &DocumentHandle,
        question: &str,
    ) -> Result<String, AiError>;
}

/// Logging wrapper for AI document services
pub struct LoggingAi {
    inner: Arc<dyn DocumentAi>,
}

impl LoggingAi {
    pub fn new(inner: Arc<dyn DocumentAi>) -> Self {
        Self { inner }
    }

    fn log<T>(op: &str, start: std::time::Instant, result: &Result<T, AiError>) {
        let duration = start.elapsed();
        match result {
            Ok(_) => {
                tracing::info!(
                    op = op,
                    duration_ms = %duration.as_millis(),
                    "AI request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    op = op,
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "AI request failed"
                );
            }
        }
    }
}

#[async_trait]
impl DocumentAi for LoggingAi {
    async fn upload_document(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
    ) -> Result<DocumentHandle, AiError> {
        let start = std::time::Instant::now();
        let result = self.inner.upload_document(bytes, display_name).await;
        Self::log("upload_document", start, &result);
        result
    }

    async fn summarize(&self, handle: &DocumentHandle) -> Result<String, AiError> {
        let start = std::time::Instant::now();
        let result = self.inner.summarize(handle).await;
        Self::log("summarize", start, &result);
        result
    }

    async fn answer_question(
        &self,
        handle: &DocumentHandle,
        question: &str,
    ) -> Result<String, AiError> {
        let start = std::time::Instant::now();
        let result = self.inner.answer_question(handle, question).await;
        Self::log("answer_question", start, &result);
        result
    }
}
