//! Mock implementations for testing
//!
//! These mocks enable runtime tests without real I/O.

use super::traits::ChatApi;
use crate::ai::{AiError, AiErrorKind, DocumentAi, DocumentHandle};
use crate::telegram::{ChatError, ChatErrorKind, ChatId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

// ============================================================================
// Mock Chat API
// ============================================================================

/// Mock chat API recording sent messages and serving staged downloads
pub struct MockChat {
    sent: Mutex<Vec<(ChatId, String)>>,
    documents: Mutex<HashMap<String, Vec<u8>>>,
}

impl MockChat {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Make a document downloadable under the given file id
    pub fn stage_document(&self, file_id: &str, bytes: Vec<u8>) {
        self.documents
            .lock()
            .unwrap()
            .insert(file_id.to_string(), bytes);
    }

    /// Texts sent to one conversation, in order
    pub fn sent_texts(&self, chat_id: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatApi for MockChat {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn download_document(&self, file_id: &str) -> Result<Vec<u8>, ChatError> {
        self.documents
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| {
                ChatError::new(
                    ChatErrorKind::InvalidRequest,
                    format!("no staged document for {file_id}"),
                )
            })
    }
}

// ============================================================================
// Mock AI Service
// ============================================================================

/// Mock AI service with queued results and recorded calls
pub struct MockAi {
    uploads: Mutex<Vec<(String, usize)>>,
    summarize_calls: Mutex<Vec<DocumentHandle>>,
    answer_calls: Mutex<Vec<(DocumentHandle, String)>>,
    upload_results: Mutex<VecDeque<Result<DocumentHandle, AiError>>>,
    summary_results: Mutex<VecDeque<Result<String, AiError>>>,
    answer_results: Mutex<VecDeque<Result<String, AiError>>>,
}

impl MockAi {
    pub fn new() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            summarize_calls: Mutex::new(Vec::new()),
            answer_calls: Mutex::new(Vec::new()),
            upload_results: Mutex::new(VecDeque::new()),
            summary_results: Mutex::new(VecDeque::new()),
            answer_results: Mutex::new(VecDeque::new()),
        }
    }

    pub fn queue_upload(&self, result: Result<DocumentHandle, AiError>) {
        self.upload_results.lock().unwrap().push_back(result);
    }

    pub fn queue_summary(&self, result: Result<String, AiError>) {
        self.summary_results.lock().unwrap().push_back(result);
    }

    pub fn queue_answer(&self, result: Result<String, AiError>) {
        self.answer_results.lock().unwrap().push_back(result);
    }

    /// Recorded uploads as (display name, byte count)
    pub fn recorded_uploads(&self) -> Vec<(String, usize)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn recorded_summarize_calls(&self) -> Vec<DocumentHandle> {
        self.summarize_calls.lock().unwrap().clone()
    }

    pub fn recorded_answer_calls(&self) -> Vec<(DocumentHandle, String)> {
        self.answer_calls.lock().unwrap().clone()
    }
}

impl Default for MockAi {
    fn default() -> Self {
        Self::new()
    }
}

fn no_result_queued(op: &str) -> AiError {
    AiError::new(
        crate::ai::AiOp::Inference,
        AiErrorKind::Unknown,
        format!("no mock result queued for {op}"),
    )
}

#[async_trait]
impl DocumentAi for MockAi {
    async fn upload_document(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
    ) -> Result<DocumentHandle, AiError> {
        self.uploads
            .lock()
            .unwrap()
            .push((display_name.to_string(), bytes.len()));
        self.upload_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(no_result_queued("upload_document")))
    }

    async fn summarize(&self, handle: &DocumentHandle) -> Result<String, AiError> {
        self.summarize_calls.lock().unwrap().push(handle.clone());
        self.summary_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(no_result_queued("summarize")))
    }

    async fn answer_question(
        &self,
        handle: &DocumentHandle,
        question: &str,
    ) -> Result<String, AiError> {
        self.answer_calls
            .lock()
            .unwrap()
            .push((handle.clone(), question.to_string()));
        self.answer_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(no_result_queued("answer_question")))
    }
}
