//! Long-poll update dispatcher
//!
//! Pulls updates from the chat platform, classifies each message into exactly
//! one event, and routes it to a per-conversation worker. One worker per
//! conversation serializes handling within that conversation while distinct
//! conversations run concurrently.

use crate::ai::DocumentAi;
use crate::runtime::{ChatApi, ConversationRuntime};
use crate::state_machine::Event;
use crate::store::ConversationStore;
use crate::telegram::{ChatId, Message, TelegramApi};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

const POLL_TIMEOUT_SECS: u64 = 30;
const POLL_RETRY_PAUSE: Duration = Duration::from_secs(1);
const WORKER_QUEUE_DEPTH: usize = 32;

const PDF_MIME: &str = "application/pdf";

/// Routes inbound updates to per-conversation workers
pub struct Dispatcher<S, A, C>
where
    S: ConversationStore + 'static,
    A: DocumentAi + 'static,
    C: ChatApi + 'static,
{
    api: Arc<TelegramApi>,
    runtime: Arc<ConversationRuntime<S, A, C>>,
    workers: Mutex<HashMap<ChatId, mpsc::Sender<Event>>>,
}

impl<S, A, C> Dispatcher<S, A, C>
where
    S: ConversationStore + 'static,
    A: DocumentAi + 'static,
    C: ChatApi + 'static,
{
    pub fn new(api: Arc<TelegramApi>, runtime: Arc<ConversationRuntime<S, A, C>>) -> Self {
        Self {
            api,
            runtime,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Poll for updates until the surrounding task is dropped
    pub async fn run(&self) {
        let mut offset = 0i64;
        loop {
            let updates = match self.api.get_updates(offset, POLL_TIMEOUT_SECS).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "update poll failed");
                    tokio::time::sleep(POLL_RETRY_PAUSE).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.message else {
                    continue;
                };
                let chat_id = message.chat.id;
                self.dispatch(chat_id, classify(&message)).await;
            }
        }
    }

    async fn dispatch(&self, chat_id: ChatId, event: Event) {
        let tx = {
            let mut workers = self.workers.lock().await;
            workers
                .entry(chat_id)
                .or_insert_with(|| self.spawn_worker(chat_id))
                .clone()
        };

        if tx.send(event).await.is_err() {
            tracing::error!(chat_id = %chat_id, "conversation worker is gone; dropping message");
            self.workers.lock().await.remove(&chat_id);
        }
    }

    fn spawn_worker(&self, chat_id: ChatId) -> mpsc::Sender<Event> {
        let (tx, mut rx) = mpsc::channel(WORKER_QUEUE_DEPTH);
        let runtime = Arc::clone(&self.runtime);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = runtime.handle_event(chat_id, event).await {
                    tracing::error!(chat_id = %chat_id, error = %e, "message handling failed");
                }
            }
        });
        tx
    }
}

/// Classify an inbound message into exactly one event
///
/// Fixed priority order: explicit command, then PDF document, then free
/// text. Everything else is unmatched.
pub fn classify(message: &Message) -> Event {
    if let Some(text) = message.text.as_deref() {
        if is_start_command(text) {
            return Event::StartCommand;
        }
    }

    if let Some(document) = &message.document {
        if document.mime_type.as_deref() == Some(PDF_MIME) {
            return Event::DocumentReceived {
                file_id: document.file_id.clone(),
                file_name: document
                    .file_name
                    .clone()
                    .unwrap_or_else(|| "document.pdf".to_string()),
            };
        }
        return Event::Unmatched;
    }

    if let Some(text) = &message.text {
        return Event::TextReceived { text: text.clone() };
    }

    Event::Unmatched
}

fn is_start_command(text: &str) -> bool {
    let first = text.split_whitespace().next().unwrap_or("");
    first == "/start" || first.starts_with("/start@")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::{Chat, Document};

    fn text_message(text: &str) -> Message {
        Message {
            message_id: 1,
            chat: Chat { id: ChatId(1234) },
            text: Some(text.to_string()),
            document: None,
        }
    }

    fn document_message(file_name: Option<&str>, mime_type: Option<&str>) -> Message {
        Message {
            message_id: 2,
            chat: Chat { id: ChatId(1234) },
            text: None,
            document: Some(Document {
                file_id: "file-1".to_string(),
                file_name: file_name.map(ToString::to_string),
                mime_type: mime_type.map(ToString::to_string),
            }),
        }
    }

    #[test]
    fn test_start_command() {
        assert!(matches!(
            classify(&text_message("/start")),
            Event::StartCommand
        ));
        assert!(matches!(
            classify(&text_message("/start@some_bot")),
            Event::StartCommand
        ));
        assert!(matches!(
            classify(&text_message("/start please")),
            Event::StartCommand
        ));
    }

    #[test]
    fn test_plain_text() {
        match classify(&text_message("What is the conclusion?")) {
            Event::TextReceived { text } => assert_eq!(text, "What is the conclusion?"),
            other => panic!("expected TextReceived, got {other:?}"),
        }
    }

    #[test]
    fn test_start_mentioned_mid_text_is_plain_text() {
        assert!(matches!(
            classify(&text_message("how does /start work?")),
            Event::TextReceived { .. }
        ));
    }

    #[test]
    fn test_pdf_document() {
        match classify(&document_message(Some("report.pdf"), Some(PDF_MIME))) {
            Event::DocumentReceived { file_id, file_name } => {
                assert_eq!(file_id, "file-1");
                assert_eq!(file_name, "report.pdf");
            }
            other => panic!("expected DocumentReceived, got {other:?}"),
        }
    }

    #[test]
    fn test_pdf_document_without_name_gets_a_default() {
        match classify(&document_message(None, Some(PDF_MIME))) {
            Event::DocumentReceived { file_name, .. } => assert_eq!(file_name, "document.pdf"),
            other => panic!("expected DocumentReceived, got {other:?}"),
        }
    }

    #[test]
    fn test_non_pdf_document_is_unmatched() {
        assert!(matches!(
            classify(&document_message(Some("photo.png"), Some("image/png"))),
            Event::Unmatched
        ));
        assert!(matches!(
            classify(&document_message(Some("unknown.bin"), None)),
            Event::Unmatched
        ));
    }

    #[test]
    fn test_message_with_neither_text_nor_document_is_unmatched() {
        let message = Message {
            message_id: 3,
            chat: Chat { id: ChatId(1234) },
            text: None,
            document: None,
        };
        assert!(matches!(classify(&message), Event::Unmatched));
    }
}
