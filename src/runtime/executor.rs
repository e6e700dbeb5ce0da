//! Conversation runtime executor

use super::traits::ChatApi;
use crate::ai::DocumentAi;
use crate::state_machine::{transition, ConvContext, Effect, Event, UnmatchedPolicy};
use crate::store::ConversationStore;
use crate::telegram::{ChatError, ChatId};
use std::collections::VecDeque;

/// Generic conversation runtime over storage, AI, and chat implementations
///
/// The runtime itself holds no per-conversation locks: the dispatcher runs
/// one worker per conversation, so events for a given chat id arrive here
/// strictly in order. Distinct conversations may run concurrently.
pub struct ConversationRuntime<S, A, C>
where
    S: ConversationStore,
    A: DocumentAi,
    C: ChatApi,
{
    store: S,
    ai: A,
    chat: C,
    unmatched_policy: UnmatchedPolicy,
}

impl<S, A, C> ConversationRuntime<S, A, C>
where
    S: ConversationStore,
    A: DocumentAi,
    C: ChatApi,
{
    pub fn new(store: S, ai: A, chat: C, unmatched_policy: UnmatchedPolicy) -> Self {
        Self {
            store,
            ai,
            chat,
            unmatched_policy,
        }
    }

    /// Handle one inbound event for a conversation, running any follow-up
    /// AI work to completion before returning.
    pub async fn handle_event(&self, chat_id: ChatId, event: Event) -> Result<(), ChatError> {
        let context = ConvContext::new(chat_id, self.unmatched_policy);

        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let state = self.store.get(chat_id).await;
            let result = transition(&state, &context, event);
            self.store.set(chat_id, result.new_state).await;

            for effect in result.effects {
                if let Some(follow_up) = self.execute_effect(chat_id, effect).await? {
                    queue.push_back(follow_up);
                }
            }
        }

        Ok(())
    }

    /// Execute one effect
    ///
    /// AI failures become follow-up events so the user gets a reply instead
    /// of silence; chat platform failures propagate to the dispatcher, which
    /// logs them per message.
    async fn execute_effect(
        &self,
        chat_id: ChatId,
        effect: Effect,
    ) -> Result<Option<Event>, ChatError> {
        match effect {
            Effect::Reply { text } => {
                self.chat.send_text(chat_id, &text).await?;
                Ok(None)
            }
            Effect::IngestDocument { file_id, file_name } => {
                Ok(Some(self.ingest(chat_id, &file_id, &file_name).await?))
            }
            Effect::AnswerQuestion { handle, question } => {
                match self.ai.answer_question(&handle, &question).await {
                    Ok(answer) => Ok(Some(Event::QuestionAnswered { answer })),
                    Err(e) => {
                        tracing::error!(chat_id = %chat_id, error = %e, "question answering failed");
                        Ok(Some(Event::AnswerFailed))
                    }
                }
            }
        }
    }

    /// Download the document from the chat platform, upload it to the AI
    /// service and request a summary
    async fn ingest(
        &self,
        chat_id: ChatId,
        file_id: &str,
        file_name: &str,
    ) -> Result<Event, ChatError> {
        let bytes = self.chat.download_document(file_id).await?;
        tracing::info!(
            chat_id = %chat_id,
            file_name = file_name,
            num_bytes = bytes.len(),
            "ingesting document"
        );

        let handle = match self.ai.upload_document(bytes, file_name).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(chat_id = %chat_id, error = %e, "document upload failed");
                return Ok(Event::IngestFailed);
            }
        };

        match self.ai.summarize(&handle).await {
            Ok(summary) => Ok(Event::DocumentIngested { handle, summary }),
            Err(e) => {
                tracing::error!(chat_id = %chat_id, error = %e, "summarization failed");
                Ok(Event::IngestFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::DocumentHandle;
    use crate::runtime::testing::{MockAi, MockChat};
    use crate::state_machine::transition::{
        ANSWER_FAILED, ASK_FOR_DOCUMENT, GREETING, INGEST_FAILED, INVITE_QUESTIONS, UNMATCHED_HINT,
    };
    use crate::state_machine::ConvState;
    use crate::store::InMemoryStore;
    use std::sync::Arc;

    type TestRuntime = ConversationRuntime<Arc<InMemoryStore>, Arc<MockAi>, Arc<MockChat>>;

    struct Harness {
        runtime: TestRuntime,
        store: Arc<InMemoryStore>,
        ai: Arc<MockAi>,
        chat: Arc<MockChat>,
    }

    fn harness(policy: UnmatchedPolicy) -> Harness {
        let store = Arc::new(InMemoryStore::new(16));
        let ai = Arc::new(MockAi::new());
        let chat = Arc::new(MockChat::new());
        let runtime = ConversationRuntime::new(
            Arc::clone(&store),
            Arc::clone(&ai),
            Arc::clone(&chat),
            policy,
        );
        Harness {
            runtime,
            store,
            ai,
            chat,
        }
    }

    fn handle(name: &str) -> DocumentHandle {
        DocumentHandle {
            name: format!("files/{name}"),
            uri: format!("https://example.invalid/files/{name}"),
        }
    }

    const C1: ChatId = ChatId(1001);
    const C2: ChatId = ChatId(1002);

    fn document_event() -> Event {
        Event::DocumentReceived {
            file_id: "file-1".to_string(),
            file_name: "report.pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_full_conversation_flow() {
        let h = harness(UnmatchedPolicy::Ignore);
        h.chat.stage_document("file-1", b"%PDF-1.4 test".to_vec());
        h.ai.queue_upload(Ok(handle("abc")));
        h.ai.queue_summary(Ok("S1".to_string()));
        h.ai.queue_answer(Ok("The conclusion is X.".to_string()));

        h.runtime.handle_event(C1, Event::StartCommand).await.unwrap();
        assert_eq!(h.chat.sent_texts(C1), vec![GREETING.to_string()]);

        h.runtime.handle_event(C1, document_event()).await.unwrap();
        assert_eq!(
            h.ai.recorded_uploads(),
            vec![("report.pdf".to_string(), b"%PDF-1.4 test".len())]
        );
        assert_eq!(h.ai.recorded_summarize_calls(), vec![handle("abc")]);
        assert_eq!(
            h.chat.sent_texts(C1),
            vec![
                GREETING.to_string(),
                "S1".to_string(),
                INVITE_QUESTIONS.to_string(),
            ]
        );
        assert_eq!(
            h.store.get(C1).await,
            ConvState::DocumentReady {
                handle: handle("abc")
            }
        );

        h.runtime
            .handle_event(
                C1,
                Event::TextReceived {
                    text: "What is the conclusion?".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            h.ai.recorded_answer_calls(),
            vec![(handle("abc"), "What is the conclusion?".to_string())]
        );
        assert_eq!(
            h.chat.sent_texts(C1).last().map(String::as_str),
            Some("The conclusion is X.")
        );
    }

    #[tokio::test]
    async fn test_unseen_conversation_is_asked_for_a_document() {
        let h = harness(UnmatchedPolicy::Ignore);

        h.runtime
            .handle_event(
                C2,
                Event::TextReceived {
                    text: "hello".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(h.chat.sent_texts(C2), vec![ASK_FOR_DOCUMENT.to_string()]);
        assert_eq!(h.store.get(C2).await, ConvState::AwaitingDocument);
    }

    #[tokio::test]
    async fn test_second_upload_replaces_the_handle() {
        let h = harness(UnmatchedPolicy::Ignore);
        h.chat.stage_document("file-1", b"first".to_vec());
        h.chat.stage_document("file-2", b"second".to_vec());
        h.ai.queue_upload(Ok(handle("old")));
        h.ai.queue_summary(Ok("S1".to_string()));
        h.ai.queue_upload(Ok(handle("new")));
        h.ai.queue_summary(Ok("S2".to_string()));
        h.ai.queue_answer(Ok("A1".to_string()));

        h.runtime.handle_event(C1, document_event()).await.unwrap();
        h.runtime
            .handle_event(
                C1,
                Event::DocumentReceived {
                    file_id: "file-2".to_string(),
                    file_name: "update.pdf".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            h.store.get(C1).await,
            ConvState::DocumentReady {
                handle: handle("new")
            }
        );

        // A question asked afterwards must reference the new handle
        h.runtime
            .handle_event(
                C1,
                Event::TextReceived {
                    text: "and now?".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            h.ai.recorded_answer_calls(),
            vec![(handle("new"), "and now?".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_upload_replies_and_keeps_previous_document() {
        let h = harness(UnmatchedPolicy::Ignore);
        h.chat.stage_document("file-1", b"first".to_vec());
        h.chat.stage_document("file-2", b"second".to_vec());
        h.ai.queue_upload(Ok(handle("good")));
        h.ai.queue_summary(Ok("S1".to_string()));
        h.ai.queue_upload(Err(crate::ai::AiError::upload(
            crate::ai::AiErrorKind::ServerError,
            "boom",
        )));

        h.runtime.handle_event(C1, document_event()).await.unwrap();
        h.runtime
            .handle_event(
                C1,
                Event::DocumentReceived {
                    file_id: "file-2".to_string(),
                    file_name: "update.pdf".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            h.chat.sent_texts(C1).last().map(String::as_str),
            Some(INGEST_FAILED)
        );
        // The previous document stays usable
        assert_eq!(
            h.store.get(C1).await,
            ConvState::DocumentReady {
                handle: handle("good")
            }
        );
    }

    #[tokio::test]
    async fn test_failed_summary_replies_and_does_not_store_handle() {
        let h = harness(UnmatchedPolicy::Ignore);
        h.chat.stage_document("file-1", b"first".to_vec());
        h.ai.queue_upload(Ok(handle("abc")));
        h.ai.queue_summary(Err(crate::ai::AiError::inference(
            crate::ai::AiErrorKind::RateLimit,
            "quota",
        )));

        h.runtime.handle_event(C1, document_event()).await.unwrap();

        assert_eq!(h.chat.sent_texts(C1), vec![INGEST_FAILED.to_string()]);
        assert_eq!(h.store.get(C1).await, ConvState::AwaitingDocument);
    }

    #[tokio::test]
    async fn test_failed_answer_replies_generic_error() {
        let h = harness(UnmatchedPolicy::Ignore);
        h.chat.stage_document("file-1", b"first".to_vec());
        h.ai.queue_upload(Ok(handle("abc")));
        h.ai.queue_summary(Ok("S1".to_string()));
        h.ai.queue_answer(Err(crate::ai::AiError::inference(
            crate::ai::AiErrorKind::Network,
            "timeout",
        )));

        h.runtime.handle_event(C1, document_event()).await.unwrap();
        h.runtime
            .handle_event(
                C1,
                Event::TextReceived {
                    text: "anyone?".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            h.chat.sent_texts(C1).last().map(String::as_str),
            Some(ANSWER_FAILED)
        );
        // Handle survives a failed inference call
        assert_eq!(
            h.store.get(C1).await,
            ConvState::DocumentReady {
                handle: handle("abc")
            }
        );
    }

    #[tokio::test]
    async fn test_unmatched_message_is_ignored_by_default() {
        let h = harness(UnmatchedPolicy::Ignore);

        h.runtime.handle_event(C1, Event::Unmatched).await.unwrap();

        assert!(h.chat.sent_texts(C1).is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_message_hint_policy() {
        let h = harness(UnmatchedPolicy::Hint);

        h.runtime.handle_event(C1, Event::Unmatched).await.unwrap();

        assert_eq!(h.chat.sent_texts(C1), vec![UNMATCHED_HINT.to_string()]);
    }

    #[tokio::test]
    async fn test_download_failure_propagates_to_caller() {
        let h = harness(UnmatchedPolicy::Ignore);
        // No staged document: the download fails

        let result = h.runtime.handle_event(C1, document_event()).await;

        assert!(result.is_err());
        assert_eq!(h.store.get(C1).await, ConvState::AwaitingDocument);
    }
}
