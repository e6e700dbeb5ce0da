//! Per-conversation state storage
//!
//! The store is injected into the runtime behind a trait so it can be swapped
//! for a durable backend without touching the state machine or the runtime.

use crate::state_machine::ConvState;
use crate::telegram::ChatId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::Mutex;

/// Storage for conversation state, keyed by chat id
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Current state for a conversation; the default `AwaitingDocument` for
    /// conversations never seen before
    async fn get(&self, id: ChatId) -> ConvState;

    /// Replace the state for a conversation
    async fn set(&self, id: ChatId, state: ConvState);
}

struct Entry {
    state: ConvState,
    touched: Instant,
}

/// In-memory conversation store, bounded by capacity
///
/// When a new conversation would exceed the capacity, the least-recently-
/// touched conversation is evicted. An evicted conversation restarts from
/// `AwaitingDocument` on its next message, the same as after a process
/// restart.
pub struct InMemoryStore {
    entries: Mutex<HashMap<ChatId, Entry>>,
    capacity: usize,
}

impl InMemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Number of conversations currently held
    #[allow(dead_code)] // Useful for tests
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    #[allow(dead_code)] // Useful for tests
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get(&self, id: ChatId) -> ConvState {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(&id) {
            Some(entry) => {
                entry.touched = Instant::now();
                entry.state.clone()
            }
            None => ConvState::default(),
        }
    }

    async fn set(&self, id: ChatId, state: ConvState) {
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(&id) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                tracing::debug!(chat_id = %oldest, "evicting least-recently-touched conversation");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            id,
            Entry {
                state,
                touched: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::DocumentHandle;
    use std::time::Duration;

    fn ready(name: &str) -> ConvState {
        ConvState::DocumentReady {
            handle: DocumentHandle {
                name: format!("files/{name}"),
                uri: format!("https://example.invalid/files/{name}"),
            },
        }
    }

    #[tokio::test]
    async fn test_unseen_conversation_defaults_to_awaiting() {
        let store = InMemoryStore::new(8);
        assert_eq!(store.get(ChatId(1)).await, ConvState::AwaitingDocument);
        // A bare read does not create an entry
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let store = InMemoryStore::new(8);
        store.set(ChatId(1), ready("abc")).await;
        assert_eq!(store.get(ChatId(1)).await, ready("abc"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_touched() {
        let store = InMemoryStore::new(2);
        store.set(ChatId(1), ready("a")).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.set(ChatId(2), ready("b")).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.set(ChatId(3), ready("c")).await;

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get(ChatId(1)).await, ConvState::AwaitingDocument);
        assert_eq!(store.get(ChatId(2)).await, ready("b"));
        assert_eq!(store.get(ChatId(3)).await, ready("c"));
    }

    #[tokio::test]
    async fn test_reads_refresh_recency() {
        let store = InMemoryStore::new(2);
        store.set(ChatId(1), ready("a")).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.set(ChatId(2), ready("b")).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        // Touch 1 so that 2 becomes the eviction candidate
        let _ = store.get(ChatId(1)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.set(ChatId(3), ready("c")).await;

        assert_eq!(store.get(ChatId(1)).await, ready("a"));
        assert_eq!(store.get(ChatId(2)).await, ConvState::AwaitingDocument);
    }

    #[tokio::test]
    async fn test_updating_existing_entry_never_evicts() {
        let store = InMemoryStore::new(2);
        store.set(ChatId(1), ready("a")).await;
        store.set(ChatId(2), ready("b")).await;
        store.set(ChatId(1), ready("a2")).await;

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get(ChatId(1)).await, ready("a2"));
        assert_eq!(store.get(ChatId(2)).await, ready("b"));
    }
}
