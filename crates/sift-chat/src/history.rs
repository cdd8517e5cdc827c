//! Per-user conversation history.
//!
//! The store is a trait so a persistent backend can be swapped in; the
//! default is an in-memory map with a per-user turn cap (oldest turns are
//! dropped first). Histories are created lazily on first append and are
//! never persisted by the default store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use sift_core::Message;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a turn to the user's history, creating it if absent.
    async fn append(&self, user_id: &str, message: Message);

    /// The user's full history in order, empty if none exists.
    async fn snapshot(&self, user_id: &str) -> Vec<Message>;

    /// Drop the user's history. Returns whether one existed. Idempotent.
    async fn clear(&self, user_id: &str) -> bool;
}

pub struct InMemoryHistory {
    inner: Mutex<HashMap<String, Vec<Message>>>,
    max_turns: usize,
}

impl InMemoryHistory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_turns,
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append(&self, user_id: &str, message: Message) {
        let mut inner = self.inner.lock().unwrap();
        let turns = inner.entry(user_id.to_string()).or_default();
        turns.push(message);
        if turns.len() > self.max_turns {
            let excess = turns.len() - self.max_turns;
            turns.drain(..excess);
            debug!(user_id = %user_id, dropped = excess, "Truncated history");
        }
    }

    async fn snapshot(&self, user_id: &str) -> Vec<Message> {
        self.inner
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn clear(&self, user_id: &str) -> bool {
        self.inner.lock().unwrap().remove(user_id).is_some()
    }
}
