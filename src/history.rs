use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::apis::GenerationResult;

/// Most recent results kept per chat, newest first.
pub const HISTORY_CAPACITY: usize = 5;

#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub subject: String,
    pub result: GenerationResult,
}

/// In-memory bounded history. Lives for the warm container only, which is
/// all the ephemerality a result needs.
#[derive(Clone)]
pub struct History {
    state: Arc<Mutex<HashMap<i64, Vec<HistoryEntry>>>>,
}

impl History {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn push(&self, chat_id: i64, entry: HistoryEntry) {
        let mut state = self.state.lock().await;
        let entries = state.entry(chat_id).or_default();
        entries.insert(0, entry);
        entries.truncate(HISTORY_CAPACITY);
    }

    pub async fn recent(&self, chat_id: i64) -> Vec<HistoryEntry> {
        let state = self.state.lock().await;
        state.get(&chat_id).cloned().unwrap_or_default()
    }

    pub async fn latest(&self, chat_id: i64) -> Option<HistoryEntry> {
        let state = self.state.lock().await;
        state
            .get(&chat_id)
            .and_then(|entries| entries.first().cloned())
    }
}
