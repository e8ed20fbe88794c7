//! In-memory [`WorkingMemoryStore`] used by unit/integration tests and by
//! the `orchestrator-server` demo mode; `lru`-bounded the same way the
//! Embedding Client bounds its response cache (`embeddings::client`), so a
//! long-running process cannot accumulate one session per project forever.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;

use crate::error::Result;
use crate::types::WorkingMemorySession;

use super::WorkingMemoryStore;

const DEFAULT_CAPACITY: usize = 512;

pub struct InMemoryWorkingMemoryStore {
    sessions: Mutex<LruCache<String, WorkingMemorySession>>,
}

impl InMemoryWorkingMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(LruCache::new(
                NonZeroUsize::new(DEFAULT_CAPACITY).expect("nonzero capacity"),
            )),
        }
    }
}

impl Default for InMemoryWorkingMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkingMemoryStore for InMemoryWorkingMemoryStore {
    async fn put(&self, session: WorkingMemorySession) -> Result<()> {
        self.sessions.lock().put(session.project_id.clone(), session);
        Ok(())
    }

    async fn get(&self, project_id: &str, now: DateTime<Utc>) -> Result<Option<WorkingMemorySession>> {
        let mut guard = self.sessions.lock();
        Ok(guard.get(project_id).filter(|s| !s.is_expired(now)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn session(project_id: &str, ttl: Duration) -> WorkingMemorySession {
        let now = Utc::now();
        WorkingMemorySession {
            session_id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            payload: serde_json::json!({"note": "cached"}),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips_within_ttl() {
        let store = InMemoryWorkingMemoryStore::new();
        store.put(session("PRJ-1", Duration::minutes(5))).await.unwrap();
        let fetched = store.get("PRJ-1", Utc::now()).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn expired_session_is_not_returned() {
        let store = InMemoryWorkingMemoryStore::new();
        let s = session("PRJ-1", Duration::minutes(-5));
        store.put(s).await.unwrap();
        let fetched = store.get("PRJ-1", Utc::now()).await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn put_replaces_prior_session_for_same_project() {
        let store = InMemoryWorkingMemoryStore::new();
        let first = session("PRJ-1", Duration::minutes(5));
        let first_id = first.session_id;
        store.put(first).await.unwrap();
        store.put(session("PRJ-1", Duration::minutes(5))).await.unwrap();
        let fetched = store.get("PRJ-1", Utc::now()).await.unwrap().unwrap();
        assert_ne!(fetched.session_id, first_id);
    }
}
