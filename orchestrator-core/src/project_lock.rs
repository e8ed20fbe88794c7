//! Per-project cooperative lock (`SPEC_FULL.md` §5, §5.1).
//!
//! Grounded on the teacher's `sync::synchronizer`/`two_phase_commit`
//! pattern of keying an async mutex per logical unit rather than taking one
//! global lock: two orchestration requests for different projects must
//! never block each other, but two concurrent requests for the *same*
//! project must serialize so a sprint is never closed and recreated twice.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Holds one `tokio::sync::Mutex<()>` per project id, created lazily on
/// first use and never removed — the table is bounded by the number of
/// distinct projects ever orchestrated, not by request volume.
#[derive(Debug, Default)]
pub struct ProjectLockTable {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ProjectLockTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `project_id`, blocking only other callers for
    /// the same project. The returned guard's lifetime is independent of
    /// `self`, so it can be held across `.await` points after this call
    /// returns.
    pub async fn acquire(&self, project_id: &str) -> ProjectLockGuard {
        let entry = self
            .locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = entry.lock_owned().await;
        ProjectLockGuard { _guard: guard }
    }
}

/// RAII guard releasing the per-project lock on drop.
pub struct ProjectLockGuard {
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_project_serializes() {
        let table = Arc::new(ProjectLockTable::new());
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let table = table.clone();
            let concurrent = concurrent.clone();
            let max_concurrent = max_concurrent.clone();
            handles.push(tokio::spawn(async move {
                let _guard = table.acquire("PRJ-1").await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_projects_do_not_block_each_other() {
        let table = Arc::new(ProjectLockTable::new());
        let a = table.acquire("PRJ-A").await;
        let b = tokio::time::timeout(Duration::from_millis(50), table.acquire("PRJ-B")).await;
        assert!(b.is_ok());
        drop(a);
    }
}
