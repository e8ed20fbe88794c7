//! Agent Memory Store (`SPEC_FULL.md` §4.7) — episode persistence and
//! similarity search, shaped after the teacher's `storage::StorageBackend`
//! trait plus `pool::PoolStatistics`.

pub mod in_memory;
pub mod working_memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Episode, EpisodeOutcome, WorkingMemorySession};

/// Point-in-time connection pool occupancy, surfaced on `/health/ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub size: usize,
    pub idle: usize,
    pub busy: usize,
    pub max: usize,
}

impl PoolStatus {
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.busy >= self.max
    }
}

/// Episode persistence and retrieval, independent of the concrete backend
/// (libsql in `orchestrator-storage`, in-memory in [`in_memory`] for tests).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Persist one episode. Called with `episode.embedding = None` when
    /// `OnEmbeddingUnavailable::StoreWithoutEmbedding` is configured and the
    /// Embedding Client degraded (§4.9).
    async fn store_episode(&self, episode: &Episode) -> Result<()>;

    /// Nearest neighbours by cosine similarity, most similar first, already
    /// paired with their similarity score in `[0, 1]`. Returns at most
    /// `limit` entries; returns an empty vector (never an error) when the
    /// store holds no embedded episodes.
    async fn find_similar_episodes(
        &self,
        project_id_to_exclude: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(Episode, f64)>>;

    /// Back-fill an outcome onto a previously stored episode.
    async fn update_episode_outcome(
        &self,
        episode_id: Uuid,
        outcome: EpisodeOutcome,
        outcome_quality: f64,
    ) -> Result<()>;

    /// Episodes linked to a sprint with no outcome yet recorded, across all
    /// projects, used by the self-heal outcome back-fill sweep (§4.11).
    async fn get_episodes_without_outcomes(&self) -> Result<Vec<Episode>>;

    /// All episodes recorded for one project, most recent first, used by
    /// the Decision Auditor (§4.6).
    async fn get_episodes_for_project(&self, project_id: &str) -> Result<Vec<Episode>>;

    async fn health(&self) -> Result<PoolStatus>;
}

/// Ephemeral per-project cache of the latest pattern analysis and recent
/// episodes (§3 "Working Memory Session", §4.7's `working_memory` relation).
/// Kept as its own trait, separate from [`MemoryStore`], since a cache miss
/// or expiry is never an error: callers fall back to recomputation.
#[async_trait]
pub trait WorkingMemoryStore: Send + Sync {
    /// Replace any existing session for `session.project_id` with this one
    /// (one live session per project at a time).
    async fn put(&self, session: WorkingMemorySession) -> Result<()>;

    /// The most recent non-expired session for `project_id`, if any.
    async fn get(&self, project_id: &str, now: DateTime<Utc>) -> Result<Option<WorkingMemorySession>>;
}

/// Cosine similarity in `[-1, 1]`; returns `0.0` for zero-length vectors or
/// dimension mismatches rather than erroring, since callers treat it as a
/// ranking score, not a correctness-critical value.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    f64::from(dot / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_similarity_of_orthogonal_vectors_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-9);
    }

    #[test]
    fn cosine_similarity_mismatched_dimensions_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }
}
