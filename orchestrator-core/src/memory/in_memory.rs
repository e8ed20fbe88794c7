//! In-memory [`MemoryStore`] used by unit/integration tests and by the
//! `orchestrator-server` demo mode. Never used in production — the real
//! backend lives in `orchestrator-storage`.

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Episode, EpisodeOutcome};

use super::{cosine_similarity, MemoryStore, PoolStatus};

/// A single fixed-capacity in-process store. `max` mirrors what a pool's
/// `max_connections` would report, kept at a constant since there is no
/// real connection pool behind it.
#[derive(Debug)]
pub struct InMemoryMemoryStore {
    episodes: RwLock<Vec<Episode>>,
    max: usize,
}

impl InMemoryMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            episodes: RwLock::new(Vec::new()),
            max: 10,
        }
    }
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn store_episode(&self, episode: &Episode) -> Result<()> {
        let mut guard = self.episodes.write();
        if let Some(existing) = guard.iter_mut().find(|e| e.episode_id == episode.episode_id) {
            *existing = episode.clone();
        } else {
            guard.push(episode.clone());
        }
        Ok(())
    }

    async fn find_similar_episodes(
        &self,
        project_id_to_exclude: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(Episode, f64)>> {
        let guard = self.episodes.read();
        let mut scored: Vec<(Episode, f64)> = guard
            .iter()
            .filter(|e| e.project_id != project_id_to_exclude)
            .filter_map(|e| {
                e.embedding
                    .as_ref()
                    .map(|emb| (e.clone(), cosine_similarity(embedding, emb)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn update_episode_outcome(
        &self,
        episode_id: Uuid,
        outcome: EpisodeOutcome,
        outcome_quality: f64,
    ) -> Result<()> {
        let mut guard = self.episodes.write();
        let episode = guard
            .iter_mut()
            .find(|e| e.episode_id == episode_id)
            .ok_or_else(|| Error::NotFound(format!("episode {episode_id} not found")))?;
        episode.outcome = Some(outcome);
        episode.outcome_quality = Some(outcome_quality);
        episode.outcome_recorded_at = Some(chrono::Utc::now());
        Ok(())
    }

    async fn get_episodes_without_outcomes(&self) -> Result<Vec<Episode>> {
        Ok(self
            .episodes
            .read()
            .iter()
            .filter(|e| e.eligible_for_backfill())
            .cloned()
            .collect())
    }

    async fn get_episodes_for_project(&self, project_id: &str) -> Result<Vec<Episode>> {
        let mut matching: Vec<Episode> = self
            .episodes
            .read()
            .iter()
            .filter(|e| e.project_id == project_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(matching)
    }

    async fn health(&self) -> Result<PoolStatus> {
        Ok(PoolStatus {
            size: 1,
            idle: 1,
            busy: 0,
            max: self.max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ActionRecord, ConfidenceScores, DecisionSource, Perception, Reasoning, TeamAvailabilityStatus,
    };
    use crate::types::PatternAnalysis;

    fn episode(project_id: &str, embedding: Option<Vec<f32>>) -> Episode {
        Episode {
            episode_id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            timestamp: chrono::Utc::now(),
            perception: Perception {
                project_id: project_id.to_string(),
                project_status: "active".to_string(),
                team_size: 5,
                team_availability_status: TeamAvailabilityStatus::Available,
                backlog_tasks: 10,
                unassigned_tasks: 5,
                active_sprints_count: 1,
            },
            reasoning: Reasoning {
                pattern_analysis: PatternAnalysis::empty(),
                confidence_scores: ConfidenceScores {
                    overall_decision_confidence: 0.5,
                    intelligence_threshold_met: false,
                    minimum_threshold: 0.65,
                },
                headline: "test episode".to_string(),
            },
            action: ActionRecord::default(),
            outcome: None,
            outcome_quality: None,
            outcome_recorded_at: None,
            embedding,
            agent_version: "test".to_string(),
            control_mode: "hybrid".to_string(),
            decision_source: DecisionSource::RuleBasedOnly,
            sprint_id: Some("S1".to_string()),
            external_note_id: None,
        }
    }

    #[tokio::test]
    async fn stores_and_finds_similar_episodes_excluding_self_project() {
        let store = InMemoryMemoryStore::new();
        store.store_episode(&episode("A", Some(vec![1.0, 0.0]))).await.unwrap();
        store.store_episode(&episode("B", Some(vec![0.9, 0.1]))).await.unwrap();
        store.store_episode(&episode("A", Some(vec![0.8, 0.2]))).await.unwrap();

        let results = store.find_similar_episodes("A", &[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.project_id, "B");
    }

    #[tokio::test]
    async fn backfill_sweep_only_returns_sprint_linked_episodes_without_outcome() {
        let store = InMemoryMemoryStore::new();
        let mut with_sprint = episode("A", None);
        with_sprint.sprint_id = Some("S1".to_string());
        let mut without_sprint = episode("A", None);
        without_sprint.sprint_id = None;
        store.store_episode(&with_sprint).await.unwrap();
        store.store_episode(&without_sprint).await.unwrap();

        let pending = store.get_episodes_without_outcomes().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].episode_id, with_sprint.episode_id);
    }

    #[tokio::test]
    async fn update_outcome_on_unknown_episode_errors() {
        let store = InMemoryMemoryStore::new();
        let err = store
            .update_episode_outcome(
                Uuid::new_v4(),
                EpisodeOutcome {
                    sprint_completed: true,
                    tasks_completed: 1,
                    tasks_total: 1,
                    summary: "done".to_string(),
                },
                0.9,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
