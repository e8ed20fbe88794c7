//! Episode Embedder (`SPEC_FULL.md` §4.9).
//!
//! Canonicalises an episode's perception/reasoning/action into a single,
//! deterministic line of text before handing it to the [`EmbeddingClient`].
//! Grounded on the teacher's `memory::canonicalize` text-building helpers:
//! field order is fixed so the same episode always embeds to the same
//! vector (§8 testable property: embedding is a pure function of content).

use crate::error::Result;
use crate::types::{ActionRecord, Perception, Reasoning};

use super::client::EmbeddingClient;

/// Wraps an [`EmbeddingClient`] with the canonicalisation step the rest of
/// the engine should use, so no call site hand-rolls its own text format.
pub struct EpisodeEmbedder<'a> {
    client: &'a EmbeddingClient,
}

impl<'a> EpisodeEmbedder<'a> {
    #[must_use]
    pub fn new(client: &'a EmbeddingClient) -> Self {
        Self { client }
    }

    /// Text form of a perception alone, used to query for similar past
    /// episodes *before* a decision has been made (the Pattern Engine only
    /// has perception to go on at that point).
    #[must_use]
    pub fn canonicalize_perception(perception: &Perception) -> String {
        format!(
            "project_status={} team_size={} availability={:?} backlog_tasks={} unassigned_tasks={} active_sprints={}",
            perception.project_status,
            perception.team_size,
            perception.team_availability_status,
            perception.backlog_tasks,
            perception.unassigned_tasks,
            perception.active_sprints_count,
        )
    }

    /// Deterministic text form of one perception/reasoning/action triple.
    /// Field order and separators are fixed; never reorder them without
    /// accepting that previously stored embeddings become incomparable.
    #[must_use]
    pub fn canonicalize(perception: &Perception, reasoning: &Reasoning, action: &ActionRecord) -> String {
        format!(
            "project_status={} team_size={} availability={:?} backlog_tasks={} unassigned_tasks={} active_sprints={} | confidence={:.3} headline={} | create_new_sprint={} tasks_to_assign={} sprint_duration_weeks={} closure={}",
            perception.project_status,
            perception.team_size,
            perception.team_availability_status,
            perception.backlog_tasks,
            perception.unassigned_tasks,
            perception.active_sprints_count,
            reasoning.confidence_scores.overall_decision_confidence,
            reasoning.headline,
            action.create_new_sprint,
            action.tasks_to_assign,
            action.sprint_duration_weeks,
            action.sprint_closure_triggered,
        )
    }

    pub async fn embed(
        &self,
        perception: &Perception,
        reasoning: &Reasoning,
        action: &ActionRecord,
    ) -> Result<Vec<f32>> {
        let text = Self::canonicalize(perception, reasoning, action);
        self.client.embed(&text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConfidenceScores, PatternAnalysis, TeamAvailabilityStatus};

    fn sample() -> (Perception, Reasoning, ActionRecord) {
        let perception = Perception {
            project_id: "PRJ-1".to_string(),
            project_status: "active".to_string(),
            team_size: 5,
            team_availability_status: TeamAvailabilityStatus::Available,
            backlog_tasks: 10,
            unassigned_tasks: 4,
            active_sprints_count: 1,
        };
        let reasoning = Reasoning {
            pattern_analysis: PatternAnalysis::empty(),
            confidence_scores: ConfidenceScores {
                overall_decision_confidence: 0.72,
                intelligence_threshold_met: true,
                minimum_threshold: 0.65,
            },
            headline: "created a new sprint".to_string(),
        };
        (perception, reasoning, ActionRecord::default())
    }

    #[test]
    fn canonicalize_is_deterministic() {
        let (perception, reasoning, action) = sample();
        let first = EpisodeEmbedder::canonicalize(&perception, &reasoning, &action);
        let second = EpisodeEmbedder::canonicalize(&perception, &reasoning, &action);
        assert_eq!(first, second);
    }

    #[test]
    fn canonicalize_changes_with_content() {
        let (perception, reasoning, action) = sample();
        let base = EpisodeEmbedder::canonicalize(&perception, &reasoning, &action);
        let mut other = perception.clone();
        other.unassigned_tasks = 99;
        let changed = EpisodeEmbedder::canonicalize(&other, &reasoning, &action);
        assert_ne!(base, changed);
    }
}
