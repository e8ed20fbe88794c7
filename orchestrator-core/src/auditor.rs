//! Decision Auditor (`SPEC_FULL.md` §4.6).
//!
//! A read-only view over the Agent Memory Store's episode history. Writing
//! an episode (the actual audit event) is the Enhanced Decision Engine's
//! job via `MemoryStore::store_episode` directly — this component exists
//! so `GET /orchestrate/intelligence/decision-audit/{project_id}` has a
//! single, narrow surface to call instead of reaching into storage itself.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::memory::MemoryStore;
use crate::types::{AppliedDecision, DecisionSource, Episode};

/// One row of the decision audit trail, derived from a stored [`Episode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub episode_id: Uuid,
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub decision_source: DecisionSource,
    pub headline: String,
    pub confidence: f64,
    pub applied: AppliedDecision,
}

impl From<&Episode> for AuditRecord {
    fn from(episode: &Episode) -> Self {
        Self {
            episode_id: episode.episode_id,
            project_id: episode.project_id.clone(),
            timestamp: episode.timestamp,
            decision_source: episode.decision_source,
            headline: episode.reasoning.headline.clone(),
            confidence: episode.reasoning.confidence_scores.overall_decision_confidence,
            applied: episode.action.clone(),
        }
    }
}

pub struct DecisionAuditor {
    memory: Arc<dyn MemoryStore>,
}

impl DecisionAuditor {
    #[must_use]
    pub fn new(memory: Arc<dyn MemoryStore>) -> Self {
        Self { memory }
    }

    /// Full decision history for one project, most recent first (the
    /// ordering `MemoryStore::get_episodes_for_project` is required to
    /// provide).
    pub async fn history(&self, project_id: &str) -> Result<Vec<AuditRecord>> {
        Ok(self
            .memory
            .get_episodes_for_project(project_id)
            .await?
            .iter()
            .map(AuditRecord::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::in_memory::InMemoryMemoryStore;
    use crate::types::{ActionRecord, ConfidenceScores, Perception, Reasoning, PatternAnalysis, TeamAvailabilityStatus};

    fn episode(project_id: &str, headline: &str) -> Episode {
        Episode {
            episode_id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            timestamp: Utc::now(),
            perception: Perception {
                project_id: project_id.to_string(),
                project_status: "active".to_string(),
                team_size: 5,
                team_availability_status: TeamAvailabilityStatus::Available,
                backlog_tasks: 10,
                unassigned_tasks: 4,
                active_sprints_count: 1,
            },
            reasoning: Reasoning {
                pattern_analysis: PatternAnalysis::empty(),
                confidence_scores: ConfidenceScores {
                    overall_decision_confidence: 0.7,
                    intelligence_threshold_met: true,
                    minimum_threshold: 0.65,
                },
                headline: headline.to_string(),
            },
            action: ActionRecord::default(),
            outcome: None,
            outcome_quality: None,
            outcome_recorded_at: None,
            embedding: None,
            agent_version: "test".to_string(),
            control_mode: "hybrid".to_string(),
            decision_source: DecisionSource::RuleBasedOnly,
            sprint_id: None,
            external_note_id: None,
        }
    }

    #[tokio::test]
    async fn history_returns_audit_records_for_project_only() {
        let store = Arc::new(InMemoryMemoryStore::new());
        store.store_episode(&episode("PRJ-1", "first")).await.unwrap();
        store.store_episode(&episode("PRJ-2", "other project")).await.unwrap();
        store.store_episode(&episode("PRJ-1", "second")).await.unwrap();

        let auditor = DecisionAuditor::new(store);
        let history = auditor.history("PRJ-1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.project_id == "PRJ-1"));
    }
}
