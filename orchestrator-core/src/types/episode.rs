//! Episode (`SPEC_FULL.md` §3, §4.7, §4.9) — the primary persisted entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::decision::{AppliedDecision, ConfidenceScores, DecisionSource};
use super::pattern::PatternAnalysis;
use super::snapshot::{TeamAvailabilityStatus, ProjectAnalysisSnapshot};

/// The subset of a `ProjectAnalysisSnapshot` worth persisting with an
/// episode — everything the Episode Embedder needs to canonicalise plus
/// enough context to explain the decision later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perception {
    pub project_id: String,
    pub project_status: String,
    pub team_size: usize,
    pub team_availability_status: TeamAvailabilityStatus,
    pub backlog_tasks: i64,
    pub unassigned_tasks: i64,
    pub active_sprints_count: usize,
}

impl From<&ProjectAnalysisSnapshot> for Perception {
    fn from(snap: &ProjectAnalysisSnapshot) -> Self {
        Self {
            project_id: snap.project_id.clone(),
            project_status: snap.project_status.clone(),
            team_size: snap.team_size,
            team_availability_status: snap.team_availability.status,
            backlog_tasks: snap.backlog_tasks,
            unassigned_tasks: snap.unassigned_tasks,
            active_sprints_count: snap.active_sprints_count,
        }
    }
}

/// Pattern outputs plus decision-pipeline state, captured for audit and
/// for future similarity retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reasoning {
    pub pattern_analysis: PatternAnalysis,
    pub confidence_scores: ConfidenceScores,
    pub headline: String,
}

/// The action taken — an alias over `AppliedDecision` kept distinct at the
/// type level so episode storage doesn't couple to the live `Decision`
/// type evolving independently.
pub type ActionRecord = AppliedDecision;

/// An observed outcome back-filled onto a previously stored episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub sprint_completed: bool,
    pub tasks_completed: i64,
    pub tasks_total: i64,
    pub summary: String,
}

/// One perception→reasoning→action→outcome record (§3, §4.7, §4.9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub episode_id: Uuid,
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub perception: Perception,
    pub reasoning: Reasoning,
    pub action: ActionRecord,
    pub outcome: Option<EpisodeOutcome>,
    pub outcome_quality: Option<f64>,
    pub outcome_recorded_at: Option<DateTime<Utc>>,
    /// `None` when persisted under `OnEmbeddingUnavailable::Skip` semantics
    /// is never actually stored (the store call is skipped entirely); under
    /// `StoreWithoutEmbedding` this is `None` but the row still exists.
    pub embedding: Option<Vec<f32>>,
    pub agent_version: String,
    pub control_mode: String,
    pub decision_source: DecisionSource,
    pub sprint_id: Option<String>,
    pub external_note_id: Option<String>,
}

impl Episode {
    /// An episode is eligible for later outcome back-fill when it is linked
    /// to a sprint but has not yet observed an outcome (§3 invariant).
    #[must_use]
    pub fn eligible_for_backfill(&self) -> bool {
        self.sprint_id.is_some() && self.outcome.is_none()
    }
}
