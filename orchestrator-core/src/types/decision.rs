//! Decision artefact (`SPEC_FULL.md` §3, §4.2, §4.4–§4.6).
//!
//! Re-expresses the source's dynamic, decorator-based adjustment objects as
//! explicit tagged sum types (`AdjustmentEvidence`, `RecommendationKind`),
//! per the REDESIGN FLAGS in `SPEC_FULL.md` §9.

use serde::{Deserialize, Serialize};

/// Baseline decision produced by the Rule-Based Planner (§4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleBasedDecision {
    pub create_new_sprint: bool,
    pub tasks_to_assign: i64,
    pub sprint_duration_weeks: i64,
    pub sprint_closure_triggered: bool,
    pub sprint_id_to_close: Option<String>,
    /// Set when an active sprint is still in progress: the self-heal path
    /// (§4.2, §4.11) that ensures its scheduled job exists even though no
    /// new sprint is being created or closed.
    pub ensure_cronjob_for_sprint_id: Option<String>,
    pub reasoning: Vec<String>,
    /// Non-blocking concerns raised alongside the decision (e.g. the
    /// planning window overlapping a configured holiday). Never suppresses
    /// `create_new_sprint` or `sprint_closure_triggered`.
    pub warnings: Vec<String>,
}

/// Which historical signal backs a candidate adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentEvidence {
    SimilarProjects { count: usize, avg_confidence: f64 },
    VelocityTrend { confidence: f64 },
    Burndown { delta: f64, forecast_velocity: f64 },
}

/// A candidate adjustment produced by the Decision Modifier and filtered by
/// the Confidence Gate (§4.4/§4.5). `T` is the concrete value type of the
/// field being adjusted (`i64` tasks, `i64` weeks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceAdjustment<T> {
    pub original: T,
    pub intelligence: T,
    pub applied: T,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub evidence_source: AdjustmentEvidence,
    pub rationale: String,
}

/// Classification of an active-sprint recommendation (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    ScopeReduction,
    RiskFlag,
    EarlyTermination,
}

/// An active-sprint intervention candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSprintRecommendation {
    pub kind: RecommendationKind,
    pub confidence: f64,
    pub evidence_source: AdjustmentEvidence,
    pub rationale: String,
    /// Populated only for `ScopeReduction`.
    pub tasks_to_move: Vec<String>,
}

/// All candidate/approved adjustments for one orchestration (§3).
/// `decision_source = rule_based_only` implies this struct is entirely
/// empty (§8 invariant).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceAdjustments {
    pub task_count_modification: Option<IntelligenceAdjustment<i64>>,
    pub sprint_duration_modification: Option<IntelligenceAdjustment<i64>>,
    pub active_sprint_recommendations: Vec<ActiveSprintRecommendation>,
}

impl IntelligenceAdjustments {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.task_count_modification.is_none()
            && self.sprint_duration_modification.is_none()
            && self.active_sprint_recommendations.is_empty()
    }

    #[must_use]
    pub fn count_applied(&self) -> usize {
        usize::from(self.task_count_modification.is_some())
            + usize::from(self.sprint_duration_modification.is_some())
            + self.active_sprint_recommendations.len()
    }
}

/// The decision's concrete, applied effect on the project (§3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedDecision {
    pub create_new_sprint: bool,
    pub tasks_to_assign: i64,
    pub sprint_duration_weeks: i64,
    pub sprint_closure_triggered: bool,
    pub sprint_id_to_close: Option<String>,
    pub ensure_cronjob_for_sprint_id: Option<String>,
    pub cronjob_created: bool,
    pub cronjob_deleted: bool,
    pub sprint_name: Option<String>,
    pub warnings: Vec<String>,
    /// Ordered, human-readable action log surfaced as `actions_taken`
    /// (§6.1), built up in `EnhancedDecisionEngine::act_on_decision`.
    pub actions_taken: Vec<String>,
}

/// Confidence bookkeeping surfaced to callers (§3, §8 invariant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub overall_decision_confidence: f64,
    pub intelligence_threshold_met: bool,
    pub minimum_threshold: f64,
}

/// Which pipeline stage produced the applied decision (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    RuleBasedOnly,
    IntelligenceEnhanced,
}

/// Metadata describing how the intelligence layer behaved, recorded
/// regardless of whether any adjustment was ultimately applied (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceMetadata {
    pub decision_mode: crate::config::IntelligenceMode,
    pub modifications_applied: usize,
    pub fallback_available: bool,
    pub similar_projects_analyzed: usize,
    pub historical_data_quality: String,
    pub prediction_confidence: f64,
}

/// The full decision artefact produced per orchestration request (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub rule_based: RuleBasedDecision,
    pub intelligence_adjustments: IntelligenceAdjustments,
    pub applied: AppliedDecision,
    pub confidence_scores: ConfidenceScores,
    pub decision_source: DecisionSource,
    pub intelligence_metadata: IntelligenceMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_adjustments_report_zero_modifications() {
        let adj = IntelligenceAdjustments::default();
        assert!(adj.is_empty());
        assert_eq!(adj.count_applied(), 0);
    }

    #[test]
    fn task_count_modification_counts_as_one() {
        let mut adj = IntelligenceAdjustments::default();
        adj.task_count_modification = Some(IntelligenceAdjustment {
            original: 8,
            intelligence: 6,
            applied: 6,
            confidence: 0.82,
            evidence_source: AdjustmentEvidence::SimilarProjects {
                count: 3,
                avg_confidence: 0.82,
            },
            rationale: "median optimal task count across similar projects".to_string(),
        });
        assert!(!adj.is_empty());
        assert_eq!(adj.count_applied(), 1);
    }
}
