//! Confidence Gate (`SPEC_FULL.md` §4.5).
//!
//! The only place `IntelligenceMode` and `confidence_threshold` are
//! consulted to decide whether a candidate adjustment becomes part of the
//! applied decision. Everything upstream (Pattern Engine, Decision
//! Modifier) is free to propose; only this stage actually commits.

use crate::config::{IntelligenceConfig, IntelligenceMode};
use crate::types::{
    AppliedDecision, ConfidenceScores, Decision, DecisionSource, IntelligenceAdjustments,
    IntelligenceMetadata, PatternAnalysis, RuleBasedDecision,
};

pub struct ConfidenceGate {
    config: IntelligenceConfig,
}

impl ConfidenceGate {
    #[must_use]
    pub fn new(config: IntelligenceConfig) -> Self {
        Self { config }
    }

    /// Combine the rule-based baseline with the candidate adjustments into
    /// a final [`Decision`] (minus the cron/sprint bookkeeping fields the
    /// Enhanced Decision Engine fills in after acting on it).
    #[must_use]
    pub fn apply(
        &self,
        rule_based: RuleBasedDecision,
        mut candidate: IntelligenceAdjustments,
        pattern: &PatternAnalysis,
    ) -> Decision {
        let overall_decision_confidence = pattern.overall_confidence;
        let intelligence_threshold_met = overall_decision_confidence >= self.config.confidence_threshold;

        let commit = match self.config.mode {
            IntelligenceMode::RuleBasedOnly => false,
            IntelligenceMode::IntelligenceEnhanced => true,
            IntelligenceMode::Hybrid => intelligence_threshold_met,
        };

        if !commit {
            candidate = IntelligenceAdjustments::default();
        } else {
            candidate
                .active_sprint_recommendations
                .retain(|r| r.confidence >= self.config.confidence_threshold);
        }

        let decision_source = if candidate.is_empty() {
            DecisionSource::RuleBasedOnly
        } else {
            DecisionSource::IntelligenceEnhanced
        };

        let tasks_to_assign = candidate
            .task_count_modification
            .as_ref()
            .map_or(rule_based.tasks_to_assign, |a| a.applied);
        let sprint_duration_weeks = candidate
            .sprint_duration_modification
            .as_ref()
            .map_or(rule_based.sprint_duration_weeks, |a| a.applied);

        let mut warnings = rule_based.warnings.clone();
        warnings.extend(candidate.active_sprint_recommendations.iter().map(|r| r.rationale.clone()));

        let applied = AppliedDecision {
            create_new_sprint: rule_based.create_new_sprint,
            tasks_to_assign,
            sprint_duration_weeks,
            sprint_closure_triggered: rule_based.sprint_closure_triggered,
            sprint_id_to_close: rule_based.sprint_id_to_close.clone(),
            ensure_cronjob_for_sprint_id: rule_based.ensure_cronjob_for_sprint_id.clone(),
            cronjob_created: false,
            cronjob_deleted: false,
            sprint_name: None,
            warnings,
            actions_taken: vec![],
        };

        let confidence_scores = ConfidenceScores {
            overall_decision_confidence,
            intelligence_threshold_met,
            minimum_threshold: self.config.confidence_threshold,
        };

        let intelligence_metadata = IntelligenceMetadata {
            decision_mode: self.config.mode,
            modifications_applied: candidate.count_applied(),
            fallback_available: true,
            similar_projects_analyzed: pattern.similar_projects.len(),
            historical_data_quality: if pattern.data_available { "sufficient".to_string() } else { "insufficient".to_string() },
            prediction_confidence: overall_decision_confidence,
        };

        Decision {
            rule_based,
            intelligence_adjustments: candidate,
            applied,
            confidence_scores,
            decision_source,
            intelligence_metadata,
        }
    }
}
