//! Decision Modifier (`SPEC_FULL.md` §4.4).
//!
//! Proposes candidate adjustments to the Rule-Based Planner's baseline from
//! the Pattern Engine's output. Every candidate still has to clear the
//! Confidence Gate (§4.5) before it becomes part of the applied decision —
//! this stage only ever widens the set of possibilities, never narrows it
//! by a confidence check of its own.

use crate::config::IntelligenceConfig;
use crate::types::{
    ActiveSprint, ActiveSprintRecommendation, AdjustmentEvidence, IntelligenceAdjustment,
    IntelligenceAdjustments, PatternAnalysis, RecommendationKind, RuleBasedDecision,
};

pub struct DecisionModifier {
    config: IntelligenceConfig,
}

impl DecisionModifier {
    #[must_use]
    pub fn new(config: IntelligenceConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn propose(
        &self,
        rule_based: &RuleBasedDecision,
        pattern: &PatternAnalysis,
        active_sprint: Option<&ActiveSprint>,
    ) -> IntelligenceAdjustments {
        let mut adjustments = IntelligenceAdjustments::default();
        if !pattern.data_available {
            return adjustments;
        }

        if self.config.enable_task_count_adjustment && rule_based.create_new_sprint {
            adjustments.task_count_modification = self.propose_task_count(rule_based, pattern);
        }
        if self.config.enable_sprint_duration_adjustment && rule_based.create_new_sprint {
            adjustments.sprint_duration_modification = self.propose_sprint_duration(rule_based, pattern);
        }
        if let Some(active) = active_sprint {
            adjustments.active_sprint_recommendations = self.propose_active_sprint(active, pattern);
        }
        adjustments
    }

    fn propose_task_count(
        &self,
        rule_based: &RuleBasedDecision,
        pattern: &PatternAnalysis,
    ) -> Option<IntelligenceAdjustment<i64>> {
        let optimal = pattern.success_indicators.optimal_tasks_per_sprint?;
        let count = pattern.similar_projects.len();
        if count < self.config.min_similar_projects {
            return None;
        }
        let avg_confidence = pattern.similar_projects.iter().map(|p| p.similarity_score).sum::<f64>() / count as f64;
        if avg_confidence < self.config.task_adjustment_min_confidence {
            return None;
        }
        let original = rule_based.tasks_to_assign;
        let intelligence = optimal.min(self.config.max_tasks_per_sprint).max(0);
        if (original - intelligence).abs() < self.config.task_adjustment_difference_threshold {
            return None;
        }
        Some(IntelligenceAdjustment {
            original,
            intelligence,
            applied: intelligence,
            confidence: avg_confidence,
            evidence_source: AdjustmentEvidence::SimilarProjects { count, avg_confidence },
            rationale: format!(
                "{count} similar project(s) suggest {intelligence} tasks per sprint rather than {original}"
            ),
        })
    }

    fn propose_sprint_duration(
        &self,
        rule_based: &RuleBasedDecision,
        pattern: &PatternAnalysis,
    ) -> Option<IntelligenceAdjustment<i64>> {
        let recommended = pattern.success_indicators.recommended_sprint_duration?;
        let confidence = pattern.velocity_trends.confidence.abs();
        if confidence < self.config.velocity_trend_min {
            return None;
        }
        let original = rule_based.sprint_duration_weeks;
        if recommended == original || recommended <= 0 {
            return None;
        }
        Some(IntelligenceAdjustment {
            original,
            intelligence: recommended,
            applied: recommended,
            confidence,
            evidence_source: AdjustmentEvidence::VelocityTrend { confidence },
            rationale: format!(
                "velocity trend ({:?}) suggests a {recommended}-week sprint rather than {original}",
                pattern.velocity_trends.trend_direction
            ),
        })
    }

    fn propose_active_sprint(
        &self,
        active: &ActiveSprint,
        pattern: &PatternAnalysis,
    ) -> Vec<ActiveSprintRecommendation> {
        let mut recommendations = Vec::new();
        if active.total_tasks == 0 {
            return recommendations;
        }
        let remaining_ratio = active.remaining_tasks as f64 / active.total_tasks as f64;
        let forecast = active.forecast_velocity;
        let burndown_confidence = pattern.velocity_trends.confidence.abs();

        if forecast > 0.0 && remaining_ratio > 0.5 && burndown_confidence >= self.config.velocity_trend_min {
            recommendations.push(ActiveSprintRecommendation {
                kind: RecommendationKind::ScopeReduction,
                confidence: burndown_confidence,
                evidence_source: AdjustmentEvidence::Burndown {
                    delta: remaining_ratio,
                    forecast_velocity: forecast,
                },
                rationale: format!(
                    "{:.0}% of committed tasks remain with a forecast velocity of {forecast:.1}/week",
                    remaining_ratio * 100.0
                ),
                tasks_to_move: Vec::new(),
            });
        }

        if pattern.success_indicators.success_probability < 0.4 && pattern.data_available {
            recommendations.push(ActiveSprintRecommendation {
                kind: RecommendationKind::RiskFlag,
                confidence: pattern.overall_confidence,
                evidence_source: AdjustmentEvidence::SimilarProjects {
                    count: pattern.similar_projects.len(),
                    avg_confidence: pattern.overall_confidence,
                },
                rationale: "similar historical sprints had a low completion rate".to_string(),
                tasks_to_move: Vec::new(),
            });
        }

        if forecast <= 0.0 && active.remaining_tasks > 0 {
            recommendations.push(ActiveSprintRecommendation {
                kind: RecommendationKind::EarlyTermination,
                confidence: burndown_confidence.max(0.5),
                evidence_source: AdjustmentEvidence::Burndown {
                    delta: remaining_ratio,
                    forecast_velocity: forecast,
                },
                rationale: "forecast velocity has dropped to zero with tasks still outstanding".to_string(),
                tasks_to_move: Vec::new(),
            });
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SimilarProject, SuccessIndicators, TrendDirection, VelocityTrends};

    fn rule_based() -> RuleBasedDecision {
        RuleBasedDecision {
            create_new_sprint: true,
            tasks_to_assign: 8,
            sprint_duration_weeks: 2,
            sprint_closure_triggered: false,
            sprint_id_to_close: None,
            ensure_cronjob_for_sprint_id: None,
            reasoning: vec![],
            warnings: vec![],
        }
    }

    fn pattern_with_task_count(optimal: i64, similarity: f64) -> PatternAnalysis {
        PatternAnalysis {
            data_available: true,
            similar_projects: vec![
                SimilarProject {
                    project_id: "A".to_string(),
                    similarity_score: similarity,
                    team_size: 5,
                    completion_rate: 0.8,
                    avg_sprint_duration_days: 14.0,
                    optimal_task_count: Some(optimal),
                    key_success_factors: vec![],
                },
                SimilarProject {
                    project_id: "B".to_string(),
                    similarity_score: similarity,
                    team_size: 5,
                    completion_rate: 0.8,
                    avg_sprint_duration_days: 14.0,
                    optimal_task_count: Some(optimal),
                    key_success_factors: vec![],
                },
                SimilarProject {
                    project_id: "C".to_string(),
                    similarity_score: similarity,
                    team_size: 5,
                    completion_rate: 0.8,
                    avg_sprint_duration_days: 14.0,
                    optimal_task_count: Some(optimal),
                    key_success_factors: vec![],
                },
            ],
            velocity_trends: VelocityTrends::insufficient_data(4.0),
            success_indicators: SuccessIndicators {
                optimal_tasks_per_sprint: Some(optimal),
                recommended_sprint_duration: Some(2),
                success_probability: 0.8,
                risk_factors: vec![],
            },
            overall_confidence: similarity,
        }
    }

    #[test]
    fn proposes_task_count_adjustment_when_gap_is_large_enough() {
        let modifier = DecisionModifier::new(IntelligenceConfig::default());
        let pattern = pattern_with_task_count(4, 0.9);
        let adj = modifier.propose(&rule_based(), &pattern, None);
        let task_mod = adj.task_count_modification.expect("adjustment proposed");
        assert_eq!(task_mod.original, 8);
        assert_eq!(task_mod.intelligence, 4);
    }

    #[test]
    fn skips_task_count_adjustment_when_gap_too_small() {
        let modifier = DecisionModifier::new(IntelligenceConfig::default());
        let pattern = pattern_with_task_count(7, 0.9);
        let adj = modifier.propose(&rule_based(), &pattern, None);
        assert!(adj.task_count_modification.is_none());
    }

    #[test]
    fn skips_task_count_adjustment_when_confidence_too_low() {
        let modifier = DecisionModifier::new(IntelligenceConfig::default());
        let pattern = pattern_with_task_count(2, 0.2);
        let adj = modifier.propose(&rule_based(), &pattern, None);
        assert!(adj.task_count_modification.is_none());
    }

    #[test]
    fn flags_scope_reduction_on_slipping_active_sprint() {
        let modifier = DecisionModifier::new(IntelligenceConfig::default());
        let mut pattern = pattern_with_task_count(4, 0.9);
        pattern.velocity_trends = VelocityTrends {
            current_team_velocity: 2.0,
            historical_range: (2.0, 6.0),
            trend_direction: TrendDirection::Decreasing,
            confidence: -0.8,
            pattern_note: "test".to_string(),
        };
        let active = ActiveSprint {
            sprint_id: "S1".to_string(),
            total_tasks: 10,
            completed_tasks: 2,
            started_at: chrono::Utc::now(),
            recent_velocities: vec![6.0, 4.0, 2.0],
            remaining_tasks: 8,
            forecast_velocity: 2.0,
        };
        let adj = modifier.propose(&rule_based(), &pattern, Some(&active));
        assert!(adj
            .active_sprint_recommendations
            .iter()
            .any(|r| r.kind == RecommendationKind::ScopeReduction));
    }
}
