//! Pattern Engine (`SPEC_FULL.md` §4.3).
//!
//! Turns nearest-neighbour episodes and the active sprint's recent
//! velocities into a [`PatternAnalysis`]. Entirely derived, read-only data:
//! nothing here mutates the Agent Memory Store.

use std::sync::Arc;

use tracing::instrument;

use crate::config::IntelligenceConfig;
use crate::memory::MemoryStore;
use crate::types::{
    ActiveSprint, PatternAnalysis, SimilarProject, SuccessIndicators, TrendDirection,
    VelocityTrends,
};

/// Minimum sample size before a velocity regression is trusted at all
/// (distinct from `IntelligenceConfig::min_similar_projects`, which gates
/// similar-project-derived adjustments instead).
const MIN_VELOCITY_SAMPLES: usize = 3;

pub struct PatternEngine {
    memory: Arc<dyn MemoryStore>,
    config: IntelligenceConfig,
}

impl PatternEngine {
    #[must_use]
    pub fn new(memory: Arc<dyn MemoryStore>, config: IntelligenceConfig) -> Self {
        Self { memory, config }
    }

    /// `embedding` is `None` when the Embedding Client degraded upstream;
    /// in that case this returns [`PatternAnalysis::empty`] without
    /// touching the memory store (§4.1 "absent historical data").
    #[instrument(skip(self, embedding, active_sprint), fields(project_id = %project_id))]
    pub async fn analyze(
        &self,
        project_id: &str,
        embedding: Option<&[f32]>,
        active_sprint: Option<&ActiveSprint>,
    ) -> crate::error::Result<PatternAnalysis> {
        let velocity_trends = active_sprint
            .map(|s| self.velocity_trend(s))
            .unwrap_or_else(|| VelocityTrends::insufficient_data(0.0));

        let Some(embedding) = embedding else {
            return Ok(PatternAnalysis {
                data_available: false,
                similar_projects: Vec::new(),
                velocity_trends,
                success_indicators: SuccessIndicators::empty(),
                overall_confidence: 0.0,
            });
        };

        let neighbours = self
            .memory
            .find_similar_episodes(project_id, embedding, self.config.max_similar_candidates)
            .await?;

        let similar_projects: Vec<SimilarProject> = neighbours
            .into_iter()
            .filter(|(_, score)| *score >= self.config.similarity_min)
            .filter_map(|(episode, score)| {
                let outcome = episode.outcome.as_ref()?;
                if outcome.tasks_total <= 0 {
                    return None;
                }
                Some(SimilarProject {
                    project_id: episode.project_id.clone(),
                    similarity_score: score,
                    team_size: episode.perception.team_size,
                    completion_rate: outcome.tasks_completed as f64 / outcome.tasks_total as f64,
                    avg_sprint_duration_days: episode.action.sprint_duration_weeks as f64 * 7.0,
                    optimal_task_count: outcome.sprint_completed.then_some(outcome.tasks_completed),
                    key_success_factors: vec![episode.reasoning.headline.clone()],
                })
            })
            .collect();

        let data_available = similar_projects.len() >= self.config.min_similar_projects;
        let success_indicators = Self::success_indicators(&similar_projects);
        let overall_confidence =
            Self::overall_confidence(&similar_projects, &velocity_trends, &self.config);

        Ok(PatternAnalysis {
            data_available,
            similar_projects,
            velocity_trends,
            success_indicators,
            overall_confidence,
        })
    }

    /// Ordinary least squares over `(index, velocity)`, reported as a
    /// direction plus signed R² (§4.3). Falls back to "insufficient data"
    /// below `MIN_VELOCITY_SAMPLES`.
    fn velocity_trend(&self, active: &ActiveSprint) -> VelocityTrends {
        let samples = &active.recent_velocities;
        let current = samples.last().copied().unwrap_or(active.forecast_velocity);
        if samples.len() < MIN_VELOCITY_SAMPLES {
            return VelocityTrends::insufficient_data(current);
        }

        let n = samples.len() as f64;
        let xs: Vec<f64> = (0..samples.len()).map(|i| i as f64).collect();
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = samples.iter().sum::<f64>() / n;

        let mut cov = 0.0;
        let mut var_x = 0.0;
        for (x, y) in xs.iter().zip(samples) {
            cov += (x - mean_x) * (y - mean_y);
            var_x += (x - mean_x).powi(2);
        }
        let slope = if var_x.abs() < f64::EPSILON { 0.0 } else { cov / var_x };

        let mut ss_tot = 0.0;
        let mut ss_res = 0.0;
        for (x, y) in xs.iter().zip(samples) {
            let predicted = mean_y + slope * (x - mean_x);
            ss_tot += (y - mean_y).powi(2);
            ss_res += (y - predicted).powi(2);
        }
        let r_squared = if ss_tot.abs() < f64::EPSILON { 0.0 } else { 1.0 - ss_res / ss_tot };
        let signed_confidence = if slope < 0.0 { -r_squared.abs() } else { r_squared.abs() };

        let direction = if slope.abs() < 0.05 {
            TrendDirection::Stable
        } else if slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        };

        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        VelocityTrends {
            current_team_velocity: current,
            historical_range: (min, max),
            trend_direction: direction,
            confidence: signed_confidence,
            pattern_note: format!("linear regression over {} recent sprint(s)", samples.len()),
        }
    }

    fn success_indicators(similar_projects: &[SimilarProject]) -> SuccessIndicators {
        if similar_projects.is_empty() {
            return SuccessIndicators::empty();
        }
        let mut task_counts: Vec<i64> = similar_projects.iter().filter_map(|p| p.optimal_task_count).collect();
        task_counts.sort_unstable();
        let optimal_tasks_per_sprint = median(&task_counts);

        let mut durations: Vec<i64> = similar_projects
            .iter()
            .map(|p| (p.avg_sprint_duration_days / 7.0).round() as i64)
            .collect();
        durations.sort_unstable();
        let recommended_sprint_duration = median(&durations);

        let weight_sum: f64 = similar_projects.iter().map(|p| p.similarity_score).sum();
        let success_probability = if weight_sum > 0.0 {
            similar_projects
                .iter()
                .map(|p| p.completion_rate * p.similarity_score)
                .sum::<f64>()
                / weight_sum
        } else {
            0.0
        };

        let mut risk_factors = Vec::new();
        if success_probability < 0.5 {
            risk_factors.push("similar historical projects completed fewer than half their committed tasks".to_string());
        }

        SuccessIndicators {
            optimal_tasks_per_sprint,
            recommended_sprint_duration,
            success_probability,
            risk_factors,
        }
    }

    fn overall_confidence(
        similar_projects: &[SimilarProject],
        velocity_trends: &VelocityTrends,
        config: &IntelligenceConfig,
    ) -> f64 {
        if similar_projects.len() < config.min_similar_projects {
            return 0.0;
        }
        let avg_similarity = similar_projects.iter().map(|p| p.similarity_score).sum::<f64>()
            / similar_projects.len() as f64;
        let velocity_component = velocity_trends.confidence.abs().max(0.0);
        (0.7 * avg_similarity + 0.3 * velocity_component).clamp(0.0, 1.0)
    }
}

fn median(sorted: &[i64]) -> Option<i64> {
    if sorted.is_empty() {
        return None;
    }
    Some(sorted[sorted.len() / 2])
}
