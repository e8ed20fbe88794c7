//! Pattern Analysis (`SPEC_FULL.md` §3, §4.3) — derived, read-only after build.

use serde::{Deserialize, Serialize};

/// A historical project judged similar to the current one by vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarProject {
    pub project_id: String,
    /// `1 - cosine_distance`, in `[0, 1]`.
    pub similarity_score: f64,
    pub team_size: usize,
    /// In `[0, 1]`.
    pub completion_rate: f64,
    pub avg_sprint_duration_days: f64,
    pub optimal_task_count: Option<i64>,
    pub key_success_factors: Vec<String>,
}

/// Direction of the current project's velocity trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Output of the linear regression over recent sprint velocities (§4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityTrends {
    pub current_team_velocity: f64,
    pub historical_range: (f64, f64),
    pub trend_direction: TrendDirection,
    /// Signed R² in `[-1, 1]`; sign matches the regression slope's sign.
    pub confidence: f64,
    pub pattern_note: String,
}

impl VelocityTrends {
    /// The "insufficient data" fallback named in §4.3.
    #[must_use]
    pub fn insufficient_data(current_velocity: f64) -> Self {
        Self {
            current_team_velocity: current_velocity,
            historical_range: (current_velocity, current_velocity),
            trend_direction: TrendDirection::Stable,
            confidence: 0.2,
            pattern_note: "insufficient velocity history for trend analysis".to_string(),
        }
    }
}

/// Derived success indicators aggregated across retained similar projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessIndicators {
    pub optimal_tasks_per_sprint: Option<i64>,
    pub recommended_sprint_duration: Option<i64>,
    pub success_probability: f64,
    pub risk_factors: Vec<String>,
}

impl SuccessIndicators {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            optimal_tasks_per_sprint: None,
            recommended_sprint_duration: None,
            success_probability: 0.0,
            risk_factors: Vec::new(),
        }
    }
}

/// The Pattern Engine's output, owned by it and handed to downstream
/// components by value (§3 ownership rule).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub data_available: bool,
    pub similar_projects: Vec<SimilarProject>,
    pub velocity_trends: VelocityTrends,
    pub success_indicators: SuccessIndicators,
    /// Weighted overall confidence the Enhanced Decision Engine compares
    /// against `intelligence.confidence_threshold` (§4.3 "Overall confidence").
    pub overall_confidence: f64,
}

impl PatternAnalysis {
    /// The empty analysis used when historical services degrade or there
    /// is no historical data (§4.1: "absent historical data yields an empty
    /// `pattern_analysis` with `data_available=false`").
    #[must_use]
    pub fn empty() -> Self {
        Self {
            data_available: false,
            similar_projects: Vec::new(),
            velocity_trends: VelocityTrends::insufficient_data(0.0),
            success_indicators: SuccessIndicators::empty(),
            overall_confidence: 0.0,
        }
    }
}
