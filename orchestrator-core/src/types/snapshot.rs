//! Project Analysis Snapshot (`SPEC_FULL.md` §3).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::pattern::PatternAnalysis;

/// A single scheduling conflict surfaced by the team-availability
/// collaborator (e.g. a holiday or planned leave).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_type: String,
    pub date: NaiveDate,
    pub name: String,
    pub details: String,
}

/// Overall availability status for the team over the requested window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamAvailabilityStatus {
    Available,
    PartiallyAvailable,
    Unavailable,
}

/// Team availability over the analyzer's requested date window.
///
/// Invariant: `conflicts` is ordered by `date` ascending (possibly empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAvailability {
    pub status: TeamAvailabilityStatus,
    pub conflicts: Vec<Conflict>,
}

impl TeamAvailability {
    /// Whether the half-open window `[start, end)` intersects any conflict
    /// date. Used by the Rule-Based Planner to append non-blocking warnings.
    #[must_use]
    pub fn intersects(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Conflict> {
        self.conflicts
            .iter()
            .filter(|c| c.date >= start && c.date < end)
            .collect()
    }
}

/// The project's currently active sprint, as reported by the sprint
/// collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSprint {
    pub sprint_id: String,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Sprint velocities (tasks/week) of the project's recent history,
    /// most-recent last, used by the Pattern Engine's regression (§4.3).
    pub recent_velocities: Vec<f64>,
    /// Cumulative tasks still outstanding at the last burndown sample,
    /// used by the Decision Modifier's active-sprint classification (§4.4).
    pub remaining_tasks: i64,
    pub forecast_velocity: f64,
}

impl ActiveSprint {
    #[must_use]
    pub fn all_tasks_complete(&self) -> bool {
        self.total_tasks > 0 && self.completed_tasks >= self.total_tasks
    }
}

/// A qualitative summary of the data-quality backing the pattern analysis,
/// surfaced for operators (not fed back into thresholds).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub data_available: bool,
    pub similar_projects_considered: usize,
    pub notes: Vec<String>,
}

/// The Project Analyzer's output: a transient, per-request aggregation of
/// project state (`SPEC_FULL.md` §3, §4.1).
///
/// Invariants:
/// - `unassigned_tasks >= 0`
/// - if `current_active_sprint` is `Some`, then `active_sprints_count >= 1`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAnalysisSnapshot {
    pub project_id: String,
    pub project_status: String,
    pub team_size: usize,
    pub team_availability: TeamAvailability,
    pub backlog_tasks: i64,
    pub unassigned_tasks: i64,
    pub active_sprints_count: usize,
    pub current_active_sprint: Option<ActiveSprint>,
    pub pattern_analysis: PatternAnalysis,
    pub insights_summary: Vec<String>,
    pub data_quality_report: DataQualityReport,
}

impl ProjectAnalysisSnapshot {
    /// Validate the invariants documented on this struct. Constructors that
    /// assemble a snapshot from collaborator responses call this before
    /// returning it to the Rule-Based Planner.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.unassigned_tasks < 0 {
            return Err(crate::error::Error::InternalError(
                "unassigned_tasks must be >= 0".to_string(),
            ));
        }
        if self.current_active_sprint.is_some() && self.active_sprints_count == 0 {
            return Err(crate::error::Error::InternalError(
                "active_sprints_count must be >= 1 when current_active_sprint is set".to_string(),
            ));
        }
        let mut prev: Option<NaiveDate> = None;
        for c in &self.team_availability.conflicts {
            if let Some(p) = prev {
                if c.date < p {
                    return Err(crate::error::Error::InternalError(
                        "team_availability.conflicts must be ordered by date ascending"
                            .to_string(),
                    ));
                }
            }
            prev = Some(c.date);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::pattern::PatternAnalysis;

    fn base_snapshot() -> ProjectAnalysisSnapshot {
        ProjectAnalysisSnapshot {
            project_id: "TEST-001".to_string(),
            project_status: "active".to_string(),
            team_size: 5,
            team_availability: TeamAvailability {
                status: TeamAvailabilityStatus::Available,
                conflicts: vec![],
            },
            backlog_tasks: 10,
            unassigned_tasks: 5,
            active_sprints_count: 0,
            current_active_sprint: None,
            pattern_analysis: PatternAnalysis::empty(),
            insights_summary: vec![],
            data_quality_report: DataQualityReport::default(),
        }
    }

    #[test]
    fn rejects_negative_unassigned_tasks() {
        let mut snap = base_snapshot();
        snap.unassigned_tasks = -1;
        assert!(snap.validate().is_err());
    }

    #[test]
    fn rejects_active_sprint_without_count() {
        let mut snap = base_snapshot();
        snap.current_active_sprint = Some(ActiveSprint {
            sprint_id: "S1".to_string(),
            total_tasks: 4,
            completed_tasks: 4,
            started_at: chrono::Utc::now(),
            recent_velocities: vec![],
            remaining_tasks: 0,
            forecast_velocity: 0.0,
        });
        snap.active_sprints_count = 0;
        assert!(snap.validate().is_err());
    }

    #[test]
    fn accepts_valid_snapshot() {
        assert!(base_snapshot().validate().is_ok());
    }
}
