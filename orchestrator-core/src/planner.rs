//! Rule-Based Planner (`SPEC_FULL.md` §4.2).
//!
//! Deterministic, dependency-free baseline decision. Every branch is
//! explainable from the snapshot alone — no historical data, no
//! collaborator calls — so it can always serve as the Enhanced Decision
//! Engine's fallback when the intelligence layer degrades (§4.10).

use chrono::{Duration as ChronoDuration, Utc};
use tracing::instrument;

use crate::config::IntelligenceConfig;
use crate::types::{ProjectAnalysisSnapshot, RuleBasedDecision, TeamAvailabilityStatus};

/// Default sprint length applied when no intelligence adjustment overrides
/// it (§4.2, consistent with the Decision Modifier's `original` baseline).
pub const DEFAULT_SPRINT_DURATION_WEEKS: i64 = 2;

/// Produces a [`RuleBasedDecision`] from a snapshot alone.
pub struct RuleBasedPlanner {
    max_tasks_per_sprint: i64,
}

impl RuleBasedPlanner {
    #[must_use]
    pub fn new(config: &IntelligenceConfig) -> Self {
        Self {
            max_tasks_per_sprint: config.max_tasks_per_sprint,
        }
    }

    #[instrument(skip(self, snapshot), fields(project_id = %snapshot.project_id))]
    #[must_use]
    pub fn plan(&self, snapshot: &ProjectAnalysisSnapshot) -> RuleBasedDecision {
        let mut reasoning = Vec::new();
        let mut warnings = Vec::new();

        if let Some(active) = &snapshot.current_active_sprint {
            if active.all_tasks_complete() {
                reasoning.push(format!(
                    "active sprint {} has all {} tasks complete; closing it",
                    active.sprint_id, active.total_tasks
                ));
                let (create_new_sprint, tasks_to_assign) =
                    self.next_sprint_plan(snapshot, &mut reasoning, &mut warnings);
                return RuleBasedDecision {
                    create_new_sprint,
                    tasks_to_assign,
                    sprint_duration_weeks: DEFAULT_SPRINT_DURATION_WEEKS,
                    sprint_closure_triggered: true,
                    sprint_id_to_close: Some(active.sprint_id.clone()),
                    ensure_cronjob_for_sprint_id: None,
                    reasoning,
                    warnings,
                };
            }
            reasoning.push(format!(
                "active sprint {} still in progress ({}/{} tasks complete); no new sprint created",
                active.sprint_id, active.completed_tasks, active.total_tasks
            ));
            reasoning.push(format!(
                "self-healing: ensuring scheduled job exists for active sprint {}",
                active.sprint_id
            ));
            return RuleBasedDecision {
                create_new_sprint: false,
                tasks_to_assign: 0,
                sprint_duration_weeks: DEFAULT_SPRINT_DURATION_WEEKS,
                sprint_closure_triggered: false,
                sprint_id_to_close: None,
                ensure_cronjob_for_sprint_id: Some(active.sprint_id.clone()),
                reasoning,
                warnings,
            };
        }

        let (create_new_sprint, tasks_to_assign) =
            self.next_sprint_plan(snapshot, &mut reasoning, &mut warnings);
        RuleBasedDecision {
            create_new_sprint,
            tasks_to_assign,
            sprint_duration_weeks: DEFAULT_SPRINT_DURATION_WEEKS,
            sprint_closure_triggered: false,
            sprint_id_to_close: None,
            ensure_cronjob_for_sprint_id: None,
            reasoning,
            warnings,
        }
    }

    /// Whether a new sprint should be created with the backlog on hand, and
    /// how many tasks it should take (capped at `max_tasks_per_sprint`).
    /// When a new sprint is planned, also checks the planning window against
    /// `team_availability.conflicts` (e.g. configured holidays) and raises a
    /// non-blocking warning for any overlap rather than deferring (§8
    /// "holiday warning, not blocking").
    fn next_sprint_plan(
        &self,
        snapshot: &ProjectAnalysisSnapshot,
        reasoning: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) -> (bool, i64) {
        if snapshot.unassigned_tasks <= 0 {
            reasoning.push("no unassigned tasks in backlog; no new sprint".to_string());
            return (false, 0);
        }
        if matches!(
            snapshot.team_availability.status,
            TeamAvailabilityStatus::Unavailable
        ) {
            reasoning.push("team unavailable over the planning window; deferring new sprint".to_string());
            return (false, 0);
        }
        let tasks_to_assign = snapshot.unassigned_tasks.min(self.max_tasks_per_sprint);
        reasoning.push(format!(
            "{tasks_to_assign} of {} unassigned task(s) assigned to a new sprint",
            snapshot.unassigned_tasks
        ));
        if matches!(
            snapshot.team_availability.status,
            TeamAvailabilityStatus::PartiallyAvailable
        ) {
            reasoning.push("team only partially available over the planning window".to_string());
        }

        let window_start = Utc::now().date_naive();
        let window_end = window_start + ChronoDuration::weeks(DEFAULT_SPRINT_DURATION_WEEKS);
        for conflict in snapshot.team_availability.intersects(window_start, window_end) {
            let note = format!(
                "planned sprint window overlaps {} \"{}\" on {}",
                conflict.conflict_type, conflict.name, conflict.date
            );
            reasoning.push(format!("non-blocking: {note}"));
            warnings.push(note);
        }

        (true, tasks_to_assign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActiveSprint, DataQualityReport, PatternAnalysis, TeamAvailability};

    fn snapshot(unassigned_tasks: i64, status: TeamAvailabilityStatus) -> ProjectAnalysisSnapshot {
        ProjectAnalysisSnapshot {
            project_id: "PRJ-1".to_string(),
            project_status: "active".to_string(),
            team_size: 5,
            team_availability: TeamAvailability {
                status,
                conflicts: vec![],
            },
            backlog_tasks: unassigned_tasks,
            unassigned_tasks,
            active_sprints_count: 0,
            current_active_sprint: None,
            pattern_analysis: PatternAnalysis::empty(),
            insights_summary: vec![],
            data_quality_report: DataQualityReport::default(),
        }
    }

    #[test]
    fn creates_sprint_when_backlog_and_team_available() {
        let planner = RuleBasedPlanner::new(&IntelligenceConfig::default());
        let decision = planner.plan(&snapshot(10, TeamAvailabilityStatus::Available));
        assert!(decision.create_new_sprint);
        assert_eq!(decision.tasks_to_assign, 10);
        assert!(!decision.sprint_closure_triggered);
    }

    #[test]
    fn caps_tasks_at_max_per_sprint() {
        let mut cfg = IntelligenceConfig::default();
        cfg.max_tasks_per_sprint = 5;
        let planner = RuleBasedPlanner::new(&cfg);
        let decision = planner.plan(&snapshot(10, TeamAvailabilityStatus::Available));
        assert_eq!(decision.tasks_to_assign, 5);
    }

    #[test]
    fn defers_when_team_unavailable() {
        let planner = RuleBasedPlanner::new(&IntelligenceConfig::default());
        let decision = planner.plan(&snapshot(10, TeamAvailabilityStatus::Unavailable));
        assert!(!decision.create_new_sprint);
    }

    #[test]
    fn closes_completed_active_sprint_and_plans_next() {
        let planner = RuleBasedPlanner::new(&IntelligenceConfig::default());
        let mut snap = snapshot(6, TeamAvailabilityStatus::Available);
        snap.current_active_sprint = Some(ActiveSprint {
            sprint_id: "PRJ-1-sprint-1".to_string(),
            total_tasks: 8,
            completed_tasks: 8,
            started_at: chrono::Utc::now(),
            recent_velocities: vec![4.0, 4.0],
            remaining_tasks: 0,
            forecast_velocity: 4.0,
        });
        let decision = planner.plan(&snap);
        assert!(decision.sprint_closure_triggered);
        assert_eq!(decision.sprint_id_to_close, Some("PRJ-1-sprint-1".to_string()));
        assert!(decision.create_new_sprint);
        assert_eq!(decision.tasks_to_assign, 6);
    }

    #[test]
    fn warns_but_still_creates_sprint_over_a_holiday() {
        use crate::types::Conflict;

        let planner = RuleBasedPlanner::new(&IntelligenceConfig::default());
        let mut snap = snapshot(10, TeamAvailabilityStatus::Available);
        let holiday = Utc::now().date_naive() + ChronoDuration::days(3);
        snap.team_availability.conflicts = vec![Conflict {
            conflict_type: "holiday".to_string(),
            date: holiday,
            name: "Company Holiday".to_string(),
            details: "office closed".to_string(),
        }];

        let decision = planner.plan(&snap);
        assert!(decision.create_new_sprint);
        assert_eq!(decision.tasks_to_assign, 10);
        assert_eq!(decision.warnings.len(), 1);
        assert!(decision.warnings[0].contains("Company Holiday"));
    }

    #[test]
    fn leaves_in_progress_sprint_untouched() {
        let planner = RuleBasedPlanner::new(&IntelligenceConfig::default());
        let mut snap = snapshot(6, TeamAvailabilityStatus::Available);
        snap.current_active_sprint = Some(ActiveSprint {
            sprint_id: "PRJ-1-sprint-1".to_string(),
            total_tasks: 8,
            completed_tasks: 3,
            started_at: chrono::Utc::now(),
            recent_velocities: vec![3.0],
            remaining_tasks: 5,
            forecast_velocity: 3.0,
        });
        let decision = planner.plan(&snap);
        assert!(!decision.sprint_closure_triggered);
        assert!(!decision.create_new_sprint);
        assert_eq!(decision.ensure_cronjob_for_sprint_id, Some("PRJ-1-sprint-1".to_string()));
        assert!(decision.reasoning.iter().any(|r| r.contains("self-healing")));
    }
}
