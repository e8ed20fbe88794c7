//! Project Analyzer (`SPEC_FULL.md` §4.1).
//!
//! Aggregates the four mandatory collaborators into one
//! [`ProjectAnalysisSnapshot`], the single input every downstream component
//! of the Enhanced Decision Engine reads. Mirrors the teacher's
//! `memory_manager::build_context` fan-out-then-assemble shape: each
//! collaborator call is independent, and a failure on any mandatory
//! collaborator aborts the whole analysis (§4.1 "mandatory collaborators").

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{instrument, warn};

use crate::collaborators::{BacklogService, ProjectService, SprintService, TeamService};
use crate::error::Result;
use crate::types::{DataQualityReport, PatternAnalysis, ProjectAnalysisSnapshot};

/// Width of the look-ahead window used to query team availability. The
/// Rule-Based Planner's own sprint-duration decision happens downstream and
/// may span a different window; this one only has to be wide enough to
/// surface near-term conflicts for the insights summary.
const AVAILABILITY_LOOKAHEAD_DAYS: i64 = 14;

/// Assembles a [`ProjectAnalysisSnapshot`] from the mandatory collaborators.
pub struct ProjectAnalyzer {
    project_service: Arc<dyn ProjectService>,
    team_service: Arc<dyn TeamService>,
    backlog_service: Arc<dyn BacklogService>,
    sprint_service: Arc<dyn SprintService>,
}

impl ProjectAnalyzer {
    #[must_use]
    pub fn new(
        project_service: Arc<dyn ProjectService>,
        team_service: Arc<dyn TeamService>,
        backlog_service: Arc<dyn BacklogService>,
        sprint_service: Arc<dyn SprintService>,
    ) -> Self {
        Self {
            project_service,
            team_service,
            backlog_service,
            sprint_service,
        }
    }

    /// Build the snapshot. `pattern_analysis` is left at
    /// [`PatternAnalysis::empty`] — the Enhanced Decision Engine fills it in
    /// after running the Pattern Engine, since the two components are
    /// independent fan-outs over the same snapshot (§4.1, §4.10).
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn analyze(&self, project_id: &str) -> Result<ProjectAnalysisSnapshot> {
        let project = self.project_service.get_project(project_id).await?;

        let window_start = Utc::now().date_naive();
        let window_end = window_start + ChronoDuration::days(AVAILABILITY_LOOKAHEAD_DAYS);
        let team_availability = self
            .team_service
            .get_availability(project_id, window_start, window_end)
            .await?;

        let backlog = self.backlog_service.get_backlog_summary(project_id).await?;
        let current_active_sprint = self.sprint_service.get_active_sprint(project_id).await?;
        let active_sprints_count = self.sprint_service.count_sprints(project_id).await?;

        if current_active_sprint.is_some() && active_sprints_count == 0 {
            warn!(
                project_id,
                "sprint collaborator reported an active sprint but a zero sprint count; treating count as 1"
            );
        }
        let active_sprints_count = if current_active_sprint.is_some() {
            active_sprints_count.max(1)
        } else {
            active_sprints_count
        };

        let mut insights_summary = Vec::new();
        if backlog.unassigned_for_sprint_count > 0 {
            insights_summary.push(format!(
                "{} unassigned task(s) eligible for sprint planning",
                backlog.unassigned_for_sprint_count
            ));
        }
        let conflicts = team_availability.intersects(window_start, window_end);
        if !conflicts.is_empty() {
            insights_summary.push(format!(
                "{} scheduling conflict(s) in the next {AVAILABILITY_LOOKAHEAD_DAYS} days",
                conflicts.len()
            ));
        }
        if let Some(sprint) = &current_active_sprint {
            if sprint.all_tasks_complete() {
                insights_summary.push("active sprint has completed all tasks".to_string());
            }
        }

        let snapshot = ProjectAnalysisSnapshot {
            project_id: project.project_id,
            project_status: project.status,
            team_size: project.team_size,
            team_availability,
            backlog_tasks: backlog.total_tasks,
            unassigned_tasks: backlog.unassigned_for_sprint_count,
            active_sprints_count,
            current_active_sprint,
            pattern_analysis: PatternAnalysis::empty(),
            insights_summary,
            data_quality_report: DataQualityReport::default(),
        };
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{
        FakeBacklogService, FakeProjectService, FakeSprintService, FakeTeamService,
    };
    use crate::collaborators::{BacklogSummary, ProjectDetails};

    fn analyzer_with_fakes() -> (
        ProjectAnalyzer,
        Arc<FakeProjectService>,
        Arc<FakeBacklogService>,
        Arc<FakeSprintService>,
    ) {
        let project = Arc::new(FakeProjectService::new());
        let team = Arc::new(FakeTeamService::new());
        let backlog = Arc::new(FakeBacklogService::new());
        let sprint = Arc::new(FakeSprintService::new());
        let analyzer = ProjectAnalyzer::new(
            project.clone(),
            team.clone(),
            backlog.clone(),
            sprint.clone(),
        );
        (analyzer, project, backlog, sprint)
    }

    #[tokio::test]
    async fn analyze_fails_when_project_unknown() {
        let (analyzer, ..) = analyzer_with_fakes();
        let err = analyzer.analyze("MISSING").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::NotFound(_)));
    }

    #[tokio::test]
    async fn analyze_aggregates_mandatory_collaborators() {
        let (analyzer, project, backlog, sprint) = analyzer_with_fakes();
        project.seed(ProjectDetails {
            project_id: "PRJ-1".to_string(),
            status: "active".to_string(),
            team_size: 6,
        });
        backlog.seed(
            "PRJ-1",
            BacklogSummary {
                total_tasks: 20,
                unassigned_for_sprint_count: 7,
            },
        );
        sprint.seed_count("PRJ-1", 2);

        let snapshot = analyzer.analyze("PRJ-1").await.unwrap();
        assert_eq!(snapshot.team_size, 6);
        assert_eq!(snapshot.backlog_tasks, 20);
        assert_eq!(snapshot.unassigned_tasks, 7);
        assert_eq!(snapshot.active_sprints_count, 2);
        assert!(!snapshot.pattern_analysis.data_available);
        assert!(snapshot
            .insights_summary
            .iter()
            .any(|s| s.contains("unassigned task")));
    }
}
