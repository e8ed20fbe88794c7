//! Programmable in-memory collaborator doubles.
//!
//! Grounded on the teacher's `storage::MockStorageBackend`-style test
//! doubles: each fake is a thin `parking_lot::Mutex`-guarded map the test
//! (or a local demo binary) seeds directly, with no network or persistence
//! involved. These are NOT behind `#[cfg(test)]` so `orchestrator-server`
//! can wire an offline/demo mode against them without a real collaborator
//! fleet.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::types::{ActiveSprint, TeamAvailability, TeamAvailabilityStatus};

use super::{BacklogService, BacklogSummary, ProjectDetails, ProjectService, SchedulerService, SprintService, TeamService};

/// In-memory [`ProjectService`] seeded with a fixed project table.
#[derive(Debug, Default)]
pub struct FakeProjectService {
    projects: Mutex<HashMap<String, ProjectDetails>>,
}

impl FakeProjectService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, details: ProjectDetails) {
        self.projects.lock().insert(details.project_id.clone(), details);
    }
}

#[async_trait]
impl ProjectService for FakeProjectService {
    async fn get_project(&self, project_id: &str) -> Result<ProjectDetails> {
        self.projects
            .lock()
            .get(project_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("project {project_id} not known to fake collaborator")))
    }
}

/// In-memory [`TeamService`] returning a fixed availability per project.
#[derive(Debug, Default)]
pub struct FakeTeamService {
    availability: Mutex<HashMap<String, TeamAvailability>>,
}

impl FakeTeamService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, project_id: impl Into<String>, availability: TeamAvailability) {
        self.availability.lock().insert(project_id.into(), availability);
    }
}

#[async_trait]
impl TeamService for FakeTeamService {
    async fn get_availability(
        &self,
        project_id: &str,
        _window_start: NaiveDate,
        _window_end: NaiveDate,
    ) -> Result<TeamAvailability> {
        Ok(self.availability.lock().get(project_id).cloned().unwrap_or(TeamAvailability {
            status: TeamAvailabilityStatus::Available,
            conflicts: Vec::new(),
        }))
    }
}

/// In-memory [`BacklogService`] returning a fixed summary per project.
#[derive(Debug, Default)]
pub struct FakeBacklogService {
    summaries: Mutex<HashMap<String, BacklogSummary>>,
}

impl FakeBacklogService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, project_id: impl Into<String>, summary: BacklogSummary) {
        self.summaries.lock().insert(project_id.into(), summary);
    }
}

#[async_trait]
impl BacklogService for FakeBacklogService {
    async fn get_backlog_summary(&self, project_id: &str) -> Result<BacklogSummary> {
        self.summaries
            .lock()
            .get(project_id)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("no backlog summary seeded for {project_id}")))
    }
}

/// In-memory [`SprintService`] tracking active sprints and a sprint counter
/// per project, and recording closures/creations for test assertions.
#[derive(Debug, Default)]
pub struct FakeSprintService {
    active: Mutex<HashMap<String, ActiveSprint>>,
    counts: Mutex<HashMap<String, usize>>,
    closed: Mutex<Vec<(String, String)>>,
    created: Mutex<Vec<(String, i64, i64)>>,
    retrospectives: Mutex<Vec<(String, String)>>,
}

impl FakeSprintService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_active(&self, project_id: impl Into<String>, sprint: ActiveSprint) {
        self.active.lock().insert(project_id.into(), sprint);
    }

    pub fn seed_count(&self, project_id: impl Into<String>, count: usize) {
        self.counts.lock().insert(project_id.into(), count);
    }

    #[must_use]
    pub fn closed_calls(&self) -> Vec<(String, String)> {
        self.closed.lock().clone()
    }

    #[must_use]
    pub fn created_calls(&self) -> Vec<(String, i64, i64)> {
        self.created.lock().clone()
    }
}

#[async_trait]
impl SprintService for FakeSprintService {
    async fn get_active_sprint(&self, project_id: &str) -> Result<Option<ActiveSprint>> {
        Ok(self.active.lock().get(project_id).cloned())
    }

    async fn count_sprints(&self, project_id: &str) -> Result<usize> {
        Ok(self.counts.lock().get(project_id).copied().unwrap_or(0))
    }

    async fn close_sprint(&self, project_id: &str, sprint_id: &str) -> Result<()> {
        self.closed.lock().push((project_id.to_string(), sprint_id.to_string()));
        self.active.lock().remove(project_id);
        Ok(())
    }

    async fn create_sprint(
        &self,
        project_id: &str,
        duration_weeks: i64,
        task_count: i64,
    ) -> Result<String> {
        self.created.lock().push((project_id.to_string(), duration_weeks, task_count));
        let mut counts = self.counts.lock();
        let next = counts.entry(project_id.to_string()).or_insert(0);
        *next += 1;
        Ok(format!("{project_id}-sprint-{next}"))
    }

    async fn create_retrospective(&self, project_id: &str, sprint_id: &str) -> Result<()> {
        self.retrospectives.lock().push((project_id.to_string(), sprint_id.to_string()));
        Ok(())
    }
}

/// In-memory [`SchedulerService`] tracking which named jobs exist.
#[derive(Debug, Default)]
pub struct FakeSchedulerService {
    jobs: Mutex<HashMap<String, String>>,
}

impl FakeSchedulerService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn job_names(&self) -> Vec<String> {
        self.jobs.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl SchedulerService for FakeSchedulerService {
    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.jobs.lock().contains_key(name))
    }

    async fn create(&self, name: &str, manifest: &str) -> Result<()> {
        self.jobs.lock().insert(name.to_string(), manifest.to_string());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.jobs.lock().remove(name);
        Ok(())
    }
}
