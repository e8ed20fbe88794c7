//! Collaborator interfaces (`SPEC_FULL.md` §4.13).
//!
//! Each upstream microservice the Project Analyzer / Rule-Based Planner /
//! Cron Controller depend on is expressed as an `async_trait` so the
//! Enhanced Decision Engine can be constructed against either the HTTP
//! implementations in [`http_clients`] or the in-memory test doubles in
//! [`fakes`] — mirroring the teacher's `StorageBackend`/`EmbeddingProvider`
//! trait-behind-constructor pattern.

pub mod fakes;
pub mod http_clients;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ActiveSprint, TeamAvailability};

/// Project metadata as reported by the project collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub project_id: String,
    pub status: String,
    pub team_size: usize,
}

/// Backlog aggregate as reported by the backlog collaborator.
///
/// `unassigned_for_sprint_count` MUST be derived upstream as
/// `status='unassigned' AND sprint_id IS NULL` (§6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogSummary {
    pub total_tasks: i64,
    pub unassigned_for_sprint_count: i64,
}

/// Mandatory: project details lookup.
#[async_trait]
pub trait ProjectService: Send + Sync {
    async fn get_project(&self, project_id: &str) -> Result<ProjectDetails>;
}

/// Mandatory: team availability over an explicit, half-open date range.
#[async_trait]
pub trait TeamService: Send + Sync {
    async fn get_availability(
        &self,
        project_id: &str,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<TeamAvailability>;
}

/// Mandatory: backlog summary.
#[async_trait]
pub trait BacklogService: Send + Sync {
    async fn get_backlog_summary(&self, project_id: &str) -> Result<BacklogSummary>;
}

/// Mandatory: sprint lookups and mutations.
#[async_trait]
pub trait SprintService: Send + Sync {
    async fn get_active_sprint(&self, project_id: &str) -> Result<Option<ActiveSprint>>;
    async fn count_sprints(&self, project_id: &str) -> Result<usize>;
    async fn close_sprint(&self, project_id: &str, sprint_id: &str) -> Result<()>;
    async fn create_sprint(
        &self,
        project_id: &str,
        duration_weeks: i64,
        task_count: i64,
    ) -> Result<String>;
    async fn create_retrospective(&self, project_id: &str, sprint_id: &str) -> Result<()>;
}

/// Optional: Kubernetes-style scheduled-job lookups and mutations (§4.11).
#[async_trait]
pub trait SchedulerService: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool>;
    async fn create(&self, name: &str, manifest: &str) -> Result<()>;
    async fn delete(&self, name: &str) -> Result<()>;
}

/// Optional: LLM advisory generation (§4.12).
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}
