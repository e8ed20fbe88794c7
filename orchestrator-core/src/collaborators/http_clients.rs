//! Thin `reqwest`-backed collaborator clients (§4.13, §6.2).
//!
//! Every client retries idempotent GETs up to
//! `CollaboratorClientConfig::max_retries` times with linear backoff before
//! surfacing [`Error::UpstreamUnavailable`], mirroring the teacher's
//! `embeddings::client` retry loop. Mutating calls (`close_sprint`,
//! `create_sprint`, scheduler writes) are never retried automatically.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::config::{AdvisorConfig, CollaboratorClientConfig};
use crate::error::{Error, Result};
use crate::types::{ActiveSprint, TeamAvailability};

use super::{
    BacklogService, BacklogSummary, LlmService, ProjectDetails, ProjectService, SchedulerService,
    SprintService, TeamService,
};

async fn get_with_retry<T: for<'de> Deserialize<'de>>(
    client: &reqwest::Client,
    cfg: &CollaboratorClientConfig,
    url: &str,
) -> Result<T> {
    let mut last_err = None;
    for attempt in 0..=cfg.max_retries {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(150 * u64::from(attempt))).await;
        }
        let sent = client.get(url).timeout(cfg.timeout()).send().await;
        match sent {
            Ok(resp) if resp.status().is_success() => {
                return resp
                    .json::<T>()
                    .await
                    .map_err(|e| Error::UpstreamUnavailable(format!("malformed response from {url}: {e}")));
            }
            Ok(resp) if resp.status().as_u16() == 404 => {
                return Err(Error::NotFound(format!("{url} returned 404")));
            }
            Ok(resp) => last_err = Some(format!("{url} returned status {}", resp.status())),
            Err(e) if e.is_timeout() => return Err(Error::Timeout(cfg.timeout())),
            Err(e) => last_err = Some(e.to_string()),
        }
    }
    Err(Error::UpstreamUnavailable(last_err.unwrap_or_else(|| url.to_string())))
}

/// `GET {base_url}/projects/{project_id}`.
pub struct HttpProjectClient {
    client: reqwest::Client,
    cfg: CollaboratorClientConfig,
}

impl HttpProjectClient {
    #[must_use]
    pub fn new(client: reqwest::Client, cfg: CollaboratorClientConfig) -> Self {
        Self { client, cfg }
    }
}

#[async_trait]
impl ProjectService for HttpProjectClient {
    async fn get_project(&self, project_id: &str) -> Result<ProjectDetails> {
        let url = format!("{}/projects/{project_id}", self.cfg.base_url);
        get_with_retry(&self.client, &self.cfg, &url).await
    }
}

/// `GET {base_url}/teams/availability?project_id=..&start=..&end=..`.
pub struct HttpTeamClient {
    client: reqwest::Client,
    cfg: CollaboratorClientConfig,
}

impl HttpTeamClient {
    #[must_use]
    pub fn new(client: reqwest::Client, cfg: CollaboratorClientConfig) -> Self {
        Self { client, cfg }
    }
}

#[async_trait]
impl TeamService for HttpTeamClient {
    async fn get_availability(
        &self,
        project_id: &str,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<TeamAvailability> {
        let url = format!(
            "{}/teams/availability?project_id={project_id}&start={window_start}&end={window_end}",
            self.cfg.base_url
        );
        get_with_retry(&self.client, &self.cfg, &url).await
    }
}

/// `GET {base_url}/backlog/summary?project_id=..`.
pub struct HttpBacklogClient {
    client: reqwest::Client,
    cfg: CollaboratorClientConfig,
}

impl HttpBacklogClient {
    #[must_use]
    pub fn new(client: reqwest::Client, cfg: CollaboratorClientConfig) -> Self {
        Self { client, cfg }
    }
}

#[async_trait]
impl BacklogService for HttpBacklogClient {
    async fn get_backlog_summary(&self, project_id: &str) -> Result<BacklogSummary> {
        let url = format!("{}/backlog/summary?project_id={project_id}", self.cfg.base_url);
        get_with_retry(&self.client, &self.cfg, &url).await
    }
}

/// Sprint reads and writes against `{base_url}/sprints/...`.
pub struct HttpSprintClient {
    client: reqwest::Client,
    cfg: CollaboratorClientConfig,
}

impl HttpSprintClient {
    #[must_use]
    pub fn new(client: reqwest::Client, cfg: CollaboratorClientConfig) -> Self {
        Self { client, cfg }
    }
}

#[async_trait]
impl SprintService for HttpSprintClient {
    async fn get_active_sprint(&self, project_id: &str) -> Result<Option<ActiveSprint>> {
        let url = format!("{}/sprints/active?project_id={project_id}", self.cfg.base_url);
        match get_with_retry::<ActiveSprint>(&self.client, &self.cfg, &url).await {
            Ok(sprint) => Ok(Some(sprint)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn count_sprints(&self, project_id: &str) -> Result<usize> {
        #[derive(Deserialize)]
        struct CountResponse {
            count: usize,
        }
        let url = format!("{}/sprints/count?project_id={project_id}", self.cfg.base_url);
        Ok(get_with_retry::<CountResponse>(&self.client, &self.cfg, &url).await?.count)
    }

    async fn close_sprint(&self, project_id: &str, sprint_id: &str) -> Result<()> {
        let url = format!("{}/sprints/{sprint_id}/close?project_id={project_id}", self.cfg.base_url);
        self.client
            .post(&url)
            .timeout(self.cfg.timeout())
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn create_sprint(
        &self,
        project_id: &str,
        duration_weeks: i64,
        task_count: i64,
    ) -> Result<String> {
        #[derive(Deserialize)]
        struct CreateResponse {
            sprint_id: String,
        }
        let url = format!("{}/sprints", self.cfg.base_url);
        let resp = self
            .client
            .post(&url)
            .timeout(self.cfg.timeout())
            .json(&serde_json::json!({
                "project_id": project_id,
                "duration_weeks": duration_weeks,
                "task_count": task_count,
            }))
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?
            .json::<CreateResponse>()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;
        Ok(resp.sprint_id)
    }

    async fn create_retrospective(&self, project_id: &str, sprint_id: &str) -> Result<()> {
        let url = format!("{}/sprints/{sprint_id}/retrospective?project_id={project_id}", self.cfg.base_url);
        self.client
            .post(&url)
            .timeout(self.cfg.timeout())
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;
        Ok(())
    }
}

/// Kubernetes-style scheduled job control via `{base_url}/scheduledjobs/...`.
pub struct HttpSchedulerClient {
    client: reqwest::Client,
    cfg: CollaboratorClientConfig,
}

impl HttpSchedulerClient {
    #[must_use]
    pub fn new(client: reqwest::Client, cfg: CollaboratorClientConfig) -> Self {
        Self { client, cfg }
    }
}

#[async_trait]
impl SchedulerService for HttpSchedulerClient {
    async fn exists(&self, name: &str) -> Result<bool> {
        let url = format!("{}/scheduledjobs/{name}", self.cfg.base_url);
        match self.client.get(&url).timeout(self.cfg.timeout()).send().await {
            Ok(resp) if resp.status().as_u16() == 404 => Ok(false),
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => Err(Error::UpstreamUnavailable(format!("{url} returned {}", resp.status()))),
            Err(e) if e.is_timeout() => Err(Error::Timeout(self.cfg.timeout())),
            Err(e) => Err(Error::UpstreamUnavailable(e.to_string())),
        }
    }

    async fn create(&self, name: &str, manifest: &str) -> Result<()> {
        let url = format!("{}/scheduledjobs", self.cfg.base_url);
        self.client
            .post(&url)
            .timeout(self.cfg.timeout())
            .header("content-type", "application/yaml")
            .body(manifest.to_string())
            .query(&[("name", name)])
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let url = format!("{}/scheduledjobs/{name}", self.cfg.base_url);
        self.client
            .delete(&url)
            .timeout(self.cfg.timeout())
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;
        Ok(())
    }
}

/// Ollama-compatible generation endpoint, `POST {service_url}/api/generate`.
pub struct HttpLlmClient {
    client: reqwest::Client,
    cfg: AdvisorConfig,
}

impl HttpLlmClient {
    #[must_use]
    pub fn new(client: reqwest::Client, cfg: AdvisorConfig) -> Self {
        Self { client, cfg }
    }
}

#[async_trait]
impl LlmService for HttpLlmClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct GenerateResponse {
            response: String,
        }
        let url = format!("{}/api/generate", self.cfg.service_url);
        let resp = self
            .client
            .post(&url)
            .timeout(self.cfg.timeout())
            .json(&serde_json::json!({ "model": model, "prompt": prompt, "stream": false }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.cfg.timeout())
                } else {
                    Error::UpstreamUnavailable(e.to_string())
                }
            })?
            .error_for_status()
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?
            .json::<GenerateResponse>()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;
        Ok(resp.response)
    }
}
