//! Cron / Self-Heal Controller (`SPEC_FULL.md` §4.11, §8).
//!
//! Owns the deterministic scheduled-job naming scheme and the manifest
//! template handed to [`SchedulerService`]. The REDESIGN FLAGS call out the
//! source's health-wait script using bash-only `==` inside a POSIX `sh`
//! shebang; this controller emits the portable `=` form instead.

use std::sync::Arc;

use tracing::instrument;

use crate::collaborators::SchedulerService;
use crate::error::Result;

/// Canonical scheduled-job name for one project/sprint pair (§8 testable
/// property: deterministic, lower-cased, stable under repeated calls).
#[must_use]
pub fn job_name(project_id: &str, sprint_id: &str) -> String {
    format!(
        "run-dailyscrum-{}-{}",
        project_id.to_lowercase(),
        sprint_id.to_lowercase()
    )
}

/// A minimal Kubernetes-style `CronJob` manifest invoking the daily scrum
/// orchestration call, with a POSIX-portable `sh -c` health-wait guard.
#[must_use]
pub fn manifest(project_id: &str, sprint_id: &str, orchestrate_url: &str) -> String {
    let name = job_name(project_id, sprint_id);
    format!(
        r#"apiVersion: batch/v1
kind: CronJob
metadata:
  name: {name}
spec:
  schedule: "0 9 * * 1-5"
  jobTemplate:
    spec:
      template:
        spec:
          restartPolicy: OnFailure
          containers:
            - name: daily-scrum
              image: curlimages/curl:latest
              command: ["/bin/sh", "-c"]
              args:
                - |
                  STATUS=$(curl -sf {orchestrate_url}/health/ready | grep -o '"status":"[a-z]*"' | cut -d'"' -f4)
                  if [ "$STATUS" = "ready" ]; then
                    curl -sf -X POST {orchestrate_url}/orchestrate/project/{project_id}
                  else
                    echo "orchestration service not ready, skipping run" >&2
                    exit 1
                  fi
"#
    )
}

/// Ensures exactly one scheduled job exists per project/sprint, and can
/// tear it down once the sprint closes.
pub struct CronController {
    scheduler: Arc<dyn SchedulerService>,
    orchestrate_base_url: String,
}

impl CronController {
    #[must_use]
    pub fn new(scheduler: Arc<dyn SchedulerService>, orchestrate_base_url: String) -> Self {
        Self {
            scheduler,
            orchestrate_base_url,
        }
    }

    /// Idempotent: returns `Ok(false)` without calling `create` if the job
    /// already exists (§8 invariant: re-running orchestration for an
    /// already-scheduled sprint never double-creates a job).
    #[instrument(skip(self))]
    pub async fn ensure_job(&self, project_id: &str, sprint_id: &str) -> Result<bool> {
        let name = job_name(project_id, sprint_id);
        if self.scheduler.exists(&name).await? {
            return Ok(false);
        }
        let manifest = manifest(project_id, sprint_id, &self.orchestrate_base_url);
        self.scheduler.create(&name, &manifest).await?;
        Ok(true)
    }

    /// Idempotent: returns `Ok(false)` if no job with that name exists.
    #[instrument(skip(self))]
    pub async fn remove_job(&self, project_id: &str, sprint_id: &str) -> Result<bool> {
        let name = job_name(project_id, sprint_id);
        if !self.scheduler.exists(&name).await? {
            return Ok(false);
        }
        self.scheduler.delete(&name).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::FakeSchedulerService;

    #[test]
    fn job_name_is_deterministic_and_lowercased() {
        let a = job_name("PRJ-1", "Sprint_1");
        let b = job_name("prj-1", "sprint_1");
        assert_eq!(a, b);
        assert_eq!(a, "run-dailyscrum-prj-1-sprint_1");
    }

    #[test]
    fn manifest_uses_posix_equality_not_bash_double_equals() {
        let m = manifest("PRJ-1", "S1", "http://orchestrator:8080");
        assert!(m.contains(r#"[ "$STATUS" = "ready" ]"#));
        assert!(!m.contains("=="));
    }

    #[tokio::test]
    async fn ensure_job_is_idempotent() {
        let scheduler = Arc::new(FakeSchedulerService::new());
        let controller = CronController::new(scheduler.clone(), "http://orchestrator:8080".to_string());
        assert!(controller.ensure_job("PRJ-1", "S1").await.unwrap());
        assert!(!controller.ensure_job("PRJ-1", "S1").await.unwrap());
        assert_eq!(scheduler.job_names().len(), 1);
    }

    #[tokio::test]
    async fn remove_job_is_idempotent() {
        let scheduler = Arc::new(FakeSchedulerService::new());
        let controller = CronController::new(scheduler.clone(), "http://orchestrator:8080".to_string());
        controller.ensure_job("PRJ-1", "S1").await.unwrap();
        assert!(controller.remove_job("PRJ-1", "S1").await.unwrap());
        assert!(!controller.remove_job("PRJ-1", "S1").await.unwrap());
    }
}
