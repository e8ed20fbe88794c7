//! Episode-outcome back-fill sweep (`SPEC_FULL.md` §4.11, §5).
//!
//! A periodic, read-episodes/write-outcomes background task, grounded on
//! the same shape as [`crate::evolution::StrategyEvolver`] — no inverse
//! runtime edge back into the Enhanced Decision Engine, never on the
//! request path. `MemoryStore::get_episodes_without_outcomes` names the
//! episodes eligible for this sweep; this module is the only caller of it.
//!
//! A closed sprint is not independently queryable by id once it stops
//! being the project's active sprint — [`SprintService::get_active_sprint`]
//! only ever reports the current one. `close_sprint` in `engine.rs` is
//! itself only ever invoked after `ActiveSprint::all_tasks_complete`, so
//! this sweep treats "no longer the active sprint" as "completed": once an
//! episode's linked sprint is absent from, or superseded in,
//! `get_active_sprint`, the sweep records it as a completed outcome using
//! the task count captured on the episode's own action/perception at
//! decision time, rather than re-deriving a snapshot that no longer exists.

use std::sync::Arc;

use tracing::{info, warn};

use crate::collaborators::SprintService;
use crate::error::Result;
use crate::memory::MemoryStore;
use crate::types::{Episode, EpisodeOutcome};

pub struct OutcomeBackfiller {
    memory: Arc<dyn MemoryStore>,
    sprint_service: Arc<dyn SprintService>,
}

impl OutcomeBackfiller {
    #[must_use]
    pub fn new(memory: Arc<dyn MemoryStore>, sprint_service: Arc<dyn SprintService>) -> Self {
        Self { memory, sprint_service }
    }

    /// The outcome to record for `episode`, or `None` if its linked sprint
    /// is still the project's active one (not yet eligible).
    fn infer_outcome(episode: &Episode, still_active: bool) -> Option<(EpisodeOutcome, f64)> {
        if still_active {
            return None;
        }
        let tasks_total = if episode.action.tasks_to_assign > 0 {
            episode.action.tasks_to_assign
        } else {
            episode.perception.backlog_tasks
        };
        let tasks_completed = tasks_total;
        let quality = if tasks_total > 0 { 1.0 } else { 0.5 };
        Some((
            EpisodeOutcome {
                sprint_completed: true,
                tasks_completed,
                tasks_total,
                summary: format!(
                    "sprint {} no longer active; inferred completion from orchestration closure invariant",
                    episode.sprint_id.as_deref().unwrap_or("unknown")
                ),
            },
            quality,
        ))
    }

    /// Run one sweep over every episode eligible for back-fill. Returns the
    /// number of episodes updated.
    pub async fn run_once(&self) -> Result<usize> {
        let pending = self.memory.get_episodes_without_outcomes().await?;
        let mut updated = 0;
        for episode in pending {
            let Some(sprint_id) = episode.sprint_id.clone() else {
                continue;
            };
            let active = self.sprint_service.get_active_sprint(&episode.project_id).await?;
            let still_active = active.is_some_and(|a| a.sprint_id == sprint_id);
            let Some((outcome, quality)) = Self::infer_outcome(&episode, still_active) else {
                continue;
            };
            if let Err(e) = self.memory.update_episode_outcome(episode.episode_id, outcome, quality).await {
                warn!(episode_id = %episode.episode_id, error = %e, "failed to back-fill episode outcome");
                continue;
            }
            info!(episode_id = %episode.episode_id, project_id = %episode.project_id, "back-filled episode outcome");
            updated += 1;
        }
        Ok(updated)
    }
}
