//! Strategy Evolver (`SPEC_FULL.md` §4.14).
//!
//! A periodic, append-only process distinct from the Enhanced Decision
//! Engine's request path — grounded on the teacher's
//! `pattern::EffectivenessTracker`, generalised into an explicit lifecycle
//! state machine (§9 Open Question, resolved) so strategy retirement has a
//! single deterministic rule instead of being folded into decision-time
//! logic. Feeding a strategy back into the next decision is a separate,
//! one-way read the Pattern Engine performs; this module never calls back
//! into the engine (REDESIGN FLAGS: no inverse runtime edge).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::config::StrategyEvolutionConfig;
use crate::error::Result;
use crate::types::{Strategy, StrategyLifecycle};

/// Persistence seam for strategies, kept separate from [`crate::memory::MemoryStore`]
/// since strategies are derived knowledge, not raw episodes (§3).
#[async_trait]
pub trait StrategyRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Strategy>>;
    async fn save(&self, strategy: &Strategy) -> Result<()>;
}

/// In-memory repository used by tests and by the demo server mode.
#[derive(Debug, Default)]
pub struct InMemoryStrategyRepository {
    strategies: Mutex<HashMap<Uuid, Strategy>>,
}

impl InMemoryStrategyRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, strategy: Strategy) {
        self.strategies.lock().insert(strategy.knowledge_id, strategy);
    }
}

#[async_trait]
impl StrategyRepository for InMemoryStrategyRepository {
    async fn list(&self) -> Result<Vec<Strategy>> {
        Ok(self.strategies.lock().values().cloned().collect())
    }

    async fn save(&self, strategy: &Strategy) -> Result<()> {
        self.strategies.lock().insert(strategy.knowledge_id, strategy.clone());
        Ok(())
    }
}

pub struct StrategyEvolver {
    repo: Arc<dyn StrategyRepository>,
    config: StrategyEvolutionConfig,
}

impl StrategyEvolver {
    #[must_use]
    pub fn new(repo: Arc<dyn StrategyRepository>, config: StrategyEvolutionConfig) -> Self {
        Self { repo, config }
    }

    /// The deterministic lifecycle rule (§9): `Active -> Deprecated` when
    /// the success rate drops below `retire_threshold` with at least
    /// `retire_min_contradictions` contradicting episodes; `Deprecated ->
    /// Retired` once `retire_grace_period_days` have elapsed since the
    /// strategy was last validated with no intervening promotion back to
    /// `Active`.
    #[must_use]
    pub fn evaluate_transition(&self, strategy: &Strategy, now: DateTime<Utc>) -> Option<StrategyLifecycle> {
        match strategy.lifecycle {
            StrategyLifecycle::Active => {
                let rate = strategy.success_rate()?;
                let contradictions = strategy.contradicting_episodes.len() as u32;
                if rate < self.config.retire_threshold && contradictions >= self.config.retire_min_contradictions {
                    Some(StrategyLifecycle::Deprecated)
                } else {
                    None
                }
            }
            StrategyLifecycle::Deprecated => {
                let since = strategy.last_validated.unwrap_or(strategy.created_at);
                let elapsed_days = (now - since).num_days();
                if elapsed_days >= self.config.retire_grace_period_days {
                    Some(StrategyLifecycle::Retired)
                } else {
                    None
                }
            }
            StrategyLifecycle::Proposed | StrategyLifecycle::Retired => None,
        }
    }

    /// Run one evolution pass over every known strategy, saving any that
    /// transition. Returns the number of strategies that changed state.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize> {
        let strategies = self.repo.list().await?;
        let mut transitioned = 0;
        for mut strategy in strategies {
            if let Some(next) = self.evaluate_transition(&strategy, now) {
                info!(
                    knowledge_id = %strategy.knowledge_id,
                    from = ?strategy.lifecycle,
                    to = ?next,
                    "strategy lifecycle transition"
                );
                strategy.lifecycle = next;
                strategy.is_active = next == StrategyLifecycle::Active;
                self.repo.save(&strategy).await?;
                transitioned += 1;
            }
        }
        Ok(transitioned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn strategy(lifecycle: StrategyLifecycle, times_applied: u64, success_count: u64, contradictions: usize) -> Strategy {
        Strategy {
            knowledge_id: Uuid::new_v4(),
            knowledge_type: "strategy".to_string(),
            content: serde_json::json!({}),
            description: "test strategy".to_string(),
            confidence: 0.5,
            supporting_episodes: vec![],
            contradicting_episodes: (0..contradictions).map(|_| Uuid::new_v4()).collect(),
            times_applied,
            success_count,
            failure_count: times_applied.saturating_sub(success_count),
            lifecycle,
            is_active: lifecycle == StrategyLifecycle::Active,
            created_at: Utc::now() - ChronoDuration::days(30),
            last_validated: Some(Utc::now() - ChronoDuration::days(30)),
            last_applied: None,
        }
    }

    #[test]
    fn active_strategy_deprecates_on_low_success_and_contradictions() {
        let evolver = StrategyEvolver::new(
            Arc::new(InMemoryStrategyRepository::new()),
            StrategyEvolutionConfig::default(),
        );
        let s = strategy(StrategyLifecycle::Active, 10, 2, 3);
        assert_eq!(evolver.evaluate_transition(&s, Utc::now()), Some(StrategyLifecycle::Deprecated));
    }

    #[test]
    fn active_strategy_stays_active_without_enough_contradictions() {
        let evolver = StrategyEvolver::new(
            Arc::new(InMemoryStrategyRepository::new()),
            StrategyEvolutionConfig::default(),
        );
        let s = strategy(StrategyLifecycle::Active, 10, 2, 1);
        assert_eq!(evolver.evaluate_transition(&s, Utc::now()), None);
    }

    #[test]
    fn deprecated_strategy_retires_after_grace_period() {
        let evolver = StrategyEvolver::new(
            Arc::new(InMemoryStrategyRepository::new()),
            StrategyEvolutionConfig::default(),
        );
        let mut s = strategy(StrategyLifecycle::Deprecated, 10, 2, 3);
        s.last_validated = Some(Utc::now() - ChronoDuration::days(20));
        assert_eq!(evolver.evaluate_transition(&s, Utc::now()), Some(StrategyLifecycle::Retired));
    }

    #[tokio::test]
    async fn run_once_persists_transitions() {
        let repo = Arc::new(InMemoryStrategyRepository::new());
        let s = strategy(StrategyLifecycle::Active, 10, 2, 3);
        let id = s.knowledge_id;
        repo.seed(s);
        let evolver = StrategyEvolver::new(repo.clone(), StrategyEvolutionConfig::default());
        let transitioned = evolver.run_once(Utc::now()).await.unwrap();
        assert_eq!(transitioned, 1);
        let updated = repo.list().await.unwrap().into_iter().find(|s| s.knowledge_id == id).unwrap();
        assert_eq!(updated.lifecycle, StrategyLifecycle::Deprecated);
    }
}
