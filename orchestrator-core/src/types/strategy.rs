//! Strategy (`SPEC_FULL.md` §3, §4.12, §4.14) — derived semantic memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a learned strategy (§4.12 state machines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyLifecycle {
    Proposed,
    Active,
    Deprecated,
    Retired,
}

/// A learned rule-of-thumb derived from clustered episodes (§3, Glossary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub knowledge_id: Uuid,
    /// Always `"strategy"`; kept as a field (rather than folded into the
    /// type name) because the Agent Memory Store's `knowledge` table is
    /// shared across multiple knowledge kinds in the schema.
    pub knowledge_type: String,
    pub content: serde_json::Value,
    pub description: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub supporting_episodes: Vec<Uuid>,
    pub contradicting_episodes: Vec<Uuid>,
    pub times_applied: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub lifecycle: StrategyLifecycle,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_validated: Option<DateTime<Utc>>,
    pub last_applied: Option<DateTime<Utc>>,
}

impl Strategy {
    /// `success_rate = success_count / times_applied` whenever
    /// `times_applied > 0` (§3 invariant, §8 testable property).
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        if self.times_applied == 0 {
            None
        } else {
            Some(self.success_count as f64 / self.times_applied as f64)
        }
    }
}
