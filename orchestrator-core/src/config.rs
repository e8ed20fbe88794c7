//! Configuration snapshot for the orchestration service.
//!
//! Every threshold named in `SPEC_FULL.md` §6.5/§6.6 lives here. A
//! `ConfigSnapshot` is built once at startup (TOML file + environment
//! overlay, see `load`) and handed to component constructors explicitly;
//! no component reads a process-global value.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Decision-making mode for the Enhanced Decision Engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntelligenceMode {
    /// Only the Rule-Based Planner runs; no pattern/intelligence layer.
    RuleBasedOnly,
    /// The intelligence layer always attempts to override the baseline.
    IntelligenceEnhanced,
    /// The intelligence layer runs but only overrides when gated adjustments
    /// clear both thresholds (the default production mode).
    Hybrid,
}

impl Default for IntelligenceMode {
    fn default() -> Self {
        Self::Hybrid
    }
}

/// Policy for episode persistence when the embedding service is
/// unreachable (resolves the Open Question in `SPEC_FULL.md` §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnEmbeddingUnavailable {
    /// Do not write an episode row; log and increment a counter.
    Skip,
    /// Write the episode with a null embedding for later back-fill.
    StoreWithoutEmbedding,
}

impl Default for OnEmbeddingUnavailable {
    fn default() -> Self {
        Self::Skip
    }
}

/// Thresholds and gates for the Pattern Engine, Decision Modifier and
/// Confidence Gate (§4.3–§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelligenceConfig {
    pub mode: IntelligenceMode,
    /// Aggregate confidence gate (§4.5 stage 2).
    pub confidence_threshold: f64,
    /// Minimum |Δ tasks| to propose a task-count adjustment.
    pub task_adjustment_difference_threshold: i64,
    /// Minimum average confidence of contributing similar projects.
    pub task_adjustment_min_confidence: f64,
    /// Minimum similarity score for a historical project to be retained.
    pub similarity_floor: f64,
    /// Minimum similarity score retained in the Pattern Engine itself.
    pub similarity_min: f64,
    /// Minimum velocity-trend confidence to contribute to overall confidence
    /// or to a duration adjustment.
    pub velocity_trend_min: f64,
    /// Minimum sample size of similar projects for a task adjustment.
    pub min_similar_projects: usize,
    /// Maximum number of candidate similar projects retrieved (K).
    pub max_similar_candidates: usize,
    /// Maximum tasks assignable to a single sprint.
    pub max_tasks_per_sprint: i64,
    pub enable_task_count_adjustment: bool,
    pub enable_sprint_duration_adjustment: bool,
}

impl Default for IntelligenceConfig {
    fn default() -> Self {
        Self {
            mode: IntelligenceMode::default(),
            confidence_threshold: 0.65,
            task_adjustment_difference_threshold: 3,
            task_adjustment_min_confidence: 0.7,
            similarity_floor: 0.5,
            similarity_min: 0.3,
            velocity_trend_min: 0.3,
            min_similar_projects: 3,
            max_similar_candidates: 10,
            max_tasks_per_sprint: 20,
            enable_task_count_adjustment: true,
            enable_sprint_duration_adjustment: true,
        }
    }
}

/// Connection pool sizing for the Agent Memory Store (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryPoolConfig {
    /// `libsql://...` for Turso, `file:...` for a local database, or
    /// `:memory:` — validated the same way the teacher's storage backend
    /// validates it (remote URLs require a non-empty token).
    pub db_url: String,
    pub db_token: String,
    pub min: usize,
    pub max: usize,
    pub recycle_s: u64,
    pub connection_timeout_s: u64,
    pub similarity_metric: SimilarityMetric,
    pub on_embedding_unavailable: OnEmbeddingUnavailable,
}

impl MemoryPoolConfig {
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_s)
    }
}

/// Vector distance metric used by similarity search (pinned per §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    Cosine,
}

impl Default for SimilarityMetric {
    fn default() -> Self {
        Self::Cosine
    }
}

impl Default for MemoryPoolConfig {
    fn default() -> Self {
        Self {
            db_url: "file:orchestrator.db".to_string(),
            db_token: String::new(),
            min: 2,
            max: 10,
            recycle_s: 1800,
            connection_timeout_s: 5,
            similarity_metric: SimilarityMetric::default(),
            on_embedding_unavailable: OnEmbeddingUnavailable::default(),
        }
    }
}

/// Resilience configuration for the Embedding Client (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub timeout_s: u64,
    pub max_retries: u32,
    pub dimensions: usize,
    pub circuit: CircuitBreakerConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11500".to_string(),
            timeout_s: 5,
            max_retries: 3,
            dimensions: 1024,
            circuit: CircuitBreakerConfig::default(),
        }
    }
}

impl EmbeddingConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }
}

/// Circuit breaker policy, grounded on the teacher's
/// `embeddings::circuit_breaker::CircuitBreakerConfig`, generalised with a
/// configurable success threshold to close from half-open (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub cool_down_s: u64,
    pub half_open_max_attempts: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            cool_down_s: 30,
            half_open_max_attempts: 3,
        }
    }
}

impl CircuitBreakerConfig {
    #[must_use]
    pub fn cool_down(&self) -> Duration {
        Duration::from_secs(self.cool_down_s)
    }
}

/// AI Advisor configuration (§4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub enabled: bool,
    pub model: String,
    pub service_url: String,
    pub timeout_s: u64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "llama3".to_string(),
            service_url: "http://localhost:11434".to_string(),
            timeout_s: 8,
        }
    }
}

impl AdvisorConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }
}

/// A single collaborator client's connection settings (§4.13/§6.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorClientConfig {
    pub base_url: String,
    pub timeout_s: u64,
    pub max_retries: u32,
}

impl Default for CollaboratorClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_s: 5,
            max_retries: 2,
        }
    }
}

impl CollaboratorClientConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }
}

/// Connection settings for every collaborator service (§6.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorsConfig {
    pub project: CollaboratorClientConfig,
    pub team: CollaboratorClientConfig,
    pub backlog: CollaboratorClientConfig,
    pub sprint: CollaboratorClientConfig,
    pub scheduler: CollaboratorClientConfig,
}

impl Default for CollaboratorsConfig {
    fn default() -> Self {
        Self {
            project: CollaboratorClientConfig::default(),
            team: CollaboratorClientConfig::default(),
            backlog: CollaboratorClientConfig::default(),
            sprint: CollaboratorClientConfig::default(),
            scheduler: CollaboratorClientConfig::default(),
        }
    }
}

/// Feature flags (§6.5 bottom).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub enable_async_learning: bool,
    pub enable_strategy_evolution: bool,
    pub enable_cross_project_learning: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_async_learning: true,
            enable_strategy_evolution: false,
            enable_cross_project_learning: true,
        }
    }
}

/// Working Memory Session TTL (§3, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingMemoryConfig {
    pub ttl_s: i64,
}

impl Default for WorkingMemoryConfig {
    fn default() -> Self {
        Self { ttl_s: 900 }
    }
}

impl WorkingMemoryConfig {
    #[must_use]
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_s)
    }
}

/// Strategy lifecycle thresholds (§9 Open Questions, resolved).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyEvolutionConfig {
    pub retire_threshold: f64,
    pub retire_min_contradictions: u32,
    pub retire_grace_period_days: i64,
}

impl Default for StrategyEvolutionConfig {
    fn default() -> Self {
        Self {
            retire_threshold: 0.35,
            retire_min_contradictions: 3,
            retire_grace_period_days: 14,
        }
    }
}

/// Episode-outcome back-fill sweep cadence (§4.11, §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackfillConfig {
    pub interval_s: i64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self { interval_s: 1800 }
    }
}

/// Top-level, immutable configuration snapshot passed by value (cheaply,
/// via `Arc`) to every component constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    pub intelligence: IntelligenceConfig,
    pub memory_pool: MemoryPoolConfig,
    pub embedding: EmbeddingConfig,
    pub advisor: AdvisorConfig,
    pub collaborators: CollaboratorsConfig,
    pub features: FeatureFlags,
    pub strategy_evolution: StrategyEvolutionConfig,
    pub working_memory: WorkingMemoryConfig,
    pub backfill: BackfillConfig,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            intelligence: IntelligenceConfig::default(),
            memory_pool: MemoryPoolConfig::default(),
            embedding: EmbeddingConfig::default(),
            advisor: AdvisorConfig::default(),
            collaborators: CollaboratorsConfig::default(),
            features: FeatureFlags::default(),
            strategy_evolution: StrategyEvolutionConfig::default(),
            working_memory: WorkingMemoryConfig::default(),
            backfill: BackfillConfig::default(),
        }
    }
}

impl ConfigSnapshot {
    /// Parse a `ConfigSnapshot` from TOML text (`toml::from_str`), failing
    /// with `Error::ConfigError` rather than panicking.
    pub fn from_toml(text: &str) -> crate::error::Result<Self> {
        toml::from_str(text)
            .map_err(|e| crate::error::Error::ConfigError(format!("invalid config toml: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_has_sane_thresholds() {
        let cfg = ConfigSnapshot::default();
        assert!(cfg.intelligence.confidence_threshold > 0.0);
        assert!(cfg.intelligence.max_tasks_per_sprint > 0);
        assert_eq!(cfg.embedding.dimensions, 1024);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg = ConfigSnapshot::from_toml(
            r#"
            [intelligence]
            confidence_threshold = 0.8
            "#,
        )
        .expect("valid toml");
        assert!((cfg.intelligence.confidence_threshold - 0.8).abs() < f64::EPSILON);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.intelligence.max_tasks_per_sprint, 20);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = ConfigSnapshot::from_toml("not = [valid").unwrap_err();
        assert!(matches!(err, crate::error::Error::ConfigError(_)));
    }
}
