//! Process-wide shared state, grounded on the teacher's server binaries
//! (`memory-mcp::bin::server`) which wire collaborator clients once at
//! startup and hand an `Arc` of shared state to every handler.
//!
//! The intelligence mode/thresholds are the one piece of configuration the
//! HTTP surface lets an operator change at runtime (§6.1
//! `POST .../decision-mode`). Rather than make the decision-making
//! components interior-mutable, [`EngineFactory`] holds the expensive
//! shared collaborators once and builds a fresh (cheap, I/O-free)
//! [`EnhancedDecisionEngine`] per request from whatever [`IntelligenceConfig`]
//! is live at that moment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use orchestrator_core::advisor::AiAdvisor;
use orchestrator_core::analyzer::ProjectAnalyzer;
use orchestrator_core::collaborators::{LlmService, SchedulerService, SprintService};
use orchestrator_core::config::{ConfigSnapshot, IntelligenceConfig};
use orchestrator_core::cron::CronController;
use orchestrator_core::embeddings::EmbeddingClient;
use orchestrator_core::engine::EnhancedDecisionEngine;
use orchestrator_core::events::{EventPublisher, LoggingEventPublisher};
use orchestrator_core::gate::ConfidenceGate;
use orchestrator_core::memory::{MemoryStore, WorkingMemoryStore};
use orchestrator_core::metrics::Metrics;
use orchestrator_core::modifier::DecisionModifier;
use orchestrator_core::pattern_engine::PatternEngine;
use orchestrator_core::planner::RuleBasedPlanner;
use orchestrator_core::project_lock::ProjectLockTable;
use parking_lot::RwLock;

pub struct EngineFactory {
    analyzer_project: Arc<dyn orchestrator_core::collaborators::ProjectService>,
    analyzer_team: Arc<dyn orchestrator_core::collaborators::TeamService>,
    analyzer_backlog: Arc<dyn orchestrator_core::collaborators::BacklogService>,
    sprint_service: Arc<dyn SprintService>,
    memory: Arc<dyn MemoryStore>,
    working_memory: Arc<dyn WorkingMemoryStore>,
    embedding_client: Arc<EmbeddingClient>,
    llm: Arc<dyn LlmService>,
    scheduler: Arc<dyn SchedulerService>,
    events: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
    locks: Arc<ProjectLockTable>,
    orchestrate_base_url: String,
    config: Arc<RwLock<ConfigSnapshot>>,
}

#[allow(clippy::too_many_arguments)]
impl EngineFactory {
    pub fn new(
        analyzer_project: Arc<dyn orchestrator_core::collaborators::ProjectService>,
        analyzer_team: Arc<dyn orchestrator_core::collaborators::TeamService>,
        analyzer_backlog: Arc<dyn orchestrator_core::collaborators::BacklogService>,
        sprint_service: Arc<dyn SprintService>,
        memory: Arc<dyn MemoryStore>,
        working_memory: Arc<dyn WorkingMemoryStore>,
        embedding_client: Arc<EmbeddingClient>,
        llm: Arc<dyn LlmService>,
        scheduler: Arc<dyn SchedulerService>,
        orchestrate_base_url: String,
        config: Arc<RwLock<ConfigSnapshot>>,
    ) -> Self {
        Self {
            analyzer_project,
            analyzer_team,
            analyzer_backlog,
            sprint_service,
            memory,
            working_memory,
            embedding_client,
            llm,
            scheduler,
            events: Arc::new(LoggingEventPublisher::new()),
            metrics: Arc::new(Metrics::new()),
            locks: Arc::new(ProjectLockTable::new()),
            orchestrate_base_url,
            config,
        }
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    #[must_use]
    pub fn memory(&self) -> Arc<dyn MemoryStore> {
        self.memory.clone()
    }

    #[must_use]
    pub fn config_snapshot(&self) -> ConfigSnapshot {
        self.config.read().clone()
    }

    pub fn update_intelligence_config(&self, update: impl FnOnce(&mut IntelligenceConfig)) {
        update(&mut self.config.write().intelligence);
    }

    #[must_use]
    pub fn build(&self) -> EnhancedDecisionEngine {
        let config = self.config.read().clone();
        let analyzer = ProjectAnalyzer::new(
            self.analyzer_project.clone(),
            self.analyzer_team.clone(),
            self.analyzer_backlog.clone(),
            self.sprint_service.clone(),
        );
        let pattern_engine = PatternEngine::new(self.memory.clone(), config.intelligence.clone());
        let planner = RuleBasedPlanner::new(&config.intelligence);
        let modifier = DecisionModifier::new(config.intelligence.clone());
        let gate = ConfidenceGate::new(config.intelligence.clone());
        let advisor = AiAdvisor::new(self.llm.clone(), config.advisor.clone());
        let cron = CronController::new(self.scheduler.clone(), self.orchestrate_base_url.clone());

        EnhancedDecisionEngine::new(
            analyzer,
            pattern_engine,
            planner,
            modifier,
            gate,
            self.memory.clone(),
            self.working_memory.clone(),
            self.embedding_client.clone(),
            advisor,
            cron,
            self.sprint_service.clone(),
            self.events.clone(),
            self.metrics.clone(),
            self.locks.clone(),
            &config,
        )
    }
}

/// Readiness flags used by `GET /health/ready` beyond pool occupancy.
#[derive(Default)]
pub struct ReadinessFlags {
    pub embedding_healthy: AtomicBool,
}

pub struct AppState {
    pub engines: Arc<EngineFactory>,
    pub readiness: Arc<ReadinessFlags>,
}

impl ReadinessFlags {
    pub fn set_embedding_healthy(&self, healthy: bool) {
        self.embedding_healthy.store(healthy, Ordering::Relaxed);
    }

    #[must_use]
    pub fn embedding_healthy(&self) -> bool {
        self.embedding_healthy.load(Ordering::Relaxed)
    }
}
