//! Enhanced Decision Engine (`SPEC_FULL.md` §4.10).
//!
//! Composition root wiring every other component into one orchestration
//! call: Project Analyzer -> Embedding Client -> Pattern Engine ->
//! Rule-Based Planner -> Decision Modifier -> Confidence Gate -> collaborator
//! actions -> Episode Embedder/Agent Memory Store -> AI Advisor -> events.
//! Every optional dependency degrades gracefully rather than failing the
//! request (§4.10 "fallback-to-rule-based-only semantics").

use std::sync::Arc;

use tracing::{instrument, warn};
use uuid::Uuid;

use crate::advisor::{AdvisoryNote, AiAdvisor};
use crate::analyzer::ProjectAnalyzer;
use crate::auditor::DecisionAuditor;
use crate::collaborators::SprintService;
use crate::config::{ConfigSnapshot, OnEmbeddingUnavailable};
use crate::cron::CronController;
use crate::embeddings::{EmbeddingClient, EpisodeEmbedder};
use crate::error::Result;
use crate::events::{EventPublisher, OrchestrationDecisionEvent};
use crate::gate::ConfidenceGate;
use crate::memory::{MemoryStore, WorkingMemoryStore};
use crate::metrics::Metrics;
use crate::modifier::DecisionModifier;
use crate::pattern_engine::PatternEngine;
use crate::planner::RuleBasedPlanner;
use crate::project_lock::ProjectLockTable;
use crate::types::{
    ActionRecord, DataQualityReport, Decision, Episode, PatternAnalysis, Perception,
    ProjectAnalysisSnapshot, Reasoning,
};

/// Everything an orchestration request returns: the analysis snapshot the
/// decision was made from, the decision itself, the episode it was recorded
/// as, and the advisor's (possibly degraded) commentary.
#[derive(Debug, Clone)]
pub struct OrchestrationOutcome {
    pub analysis: ProjectAnalysisSnapshot,
    pub decision: Decision,
    pub episode_id: Uuid,
    pub advisory: AdvisoryNote,
}

pub struct EnhancedDecisionEngine {
    analyzer: ProjectAnalyzer,
    pattern_engine: PatternEngine,
    planner: RuleBasedPlanner,
    modifier: DecisionModifier,
    gate: ConfidenceGate,
    auditor: DecisionAuditor,
    advisor: AiAdvisor,
    cron: CronController,
    sprint_service: Arc<dyn SprintService>,
    memory: Arc<dyn MemoryStore>,
    working_memory: Arc<dyn WorkingMemoryStore>,
    working_memory_ttl: chrono::Duration,
    embedding_client: Arc<EmbeddingClient>,
    events: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
    locks: Arc<ProjectLockTable>,
    on_embedding_unavailable: OnEmbeddingUnavailable,
    agent_version: String,
    enable_cross_project_learning: bool,
}

impl EnhancedDecisionEngine {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        analyzer: ProjectAnalyzer,
        pattern_engine: PatternEngine,
        planner: RuleBasedPlanner,
        modifier: DecisionModifier,
        gate: ConfidenceGate,
        memory: Arc<dyn MemoryStore>,
        working_memory: Arc<dyn WorkingMemoryStore>,
        embedding_client: Arc<EmbeddingClient>,
        advisor: AiAdvisor,
        cron: CronController,
        sprint_service: Arc<dyn SprintService>,
        events: Arc<dyn EventPublisher>,
        metrics: Arc<Metrics>,
        locks: Arc<ProjectLockTable>,
        config: &ConfigSnapshot,
    ) -> Self {
        Self {
            analyzer,
            pattern_engine,
            planner,
            modifier,
            gate,
            auditor: DecisionAuditor::new(memory.clone()),
            advisor,
            cron,
            sprint_service,
            memory,
            working_memory,
            working_memory_ttl: config.working_memory.ttl(),
            embedding_client,
            events,
            metrics,
            locks,
            on_embedding_unavailable: config.memory_pool.on_embedding_unavailable,
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            enable_cross_project_learning: config.features.enable_cross_project_learning,
        }
    }

    #[must_use]
    pub fn auditor(&self) -> &DecisionAuditor {
        &self.auditor
    }

    /// Run one full orchestration pass for `project_id`. Serializes against
    /// any other in-flight orchestration for the same project (§5.1).
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn orchestrate(&self, project_id: &str) -> Result<OrchestrationOutcome> {
        let _guard = self.locks.acquire(project_id).await;

        let mut snapshot = self.analyzer.analyze(project_id).await?;
        let perception = Perception::from(&snapshot);

        let embedding = match self
            .embedding_client
            .embed(&EpisodeEmbedder::canonicalize_perception(&perception))
            .await
        {
            Ok(vector) => Some(vector),
            Err(e) => {
                if matches!(e, crate::error::Error::CircuitOpen) {
                    self.metrics.record_embedding_circuit_open();
                }
                warn!(project_id, error = %e, "embedding unavailable, degrading to rule-based pattern analysis");
                None
            }
        };

        let pattern_analysis = if self.enable_cross_project_learning {
            match self
                .pattern_engine
                .analyze(project_id, embedding.as_deref(), snapshot.current_active_sprint.as_ref())
                .await
            {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!(project_id, error = %e, "pattern engine degraded, falling back to empty analysis");
                    PatternAnalysis::empty()
                }
            }
        } else {
            PatternAnalysis::empty()
        };
        snapshot.pattern_analysis = pattern_analysis.clone();
        snapshot.data_quality_report = DataQualityReport {
            data_available: pattern_analysis.data_available,
            similar_projects_considered: pattern_analysis.similar_projects.len(),
            notes: Vec::new(),
        };

        let rule_based = self.planner.plan(&snapshot);
        let candidate = self.modifier.propose(&rule_based, &pattern_analysis, snapshot.current_active_sprint.as_ref());
        let mut decision = self.gate.apply(rule_based, candidate, &pattern_analysis);

        self.act_on_decision(project_id, &mut decision).await?;

        let headline = Self::headline(&decision);
        let reasoning = Reasoning {
            pattern_analysis: pattern_analysis.clone(),
            confidence_scores: decision.confidence_scores.clone(),
            headline: headline.clone(),
        };
        let action: ActionRecord = decision.applied.clone();

        let full_embedding = if embedding.is_some() {
            match self.embedding_client.embed(&EpisodeEmbedder::canonicalize(&perception, &reasoning, &action)).await {
                Ok(v) => Some(v),
                Err(_) => None,
            }
        } else {
            None
        };

        let episode_id = Uuid::new_v4();
        let should_store = full_embedding.is_some() || self.on_embedding_unavailable == OnEmbeddingUnavailable::StoreWithoutEmbedding;
        if should_store {
            let episode = Episode {
                episode_id,
                project_id: project_id.to_string(),
                timestamp: chrono::Utc::now(),
                perception,
                reasoning,
                action,
                outcome: None,
                outcome_quality: None,
                outcome_recorded_at: None,
                embedding: full_embedding,
                agent_version: self.agent_version.clone(),
                control_mode: format!("{:?}", decision.intelligence_metadata.decision_mode),
                decision_source: decision.decision_source,
                sprint_id: Self::sprint_id_for_episode(&decision),
                external_note_id: None,
            };
            // Storage stays on the request path: the Decision Auditor reads
            // this same episode back via `get_episodes_for_project` (§4.6),
            // so deferring the write would make a just-completed
            // orchestration invisible to `decision-audit` until the
            // background write lands. `enable_async_learning` instead gates
            // the periodic strategy-evolution/back-fill sweep started in
            // `orchestrator-server::main`, which reads episodes rather than
            // racing to write the one the response depends on.
            if let Err(e) = self.memory.store_episode(&episode).await {
                self.metrics.record_audit_write_failed();
                warn!(project_id, error = %e, "failed to persist decision episode");
            }
        }

        let advisory = self.advisor.advise(project_id, &decision).await;
        if !advisory.enabled && advisory.error.is_some() {
            self.metrics.record_advisor_degraded();
        }

        let now = chrono::Utc::now();
        let working_memory_session = crate::types::WorkingMemorySession {
            session_id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            payload: serde_json::json!({
                "pattern_analysis": pattern_analysis,
                "last_episode_id": episode_id,
            }),
            created_at: now,
            expires_at: now + self.working_memory_ttl,
        };
        if let Err(e) = self.working_memory.put(working_memory_session).await {
            warn!(project_id, error = %e, "failed to refresh working memory session");
        }

        self.metrics.record_decision(decision.decision_source);
        self.events
            .publish(OrchestrationDecisionEvent::new(project_id, episode_id, decision.decision_source, headline))
            .await;

        Ok(OrchestrationOutcome { analysis: snapshot, decision, episode_id, advisory })
    }

    async fn act_on_decision(&self, project_id: &str, decision: &mut Decision) -> Result<()> {
        let mut actions_taken = Vec::new();

        if decision.applied.sprint_closure_triggered {
            if let Some(sprint_id) = decision.applied.sprint_id_to_close.clone() {
                self.sprint_service.close_sprint(project_id, &sprint_id).await?;
                self.sprint_service.create_retrospective(project_id, &sprint_id).await?;
                decision.applied.cronjob_deleted = self.cron.remove_job(project_id, &sprint_id).await?;
                actions_taken.push(format!("Closed sprint {sprint_id}"));
                if decision.applied.cronjob_deleted {
                    actions_taken.push(format!("Deleted cronjob {}", crate::cron::job_name(project_id, &sprint_id)));
                }
            }
        }

        if decision.applied.create_new_sprint {
            let sprint_name = self
                .sprint_service
                .create_sprint(project_id, decision.applied.sprint_duration_weeks, decision.applied.tasks_to_assign)
                .await?;
            decision.applied.cronjob_created = self.cron.ensure_job(project_id, &sprint_name).await?;
            decision.applied.sprint_name = Some(sprint_name.clone());
            actions_taken.push(format!("Created sprint {sprint_name}"));
            if decision.applied.cronjob_created {
                actions_taken.push(format!("Created cronjob {}", crate::cron::job_name(project_id, &sprint_name)));
            }
        } else if let Some(sprint_id) = decision.applied.ensure_cronjob_for_sprint_id.clone() {
            // Self-heal path (§4.2, §4.11): the active sprint is still in
            // progress, so no sprint mutation happens here, only a check
            // that its scheduled job still exists.
            decision.applied.cronjob_created = self.cron.ensure_job(project_id, &sprint_id).await?;
            if decision.applied.cronjob_created {
                actions_taken.push(format!("Created cronjob {}", crate::cron::job_name(project_id, &sprint_id)));
            }
        }

        decision.applied.actions_taken = actions_taken;
        Ok(())
    }

    fn headline(decision: &Decision) -> String {
        if decision.applied.sprint_closure_triggered && decision.applied.create_new_sprint {
            "closed completed sprint and opened the next one".to_string()
        } else if decision.applied.sprint_closure_triggered {
            "closed completed sprint".to_string()
        } else if decision.applied.create_new_sprint {
            format!(
                "created a new sprint with {} task(s) over {} week(s)",
                decision.applied.tasks_to_assign, decision.applied.sprint_duration_weeks
            )
        } else if decision.applied.ensure_cronjob_for_sprint_id.is_some() && decision.applied.cronjob_created {
            "self-healed missing cronjob for the active sprint".to_string()
        } else {
            "no sprint action taken this cycle".to_string()
        }
    }

    fn sprint_id_for_episode(decision: &Decision) -> Option<String> {
        decision
            .applied
            .sprint_name
            .clone()
            .or_else(|| decision.applied.sprint_id_to_close.clone())
            .or_else(|| decision.applied.ensure_cronjob_for_sprint_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{
        FakeBacklogService, FakeProjectService, FakeSchedulerService, FakeSprintService, FakeTeamService,
    };
    use crate::collaborators::{BacklogSummary, LlmService, ProjectDetails, SchedulerService};
    use crate::config::{AdvisorConfig, EmbeddingConfig, IntelligenceConfig};
    use crate::memory::in_memory::InMemoryMemoryStore;
    use crate::memory::working_memory::InMemoryWorkingMemoryStore;
    use async_trait::async_trait;

    struct NeverCalledLlm;

    #[async_trait]
    impl LlmService for NeverCalledLlm {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String> {
            unreachable!("advisor disabled in tests")
        }
    }

    #[allow(clippy::type_complexity)]
    fn build_engine() -> (
        EnhancedDecisionEngine,
        Arc<FakeProjectService>,
        Arc<FakeBacklogService>,
        Arc<FakeSprintService>,
        Arc<FakeSchedulerService>,
    ) {
        build_engine_with(ConfigSnapshot::default(), Arc::new(InMemoryMemoryStore::new()))
    }

    #[allow(clippy::type_complexity)]
    fn build_engine_with(
        config: ConfigSnapshot,
        memory: Arc<dyn MemoryStore>,
    ) -> (
        EnhancedDecisionEngine,
        Arc<FakeProjectService>,
        Arc<FakeBacklogService>,
        Arc<FakeSprintService>,
        Arc<FakeSchedulerService>,
    ) {
        let project = Arc::new(FakeProjectService::new());
        let team = Arc::new(FakeTeamService::new());
        let backlog = Arc::new(FakeBacklogService::new());
        let sprint = Arc::new(FakeSprintService::new());
        let scheduler = Arc::new(FakeSchedulerService::new());

        let analyzer = ProjectAnalyzer::new(project.clone(), team, backlog.clone(), sprint.clone());
        let pattern_engine = PatternEngine::new(memory.clone(), config.intelligence.clone());
        let planner = RuleBasedPlanner::new(&config.intelligence);
        let modifier = DecisionModifier::new(config.intelligence.clone());
        let gate = ConfidenceGate::new(config.intelligence.clone());
        let embedding_client = Arc::new(EmbeddingClient::new(reqwest::Client::new(), EmbeddingConfig {
            base_url: "http://localhost:1".to_string(),
            max_retries: 0,
            ..EmbeddingConfig::default()
        }));
        let advisor = AiAdvisor::new(Arc::new(NeverCalledLlm), AdvisorConfig { enabled: false, ..AdvisorConfig::default() });
        let cron = CronController::new(scheduler.clone(), "http://orchestrator:8080".to_string());
        let events: Arc<dyn EventPublisher> = Arc::new(crate::events::LoggingEventPublisher::new());
        let metrics = Arc::new(Metrics::new());
        let locks = Arc::new(ProjectLockTable::new());

        let engine = EnhancedDecisionEngine::new(
            analyzer,
            pattern_engine,
            planner,
            modifier,
            gate,
            memory,
            Arc::new(InMemoryWorkingMemoryStore::new()),
            embedding_client,
            advisor,
            cron,
            sprint.clone(),
            events,
            metrics,
            locks,
            &config,
        );
        (engine, project, backlog, sprint, scheduler)
    }

    #[tokio::test]
    async fn orchestrate_creates_sprint_and_cron_job_for_fresh_backlog() {
        let (engine, project, backlog, sprint, _scheduler) = build_engine();
        project.seed(ProjectDetails { project_id: "PRJ-1".to_string(), status: "active".to_string(), team_size: 5 });
        backlog.seed("PRJ-1", BacklogSummary { total_tasks: 10, unassigned_for_sprint_count: 8 });

        let outcome = engine.orchestrate("PRJ-1").await.unwrap();
        assert!(outcome.decision.applied.create_new_sprint);
        assert!(outcome.decision.applied.cronjob_created);
        assert!(outcome.decision.applied.sprint_name.is_some());
        assert_eq!(sprint.created_calls().len(), 1);
        assert!(outcome.decision.applied.actions_taken.iter().any(|a| a.starts_with("Created cronjob")));
        assert!(!outcome.advisory.enabled);
    }

    #[tokio::test]
    async fn orchestrate_is_idempotent_with_no_backlog() {
        let (engine, project, backlog, sprint, _scheduler) = build_engine();
        project.seed(ProjectDetails { project_id: "PRJ-2".to_string(), status: "active".to_string(), team_size: 5 });
        backlog.seed("PRJ-2", BacklogSummary { total_tasks: 0, unassigned_for_sprint_count: 0 });

        let outcome = engine.orchestrate("PRJ-2").await.unwrap();
        assert!(!outcome.decision.applied.create_new_sprint);
        assert!(sprint.created_calls().is_empty());
    }

    #[tokio::test]
    async fn disabling_cross_project_learning_skips_pattern_engine_entirely() {
        let memory: Arc<dyn MemoryStore> = Arc::new(InMemoryMemoryStore::new());
        let mut config = ConfigSnapshot::default();
        config.intelligence.min_similar_projects = 1;
        config.features.enable_cross_project_learning = false;
        let (engine, project, backlog, _sprint, _scheduler) = build_engine_with(config, memory);
        project.seed(ProjectDetails { project_id: "PRJ-3".to_string(), status: "active".to_string(), team_size: 5 });
        backlog.seed("PRJ-3", BacklogSummary { total_tasks: 10, unassigned_for_sprint_count: 8 });

        let outcome = engine.orchestrate("PRJ-3").await.unwrap();
        assert!(!outcome.analysis.pattern_analysis.data_available);
        assert!(outcome.analysis.pattern_analysis.similar_projects.is_empty());
        assert_eq!(outcome.decision.decision_source, crate::types::DecisionSource::RuleBasedOnly);
    }

    #[tokio::test]
    async fn active_sprint_with_missing_cronjob_self_heals() {
        let (engine, project, backlog, sprint, scheduler) = build_engine();
        project.seed(ProjectDetails { project_id: "TEST-001".to_string(), status: "active".to_string(), team_size: 5 });
        backlog.seed("TEST-001", BacklogSummary { total_tasks: 10, unassigned_for_sprint_count: 2 });
        sprint.seed_active(
            "TEST-001",
            crate::types::ActiveSprint {
                sprint_id: "TEST-001-S12".to_string(),
                total_tasks: 8,
                completed_tasks: 3,
                started_at: chrono::Utc::now(),
                recent_velocities: vec![3.0],
                remaining_tasks: 5,
                forecast_velocity: 3.0,
            },
        );
        assert!(!scheduler.exists(&crate::cron::job_name("TEST-001", "TEST-001-S12")).await.unwrap());

        let outcome = engine.orchestrate("TEST-001").await.unwrap();
        assert!(!outcome.decision.applied.create_new_sprint);
        assert!(!outcome.decision.applied.sprint_closure_triggered);
        assert!(outcome.decision.applied.cronjob_created);
        assert_eq!(
            outcome.decision.applied.ensure_cronjob_for_sprint_id,
            Some("TEST-001-S12".to_string())
        );
        assert!(outcome
            .decision
            .applied
            .actions_taken
            .iter()
            .any(|a| a == &format!("Created cronjob {}", crate::cron::job_name("TEST-001", "TEST-001-S12"))));
        assert!(scheduler.exists(&crate::cron::job_name("TEST-001", "TEST-001-S12")).await.unwrap());
    }
}
