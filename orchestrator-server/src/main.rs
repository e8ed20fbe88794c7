//! Project orchestration service entry point.
//!
//! Wires collaborator HTTP clients, the libsql-backed Agent Memory Store
//! and the Enhanced Decision Engine behind an `axum` router, the same shape
//! the teacher's `memory-mcp::bin::server` binary wires its MCP transport
//! and tool registry.

mod config;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use orchestrator_core::collaborators::http_clients::{
    HttpBacklogClient, HttpLlmClient, HttpProjectClient, HttpSchedulerClient, HttpSprintClient, HttpTeamClient,
};
use orchestrator_core::backfill::OutcomeBackfiller;
use orchestrator_core::embeddings::EmbeddingClient;
use orchestrator_core::evolution::StrategyEvolver;
use orchestrator_core::memory::{MemoryStore, WorkingMemoryStore};
use parking_lot::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::state::{AppState, EngineFactory, ReadinessFlags};

fn init_tracing(cfg: &config::LoggingConfig) {
    let filter = EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if cfg.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = AppConfig::load()?;
    init_tracing(&app_config.logging);

    tracing::info!(bind_addr = %app_config.server.bind_addr, "starting project orchestration service");

    let http = reqwest::Client::new();
    let collaborators = &app_config.core.collaborators;

    let project = Arc::new(HttpProjectClient::new(http.clone(), collaborators.project.clone()));
    let team = Arc::new(HttpTeamClient::new(http.clone(), collaborators.team.clone()));
    let backlog = Arc::new(HttpBacklogClient::new(http.clone(), collaborators.backlog.clone()));
    let sprint = Arc::new(HttpSprintClient::new(http.clone(), collaborators.sprint.clone()));
    let scheduler = Arc::new(HttpSchedulerClient::new(http.clone(), collaborators.scheduler.clone()));
    let llm = Arc::new(HttpLlmClient::new(http.clone(), app_config.core.advisor.clone()));

    let libsql_store = orchestrator_storage::LibsqlMemoryStore::connect(&app_config.core.memory_pool).await?;
    let storage_pool = libsql_store.pool();
    let memory: Arc<dyn MemoryStore> = Arc::new(libsql_store);
    let working_memory: Arc<dyn WorkingMemoryStore> =
        Arc::new(orchestrator_storage::LibsqlWorkingMemoryStore::new(storage_pool.clone()));
    let strategy_repo = Arc::new(orchestrator_storage::LibsqlStrategyRepository::new(storage_pool));
    let embedding_client = Arc::new(EmbeddingClient::new(http.clone(), app_config.core.embedding.clone()));

    let orchestrate_base_url = format!("http://{}", app_config.server.bind_addr);
    let shared_config = Arc::new(RwLock::new(app_config.core.clone()));

    let backfill_sprint_service = sprint.clone();
    let backfill_memory = memory.clone();

    let engines = Arc::new(EngineFactory::new(
        project,
        team,
        backlog,
        sprint,
        memory,
        working_memory,
        embedding_client,
        llm,
        scheduler,
        orchestrate_base_url,
        shared_config.clone(),
    ));
    let readiness = Arc::new(ReadinessFlags::default());
    readiness.set_embedding_healthy(true);

    if shared_config.read().features.enable_strategy_evolution {
        let evolver = StrategyEvolver::new(strategy_repo, shared_config.read().strategy_evolution.clone());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(3600));
            loop {
                ticker.tick().await;
                match evolver.run_once(chrono::Utc::now()).await {
                    Ok(transitioned) if transitioned > 0 => {
                        tracing::info!(transitioned, "strategy evolution sweep transitioned strategies");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "strategy evolution sweep failed"),
                }
            }
        });
    }

    // `enable_async_learning` gates this sweep rather than episode storage
    // itself (see the comment on `EnhancedDecisionEngine::orchestrate` in
    // `orchestrator-core::engine`): this reads already-stored episodes and
    // back-fills their outcomes, it never races the request path.
    if shared_config.read().features.enable_async_learning {
        let backfiller = OutcomeBackfiller::new(backfill_memory, backfill_sprint_service);
        let interval_s = shared_config.read().backfill.interval_s.max(1) as u64;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_s));
            loop {
                ticker.tick().await;
                match backfiller.run_once().await {
                    Ok(updated) if updated > 0 => {
                        tracing::info!(updated, "episode outcome back-fill sweep updated episodes");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "episode outcome back-fill sweep failed"),
                }
            }
        });
    }

    let state = Arc::new(AppState { engines, readiness });

    let router = Router::new()
        .route("/orchestrate/project/{project_id}", post(routes::orchestrate_project))
        .route(
            "/orchestrate/intelligence/decision-impact/{project_id}",
            get(routes::decision_impact),
        )
        .route(
            "/orchestrate/intelligence/project/{project_id}/decision-mode",
            post(routes::set_decision_mode),
        )
        .route(
            "/orchestrate/intelligence/decision-audit/{project_id}",
            get(routes::decision_audit),
        )
        .route(
            "/orchestrate/intelligence/performance/metrics/{project_id}",
            get(routes::performance_metrics),
        )
        .route("/health/ready", get(routes::health_ready))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&app_config.server.bind_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
