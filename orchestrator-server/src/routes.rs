//! HTTP surface (`SPEC_FULL.md` §6.1), grounded on the teacher's
//! `memory-mcp::server::tools` handler-per-operation layout, adapted to
//! `axum` extractors/responses.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Json, http::StatusCode};
use orchestrator_core::config::IntelligenceMode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /orchestrate/project/{project_id}`. Every field is
/// currently informational — the Rule-Based Planner and Confidence Gate
/// derive their own decisions from live collaborator state — but the
/// surface is kept so callers can eventually steer a single run (§6.1).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrchestrateOptions {
    pub create_sprint_if_needed: Option<bool>,
    pub assign_tasks: Option<bool>,
    pub create_cronjob: Option<bool>,
    pub schedule: Option<String>,
    pub sprint_duration_weeks: Option<i64>,
    pub max_tasks_per_sprint: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrchestrateRequest {
    pub action: Option<String>,
    pub options: OrchestrateOptions,
}

pub async fn orchestrate_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(_req): Json<OrchestrateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engines.build();
    let outcome = engine.orchestrate(&project_id).await?;

    Ok(Json(json!({
        "analysis": outcome.analysis,
        "decisions": outcome.decision.rule_based,
        "actions_taken": outcome.decision.applied.actions_taken,
        "performance_metrics": state.engines.metrics().snapshot(),
        "intelligence_metadata": outcome.decision.intelligence_metadata,
        "confidence_scores": outcome.decision.confidence_scores,
        "intelligence_adjustments": outcome.decision.intelligence_adjustments,
        "episode_id": outcome.episode_id,
        "ai_agent_advisory": outcome.advisory,
    })))
}

#[derive(Debug, Serialize)]
struct DecisionSourceAggregate {
    count: usize,
    average_confidence: f64,
}

pub async fn decision_impact(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engines.build();
    let history = engine.auditor().history(&project_id).await?;

    let (rule_based, enhanced): (Vec<_>, Vec<_>) = history
        .iter()
        .partition(|r| r.decision_source == orchestrator_core::types::DecisionSource::RuleBasedOnly);

    if rule_based.is_empty() || enhanced.is_empty() {
        return Ok(Json(json!({
            "comparison_report": {
                "message": "insufficient decision history to compare rule-based and intelligence-enhanced outcomes",
            }
        })));
    }

    let aggregate = |records: &[&orchestrator_core::auditor::AuditRecord]| DecisionSourceAggregate {
        count: records.len(),
        average_confidence: records.iter().map(|r| r.confidence).sum::<f64>() / records.len() as f64,
    };

    Ok(Json(json!({
        "comparison_report": {
            "rule_based_only": aggregate(&rule_based),
            "intelligence_enhanced": aggregate(&enhanced),
        }
    })))
}

#[derive(Debug, Deserialize)]
struct DecisionModeRequest {
    mode: IntelligenceMode,
    confidence_threshold: Option<f64>,
    enable_task_count_adjustment: Option<bool>,
    enable_sprint_duration_adjustment: Option<bool>,
}

pub async fn set_decision_mode(
    State(state): State<Arc<AppState>>,
    Path(_project_id): Path<String>,
    Json(req): Json<DecisionModeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(threshold) = req.confidence_threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(orchestrator_core::error::Error::BadRequest(
                "confidence_threshold must be within [0, 1]".to_string(),
            )
            .into());
        }
    }

    state.engines.update_intelligence_config(|intelligence| {
        intelligence.mode = req.mode;
        if let Some(threshold) = req.confidence_threshold {
            intelligence.confidence_threshold = threshold;
        }
        if let Some(enabled) = req.enable_task_count_adjustment {
            intelligence.enable_task_count_adjustment = enabled;
        }
        if let Some(enabled) = req.enable_sprint_duration_adjustment {
            intelligence.enable_sprint_duration_adjustment = enabled;
        }
    });

    let applied = state.engines.config_snapshot().intelligence;
    Ok(Json(json!({ "applied": applied })))
}

pub async fn decision_audit(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engines.build();
    let history = engine.auditor().history(&project_id).await?;
    if history.is_empty() {
        return Ok(Json(json!({ "detail": "No decision audit records found" })));
    }
    Ok(Json(json!({ "records": history })))
}

pub async fn performance_metrics(
    State(state): State<Arc<AppState>>,
    Path(_project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.engines.metrics().snapshot();
    let recommendations_generated = snapshot.decisions_intelligence_enhanced;
    let adjustments_applied = snapshot.decisions_intelligence_enhanced;
    let application_rate_percent = snapshot.intelligence_adoption_rate * 100.0;

    Ok(Json(json!({
        "component_metrics": snapshot,
        "adoption_metrics": {
            "intelligence_invocations": snapshot.decisions_total,
            "recommendations_generated": recommendations_generated,
            "adjustments_applied": adjustments_applied,
            "application_rate_percent": application_rate_percent,
        },
        "thresholds": state.engines.config_snapshot().intelligence,
    })))
}

pub async fn health_ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pool_status = state.engines.memory().health().await;
    let embedding_healthy = state.readiness.embedding_healthy();

    match pool_status {
        Ok(status) if !status.is_exhausted() => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "pool": { "size": status.size, "idle": status.idle, "busy": status.busy, "max": status.max },
                "embedding_service": if embedding_healthy { "up" } else { "down" },
            })),
        ),
        Ok(status) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "pool": { "size": status.size, "idle": status.idle, "busy": status.busy, "max": status.max },
                "embedding_service": if embedding_healthy { "up" } else { "down" },
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "error": e.to_string() })),
        ),
    }
}
