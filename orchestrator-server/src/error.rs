//! Error-to-HTTP mapping (`SPEC_FULL.md` §7.1).
//!
//! `CircuitOpen`, `Timeout`, `AuditWriteFailed` and `AdvisoryDegraded` never
//! reach this layer — the Enhanced Decision Engine folds them into
//! `warnings[]`/`ai_agent_advisory` before returning. Anything that does
//! reach here is mapped by the table below.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use orchestrator_core::error::Error;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response(),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response(),
            Error::UpstreamUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": msg }))).into_response()
            }
            other => {
                let trace_id = Uuid::new_v4();
                error!(%trace_id, error = %other, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error", "trace_id": trace_id.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
