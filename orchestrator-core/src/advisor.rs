//! AI Advisor (`SPEC_FULL.md` §4.12).
//!
//! Strictly advisory, non-blocking natural-language commentary on a
//! decision. Never allowed to affect `applied` — if it times out, errors,
//! or is disabled, the caller gets a degraded-but-valid response instead
//! of an error.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::collaborators::LlmService;
use crate::config::AdvisorConfig;
use crate::types::Decision;

/// What the advisor surfaced for one decision, always present in the
/// response even when disabled or degraded (§4.12).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryNote {
    pub enabled: bool,
    pub commentary: Option<String>,
    pub error: Option<String>,
}

impl AdvisoryNote {
    fn disabled() -> Self {
        Self {
            enabled: false,
            commentary: None,
            error: None,
        }
    }

    fn degraded(error: impl Into<String>) -> Self {
        Self {
            enabled: false,
            commentary: None,
            error: Some(error.into()),
        }
    }
}

pub struct AiAdvisor {
    llm: Arc<dyn LlmService>,
    config: AdvisorConfig,
}

impl AiAdvisor {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmService>, config: AdvisorConfig) -> Self {
        Self { llm, config }
    }

    /// Bounded-timeout, best-effort commentary. Never returns `Err` — a
    /// failure degrades `AdvisoryNote` instead, since the advisor must
    /// never block or fail an orchestration request (§4.12).
    pub async fn advise(&self, project_id: &str, decision: &Decision) -> AdvisoryNote {
        if !self.config.enabled {
            return AdvisoryNote::disabled();
        }

        let prompt = Self::prompt_for(project_id, decision);
        let call = self.llm.generate(&self.config.model, &prompt);
        match tokio::time::timeout(self.config.timeout(), call).await {
            Ok(Ok(commentary)) => AdvisoryNote {
                enabled: true,
                commentary: Some(commentary),
                error: None,
            },
            Ok(Err(e)) => {
                warn!(project_id, error = %e, "AI advisor call failed");
                AdvisoryNote::degraded(e.to_string())
            }
            Err(_) => {
                warn!(project_id, "AI advisor call timed out");
                AdvisoryNote::degraded("advisor request timed out")
            }
        }
    }

    fn prompt_for(project_id: &str, decision: &Decision) -> String {
        format!(
            "Project {project_id}: {:?} decision, {} tasks assigned over {} week(s), {} adjustment(s) applied. Give one sentence of operator-facing commentary.",
            decision.decision_source,
            decision.applied.tasks_to_assign,
            decision.applied.sprint_duration_weeks,
            decision.intelligence_adjustments.count_applied(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{
        AppliedDecision, ConfidenceScores, DecisionSource, IntelligenceAdjustments,
        IntelligenceMetadata, RuleBasedDecision,
    };
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubLlm {
        response: Result<String, String>,
        delay: Duration,
    }

    #[async_trait]
    impl LlmService for StubLlm {
        async fn generate(&self, _model: &str, _prompt: &str) -> crate::error::Result<String> {
            tokio::time::sleep(self.delay).await;
            self.response
                .clone()
                .map_err(Error::UpstreamUnavailable)
        }
    }

    fn decision() -> Decision {
        Decision {
            rule_based: RuleBasedDecision {
                create_new_sprint: true,
                tasks_to_assign: 5,
                sprint_duration_weeks: 2,
                sprint_closure_triggered: false,
                sprint_id_to_close: None,
                ensure_cronjob_for_sprint_id: None,
                reasoning: vec![],
                warnings: vec![],
            },
            intelligence_adjustments: IntelligenceAdjustments::default(),
            applied: AppliedDecision {
                create_new_sprint: true,
                tasks_to_assign: 5,
                sprint_duration_weeks: 2,
                ..AppliedDecision::default()
            },
            confidence_scores: ConfidenceScores {
                overall_decision_confidence: 0.5,
                intelligence_threshold_met: false,
                minimum_threshold: 0.65,
            },
            decision_source: DecisionSource::RuleBasedOnly,
            intelligence_metadata: IntelligenceMetadata {
                decision_mode: crate::config::IntelligenceMode::Hybrid,
                modifications_applied: 0,
                fallback_available: true,
                similar_projects_analyzed: 0,
                historical_data_quality: "insufficient".to_string(),
                prediction_confidence: 0.0,
            },
        }
    }

    #[tokio::test]
    async fn disabled_advisor_returns_disabled_note() {
        let llm = Arc::new(StubLlm { response: Ok("x".to_string()), delay: Duration::ZERO });
        let advisor = AiAdvisor::new(llm, AdvisorConfig { enabled: false, ..AdvisorConfig::default() });
        let note = advisor.advise("PRJ-1", &decision()).await;
        assert!(!note.enabled);
        assert!(note.error.is_none());
    }

    #[tokio::test]
    async fn enabled_advisor_returns_commentary() {
        let llm = Arc::new(StubLlm { response: Ok("looks healthy".to_string()), delay: Duration::ZERO });
        let advisor = AiAdvisor::new(llm, AdvisorConfig { enabled: true, ..AdvisorConfig::default() });
        let note = advisor.advise("PRJ-1", &decision()).await;
        assert!(note.enabled);
        assert_eq!(note.commentary.as_deref(), Some("looks healthy"));
    }

    #[tokio::test]
    async fn advisor_degrades_on_timeout() {
        let llm = Arc::new(StubLlm { response: Ok("slow".to_string()), delay: Duration::from_millis(50) });
        let mut cfg = AdvisorConfig { enabled: true, ..AdvisorConfig::default() };
        cfg.timeout_s = 0;
        let advisor = AiAdvisor::new(llm, cfg);
        let note = advisor.advise("PRJ-1", &decision()).await;
        assert!(!note.enabled);
        assert!(note.error.is_some());
    }

    #[tokio::test]
    async fn advisor_degrades_on_upstream_error() {
        let llm = Arc::new(StubLlm { response: Err("boom".to_string()), delay: Duration::ZERO });
        let advisor = AiAdvisor::new(llm, AdvisorConfig { enabled: true, ..AdvisorConfig::default() });
        let note = advisor.advise("PRJ-1", &decision()).await;
        assert!(!note.enabled);
        assert!(note.error.is_some());
    }
}
