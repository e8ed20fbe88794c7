//! Component and adoption metrics (`SPEC_FULL.md` §4.10, §6.1 performance
//! endpoint).
//!
//! Plain atomics rather than a metrics-crate dependency: the teacher has no
//! metrics exporter in its own stack, so this stays at the same ambient
//! level — counted in-process, and surfaced read-only via
//! `GET /orchestrate/intelligence/performance/metrics/{project_id}`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::types::DecisionSource;

#[derive(Debug, Default)]
pub struct Metrics {
    decisions_total: AtomicU64,
    decisions_intelligence_enhanced: AtomicU64,
    decisions_rule_based_only: AtomicU64,
    embedding_circuit_open_total: AtomicU64,
    advisor_degraded_total: AtomicU64,
    audit_write_failed_total: AtomicU64,
}

/// Point-in-time read of [`Metrics`], serialised directly into the
/// performance-metrics response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub decisions_total: u64,
    pub decisions_intelligence_enhanced: u64,
    pub decisions_rule_based_only: u64,
    /// Fraction of decisions where the intelligence layer's output was
    /// actually committed, in `[0, 1]`.
    pub intelligence_adoption_rate: f64,
    pub embedding_circuit_open_total: u64,
    pub advisor_degraded_total: u64,
    pub audit_write_failed_total: u64,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decision(&self, source: DecisionSource) {
        self.decisions_total.fetch_add(1, Ordering::Relaxed);
        match source {
            DecisionSource::IntelligenceEnhanced => {
                self.decisions_intelligence_enhanced.fetch_add(1, Ordering::Relaxed);
            }
            DecisionSource::RuleBasedOnly => {
                self.decisions_rule_based_only.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_embedding_circuit_open(&self) {
        self.embedding_circuit_open_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_advisor_degraded(&self) {
        self.advisor_degraded_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audit_write_failed(&self) {
        self.audit_write_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.decisions_total.load(Ordering::Relaxed);
        let enhanced = self.decisions_intelligence_enhanced.load(Ordering::Relaxed);
        let intelligence_adoption_rate = if total == 0 { 0.0 } else { enhanced as f64 / total as f64 };
        MetricsSnapshot {
            decisions_total: total,
            decisions_intelligence_enhanced: enhanced,
            decisions_rule_based_only: self.decisions_rule_based_only.load(Ordering::Relaxed),
            intelligence_adoption_rate,
            embedding_circuit_open_total: self.embedding_circuit_open_total.load(Ordering::Relaxed),
            advisor_degraded_total: self.advisor_degraded_total.load(Ordering::Relaxed),
            audit_write_failed_total: self.audit_write_failed_total.load(Ordering::Relaxed),
        }
    }
}
