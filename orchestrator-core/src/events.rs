//! Event publishing (`SPEC_FULL.md` §6.3).
//!
//! One event kind is emitted today, `ORCHESTRATION_DECISION`, fired once
//! per completed orchestration request regardless of decision source. The
//! publisher is a trait so `orchestrator-server` can fan it out to a real
//! broker later without the engine caring; the only implementation here
//! logs structurally (teacher's `tracing`-everywhere style) and rebroadcasts
//! on an in-process channel for same-process subscribers (e.g. a future
//! SSE endpoint or test assertions).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::types::DecisionSource;

/// The one event kind this service emits (§6.3).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestrationDecisionEvent {
    pub event_type: &'static str,
    pub project_id: String,
    pub episode_id: Uuid,
    pub decision_source: DecisionSource,
    pub timestamp: DateTime<Utc>,
    pub summary: String,
}

impl OrchestrationDecisionEvent {
    #[must_use]
    pub fn new(project_id: impl Into<String>, episode_id: Uuid, decision_source: DecisionSource, summary: impl Into<String>) -> Self {
        Self {
            event_type: "ORCHESTRATION_DECISION",
            project_id: project_id.into(),
            episode_id,
            decision_source,
            timestamp: Utc::now(),
            summary: summary.into(),
        }
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: OrchestrationDecisionEvent);
}

/// Logs the event as structured JSON and rebroadcasts it on a bounded
/// in-process channel. Subscribers that lag past the channel capacity miss
/// events rather than back-pressuring the publisher — acceptable since the
/// log line is the durable record.
pub struct LoggingEventPublisher {
    sender: broadcast::Sender<OrchestrationDecisionEvent>,
}

impl LoggingEventPublisher {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationDecisionEvent> {
        self.sender.subscribe()
    }
}

impl Default for LoggingEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: OrchestrationDecisionEvent) {
        info!(
            event_type = event.event_type,
            project_id = %event.project_id,
            episode_id = %event.episode_id,
            decision_source = ?event.decision_source,
            summary = %event.summary,
            "orchestration decision recorded"
        );
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscribers() {
        let publisher = LoggingEventPublisher::new();
        let mut rx = publisher.subscribe();
        let event = OrchestrationDecisionEvent::new(
            "PRJ-1",
            Uuid::new_v4(),
            DecisionSource::RuleBasedOnly,
            "created a new sprint",
        );
        publisher.publish(event.clone()).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_error() {
        let publisher = LoggingEventPublisher::new();
        publisher
            .publish(OrchestrationDecisionEvent::new(
                "PRJ-1",
                Uuid::new_v4(),
                DecisionSource::RuleBasedOnly,
                "no subscribers",
            ))
            .await;
    }
}
