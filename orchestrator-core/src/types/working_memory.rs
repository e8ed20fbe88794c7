//! Working Memory Session (`SPEC_FULL.md` §3, §4.7) — ephemeral per-project
//! caching of the latest pattern analysis and recent episode ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// TTL-bounded cache of a project's most recent orchestration context, so a
/// closely-following request (a manual retry, a dashboard refresh) does not
/// have to re-run the Pattern Engine's similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingMemorySession {
    pub session_id: Uuid,
    pub project_id: String,
    /// The last [`crate::types::PatternAnalysis`] plus recent episode ids,
    /// kept as opaque JSON here (mirroring the `knowledge.content` column)
    /// since callers read it back through [`crate::memory::WorkingMemoryStore`]
    /// rather than through this type directly.
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl WorkingMemorySession {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expires_at_boundary_counts_as_expired() {
        let now = Utc::now();
        let session = WorkingMemorySession {
            session_id: Uuid::new_v4(),
            project_id: "PRJ-1".to_string(),
            payload: serde_json::json!({}),
            created_at: now - Duration::minutes(5),
            expires_at: now,
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));
    }
}
