//! libsql/Turso-backed [`orchestrator_core::memory::MemoryStore`] (§4.7).
//!
//! Grounded on the teacher's `memory-storage-turso` crate: the same
//! remote/local URL validation in [`LibsqlMemoryStore::connect`], the same
//! JSON-text-column schema in [`schema`], the same connection-pool shape in
//! [`pool`], and the same brute-force-fetch-then-`cosine_similarity`
//! fallback search the teacher uses when no native vector index is present
//! (`storage::search::find_similar_episodes_brute_force`).

pub mod pool;
mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use libsql::{params, Builder};
use orchestrator_core::config::MemoryPoolConfig;
use orchestrator_core::error::{Error, Result};
use orchestrator_core::evolution::StrategyRepository;
use orchestrator_core::memory::{cosine_similarity, MemoryStore, PoolStatus, WorkingMemoryStore};
use orchestrator_core::types::{
    ActionRecord, Episode, EpisodeOutcome, Perception, Reasoning, Strategy, StrategyLifecycle,
    WorkingMemorySession,
};
use tracing::{info, warn};
use uuid::Uuid;

pub use pool::ConnectionPool;

pub struct LibsqlMemoryStore {
    pool: Arc<ConnectionPool>,
}

impl LibsqlMemoryStore {
    /// Open (and, on first run, initialise the schema of) a libsql
    /// database. Mirrors the teacher's security checks in
    /// `TursoStorage::with_config`: only `libsql://`, `file:` and
    /// `:memory:` URLs are accepted, and remote URLs require a token.
    pub async fn connect(config: &MemoryPoolConfig) -> Result<Self> {
        let url = &config.db_url;
        if !url.starts_with("libsql://") && !url.starts_with("file:") && url != ":memory:" {
            return Err(Error::ConfigError(format!(
                "insecure or unsupported database url `{url}`; only libsql://, file: or :memory: are allowed"
            )));
        }
        if url.starts_with("libsql://") && config.db_token.trim().is_empty() {
            return Err(Error::ConfigError(
                "authentication token required for remote libsql connections".to_string(),
            ));
        }

        info!(url, "connecting to agent memory store");
        let db = if url.starts_with("libsql://") {
            Builder::new_remote(url.clone(), config.db_token.clone())
                .build()
                .await
                .map_err(|e| Error::InternalError(format!("failed to connect to libsql: {e}")))?
        } else {
            let path = url.strip_prefix("file:").unwrap_or(url);
            Builder::new_local(path)
                .build()
                .await
                .map_err(|e| Error::InternalError(format!("failed to open local libsql db: {e}")))?
        };

        let pool = Arc::new(ConnectionPool::new(Arc::new(db), config));
        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Shares the underlying connection pool with [`LibsqlStrategyRepository`]
    /// and [`LibsqlWorkingMemoryStore`] so a process opens one database
    /// connection pool, not three.
    #[must_use]
    pub fn pool(&self) -> Arc<ConnectionPool> {
        self.pool.clone()
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.pool.acquire().await?;
        for statement in schema::ALL_SCHEMA_STATEMENTS {
            conn.execute(statement, ())
                .await
                .map_err(|e| Error::InternalError(format!("schema migration failed: {e}")))?;
        }
        Ok(())
    }
}

fn to_unix(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

fn from_unix(ts: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .ok_or_else(|| Error::InternalError(format!("invalid stored timestamp {ts}")))
}

fn row_to_episode(row: &libsql::Row) -> Result<Episode> {
    let map_err = |e: libsql::Error| Error::InternalError(format!("row decode failed: {e}"));
    let episode_id: String = row.get(0).map_err(map_err)?;
    let project_id: String = row.get(1).map_err(map_err)?;
    let timestamp: i64 = row.get(2).map_err(map_err)?;
    let perception: String = row.get(3).map_err(map_err)?;
    let reasoning: String = row.get(4).map_err(map_err)?;
    let action: String = row.get(5).map_err(map_err)?;
    let outcome: Option<String> = row.get(6).map_err(map_err)?;
    let outcome_quality: Option<f64> = row.get(7).map_err(map_err)?;
    let outcome_recorded_at: Option<i64> = row.get(8).map_err(map_err)?;
    let embedding: Option<String> = row.get(9).map_err(map_err)?;
    let agent_version: String = row.get(10).map_err(map_err)?;
    let control_mode: String = row.get(11).map_err(map_err)?;
    let decision_source: String = row.get(12).map_err(map_err)?;
    let sprint_id: Option<String> = row.get(13).map_err(map_err)?;
    let external_note_id: Option<String> = row.get(14).map_err(map_err)?;

    Ok(Episode {
        episode_id: Uuid::parse_str(&episode_id)
            .map_err(|e| Error::InternalError(format!("invalid stored episode_id: {e}")))?,
        project_id,
        timestamp: from_unix(timestamp)?,
        perception: serde_json::from_str::<Perception>(&perception)?,
        reasoning: serde_json::from_str::<Reasoning>(&reasoning)?,
        action: serde_json::from_str::<ActionRecord>(&action)?,
        outcome: outcome.map(|o| serde_json::from_str::<EpisodeOutcome>(&o)).transpose()?,
        outcome_quality,
        outcome_recorded_at: outcome_recorded_at.map(from_unix).transpose()?,
        embedding: embedding.map(|e| serde_json::from_str::<Vec<f32>>(&e)).transpose()?,
        agent_version,
        control_mode,
        decision_source: serde_json::from_value(serde_json::Value::String(decision_source))?,
        sprint_id,
        external_note_id,
    })
}

#[async_trait]
impl MemoryStore for LibsqlMemoryStore {
    async fn store_episode(&self, episode: &Episode) -> Result<()> {
        let conn = self.pool.acquire().await?;
        let decision_source = serde_json::to_value(episode.decision_source)?
            .as_str()
            .ok_or_else(|| Error::InternalError("decision_source did not serialise to a string".to_string()))?
            .to_string();
        conn.execute(
            "INSERT OR REPLACE INTO episodes (
                episode_id, project_id, timestamp, perception, reasoning, action,
                outcome, outcome_quality, outcome_recorded_at, embedding,
                agent_version, control_mode, decision_source, sprint_id, external_note_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                episode.episode_id.to_string(),
                episode.project_id.clone(),
                to_unix(episode.timestamp),
                serde_json::to_string(&episode.perception)?,
                serde_json::to_string(&episode.reasoning)?,
                serde_json::to_string(&episode.action)?,
                episode.outcome.as_ref().map(serde_json::to_string).transpose()?,
                episode.outcome_quality,
                episode.outcome_recorded_at.map(to_unix),
                episode.embedding.as_ref().map(serde_json::to_string).transpose()?,
                episode.agent_version.clone(),
                episode.control_mode.clone(),
                decision_source,
                episode.sprint_id.clone(),
                episode.external_note_id.clone(),
            ],
        )
        .await
        .map_err(|e| Error::InternalError(format!("failed to store episode: {e}")))?;
        Ok(())
    }

    async fn find_similar_episodes(
        &self,
        project_id_to_exclude: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(Episode, f64)>> {
        let conn = self.pool.acquire().await?;
        let mut rows = conn
            .query(
                "SELECT episode_id, project_id, timestamp, perception, reasoning, action,
                        outcome, outcome_quality, outcome_recorded_at, embedding,
                        agent_version, control_mode, decision_source, sprint_id, external_note_id
                 FROM episodes
                 WHERE project_id != ? AND embedding IS NOT NULL",
                params![project_id_to_exclude.to_string()],
            )
            .await
            .map_err(|e| Error::InternalError(format!("similarity query failed: {e}")))?;

        let mut scored = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::InternalError(e.to_string()))? {
            let episode = row_to_episode(&row)?;
            let Some(candidate_embedding) = episode.embedding.as_deref() else {
                continue;
            };
            let similarity = cosine_similarity(embedding, candidate_embedding);
            scored.push((episode, similarity));
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn update_episode_outcome(
        &self,
        episode_id: Uuid,
        outcome: EpisodeOutcome,
        outcome_quality: f64,
    ) -> Result<()> {
        let conn = self.pool.acquire().await?;
        let affected = conn
            .execute(
                "UPDATE episodes SET outcome = ?, outcome_quality = ?, outcome_recorded_at = ? WHERE episode_id = ?",
                params![
                    serde_json::to_string(&outcome)?,
                    outcome_quality,
                    Utc::now().timestamp(),
                    episode_id.to_string(),
                ],
            )
            .await
            .map_err(|e| Error::InternalError(format!("failed to back-fill outcome: {e}")))?;
        if affected == 0 {
            return Err(Error::NotFound(format!("episode {episode_id} not found")));
        }
        Ok(())
    }

    async fn get_episodes_without_outcomes(&self) -> Result<Vec<Episode>> {
        let conn = self.pool.acquire().await?;
        let mut rows = conn
            .query(
                "SELECT episode_id, project_id, timestamp, perception, reasoning, action,
                        outcome, outcome_quality, outcome_recorded_at, embedding,
                        agent_version, control_mode, decision_source, sprint_id, external_note_id
                 FROM episodes
                 WHERE sprint_id IS NOT NULL AND outcome IS NULL",
                (),
            )
            .await
            .map_err(|e| Error::InternalError(format!("backfill sweep query failed: {e}")))?;
        let mut episodes = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::InternalError(e.to_string()))? {
            episodes.push(row_to_episode(&row)?);
        }
        Ok(episodes)
    }

    async fn get_episodes_for_project(&self, project_id: &str) -> Result<Vec<Episode>> {
        let conn = self.pool.acquire().await?;
        let mut rows = conn
            .query(
                "SELECT episode_id, project_id, timestamp, perception, reasoning, action,
                        outcome, outcome_quality, outcome_recorded_at, embedding,
                        agent_version, control_mode, decision_source, sprint_id, external_note_id
                 FROM episodes
                 WHERE project_id = ?
                 ORDER BY timestamp DESC",
                params![project_id.to_string()],
            )
            .await
            .map_err(|e| Error::InternalError(format!("audit history query failed: {e}")))?;
        let mut episodes = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::InternalError(e.to_string()))? {
            episodes.push(row_to_episode(&row)?);
        }
        Ok(episodes)
    }

    async fn health(&self) -> Result<PoolStatus> {
        let status = self.pool.status();
        if status.is_exhausted() {
            warn!(?status, "memory store connection pool exhausted");
        }
        Ok(status)
    }
}

fn row_to_strategy(row: &libsql::Row) -> Result<Strategy> {
    let map_err = |e: libsql::Error| Error::InternalError(format!("row decode failed: {e}"));
    let knowledge_id: String = row.get(0).map_err(map_err)?;
    let knowledge_type: String = row.get(1).map_err(map_err)?;
    let content: String = row.get(2).map_err(map_err)?;
    let description: String = row.get(3).map_err(map_err)?;
    let confidence: f64 = row.get(4).map_err(map_err)?;
    let supporting_episodes: String = row.get(5).map_err(map_err)?;
    let contradicting_episodes: String = row.get(6).map_err(map_err)?;
    let times_applied: i64 = row.get(7).map_err(map_err)?;
    let success_count: i64 = row.get(8).map_err(map_err)?;
    let failure_count: i64 = row.get(9).map_err(map_err)?;
    let lifecycle: String = row.get(10).map_err(map_err)?;
    let is_active: i64 = row.get(11).map_err(map_err)?;
    let created_at: i64 = row.get(12).map_err(map_err)?;
    let last_validated: Option<i64> = row.get(13).map_err(map_err)?;
    let last_applied: Option<i64> = row.get(14).map_err(map_err)?;

    Ok(Strategy {
        knowledge_id: Uuid::parse_str(&knowledge_id)
            .map_err(|e| Error::InternalError(format!("invalid stored knowledge_id: {e}")))?,
        knowledge_type,
        content: serde_json::from_str(&content)?,
        description,
        confidence,
        supporting_episodes: serde_json::from_str(&supporting_episodes)?,
        contradicting_episodes: serde_json::from_str(&contradicting_episodes)?,
        times_applied: times_applied as u64,
        success_count: success_count as u64,
        failure_count: failure_count as u64,
        lifecycle: serde_json::from_value(serde_json::Value::String(lifecycle))?,
        is_active: is_active != 0,
        created_at: from_unix(created_at)?,
        last_validated: last_validated.map(from_unix).transpose()?,
        last_applied: last_applied.map(from_unix).transpose()?,
    })
}

/// libsql-backed [`StrategyRepository`], grounded on the same `knowledge`
/// table convention as the teacher's `memory-storage-turso` strategy store.
pub struct LibsqlStrategyRepository {
    pool: Arc<ConnectionPool>,
}

impl LibsqlStrategyRepository {
    #[must_use]
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StrategyRepository for LibsqlStrategyRepository {
    async fn list(&self) -> Result<Vec<Strategy>> {
        let conn = self.pool.acquire().await?;
        let mut rows = conn
            .query(
                "SELECT knowledge_id, knowledge_type, content, description, confidence,
                        supporting_episodes, contradicting_episodes, times_applied,
                        success_count, failure_count, lifecycle, is_active, created_at,
                        last_validated, last_applied
                 FROM knowledge",
                (),
            )
            .await
            .map_err(|e| Error::InternalError(format!("strategy list query failed: {e}")))?;
        let mut strategies = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::InternalError(e.to_string()))? {
            strategies.push(row_to_strategy(&row)?);
        }
        Ok(strategies)
    }

    async fn save(&self, strategy: &Strategy) -> Result<()> {
        let conn = self.pool.acquire().await?;
        let lifecycle = serde_json::to_value(strategy.lifecycle)?
            .as_str()
            .ok_or_else(|| Error::InternalError("lifecycle did not serialise to a string".to_string()))?
            .to_string();
        conn.execute(
            "INSERT OR REPLACE INTO knowledge (
                knowledge_id, knowledge_type, content, description, confidence,
                supporting_episodes, contradicting_episodes, times_applied,
                success_count, failure_count, lifecycle, is_active, created_at,
                last_validated, last_applied
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                strategy.knowledge_id.to_string(),
                strategy.knowledge_type.clone(),
                serde_json::to_string(&strategy.content)?,
                strategy.description.clone(),
                strategy.confidence,
                serde_json::to_string(&strategy.supporting_episodes)?,
                serde_json::to_string(&strategy.contradicting_episodes)?,
                strategy.times_applied as i64,
                strategy.success_count as i64,
                strategy.failure_count as i64,
                lifecycle,
                i64::from(strategy.is_active),
                to_unix(strategy.created_at),
                strategy.last_validated.map(to_unix),
                strategy.last_applied.map(to_unix),
            ],
        )
        .await
        .map_err(|e| Error::InternalError(format!("failed to save strategy: {e}")))?;
        Ok(())
    }
}

/// libsql-backed [`WorkingMemoryStore`] (§3, §4.7) — one live session per
/// project, replaced wholesale on each `put`, the same `INSERT OR REPLACE`
/// convention [`LibsqlMemoryStore::store_episode`] uses.
pub struct LibsqlWorkingMemoryStore {
    pool: Arc<ConnectionPool>,
}

impl LibsqlWorkingMemoryStore {
    #[must_use]
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkingMemoryStore for LibsqlWorkingMemoryStore {
    async fn put(&self, session: WorkingMemorySession) -> Result<()> {
        let conn = self.pool.acquire().await?;
        conn.execute("DELETE FROM working_memory WHERE project_id = ?", params![session.project_id.clone()])
            .await
            .map_err(|e| Error::InternalError(format!("failed to clear prior working memory session: {e}")))?;
        conn.execute(
            "INSERT INTO working_memory (session_id, project_id, payload, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                session.session_id.to_string(),
                session.project_id.clone(),
                serde_json::to_string(&session.payload)?,
                to_unix(session.created_at),
                to_unix(session.expires_at),
            ],
        )
        .await
        .map_err(|e| Error::InternalError(format!("failed to store working memory session: {e}")))?;
        Ok(())
    }

    async fn get(&self, project_id: &str, now: DateTime<Utc>) -> Result<Option<WorkingMemorySession>> {
        let conn = self.pool.acquire().await?;
        let mut rows = conn
            .query(
                "SELECT session_id, project_id, payload, created_at, expires_at
                 FROM working_memory WHERE project_id = ?",
                params![project_id.to_string()],
            )
            .await
            .map_err(|e| Error::InternalError(format!("working memory lookup failed: {e}")))?;
        let Some(row) = rows.next().await.map_err(|e| Error::InternalError(e.to_string()))? else {
            return Ok(None);
        };
        let map_err = |e: libsql::Error| Error::InternalError(format!("row decode failed: {e}"));
        let session_id: String = row.get(0).map_err(map_err)?;
        let project_id: String = row.get(1).map_err(map_err)?;
        let payload: String = row.get(2).map_err(map_err)?;
        let created_at: i64 = row.get(3).map_err(map_err)?;
        let expires_at: i64 = row.get(4).map_err(map_err)?;

        let session = WorkingMemorySession {
            session_id: Uuid::parse_str(&session_id)
                .map_err(|e| Error::InternalError(format!("invalid stored session_id: {e}")))?,
            project_id,
            payload: serde_json::from_str(&payload)?,
            created_at: from_unix(created_at)?,
            expires_at: from_unix(expires_at)?,
        };
        Ok((!session.is_expired(now)).then_some(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::config::MemoryPoolConfig;
    use orchestrator_core::types::{ConfidenceScores, DecisionSource, PatternAnalysis, TeamAvailabilityStatus};

    fn memory_config() -> MemoryPoolConfig {
        MemoryPoolConfig { db_url: ":memory:".to_string(), max: 2, ..MemoryPoolConfig::default() }
    }

    fn sample_episode(project_id: &str) -> Episode {
        Episode {
            episode_id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            timestamp: Utc::now(),
            perception: Perception {
                project_id: project_id.to_string(),
                project_status: "active".to_string(),
                team_size: 5,
                team_availability_status: TeamAvailabilityStatus::Available,
                backlog_tasks: 10,
                unassigned_tasks: 3,
                active_sprints_count: 1,
            },
            reasoning: Reasoning {
                pattern_analysis: PatternAnalysis::empty(),
                confidence_scores: ConfidenceScores {
                    overall_decision_confidence: 0.8,
                    intelligence_threshold_met: true,
                    minimum_threshold: 0.65,
                },
                headline: "created a new sprint".to_string(),
            },
            action: ActionRecord::default(),
            outcome: None,
            outcome_quality: None,
            outcome_recorded_at: None,
            embedding: Some(vec![1.0, 0.0, 0.0]),
            agent_version: "test".to_string(),
            control_mode: "hybrid".to_string(),
            decision_source: DecisionSource::RuleBasedOnly,
            sprint_id: Some("SPR-1".to_string()),
            external_note_id: None,
        }
    }

    #[tokio::test]
    async fn store_and_retrieve_round_trips_an_episode() {
        let store = LibsqlMemoryStore::connect(&memory_config()).await.unwrap();
        let episode = sample_episode("PRJ-1");
        store.store_episode(&episode).await.unwrap();
        let fetched = store.get_episodes_for_project("PRJ-1").await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].episode_id, episode.episode_id);
    }

    #[tokio::test]
    async fn find_similar_episodes_excludes_same_project_and_ranks_by_similarity() {
        let store = LibsqlMemoryStore::connect(&memory_config()).await.unwrap();
        store.store_episode(&sample_episode("PRJ-1")).await.unwrap();
        let mut other = sample_episode("PRJ-2");
        other.embedding = Some(vec![0.0, 1.0, 0.0]);
        store.store_episode(&other).await.unwrap();

        let results = store.find_similar_episodes("PRJ-1", &[1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.project_id, "PRJ-2");
    }

    #[tokio::test]
    async fn update_episode_outcome_fails_for_unknown_episode() {
        let store = LibsqlMemoryStore::connect(&memory_config()).await.unwrap();
        let outcome = EpisodeOutcome {
            sprint_completed: true,
            tasks_completed: 8,
            tasks_total: 10,
            summary: "done".to_string(),
        };
        let err = store.update_episode_outcome(Uuid::new_v4(), outcome, 0.8).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_insecure_database_url() {
        let config = MemoryPoolConfig { db_url: "http://example.com/db".to_string(), ..MemoryPoolConfig::default() };
        let err = LibsqlMemoryStore::connect(&config).await.unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
