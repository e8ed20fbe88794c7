//! Table schema for the libsql-backed Agent Memory Store: `episodes`,
//! `knowledge` (strategies) and `working_memory`, the three relations named
//! in `SPEC_FULL.md` §4.7.

/// Perception/reasoning/action are stored as JSON text columns, the same
/// way the teacher's turso backend stores `context`/`steps`/`metadata` —
/// there is no native struct column type in libsql, and JSON keeps the
/// schema stable as those types grow fields.
pub const CREATE_EPISODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS episodes (
    episode_id TEXT PRIMARY KEY NOT NULL,
    project_id TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    perception TEXT NOT NULL,
    reasoning TEXT NOT NULL,
    action TEXT NOT NULL,
    outcome TEXT,
    outcome_quality REAL,
    outcome_recorded_at INTEGER,
    embedding TEXT,
    agent_version TEXT NOT NULL,
    control_mode TEXT NOT NULL,
    decision_source TEXT NOT NULL,
    sprint_id TEXT,
    external_note_id TEXT,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
)
"#;

pub const CREATE_EPISODES_PROJECT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_episodes_project_id
ON episodes(project_id, timestamp DESC)
"#;

pub const CREATE_EPISODES_SPRINT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_episodes_sprint_id
ON episodes(sprint_id)
WHERE sprint_id IS NOT NULL
"#;

/// Backfill sweep (§4.11) filters on this directly; matches the teacher's
/// `idx_episodes_task_type`-style single-purpose index.
pub const CREATE_EPISODES_PENDING_OUTCOME_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_episodes_pending_outcome
ON episodes(sprint_id)
WHERE sprint_id IS NOT NULL AND outcome IS NULL
"#;

/// Semantic memory: strategies derived from clustered episodes (§3, §4.7).
pub const CREATE_KNOWLEDGE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS knowledge (
    knowledge_id TEXT PRIMARY KEY NOT NULL,
    knowledge_type TEXT NOT NULL,
    content TEXT NOT NULL,
    description TEXT NOT NULL,
    confidence REAL NOT NULL,
    supporting_episodes TEXT NOT NULL,
    contradicting_episodes TEXT NOT NULL,
    times_applied INTEGER NOT NULL,
    success_count INTEGER NOT NULL,
    failure_count INTEGER NOT NULL,
    lifecycle TEXT NOT NULL,
    is_active INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    last_validated INTEGER,
    last_applied INTEGER
)
"#;

pub const CREATE_KNOWLEDGE_TYPE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_knowledge_type_active
ON knowledge(knowledge_type, is_active)
"#;

/// Ephemeral per-project cache (§3 "Working Memory Session", §4.7).
pub const CREATE_WORKING_MEMORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS working_memory (
    session_id TEXT PRIMARY KEY NOT NULL,
    project_id TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
)
"#;

pub const CREATE_WORKING_MEMORY_PROJECT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_working_memory_project_id
ON working_memory(project_id)
"#;

pub const ALL_SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_EPISODES_TABLE,
    CREATE_EPISODES_PROJECT_INDEX,
    CREATE_EPISODES_SPRINT_INDEX,
    CREATE_EPISODES_PENDING_OUTCOME_INDEX,
    CREATE_KNOWLEDGE_TABLE,
    CREATE_KNOWLEDGE_TYPE_INDEX,
    CREATE_WORKING_MEMORY_TABLE,
    CREATE_WORKING_MEMORY_PROJECT_INDEX,
];
