//! Error taxonomy for the orchestration core.

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds produced by the decision engine, pattern layer and memory
/// subsystem. Each variant maps to exactly one HTTP status/propagation rule
/// (see `SPEC_FULL.md` §7).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("circuit breaker open")]
    CircuitOpen,

    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    VectorDimensionMismatch { expected: usize, actual: usize },

    #[error("scheduler rejected request: {0}")]
    SchedulerRejected(String),

    #[error("audit write failed: {0}")]
    AuditWriteFailed(String),

    #[error("advisory degraded: {0}")]
    AdvisoryDegraded(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    InternalError(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether a caller may retry this error with backoff.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UpstreamUnavailable(_)
                | Error::CircuitOpen
                | Error::Timeout(_)
                | Error::PoolExhausted
        )
    }

    /// Whether this error must degrade the decision to `rule_based_only`
    /// rather than failing the orchestration outright.
    #[must_use]
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Error::CircuitOpen
                | Error::Timeout(_)
                | Error::AuditWriteFailed(_)
                | Error::AdvisoryDegraded(_)
        )
    }

    /// Whether this error must be surfaced as a 4xx to the HTTP caller.
    #[must_use]
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Error::BadRequest(_) | Error::NotFound(_))
    }
}
