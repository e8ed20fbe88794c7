//! Connection pool for the libsql Agent Memory Store, grounded on the
//! teacher's `memory-storage-turso::pool` (`PoolConfig`/`PoolStatistics`)
//! but simplified to a semaphore-gated connection factory: libsql
//! connections are cheap and stateless, so there is nothing to recycle
//! beyond bounding concurrent use.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use libsql::{Connection, Database};
use orchestrator_core::config::MemoryPoolConfig;
use orchestrator_core::error::{Error, Result};
use orchestrator_core::memory::PoolStatus;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

pub struct ConnectionPool {
    db: Arc<Database>,
    semaphore: Arc<Semaphore>,
    max: usize,
    in_use: Arc<AtomicUsize>,
    connect_timeout: std::time::Duration,
}

/// A checked-out connection; releases its pool slot on drop.
pub struct PooledConnection {
    conn: Connection,
    _permit: OwnedSemaphorePermit,
    in_use: Arc<AtomicUsize>,
}

impl std::ops::Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConnectionPool {
    pub fn new(db: Arc<Database>, config: &MemoryPoolConfig) -> Self {
        Self {
            db,
            semaphore: Arc::new(Semaphore::new(config.max)),
            max: config.max,
            in_use: Arc::new(AtomicUsize::new(0)),
            connect_timeout: config.connection_timeout(),
        }
    }

    /// Acquire a connection, waiting up to the configured timeout for a
    /// free slot before reporting the pool as exhausted (§4.7, §6.2
    /// `/health/ready`).
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let permit = tokio::time::timeout(self.connect_timeout, self.semaphore.clone().acquire_owned())
            .await
            .map_err(|_| Error::PoolExhausted)?
            .map_err(|_| Error::InternalError("connection pool semaphore closed".to_string()))?;

        let conn = self
            .db
            .connect()
            .map_err(|e| Error::InternalError(format!("failed to open libsql connection: {e}")))?;
        self.in_use.fetch_add(1, Ordering::SeqCst);
        debug!(in_use = self.in_use.load(Ordering::SeqCst), max = self.max, "connection acquired");
        Ok(PooledConnection { conn, _permit: permit, in_use: self.in_use.clone() })
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let busy = self.in_use.load(Ordering::SeqCst);
        let idle = self.max.saturating_sub(busy);
        PoolStatus { size: busy + idle, idle, busy, max: self.max }
    }
}
