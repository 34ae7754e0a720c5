//! Transaction-scoped session handed to one unit of work

use std::time::Instant;

use sqlx::{PgConnection, Postgres, Transaction};

use crate::error::PersistenceError;

/// One transaction on one pooled connection.
///
/// A session is owned by exactly one request and is never shared. Dropping
/// it without calling [`Session::commit`] rolls the transaction back and
/// hands the connection back to the pool.
pub struct Session {
    tx: Transaction<'static, Postgres>,
    opened_at: Instant,
}

impl Session {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx,
            opened_at: Instant::now(),
        }
    }

    /// Connection to run statements on, inside the open transaction.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Commit pending changes. Consumes the session so it commits once.
    pub async fn commit(self) -> Result<(), PersistenceError> {
        let elapsed = self.opened_at.elapsed();
        self.tx.commit().await?;
        tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "session committed");
        Ok(())
    }

    /// Discard pending changes.
    pub async fn rollback(self) -> Result<(), PersistenceError> {
        let elapsed = self.opened_at.elapsed();
        self.tx.rollback().await?;
        tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "session rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("opened_at", &self.opened_at)
            .finish_non_exhaustive()
    }
}
