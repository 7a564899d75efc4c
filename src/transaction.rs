use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::client::Client;
use crate::connection::Connection;
use crate::error::SqlDelegateError;

#[derive(Debug, Default)]
pub(crate) struct TxFlags {
    active: AtomicBool,
    abandoned: AtomicBool,
}

impl TxFlags {
    pub(crate) fn take_abandoned(&self) -> bool {
        self.abandoned.swap(false, Ordering::AcqRel)
    }
}

/// Clears the active flag however the transaction ends; a transaction left open on the
/// connection is flagged for rollback before the client's next statement.
struct TxGuard<'a> {
    flags: &'a TxFlags,
    open: bool,
}

impl Drop for TxGuard<'_> {
    fn drop(&mut self) {
        if self.open {
            warn!("transaction dropped before completion");
            self.flags.abandoned.store(true, Ordering::Release);
        }
        self.flags.active.store(false, Ordering::Release);
    }
}

impl<C: Connection> Client<C> {
    /// Run `work` inside `BEGIN`/`COMMIT`, rolling back if it fails.
    ///
    /// The unit of work receives this client and issues its statements through it:
    /// ```rust,no_run
    /// # use sql_delegate::prelude::*;
    /// # async fn demo(client: &PgClient) -> Result<(), SqlDelegateError> {
    /// let moved = client
    ///     .transaction(|tx| {
    ///         Box::pin(async move {
    ///             tx.execute("UPDATE accounts SET balance = balance - 10 WHERE id = $1", &[1.into()])
    ///                 .await?;
    ///             tx.execute("UPDATE accounts SET balance = balance + 10 WHERE id = $1", &[2.into()])
    ///                 .await
    ///         })
    ///     })
    ///     .await?;
    /// # let _ = moved;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// - `NestedTransaction` when a transaction is already open on this client; nothing is sent.
    /// - The error of `work` after a successful rollback.
    /// - `RollbackFailed` carrying both errors when the rollback fails too.
    /// - The connection's error if `BEGIN` or `COMMIT` fails.
    pub async fn transaction<T, F>(&self, work: F) -> Result<T, SqlDelegateError>
    where
        F: for<'c> FnOnce(&'c Client<C>) -> BoxFuture<'c, Result<T, SqlDelegateError>>,
    {
        if self
            .tx
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SqlDelegateError::NestedTransaction);
        }
        let mut guard = TxGuard {
            flags: self.tx.as_ref(),
            open: false,
        };

        let conn = self.connection().await?;
        conn.execute_batch("BEGIN").await?;
        guard.open = true;
        debug!("transaction started");

        match work(self).await {
            Ok(value) => {
                let committed = conn.execute_batch("COMMIT").await;
                guard.open = false;
                committed?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(error) => {
                warn!(%error, "rolling back transaction");
                let rolled_back = conn.execute_batch("ROLLBACK").await;
                guard.open = false;
                match rolled_back {
                    Ok(()) => Err(error),
                    Err(rollback) => Err(SqlDelegateError::RollbackFailed {
                        error: Box::new(error),
                        rollback: Box::new(rollback),
                    }),
                }
            }
        }
    }

    /// True while a [`transaction`](Self::transaction) unit of work is running.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.tx.active.load(Ordering::Acquire)
    }
}
