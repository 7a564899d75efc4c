use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::connection::StatementHandle;
use crate::error::SqlDelegateError;
use crate::query::Query;
use crate::resolve::{Replacements, resolve};
use crate::results::ResultSet;
use crate::transaction::TxFlags;
use crate::types::RowValues;

/// A server-side statement bound to the [`Query`] template it was compiled from.
///
/// Each execution only supplies new replacement values; the template's delegates are resolved
/// against them and the resulting arguments sent with the stored handle.
///
/// ```rust,no_run
/// # use sql_delegate::prelude::*;
/// # async fn demo(client: &PgClient) -> Result<(), SqlDelegateError> {
/// let stmt = client
///     .prepare_statement(Select::from("users").filter("id", delegate("id")))
///     .await?;
/// for id in [1, 2, 3] {
///     let rows = stmt.execute(&Replacements::new().bind("id", id)).await?;
///     println!("{} row(s)", rows.len());
/// }
/// stmt.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct PreparedStatement<S: StatementHandle> {
    template: Arc<Query>,
    handle: RwLock<Option<S>>,
    tx: Arc<TxFlags>,
}

impl<S: StatementHandle> PreparedStatement<S> {
    pub(crate) fn new(template: Query, handle: S, tx: Arc<TxFlags>) -> Self {
        Self {
            template: Arc::new(template),
            handle: RwLock::new(Some(handle)),
            tx,
        }
    }

    #[must_use]
    pub fn template(&self) -> &Arc<Query> {
        &self.template
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        self.template.sql()
    }

    /// Resolve the template against `replacements` and run the statement.
    ///
    /// # Errors
    /// `StatementClosed` after [`close`](Self::close), checked before anything else; resolution
    /// errors from [`resolve`] without contacting the server; otherwise the connection's error.
    pub async fn execute(&self, replacements: &Replacements) -> Result<ResultSet, SqlDelegateError> {
        let guard = self.handle.read().await;
        let Some(handle) = guard.as_ref() else {
            return Err(SqlDelegateError::StatementClosed);
        };
        let params = resolve(&self.template, replacements)?;
        if self.tx.take_abandoned() {
            warn!("rolling back abandoned transaction");
            handle.rollback().await?;
        }
        handle.execute(&params).await
    }

    /// Shorthand for [`execute`](Self::execute) with positional values only.
    ///
    /// # Errors
    /// Same as [`execute`](Self::execute).
    pub async fn execute_positional(
        &self,
        params: Vec<RowValues>,
    ) -> Result<ResultSet, SqlDelegateError> {
        self.execute(&Replacements::from_positional(params)).await
    }

    /// Release the server-side statement. Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns the connection's error if the release fails; the wrapper is closed regardless.
    pub async fn close(&self) -> Result<(), SqlDelegateError> {
        let handle = self.handle.write().await.take();
        match handle {
            Some(handle) => {
                debug!(sql = %self.template, "closing prepared statement");
                handle.close().await
            }
            None => Ok(()),
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.handle.read().await.is_none()
    }
}

impl<S: StatementHandle> std::fmt::Debug for PreparedStatement<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

impl<S: StatementHandle> Drop for PreparedStatement<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            warn!(sql = %self.template, "prepared statement dropped without close");
            if let Ok(runtime) = Handle::try_current() {
                runtime.spawn(async move {
                    if let Err(error) = handle.close().await {
                        warn!(%error, "closing dropped prepared statement failed");
                    }
                });
            }
        }
    }
}
