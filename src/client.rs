use std::sync::Arc;

use tracing::warn;

use crate::connection::{Connection, NotificationStream};
use crate::dispatch::{Dispatched, PrepareMode, Request, dispatch, prepare};
use crate::error::SqlDelegateError;
use crate::prepared::PreparedStatement;
use crate::query::Query;
use crate::query_builder::{Compile, Delete, Insert, PostgresCompiler, Select, Statement, Update, Values};
use crate::results::ResultSet;
use crate::transaction::TxFlags;
use crate::types::RowValues;

/// Query client owning one connection for its whole lifetime.
///
/// Raw SQL, assembled [`Query`] values and structured descriptions all funnel into the same
/// dispatcher; the `prepare*` methods and a [`PrepareMode::Prepared`] mode return reusable
/// [`PreparedStatement`]s instead of rows.
pub struct Client<C: Connection> {
    pub(crate) conn: C,
    compiler: Box<dyn Compile>,
    pub(crate) tx: Arc<TxFlags>,
}

impl<C: Connection> Client<C> {
    /// Wrap an open connection, compiling structured descriptions with [`PostgresCompiler`].
    pub fn new(conn: C) -> Self {
        Self::with_compiler(conn, PostgresCompiler)
    }

    pub fn with_compiler(conn: C, compiler: impl Compile + 'static) -> Self {
        Self {
            conn,
            compiler: Box::new(compiler),
            tx: Arc::default(),
        }
    }

    #[must_use]
    pub fn compiler(&self) -> &dyn Compile {
        self.compiler.as_ref()
    }

    /// The connection, after rolling back a transaction whose unit of work was dropped mid-flight.
    pub(crate) async fn connection(&self) -> Result<&C, SqlDelegateError> {
        if self.tx.take_abandoned() {
            warn!("rolling back abandoned transaction");
            self.conn.execute_batch("ROLLBACK").await?;
        }
        Ok(&self.conn)
    }

    /// Run `sql` once with fixed arguments.
    ///
    /// # Errors
    /// Returns the connection's error.
    pub async fn query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlDelegateError> {
        self.connection().await?.query(sql, params).await
    }

    /// Run a statement and report the number of affected rows.
    ///
    /// # Errors
    /// Returns the connection's error.
    pub async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<usize, SqlDelegateError> {
        Ok(self.query(sql, params).await?.rows_affected)
    }

    /// Run several `;`-separated statements without arguments.
    ///
    /// # Errors
    /// Returns the connection's error.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), SqlDelegateError> {
        self.connection().await?.execute_batch(sql).await
    }

    /// Compile a structured description and run it once.
    ///
    /// # Errors
    /// `ConfigError` if the compiled query still carries delegates (use a prepared statement
    /// for those) or cannot be compiled; otherwise the connection's error.
    pub async fn run(&self, statement: impl Into<Statement>) -> Result<ResultSet, SqlDelegateError> {
        self.dispatch(Request::Structured(statement.into()), PrepareMode::Direct)
            .await?
            .into_rows()
    }

    /// Run an assembled query once; every slot must hold a concrete value.
    ///
    /// # Errors
    /// `ConfigError` if the query carries delegates; otherwise the connection's error.
    pub async fn run_query(&self, query: Query) -> Result<ResultSet, SqlDelegateError> {
        self.dispatch(Request::Query(query), PrepareMode::Direct)
            .await?
            .into_rows()
    }

    /// Prepare raw SQL; each `$n` marker becomes a positional placeholder of the template.
    ///
    /// # Errors
    /// `ConfigError` for a marker past the parameter limit; otherwise the connection's error.
    pub async fn prepare(&self, sql: &str) -> Result<PreparedStatement<C::Statement>, SqlDelegateError> {
        self.prepare_query(Query::from_template(sql)?).await
    }

    /// Prepare an assembled query as a reusable template.
    ///
    /// # Errors
    /// `ConfigError` if the SQL and argument slots disagree; otherwise the connection's error.
    pub async fn prepare_query(
        &self,
        query: Query,
    ) -> Result<PreparedStatement<C::Statement>, SqlDelegateError> {
        query.validate()?;
        prepare(self.connection().await?, &self.tx, query).await
    }

    /// Compile a structured description and prepare it as a reusable template.
    ///
    /// # Errors
    /// `ConfigError` if compilation fails; otherwise the connection's error.
    pub async fn prepare_statement(
        &self,
        statement: impl Into<Statement>,
    ) -> Result<PreparedStatement<C::Statement>, SqlDelegateError> {
        let query = self.compiler.compile(&statement.into())?;
        self.prepare_query(query).await
    }

    /// # Errors
    /// See [`dispatch`](Self::dispatch).
    pub async fn select(
        &self,
        select: Select,
        mode: impl Into<PrepareMode>,
    ) -> Result<Dispatched<C::Statement>, SqlDelegateError> {
        self.dispatch(Request::Structured(select.into()), mode).await
    }

    /// # Errors
    /// See [`dispatch`](Self::dispatch).
    pub async fn insert(
        &self,
        insert: Insert,
        mode: impl Into<PrepareMode>,
    ) -> Result<Dispatched<C::Statement>, SqlDelegateError> {
        self.dispatch(Request::Structured(insert.into()), mode).await
    }

    /// # Errors
    /// See [`dispatch`](Self::dispatch).
    pub async fn update(
        &self,
        update: Update,
        mode: impl Into<PrepareMode>,
    ) -> Result<Dispatched<C::Statement>, SqlDelegateError> {
        self.dispatch(Request::Structured(update.into()), mode).await
    }

    /// # Errors
    /// See [`dispatch`](Self::dispatch).
    pub async fn delete(
        &self,
        delete: Delete,
        mode: impl Into<PrepareMode>,
    ) -> Result<Dispatched<C::Statement>, SqlDelegateError> {
        self.dispatch(Request::Structured(delete.into()), mode).await
    }

    /// # Errors
    /// See [`dispatch`](Self::dispatch).
    pub async fn values(
        &self,
        values: Values,
        mode: impl Into<PrepareMode>,
    ) -> Result<Dispatched<C::Statement>, SqlDelegateError> {
        self.dispatch(Request::Structured(values.into()), mode).await
    }

    /// Route a request to direct or prepared execution.
    ///
    /// Direct execution returns [`Dispatched::Rows`]; prepared execution returns
    /// [`Dispatched::Prepared`] without running the statement.
    ///
    /// # Errors
    /// - `ConfigError` when a query's SQL and slots disagree, when compilation fails, or when a
    ///   query carrying delegates is executed directly.
    /// - The connection's error otherwise.
    pub async fn dispatch(
        &self,
        request: impl Into<Request>,
        mode: impl Into<PrepareMode>,
    ) -> Result<Dispatched<C::Statement>, SqlDelegateError> {
        let conn = self.connection().await?;
        dispatch(conn, &self.tx, self.compiler.as_ref(), request.into(), mode.into()).await
    }

    /// # Errors
    /// Returns the connection's error.
    pub async fn listen(&self, channel: &str) -> Result<NotificationStream, SqlDelegateError> {
        self.connection().await?.listen(channel).await
    }

    /// # Errors
    /// Returns the connection's error.
    pub async fn unlisten(&self, channel: &str) -> Result<(), SqlDelegateError> {
        self.connection().await?.unlisten(channel).await
    }

    /// # Errors
    /// Returns the connection's error.
    pub async fn terminate(&self) -> Result<(), SqlDelegateError> {
        self.conn.terminate().await
    }

    pub async fn disconnected(&self) {
        self.conn.disconnected().await;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.conn.is_closed()
    }

    #[must_use]
    pub fn process_id(&self) -> i32 {
        self.conn.process_id()
    }

    /// # Errors
    /// Returns the connection's error.
    pub async fn parameter(&self, name: &str) -> Result<Option<String>, SqlDelegateError> {
        self.connection().await?.parameter(name).await
    }
}

impl<C: Connection> std::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("process_id", &self.conn.process_id())
            .field("in_transaction", &self.in_transaction())
            .finish_non_exhaustive()
    }
}
