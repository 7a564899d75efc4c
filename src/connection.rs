//! The asynchronous connection a [`Client`](crate::client::Client) drives.
//!
//! Everything here is consumed, not implemented, by the query layer: the Postgres backend in
//! [`crate::postgres`] provides the production implementation and tests substitute their own.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::SqlDelegateError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Asynchronous notification delivered on a channel the connection listens to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub process_id: i32,
    pub channel: String,
    pub payload: String,
}

pub type NotificationStream = BoxStream<'static, Notification>;

/// Server-side compiled statement.
#[async_trait]
pub trait StatementHandle: Send + Sync + 'static {
    /// Run the statement with a concrete argument list, one value per parameter.
    async fn execute(&self, params: &[RowValues]) -> Result<ResultSet, SqlDelegateError>;

    /// Release the server-side statement.
    async fn close(self) -> Result<(), SqlDelegateError>;

    /// Roll back whatever transaction is open on the connection that owns this statement.
    async fn rollback(&self) -> Result<(), SqlDelegateError>;
}

#[async_trait]
pub trait Connection: Send + Sync + 'static {
    type Statement: StatementHandle;

    /// Run one statement with fixed arguments.
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlDelegateError>;

    /// Run one or more `;`-separated statements without arguments.
    async fn execute_batch(&self, sql: &str) -> Result<(), SqlDelegateError>;

    async fn prepare(&self, sql: &str) -> Result<Self::Statement, SqlDelegateError>;

    /// Start listening on `channel`; the stream yields only that channel's notifications.
    async fn listen(&self, channel: &str) -> Result<NotificationStream, SqlDelegateError>;

    async fn unlisten(&self, channel: &str) -> Result<(), SqlDelegateError>;

    /// Close the connection; later operations fail with the connection's own error.
    async fn terminate(&self) -> Result<(), SqlDelegateError>;

    /// Resolves once the connection is closed, for whatever reason.
    async fn disconnected(&self);

    fn is_closed(&self) -> bool;

    fn process_id(&self) -> i32;

    /// Current value of a server run-time parameter, `None` when it is not set.
    async fn parameter(&self, name: &str) -> Result<Option<String>, SqlDelegateError>;
}
