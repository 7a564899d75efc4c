use std::future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tokio::sync::{broadcast, watch};
use tokio_postgres::tls::NoTlsStream;
use tokio_postgres::{AsyncMessage, Socket, Statement};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::connection::{Connection, Notification, NotificationStream, StatementHandle};
use crate::error::SqlDelegateError;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::query::run_statement;

const NOTIFICATION_BUFFER: usize = 256;

/// A `tokio_postgres` client plus the task driving its socket.
///
/// The task forwards `NOTIFY` messages to every live [`NotificationStream`] and flips the closed
/// signal when the socket ends.
pub struct PgConnection {
    client: Arc<tokio_postgres::Client>,
    notifications: broadcast::Sender<Notification>,
    closed: watch::Receiver<bool>,
    shutdown: CancellationToken,
    process_id: i32,
}

impl PgConnection {
    pub(crate) async fn start(
        client: tokio_postgres::Client,
        mut connection: tokio_postgres::Connection<Socket, NoTlsStream>,
    ) -> Result<Self, SqlDelegateError> {
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
        let (closed_tx, closed) = watch::channel(false);
        let shutdown = CancellationToken::new();

        let forward = notifications.clone();
        let stop = shutdown.clone();
        tokio::spawn(async move {
            let mut messages = stream::poll_fn(move |cx| connection.poll_message(cx));
            loop {
                tokio::select! {
                    () = stop.cancelled() => {
                        debug!("connection terminated by client");
                        break;
                    }
                    message = messages.next() => match message {
                        Some(Ok(AsyncMessage::Notification(n))) => {
                            // no subscribers is fine
                            let _ = forward.send(Notification {
                                process_id: n.process_id(),
                                channel: n.channel().to_string(),
                                payload: n.payload().to_string(),
                            });
                        }
                        Some(Ok(AsyncMessage::Notice(notice))) => {
                            debug!(%notice, "server notice");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!(error = %e, "postgres connection error");
                            break;
                        }
                        None => break,
                    },
                }
            }
            let _ = closed_tx.send(true);
        });

        let row = client.query_one("SELECT pg_backend_pid()", &[]).await?;
        let process_id: i32 = row.try_get(0)?;
        debug!(process_id, "connected");

        Ok(Self {
            client: Arc::new(client),
            notifications,
            closed,
            shutdown,
            process_id,
        })
    }

    /// The underlying driver client, for calls this crate does not wrap.
    #[must_use]
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Server-side statement; released when the handle is closed or dropped.
pub struct PgStatement {
    client: Arc<tokio_postgres::Client>,
    statement: Statement,
}

impl PgStatement {
    #[must_use]
    pub fn statement(&self) -> &Statement {
        &self.statement
    }
}

#[async_trait]
impl StatementHandle for PgStatement {
    async fn execute(&self, params: &[RowValues]) -> Result<ResultSet, SqlDelegateError> {
        run_statement(&self.client, &self.statement, params).await
    }

    async fn close(self) -> Result<(), SqlDelegateError> {
        // the driver sends Close for the statement once its last clone drops
        drop(self.statement);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), SqlDelegateError> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }
}

#[async_trait]
impl Connection for PgConnection {
    type Statement = PgStatement;

    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlDelegateError> {
        let statement = self.client.prepare(sql).await?;
        run_statement(&self.client, &statement, params).await
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), SqlDelegateError> {
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn prepare(&self, sql: &str) -> Result<PgStatement, SqlDelegateError> {
        let statement = self.client.prepare(sql).await?;
        Ok(PgStatement {
            client: Arc::clone(&self.client),
            statement,
        })
    }

    async fn listen(&self, channel: &str) -> Result<NotificationStream, SqlDelegateError> {
        // subscribe first so nothing sent right after LISTEN is missed
        let receiver = self.notifications.subscribe();
        self.client
            .batch_execute(&format!("LISTEN {}", quote_channel(channel)))
            .await?;
        Ok(channel_stream(receiver, channel.to_string()))
    }

    async fn unlisten(&self, channel: &str) -> Result<(), SqlDelegateError> {
        self.client
            .batch_execute(&format!("UNLISTEN {}", quote_channel(channel)))
            .await?;
        Ok(())
    }

    async fn terminate(&self) -> Result<(), SqlDelegateError> {
        self.shutdown.cancel();
        self.disconnected().await;
        Ok(())
    }

    async fn disconnected(&self) {
        let mut closed = self.closed.clone();
        // a dropped sender means the task is gone as well
        let _ = closed.wait_for(|closed| *closed).await;
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed() || *self.closed.borrow()
    }

    fn process_id(&self) -> i32 {
        self.process_id
    }

    async fn parameter(&self, name: &str) -> Result<Option<String>, SqlDelegateError> {
        let row = self
            .client
            .query_one("SELECT current_setting($1, true)", &[&name])
            .await?;
        Ok(row.try_get(0)?)
    }
}

/// Channel names are case-sensitive on the wire, so they are always sent quoted.
fn quote_channel(channel: &str) -> String {
    format!("\"{}\"", channel.replace('"', "\"\""))
}

/// Notifications for `channel`; when the receiver falls behind, the skipped messages are
/// logged and delivery resumes with the oldest one still buffered.
fn channel_stream(
    receiver: broadcast::Receiver<Notification>,
    channel: String,
) -> NotificationStream {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(notification) => return Some((notification, receiver)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "notification stream fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .filter(move |notification| future::ready(notification.channel == channel))
    .boxed()
}
