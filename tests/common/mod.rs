#![allow(dead_code)]

use std::future;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use sql_delegate::prelude::*;
use tokio::sync::{broadcast, watch};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// Shared view of what a [`FakeConnection`] was asked to do.
pub struct FakeState {
    log: Mutex<Vec<String>>,
    fail_on: Mutex<Vec<String>>,
    notifications: broadcast::Sender<Notification>,
    closed: watch::Sender<bool>,
}

impl FakeState {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Fail every operation whose log line contains `needle`.
    pub fn fail_when(&self, needle: &str) {
        self.fail_on.lock().unwrap().push(needle.to_string());
    }

    pub fn notify(&self, channel: &str, payload: &str) {
        let _ = self.notifications.send(Notification {
            process_id: 7,
            channel: channel.to_string(),
            payload: payload.to_string(),
        });
    }

    pub async fn wait_for_entry(&self, prefix: &str) -> bool {
        for _ in 0..50 {
            if self.log().iter().any(|entry| entry.starts_with(prefix)) {
                return true;
            }
            tokio::task::yield_now().await;
        }
        false
    }

    fn record(&self, entry: String) -> Result<(), SqlDelegateError> {
        let failing = self
            .fail_on
            .lock()
            .unwrap()
            .iter()
            .any(|needle| entry.contains(needle.as_str()));
        self.log.lock().unwrap().push(entry.clone());
        if failing {
            Err(SqlDelegateError::ExecutionError(format!("injected failure: {entry}")))
        } else {
            Ok(())
        }
    }
}

pub fn render(params: &[RowValues]) -> String {
    params
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One row per parameter so tests can read back what was bound.
fn echo(params: &[RowValues]) -> ResultSet {
    let mut rs = ResultSet::with_columns(vec!["value".to_string()]);
    for param in params {
        rs.add_row_values(vec![param.clone()]);
    }
    rs
}

pub struct FakeConnection {
    state: Arc<FakeState>,
}

impl FakeConnection {
    pub fn new() -> (Self, Arc<FakeState>) {
        let (notifications, _) = broadcast::channel(16);
        let (closed, _) = watch::channel(false);
        let state = Arc::new(FakeState {
            log: Mutex::new(Vec::new()),
            fail_on: Mutex::new(Vec::new()),
            notifications,
            closed,
        });
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

pub fn fake_client() -> (Client<FakeConnection>, Arc<FakeState>) {
    let (conn, state) = FakeConnection::new();
    (Client::new(conn), state)
}

pub struct FakeStatement {
    sql: String,
    state: Arc<FakeState>,
}

#[async_trait]
impl StatementHandle for FakeStatement {
    async fn execute(&self, params: &[RowValues]) -> Result<ResultSet, SqlDelegateError> {
        self.state
            .record(format!("execute: {} [{}]", self.sql, render(params)))?;
        Ok(echo(params))
    }

    async fn close(self) -> Result<(), SqlDelegateError> {
        self.state.record(format!("close: {}", self.sql))
    }

    async fn rollback(&self) -> Result<(), SqlDelegateError> {
        self.state.record("batch: ROLLBACK".to_string())
    }
}

#[async_trait]
impl Connection for FakeConnection {
    type Statement = FakeStatement;

    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlDelegateError> {
        self.state
            .record(format!("query: {sql} [{}]", render(params)))?;
        Ok(echo(params))
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), SqlDelegateError> {
        self.state.record(format!("batch: {sql}"))
    }

    async fn prepare(&self, sql: &str) -> Result<FakeStatement, SqlDelegateError> {
        self.state.record(format!("prepare: {sql}"))?;
        Ok(FakeStatement {
            sql: sql.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    async fn listen(&self, channel: &str) -> Result<NotificationStream, SqlDelegateError> {
        let receiver = self.state.notifications.subscribe();
        self.state.record(format!("listen: {channel}"))?;
        let channel = channel.to_string();
        Ok(stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.ok().map(|n| (n, receiver))
        })
        .filter(move |n| future::ready(n.channel == channel))
        .boxed())
    }

    async fn unlisten(&self, channel: &str) -> Result<(), SqlDelegateError> {
        self.state.record(format!("unlisten: {channel}"))
    }

    async fn terminate(&self) -> Result<(), SqlDelegateError> {
        self.state.record("terminate".to_string())?;
        self.state.closed.send_replace(true);
        Ok(())
    }

    async fn disconnected(&self) {
        let mut closed = self.state.closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
    }

    fn is_closed(&self) -> bool {
        *self.state.closed.borrow()
    }

    fn process_id(&self) -> i32 {
        42
    }

    async fn parameter(&self, name: &str) -> Result<Option<String>, SqlDelegateError> {
        self.state.record(format!("parameter: {name}"))?;
        Ok((name == "server_encoding").then(|| "UTF8".to_string()))
    }
}

/// Formatted log output collected while a [`capture_warnings`] guard is alive.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route `warn!` and above on this thread into a buffer until the guard drops.
pub fn capture_warnings() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}
