//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::client::Client;
pub use crate::config::{ConnectOptions, Transport};
pub use crate::connection::{Connection, Notification, NotificationStream, StatementHandle};
pub use crate::delegate::{Delegate, Operand, delegate, delegate_pair, delegate_pairs, value};
pub use crate::dispatch::{Dispatched, PrepareMode, Request};
pub use crate::error::SqlDelegateError;
pub use crate::prepared::PreparedStatement;
pub use crate::query::{Arg, Query};
pub use crate::query_builder::{
    Compile, Delete, Insert, Order, PostgresCompiler, Select, Statement, Update, Values,
};
pub use crate::resolve::{Replacements, resolve};
pub use crate::results::{ResultSet, Row};
pub use crate::types::{RowValues, TypeHint};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PgClient, PgConnection, PgStatement};
