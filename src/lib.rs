//! Deferred-parameter queries over an asynchronous Postgres connection.
//!
//! Queries are SQL text plus ordered argument slots. A slot holds either a concrete value or a
//! [`Delegate`](delegate::Delegate): a named placeholder resolved only when the query runs. This
//! lets a statement be prepared once and executed many times with different values:
//!
//! ```rust,no_run
//! use sql_delegate::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlDelegateError> {
//! let client = PgClient::connect(&ConnectOptions::from_env()?).await?;
//!
//! let by_team = client
//!     .prepare_statement(
//!         Select::from("players")
//!             .filter("team", delegate("team"))
//!             .limit(delegate("limit").with_default(10)),
//!     )
//!     .await?;
//! let reds = by_team.execute(&Replacements::new().bind("team", "red")).await?;
//! let blues = by_team
//!     .execute(&Replacements::new().bind("team", "blue").bind("limit", 3))
//!     .await?;
//! # let _ = (reds, blues);
//! by_team.close().await?;
//!
//! client
//!     .transaction(|tx| {
//!         Box::pin(async move {
//!             tx.run(Insert::into("players").row([("name", "ann"), ("team", "red")]))
//!                 .await?;
//!             Ok(())
//!         })
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod delegate;
pub mod dispatch;
pub mod error;
pub mod markers;
pub mod prelude;
pub mod prepared;
pub mod query;
pub mod query_builder;
pub mod resolve;
pub mod results;
pub mod transaction;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use client::Client;
pub use delegate::{Delegate, Operand, delegate, delegate_pair, delegate_pairs, value};
pub use error::SqlDelegateError;
pub use query::{Arg, Query};
pub use resolve::{Replacements, resolve};
pub use types::RowValues;

#[cfg(feature = "postgres")]
pub use postgres::PgClient;
