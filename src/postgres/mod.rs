// PostgreSQL backend built on tokio-postgres
//
// - config: driver configuration and the connect entry points
// - connection: the Connection/StatementHandle implementation and its driver task
// - params: RowValues -> wire parameter conversion
// - query: statement execution and row extraction

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::PgClient;
pub use connection::{PgConnection, PgStatement};
