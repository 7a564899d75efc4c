use tokio_postgres::{Config, NoTls};
use tracing::debug;

use crate::client::Client;
use crate::config::{ConnectOptions, Transport};
use crate::error::SqlDelegateError;

use super::connection::PgConnection;

/// Client over a `tokio-postgres` connection.
pub type PgClient = Client<PgConnection>;

impl ConnectOptions {
    /// Driver configuration for the given transport.
    ///
    /// # Errors
    /// Returns `SqlDelegateError::ConfigError` when the options are invalid, or when a local
    /// socket is requested on a platform without them.
    pub fn pg_config(&self, transport: &Transport) -> Result<Config, SqlDelegateError> {
        self.validate()?;
        let mut config = Config::new();
        config.user(&self.user);
        if let Some(password) = &self.password {
            config.password(password);
        }
        if let Some(database) = &self.database {
            config.dbname(database);
        }
        if let Some(name) = &self.application_name {
            config.application_name(name);
        }
        if let Some(timeout) = self.connect_timeout_duration() {
            config.connect_timeout(timeout);
        }
        match transport {
            Transport::Tcp { host, port } => {
                config.host(host).port(*port);
            }
            #[cfg(unix)]
            Transport::Unix { dir, port } => {
                config.host_path(dir).port(*port);
            }
            #[cfg(not(unix))]
            Transport::Unix { .. } => {
                return Err(SqlDelegateError::ConfigError(
                    "local sockets are not available on this platform".to_string(),
                ));
            }
        }
        Ok(config)
    }
}

impl Client<PgConnection> {
    /// Connect over a local socket when the host is local and the socket directory exists,
    /// over the network otherwise.
    ///
    /// # Errors
    /// `ConfigError` for invalid options; otherwise the driver's connect error.
    pub async fn connect(options: &ConnectOptions) -> Result<Self, SqlDelegateError> {
        Self::connect_via(options, &Transport::detect(options)).await
    }

    /// # Errors
    /// `ConfigError` for invalid options; otherwise the driver's connect error.
    pub async fn connect_tcp(options: &ConnectOptions) -> Result<Self, SqlDelegateError> {
        let transport = Transport::Tcp {
            host: options.host.clone(),
            port: options.port,
        };
        Self::connect_via(options, &transport).await
    }

    /// # Errors
    /// `ConfigError` for invalid options; otherwise the driver's connect error.
    pub async fn connect_unix(options: &ConnectOptions) -> Result<Self, SqlDelegateError> {
        let transport = Transport::Unix {
            dir: options.socket_dir.clone(),
            port: options.port,
        };
        Self::connect_via(options, &transport).await
    }

    /// # Errors
    /// `ConfigError` for invalid options; otherwise the driver's connect error.
    pub async fn connect_via(
        options: &ConnectOptions,
        transport: &Transport,
    ) -> Result<Self, SqlDelegateError> {
        let config = options.pg_config(transport)?;
        debug!(?transport, user = %options.user, "connecting");
        let (client, connection) = config.connect(NoTls).await?;
        Ok(Client::new(PgConnection::start(client, connection).await?))
    }
}
