//! Connection options and transport selection.
//!
//! Whether a client talks to the server over a local socket or over the network is decided
//! from the options alone plus a check that the socket directory exists; no name resolution is
//! involved.

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SqlDelegateError;

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_socket_dir() -> PathBuf {
    PathBuf::from("/var/run/postgresql")
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,
    #[serde(default)]
    pub application_name: Option<String>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: String::new(),
            password: None,
            database: None,
            socket_dir: default_socket_dir(),
            application_name: None,
            connect_timeout_secs: None,
        }
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("socket_dir", &self.socket_dir)
            .field("application_name", &self.application_name)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl ConnectOptions {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    #[must_use]
    pub fn socket_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = dir.into();
        self
    }

    #[must_use]
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Connection timeout, kept in whole seconds; a fractional second rounds up.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self.connect_timeout_secs = Some(secs);
        self
    }

    /// The timeout to hand the driver; `0` means wait indefinitely, as with libpq.
    #[must_use]
    pub fn connect_timeout_duration(&self) -> Option<Duration> {
        self.connect_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Options from the libpq environment: `PGHOST`, `PGPORT`, `PGUSER`, `PGPASSWORD`,
    /// `PGDATABASE` and `PGSOCKETDIR`. Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns `SqlDelegateError::ConfigError` for an unparsable `PGPORT`.
    pub fn from_env() -> Result<Self, SqlDelegateError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    ///
    /// # Errors
    /// Returns `SqlDelegateError::ConfigError` for an unparsable `PGPORT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SqlDelegateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(host) = lookup("PGHOST") {
            // libpq treats a host starting with `/` as a socket directory
            if host.starts_with('/') {
                options.socket_dir = PathBuf::from(host);
                options.host = default_host();
            } else {
                options.host = host;
            }
        }
        if let Some(port) = lookup("PGPORT") {
            options.port = port.trim().parse().map_err(|e| {
                SqlDelegateError::ConfigError(format!("PGPORT `{port}` is not a port: {e}"))
            })?;
        }
        if let Some(user) = lookup("PGUSER") {
            options.user = user;
        }
        options.password = lookup("PGPASSWORD").or(options.password);
        options.database = lookup("PGDATABASE").or(options.database);
        if let Some(dir) = lookup("PGSOCKETDIR") {
            options.socket_dir = PathBuf::from(dir);
        }
        Ok(options)
    }

    /// # Errors
    /// Returns `SqlDelegateError::ConfigError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), SqlDelegateError> {
        if self.user.is_empty() {
            return Err(SqlDelegateError::ConfigError("user is required".to_string()));
        }
        if self.port == 0 {
            return Err(SqlDelegateError::ConfigError("port must be non-zero".to_string()));
        }
        if self.host.trim().is_empty() {
            return Err(SqlDelegateError::ConfigError("host is required".to_string()));
        }
        if !self.socket_dir.is_absolute() {
            return Err(SqlDelegateError::ConfigError(format!(
                "socket directory `{}` must be absolute",
                self.socket_dir.display()
            )));
        }
        Ok(())
    }

    /// True for `localhost`, an empty host, or a loopback address literal.
    #[must_use]
    pub fn is_local_host(&self) -> bool {
        let host = self.host.trim();
        host.is_empty()
            || host.eq_ignore_ascii_case("localhost")
            || host
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .is_ok_and(|ip| ip.is_loopback())
    }
}

/// How a client reaches the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Tcp { host: String, port: u16 },
    /// Socket file `.s.PGSQL.<port>` inside `dir`.
    Unix { dir: PathBuf, port: u16 },
}

impl Transport {
    /// Local hosts use the socket directory when `dir_exists` reports it present; everything
    /// else goes over the network.
    pub fn select<F>(options: &ConnectOptions, dir_exists: F) -> Self
    where
        F: Fn(&Path) -> bool,
    {
        let transport = if options.is_local_host() && dir_exists(&options.socket_dir) {
            Transport::Unix {
                dir: options.socket_dir.clone(),
                port: options.port,
            }
        } else {
            let host = match options.host.trim() {
                "" => default_host(),
                host => host.to_string(),
            };
            Transport::Tcp {
                host,
                port: options.port,
            }
        };
        debug!(?transport, "selected transport");
        transport
    }

    /// [`select`](Self::select) against the local filesystem.
    #[must_use]
    pub fn detect(options: &ConnectOptions) -> Self {
        Self::select(options, Path::is_dir)
    }

    #[must_use]
    pub fn is_unix(&self) -> bool {
        matches!(self, Transport::Unix { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_host_forms() {
        for host in ["localhost", "LOCALHOST", "", "127.0.0.1", "::1", "[::1]"] {
            assert!(ConnectOptions::new("u").host(host).is_local_host(), "{host}");
        }
        for host in ["db.internal", "10.0.0.5", "localhost.example.com"] {
            assert!(!ConnectOptions::new("u").host(host).is_local_host(), "{host}");
        }
    }

    #[test]
    fn sub_second_timeouts_round_up() {
        let options = ConnectOptions::new("u").connect_timeout(Duration::from_millis(500));
        assert_eq!(options.connect_timeout_secs, Some(1));
        assert_eq!(
            options.connect_timeout_duration(),
            Some(Duration::from_secs(1))
        );
        let options = options.connect_timeout(Duration::from_secs(3));
        assert_eq!(options.connect_timeout_secs, Some(3));

        let zero = ConnectOptions {
            connect_timeout_secs: Some(0),
            ..ConnectOptions::new("u")
        };
        assert_eq!(zero.connect_timeout_duration(), None);
    }

    #[test]
    fn routing_depends_on_socket_dir_presence() {
        let options = ConnectOptions::new("u").socket_dir("/tmp/pg");
        assert_eq!(
            Transport::select(&options, |_| true),
            Transport::Unix {
                dir: PathBuf::from("/tmp/pg"),
                port: 5432
            }
        );
        assert_eq!(
            Transport::select(&options, |_| false),
            Transport::Tcp {
                host: "localhost".into(),
                port: 5432
            }
        );
        let remote = options.host("db.internal").port(6543);
        assert_eq!(
            Transport::select(&remote, |_| true),
            Transport::Tcp {
                host: "db.internal".into(),
                port: 6543
            }
        );
    }

    #[test]
    fn env_lookup_and_validation() {
        let options = ConnectOptions::from_lookup(|key| match key {
            "PGHOST" => Some("/run/pg".into()),
            "PGPORT" => Some("6000".into()),
            "PGUSER" => Some("app".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(options.socket_dir, PathBuf::from("/run/pg"));
        assert_eq!(options.host, "localhost");
        assert_eq!(options.port, 6000);
        assert!(options.validate().is_ok());

        let bad = ConnectOptions::from_lookup(|key| (key == "PGPORT").then(|| "x".into()));
        assert!(matches!(bad, Err(SqlDelegateError::ConfigError(_))));
        assert!(ConnectOptions::default().validate().is_err());
        assert!(ConnectOptions::new("u").socket_dir("rel").validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let options: ConnectOptions = serde_json::from_str(r#"{"user": "app"}"#).unwrap();
        assert_eq!(options, ConnectOptions::new("app"));
        assert!(!format!("{:?}", options.password("secret")).contains("secret"));
    }
}
