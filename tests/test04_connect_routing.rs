use std::path::PathBuf;

use sql_delegate::prelude::*;

#[test]
fn existing_socket_dir_routes_local_hosts_over_the_socket() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let options = ConnectOptions::new("app").socket_dir(dir.path()).port(5433);

    assert_eq!(
        Transport::detect(&options),
        Transport::Unix {
            dir: dir.path().to_path_buf(),
            port: 5433
        }
    );
    assert!(Transport::detect(&options.clone().host("127.0.0.1")).is_unix());
    assert!(Transport::detect(&options.clone().host("")).is_unix());

    let remote = options.host("db.example.com");
    assert_eq!(
        Transport::detect(&remote),
        Transport::Tcp {
            host: "db.example.com".into(),
            port: 5433
        }
    );
    Ok(())
}

#[test]
fn missing_socket_dir_falls_back_to_the_network() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let gone: PathBuf = dir.path().join("not-there");
    let options = ConnectOptions::new("app").socket_dir(&gone);
    assert_eq!(
        Transport::detect(&options),
        Transport::Tcp {
            host: "localhost".into(),
            port: 5432
        }
    );

    let removed = dir.path().to_path_buf();
    dir.close()?;
    assert!(!Transport::detect(&ConnectOptions::new("app").socket_dir(removed)).is_unix());
    Ok(())
}

#[test]
fn a_regular_file_is_not_a_socket_dir() -> Result<(), Box<dyn std::error::Error>> {
    let file = tempfile::NamedTempFile::new()?;
    let options = ConnectOptions::new("app").socket_dir(file.path());
    assert!(!Transport::detect(&options).is_unix());
    Ok(())
}

#[cfg(feature = "postgres")]
#[test]
fn invalid_options_fail_before_connecting() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let err = PgClient::connect(&ConnectOptions::default()).await.unwrap_err();
        assert!(matches!(err, SqlDelegateError::ConfigError(ref m) if m.contains("user")));

        let relative = ConnectOptions::new("app").socket_dir("relative/dir");
        let err = PgClient::connect_unix(&relative).await.unwrap_err();
        assert!(matches!(err, SqlDelegateError::ConfigError(_)));
    });
    Ok(())
}

#[cfg(feature = "postgres")]
#[test]
fn options_load_from_json_config() -> Result<(), Box<dyn std::error::Error>> {
    let options: ConnectOptions = serde_json::from_str(
        r#"{
            "host": "10.0.0.8",
            "port": 6432,
            "user": "svc",
            "password": "pw",
            "database": "orders",
            "connect_timeout_secs": 3
        }"#,
    )?;
    assert_eq!(options.socket_dir, PathBuf::from("/var/run/postgresql"));
    let transport = Transport::select(&options, |_| true);
    let config = options.pg_config(&transport)?;
    assert_eq!(config.get_ports(), &[6432]);
    assert_eq!(config.get_dbname(), Some("orders"));
    assert_eq!(
        config.get_connect_timeout(),
        Some(&std::time::Duration::from_secs(3))
    );
    Ok(())
}
