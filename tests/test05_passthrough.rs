mod common;

use std::time::Duration;

use common::fake_client;
use futures_util::StreamExt;
use sql_delegate::prelude::*;

#[tokio::test]
async fn listen_yields_only_its_channel() -> Result<(), SqlDelegateError> {
    let (client, state) = fake_client();
    let mut jobs = client.listen("jobs").await?;

    state.notify("other", "ignored");
    state.notify("jobs", "42");

    let received = tokio::time::timeout(Duration::from_secs(1), jobs.next())
        .await
        .map_err(|_| SqlDelegateError::ConnectionError("no notification".into()))?;
    assert_eq!(
        received,
        Some(Notification {
            process_id: 7,
            channel: "jobs".into(),
            payload: "42".into(),
        })
    );

    client.unlisten("jobs").await?;
    assert_eq!(state.log(), vec!["listen: jobs", "unlisten: jobs"]);
    Ok(())
}

#[tokio::test]
async fn connection_details_are_forwarded() -> Result<(), SqlDelegateError> {
    let (client, state) = fake_client();
    assert_eq!(client.process_id(), 42);
    assert_eq!(
        client.parameter("server_encoding").await?,
        Some("UTF8".to_string())
    );
    assert_eq!(client.parameter("nope").await?, None);
    assert!(!client.is_closed());

    client.terminate().await?;
    tokio::time::timeout(Duration::from_secs(1), client.disconnected())
        .await
        .map_err(|_| SqlDelegateError::ConnectionError("still connected".into()))?;
    assert!(client.is_closed());
    assert_eq!(
        state.log(),
        vec![
            "parameter: server_encoding",
            "parameter: nope",
            "terminate"
        ]
    );
    Ok(())
}

#[tokio::test]
async fn custom_compiler_is_used_for_structured_requests() -> Result<(), SqlDelegateError> {
    struct Shouting;

    impl Compile for Shouting {
        fn compile(&self, statement: &Statement) -> Result<Query, SqlDelegateError> {
            let query = PostgresCompiler.compile(statement)?;
            let (sql, args) = query.into_parts();
            Ok(Query::with_args(format!("{sql} /* shouting */"), args))
        }
    }

    let (conn, state) = common::FakeConnection::new();
    let client = Client::with_compiler(conn, Shouting);
    client.run(Delete::from("t").filter("id", 1)).await?;
    assert_eq!(
        state.log(),
        vec!["query: DELETE FROM t WHERE id = $1 /* shouting */ [1]"]
    );
    Ok(())
}
