use leader_election::Role;
use leader_node::{build_store, run_until, status, Cli, Node, NodeConfig, StoreKind};
use clap::Parser;
use leader_record::{InMemoryRecordStore, RecordStore};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn config_with_channels(channels: &[&str]) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.node.channels = channels.iter().map(ToString::to_string).collect();
    config
}

#[tokio::test(start_paused = true)]
async fn single_node_becomes_master_and_releases_on_shutdown() {
    let config = config_with_channels(&["requests"]);
    let store = Arc::new(InMemoryRecordStore::new());
    let mut node = Node::new(&config, store.clone());
    let consumer = node.gate().register_consumer("requests");

    assert!(consumer.is_paused());
    assert_eq!(node.start().await.unwrap(), Role::Master);
    assert!(!consumer.is_paused());
    assert_eq!(node.gate().consumer_channels(), vec!["requests"]);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let held = status(&config, store.as_ref()).await.unwrap().unwrap();
    assert!(held.is_held_by(&node.coordinator().token()));

    node.shutdown().await.unwrap();
    assert!(consumer.is_paused());
    let released = store
        .get(&config.management.management_id)
        .await
        .unwrap()
        .unwrap();
    assert!(released.is_released());
}

#[tokio::test(start_paused = true)]
async fn second_node_stays_candidate() {
    let config = NodeConfig::default();
    let store = Arc::new(InMemoryRecordStore::new());
    let mut first = Node::new(&config, store.clone());
    let mut second = Node::new(&config, store.clone());

    assert_eq!(first.start().await.unwrap(), Role::Master);
    assert_eq!(second.start().await.unwrap(), Role::Candidate);
    assert!(!second.gate().is_enabled());

    first.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert!(second.coordinator().is_master());
    assert!(second.gate().is_enabled());

    second.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn run_until_stops_when_shutdown_resolves() {
    let config = NodeConfig::default();
    let store = Arc::new(InMemoryRecordStore::new());
    let node = Node::new(&config, store.clone());

    run_until(node, tokio::time::sleep(Duration::from_secs(2)))
        .await
        .unwrap();

    let record = status(&config, store.as_ref()).await.unwrap().unwrap();
    assert!(record.is_released());
}

#[tokio::test]
async fn status_of_untouched_store_is_empty() {
    let config = NodeConfig::default();
    let store = build_store(&config).await.unwrap();
    assert!(status(&config, store.as_ref()).await.unwrap().is_none());
}

#[cfg(not(feature = "postgres"))]
#[tokio::test]
async fn postgres_without_feature_is_an_error() {
    let mut config = NodeConfig::default();
    config.node.store = StoreKind::Postgres;
    config.node.database_url = Some("postgres://localhost/jobs".to_string());
    assert!(build_store(&config).await.is_err());
}

#[test]
fn flags_override_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[management]
management_id = "from-file"
heartbeat_expiration_secs = 20

[node]
channels = ["from-file"]
"#
    )
    .unwrap();
    let path = file.path().to_str().unwrap();

    let cli = Cli::try_parse_from([
        "leader-node",
        "--config",
        path,
        "--management-id",
        "from-flag",
        "run",
        "--channel",
        "requests",
    ])
    .unwrap();
    let config = cli.resolve().unwrap();

    assert_eq!(config.management.management_id, "from-flag");
    assert_eq!(config.management.heartbeat_expiration_secs, 20);
    assert_eq!(config.node.channels, vec!["requests"]);
    assert_eq!(config.node.store, StoreKind::Memory);
}
