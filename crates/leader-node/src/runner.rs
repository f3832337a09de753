//! Node wiring: store, messaging gate, coordinator and channel watchers

use crate::config::{NodeConfig, StoreKind};
use anyhow::Context;
use leader_election::{Coordinator, MessagingGate, Role};
use leader_record::{InMemoryRecordStore, ManagementRecord, RecordStore};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Build the configured record store.
///
/// The postgres store gets its table created and its row seeded so the
/// first claims have a row to lock.
///
/// # Errors
/// Connection or schema failures, or a postgres store requested from a build
/// without the `postgres` feature.
pub async fn build_store(config: &NodeConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config.node.store {
        StoreKind::Memory => Ok(Arc::new(InMemoryRecordStore::new())),
        StoreKind::Postgres => postgres_store(config).await,
    }
}

#[cfg(feature = "postgres")]
async fn postgres_store(config: &NodeConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    use leader_record::PostgresRecordStore;

    let url = config
        .node
        .database_url
        .as_deref()
        .context("database_url is required for the postgres store")?;
    let store = PostgresRecordStore::connect(url)
        .await
        .context("connecting to the management database")?;
    store.ensure_schema().await.context("creating management table")?;
    store
        .seed(&config.management.management_id)
        .await
        .context("seeding management record")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn postgres_store(_config: &NodeConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    anyhow::bail!("postgres store requested but this build lacks the `postgres` feature")
}

/// Read the shared management record without taking part in the election.
///
/// # Errors
/// Store failures.
pub async fn status(
    config: &NodeConfig,
    store: &dyn RecordStore,
) -> anyhow::Result<Option<ManagementRecord>> {
    store
        .get(&config.management.management_id)
        .await
        .context("reading management record")
}

/// One participating instance
#[derive(Debug)]
pub struct Node {
    coordinator: Arc<Coordinator>,
    gate: Arc<MessagingGate>,
    channels: Vec<String>,
    watchers: Vec<JoinHandle<()>>,
}

impl Node {
    /// Wire a coordinator over `store`; channels are registered on start
    #[must_use]
    pub fn new(config: &NodeConfig, store: Arc<dyn RecordStore>) -> Self {
        let gate = Arc::new(MessagingGate::new());
        let coordinator = Arc::new(Coordinator::new(
            config.management.clone(),
            store,
            gate.clone(),
        ));
        Self {
            coordinator,
            gate,
            channels: config.node.channels.clone(),
            watchers: Vec::new(),
        }
    }

    /// The election coordinator
    #[must_use]
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// The messaging gate flipped by the coordinator
    #[must_use]
    pub fn gate(&self) -> &Arc<MessagingGate> {
        &self.gate
    }

    /// Spawn channel watchers and join the election.
    ///
    /// # Errors
    /// The node was already started.
    pub async fn start(&mut self) -> anyhow::Result<Role> {
        if self.watchers.is_empty() {
            self.spawn_watchers();
        }
        let role = self.coordinator.start().await?;
        tracing::info!(
            token = %self.coordinator.token(),
            role = %role,
            "Joined election for {}",
            self.coordinator.config().management_id
        );
        Ok(role)
    }

    /// Leave the election, releasing the lease if held, and stop the watchers.
    ///
    /// # Errors
    /// The node was never started.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        self.coordinator.stop().await?;
        for watcher in self.watchers.drain(..) {
            watcher.abort();
        }
        Ok(())
    }

    fn spawn_watchers(&mut self) {
        for name in &self.channels {
            let mut consumer = self.gate.register_consumer(name.clone());
            self.watchers.push(tokio::spawn(async move {
                while let Ok(paused) = consumer.changed().await {
                    if paused {
                        tracing::info!(channel = consumer.name(), "Consumer paused");
                    } else {
                        tracing::info!(channel = consumer.name(), "Consumer resumed");
                    }
                }
            }));
        }

        let mut events = self.gate.subscribe_producer();
        self.watchers.push(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        tracing::debug!(enabled = event.enabled, "Producer messaging change");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Producer watcher lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }
}

/// Run `node` until `shutdown` resolves, then leave the election.
///
/// # Errors
/// Start or stop failures.
pub async fn run_until<F>(mut node: Node, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    node.start().await?;
    shutdown.await;
    tracing::info!("Shutdown requested");
    node.shutdown().await
}
