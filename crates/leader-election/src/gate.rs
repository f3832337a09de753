//! Channel gating
//!
//! Only the master may consume from or produce to the shared channels. The
//! coordinator flips a [`ChannelGate`] on every role change; the
//! [`MessagingGate`] implementation pauses named consumer channels and
//! broadcasts a [`MessagingChangeEvent`] to producers.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch};

/// Capacity of the producer event channel
const PRODUCER_EVENT_CAPACITY: usize = 16;

/// Switch for message flow, called synchronously on role changes
pub trait ChannelGate: Send + Sync {
    /// Allow consuming and producing
    fn enable(&self);

    /// Stop consuming and producing
    fn disable(&self);
}

/// Enablement notice for outbound producers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingChangeEvent {
    /// Whether producing is allowed
    pub enabled: bool,
}

/// Error returned when a gate is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("messaging gate closed")]
pub struct GateClosed;

/// Consumer-side view of one named inbound channel
#[derive(Debug, Clone)]
pub struct ConsumerHandle {
    name: String,
    paused: watch::Receiver<bool>,
}

impl ConsumerHandle {
    /// Channel name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether consumption is currently paused
    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Wait until consumption is allowed
    ///
    /// # Errors
    /// `GateClosed` if the gate was dropped.
    pub async fn wait_until_resumed(&mut self) -> Result<(), GateClosed> {
        self.paused
            .wait_for(|paused| !*paused)
            .await
            .map(|_| ())
            .map_err(|_| GateClosed)
    }

    /// Wait for the next pause/resume flip and return the new paused flag
    ///
    /// # Errors
    /// `GateClosed` if the gate was dropped.
    pub async fn changed(&mut self) -> Result<bool, GateClosed> {
        self.paused.changed().await.map_err(|_| GateClosed)?;
        Ok(*self.paused.borrow_and_update())
    }
}

/// Gate over named consumer channels and a producer broadcast.
///
/// Starts disabled: a fresh instance is a candidate until it wins the lease.
#[derive(Debug)]
pub struct MessagingGate {
    consumers: DashMap<String, watch::Sender<bool>>,
    producers: broadcast::Sender<MessagingChangeEvent>,
    enabled: AtomicBool,
}

impl MessagingGate {
    /// Create a disabled gate with no channels
    #[must_use]
    pub fn new() -> Self {
        let (producers, _) = broadcast::channel(PRODUCER_EVENT_CAPACITY);
        Self {
            consumers: DashMap::new(),
            producers,
            enabled: AtomicBool::new(false),
        }
    }

    /// Register (or attach to) an inbound consumer channel
    pub fn register_consumer(&self, name: impl Into<String>) -> ConsumerHandle {
        let name = name.into();
        let paused = !self.is_enabled();
        let receiver = self
            .consumers
            .entry(name.clone())
            .or_insert_with(|| watch::channel(paused).0)
            .subscribe();
        ConsumerHandle {
            name,
            paused: receiver,
        }
    }

    /// Names of all registered consumer channels, sorted
    #[must_use]
    pub fn consumer_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.consumers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Subscribe an outbound producer to enablement events
    #[must_use]
    pub fn subscribe_producer(&self) -> broadcast::Receiver<MessagingChangeEvent> {
        self.producers.subscribe()
    }

    /// Whether communication is currently enabled
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);

        for consumer in &self.consumers {
            consumer.value().send_replace(!enabled);
        }

        // No subscribed producers is fine
        let _ = self.producers.send(MessagingChangeEvent { enabled });
    }
}

impl Default for MessagingGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelGate for MessagingGate {
    fn enable(&self) {
        self.set_enabled(true);
        tracing::warn!(
            "Enabled communication for master instance ({} consumer channels)",
            self.consumers.len()
        );
    }

    fn disable(&self) {
        self.set_enabled(false);
        tracing::warn!(
            "Disabled communication, not master instance ({} consumer channels)",
            self.consumers.len()
        );
    }
}
