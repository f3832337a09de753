//! Leader election coordinator
//!
//! Decides on a fixed cadence whether this process is the singleton master
//! and enforces the answer on the shared channels:
//! - While candidate, the probe timer tries to claim the lease
//! - While master, the heartbeat timer refreshes it
//! - Every role change flips the [`ChannelGate`] and swaps which timer runs
//!
//! Store failures during a tick are logged and leave the role untouched; the
//! next tick retries. Only the store's per-id lock makes claims atomic across
//! processes. Within one process the two timers are kept apart on a
//! best-effort basis by pausing whichever one the current role does not need.

use crate::config::ElectionConfig;
use crate::error::{ElectionError, ElectionResult};
use crate::gate::ChannelGate;
use crate::lease;
use crate::role::{Role, RoleChange};
use crate::timer::{PeriodicTimer, TimerState};
use leader_record::{Clock, ManagementRecord, RecordStore, SystemClock};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use uuid::Uuid;

const PROBE_TIMER: &str = "master-check";
const HEARTBEAT_TIMER: &str = "heartbeat";

#[derive(Debug)]
struct Timers {
    probe: PeriodicTimer,
    heartbeat: PeriodicTimer,
}

impl Timers {
    fn arrange_for(&self, role: Role) {
        match role {
            Role::Master => {
                self.heartbeat.resume();
                self.probe.pause();
            }
            Role::Candidate => {
                self.probe.resume();
                self.heartbeat.pause();
            }
        }
    }

    async fn shutdown(self) {
        self.probe.cancel();
        self.heartbeat.cancel();
        self.probe.join().await;
        self.heartbeat.join().await;
    }
}

/// Generate a fresh leadership token
#[must_use]
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

/// Singleton election coordinator for one process
pub struct Coordinator {
    config: ElectionConfig,
    store: Arc<dyn RecordStore>,
    gate: Arc<dyn ChannelGate>,
    clock: Arc<dyn Clock>,
    current: Mutex<ManagementRecord>,
    master: AtomicBool,
    timers: Mutex<Option<Timers>>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("current", &*self.current.lock())
            .field("role", &self.role())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Create a candidate with a freshly generated token
    #[must_use]
    pub fn new(
        config: ElectionConfig,
        store: Arc<dyn RecordStore>,
        gate: Arc<dyn ChannelGate>,
    ) -> Self {
        let current = ManagementRecord::new(config.management_id.clone(), generate_token(), None);
        Self {
            config,
            store,
            gate,
            clock: Arc::new(SystemClock),
            current: Mutex::new(current),
            master: AtomicBool::new(false),
            timers: Mutex::new(None),
        }
    }

    /// Read time from `clock` instead of the system clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a fixed token, e.g. to resume an identity across a restart
    #[inline]
    #[must_use]
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.current.lock().token = Some(token.into());
        self
    }

    /// Election configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    /// Whether this process currently acts as master
    #[inline]
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.master.load(Ordering::SeqCst)
    }

    /// Current role
    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        Role::from_master(self.is_master())
    }

    /// This process's candidate record
    #[must_use]
    pub fn current_info(&self) -> ManagementRecord {
        self.current.lock().clone()
    }

    /// This process's leadership token
    #[must_use]
    pub fn token(&self) -> String {
        self.current.lock().token.clone().unwrap_or_default()
    }

    /// Whether the timers are running
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.timers.lock().is_some()
    }

    /// Start the election: probe timer running, heartbeat timer paused, then
    /// one immediate probe.
    ///
    /// A failing initial probe is logged, not returned; the probe timer retries.
    ///
    /// # Errors
    /// `ElectionError::AlreadyStarted` on a second call.
    pub async fn start(self: &Arc<Self>) -> ElectionResult<Role> {
        {
            let mut timers = self.timers.lock();
            if timers.is_some() {
                return Err(ElectionError::AlreadyStarted);
            }

            let now = self.clock.now();
            let info = {
                let mut current = self.current.lock();
                current.last_heartbeat = Some(now);
                current.clone()
            };
            tracing::info!("Current job service instance {}", info);

            *timers = Some(Timers {
                probe: self.spawn_timer(PROBE_TIMER, TimerState::Running, |c| async move {
                    c.try_become_master().await;
                }),
                heartbeat: self.spawn_timer(HEARTBEAT_TIMER, TimerState::Paused, |c| async move {
                    c.refresh_heartbeat().await;
                }),
            });
        }

        Ok(self.try_become_master().await)
    }

    /// Stop the election: cancel both timers, wait for in-flight ticks, then
    /// release the lease if this process still holds it.
    ///
    /// A failing release is logged, not returned.
    ///
    /// # Errors
    /// `ElectionError::NotStarted` if `start` was never called.
    pub async fn stop(&self) -> ElectionResult<()> {
        let timers = self.timers.lock().take().ok_or(ElectionError::NotStarted)?;
        timers.shutdown().await;

        if let Err(e) = self.release().await {
            tracing::error!("Error releasing master lease: {}", e);
        }
        tracing::info!("Shutting down master instance check");
        Ok(())
    }

    /// One probe tick, with failures logged. Returns the role afterwards.
    pub async fn try_become_master(&self) -> Role {
        match self.probe().await {
            Ok(role) => {
                tracing::debug!("Checked master: {}", role);
                role
            }
            Err(e) => {
                tracing::error!("Error checking master: {}", e);
                self.role()
            }
        }
    }

    /// One heartbeat tick, with failures logged. Returns the role afterwards.
    pub async fn refresh_heartbeat(&self) -> Role {
        match self.heartbeat().await {
            Ok(role) => role,
            Err(e) => {
                tracing::error!("Error on heartbeat: {}", e);
                self.role()
            }
        }
    }

    /// Try to claim the lease.
    ///
    /// Becomes master when the record is free, expired, or already ours.
    /// Demotes when a master finds someone else's live lease.
    ///
    /// # Errors
    /// Store failures; the role is unchanged when one is returned.
    pub async fn probe(&self) -> ElectionResult<Role> {
        tracing::debug!("Try to become master");
        let candidate = self.current_info();
        let id = candidate.id.clone();
        let update = lease::claim(
            candidate,
            self.clock.clone(),
            self.config.heartbeat_expiration(),
        );

        let claimed = self.store.get_and_update(&id, update).await?;

        let won = match claimed {
            Some(record) => {
                tracing::info!("Set master {}", record);
                self.current.lock().last_heartbeat = record.last_heartbeat;
                true
            }
            None => false,
        };

        let next = self.role().after_probe(won);
        self.apply(next, "probe");
        Ok(next)
    }

    /// Refresh the lease while master.
    ///
    /// The write only lands if the record still carries our token. When it does
    /// not, the lease was lost and the coordinator demotes right away.
    ///
    /// # Errors
    /// Store failures; the role is unchanged when one is returned.
    pub async fn heartbeat(&self) -> ElectionResult<Role> {
        if !self.is_master() {
            tracing::debug!("Skipping heartbeat, not master");
            return Ok(Role::Candidate);
        }

        tracing::debug!("Heartbeat master");
        let info = self.current_info();
        let renewed = self
            .store
            .get_and_update(&info.id, lease::renew(self.token(), self.clock.clone()))
            .await?;

        if let Some(record) = &renewed {
            self.current.lock().last_heartbeat = record.last_heartbeat;
        } else {
            tracing::warn!("Lease for {} no longer held by this instance", info.id);
        }

        let next = self.role().after_heartbeat(renewed.is_some());
        self.apply(next, "heartbeat");
        Ok(next)
    }

    /// Clear the record if this process holds it and drop to candidate.
    ///
    /// # Errors
    /// Store failures; local state is unchanged when one is returned.
    pub async fn release(&self) -> ElectionResult<()> {
        tracing::info!("Release master");
        let id = self.config.management_id.clone();
        let released = self
            .store
            .get_and_update(&id, lease::release(self.token()))
            .await?;

        if released.is_none() {
            tracing::debug!("Nothing to release, lease for {} held elsewhere", id);
        }
        self.apply(Role::Candidate, "release");
        Ok(())
    }

    fn apply(&self, next: Role, cause: &str) {
        let previous = Role::from_master(self.master.swap(next.is_master(), Ordering::SeqCst));

        if let Some(timers) = self.timers.lock().as_ref() {
            timers.arrange_for(next);
        }

        let Some(change) = RoleChange::between(previous, next) else {
            return;
        };
        if change.is_promotion() {
            tracing::info!("Became master after {}", cause);
            self.gate.enable();
        } else {
            tracing::info!("Stepped down to candidate after {}", cause);
            self.gate.disable();
        }
    }

    fn spawn_timer<F, Fut>(
        self: &Arc<Self>,
        name: &'static str,
        initial: TimerState,
        tick: F,
    ) -> PeriodicTimer
    where
        F: Fn(Arc<Self>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let period = match name {
            HEARTBEAT_TIMER => self.config.heartbeat_interval(),
            _ => self.config.master_check_interval(),
        };
        let weak: Weak<Self> = Arc::downgrade(self);
        PeriodicTimer::spawn(name, period, initial, move || {
            let coordinator = weak.upgrade();
            let tick = coordinator.map(&tick);
            async move {
                if let Some(tick) = tick {
                    tick.await;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::MessagingGate;
    use leader_record::InMemoryRecordStore;

    fn coordinator(store: Arc<InMemoryRecordStore>, gate: Arc<MessagingGate>) -> Coordinator {
        Coordinator::new(ElectionConfig::default(), store, gate)
    }

    #[test]
    fn new_coordinator_is_candidate() {
        let c = coordinator(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(MessagingGate::new()),
        );

        assert_eq!(c.role(), Role::Candidate);
        assert!(!c.is_started());
        assert_eq!(c.current_info().id, crate::config::DEFAULT_MANAGEMENT_ID);
        assert!(Uuid::parse_str(&c.token()).is_ok());
    }

    #[test]
    fn tokens_are_unique_per_instance() {
        let store = Arc::new(InMemoryRecordStore::new());
        let gate = Arc::new(MessagingGate::new());
        let a = coordinator(store.clone(), gate.clone());
        let b = coordinator(store, gate);

        assert_ne!(a.token(), b.token());
    }

    #[tokio::test]
    async fn probe_claims_empty_store_and_enables_gate() {
        let store = Arc::new(InMemoryRecordStore::new());
        let gate = Arc::new(MessagingGate::new());
        let c = coordinator(store.clone(), gate.clone());

        assert_eq!(c.probe().await.unwrap(), Role::Master);
        assert!(gate.is_enabled());

        let record = store
            .get(crate::config::DEFAULT_MANAGEMENT_ID)
            .await
            .unwrap()
            .unwrap();
        assert!(record.is_held_by(&c.token()));
        assert_eq!(record.last_heartbeat, c.current_info().last_heartbeat);
    }

    #[tokio::test]
    async fn heartbeat_is_skipped_for_candidates() {
        let store = Arc::new(InMemoryRecordStore::new());
        let c = coordinator(store.clone(), Arc::new(MessagingGate::new()));

        assert_eq!(c.heartbeat().await.unwrap(), Role::Candidate);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn release_clears_own_lease() {
        let store = Arc::new(InMemoryRecordStore::new());
        let gate = Arc::new(MessagingGate::new());
        let c = coordinator(store.clone(), gate.clone());
        c.probe().await.unwrap();

        c.release().await.unwrap();

        let record = store
            .get(crate::config::DEFAULT_MANAGEMENT_ID)
            .await
            .unwrap()
            .unwrap();
        assert!(record.is_released());
        assert!(!c.is_master());
        assert!(!gate.is_enabled());
    }

    #[tokio::test]
    async fn stop_before_start_is_an_error() {
        let c = coordinator(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(MessagingGate::new()),
        );
        assert!(matches!(c.stop().await, Err(ElectionError::NotStarted)));
    }
}
