//! Pausable periodic timer
//!
//! Each timer runs its callback on a dedicated task. The callback is awaited
//! before the next tick is considered, so one timer never overlaps itself;
//! two different timers may still run concurrently.
//!
//! Cancelling does not interrupt a tick in flight. The task finishes the
//! current callback and exits; [`PeriodicTimer::join`] waits for that.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Run state of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Ticking
    Running,
    /// Alive but not ticking
    Paused,
    /// Stopped for good
    Cancelled,
}

/// Periodic trigger that can be paused, resumed and cancelled
#[derive(Debug)]
pub struct PeriodicTimer {
    name: &'static str,
    state: watch::Sender<TimerState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTimer {
    /// Spawn a timer calling `tick` every `period`.
    ///
    /// The first tick fires one full period after spawning (or after the
    /// timer is first resumed when `initial` is `Paused`).
    pub fn spawn<F, Fut>(
        name: &'static str,
        period: Duration,
        initial: TimerState,
        tick: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (state, receiver) = watch::channel(initial);
        let task = tokio::spawn(run(name, period, receiver, tick));
        tracing::debug!("Spawned timer {} every {:?} ({:?})", name, period, initial);
        Self {
            name,
            state,
            task: Mutex::new(Some(task)),
        }
    }

    /// Timer name used in logs
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current run state
    #[inline]
    #[must_use]
    pub fn state(&self) -> TimerState {
        *self.state.borrow()
    }

    /// Stop ticking until resumed. No effect once cancelled.
    pub fn pause(&self) {
        self.transition(TimerState::Paused);
    }

    /// Resume ticking. No effect once cancelled.
    pub fn resume(&self) {
        self.transition(TimerState::Running);
    }

    /// Stop the timer permanently
    pub fn cancel(&self) {
        self.state.send_if_modified(|state| {
            let changed = *state != TimerState::Cancelled;
            *state = TimerState::Cancelled;
            changed
        });
    }

    /// Wait for the timer task to exit after [`cancel`](Self::cancel)
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("Timer {} task failed: {}", self.name, e);
            }
        }
    }

    fn transition(&self, next: TimerState) {
        self.state.send_if_modified(|state| {
            if *state == TimerState::Cancelled || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run<F, Fut>(
    name: &'static str,
    period: Duration,
    mut state: watch::Receiver<TimerState>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let current = *state.borrow_and_update();
        match current {
            TimerState::Cancelled => break,
            TimerState::Paused => {
                if state.changed().await.is_err() {
                    break;
                }
                interval.reset();
            }
            TimerState::Running => {
                tokio::select! {
                    _ = interval.tick() => tick().await,
                    changed = state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
    tracing::debug!("Timer {} stopped", name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_timer(initial: TimerState) -> (PeriodicTimer, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let ticks = count.clone();
        let timer = PeriodicTimer::spawn("test", Duration::from_secs(1), initial, move || {
            let ticks = ticks.clone();
            async move {
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        });
        (timer, count)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let (_timer, count) = counting_timer(TimerState::Running);

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_timer_does_not_tick() {
        let (timer, count) = counting_timer(TimerState::Paused);

        time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        timer.resume();
        time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        timer.pause();
        time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_final() {
        let (timer, count) = counting_timer(TimerState::Running);

        time::sleep(Duration::from_millis(1_500)).await;
        timer.cancel();
        timer.join().await;
        timer.resume();

        time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timer.state(), TimerState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_can_pause_its_own_timer() {
        let count = Arc::new(AtomicUsize::new(0));
        let timer = Arc::new(std::sync::OnceLock::<PeriodicTimer>::new());

        let ticks = count.clone();
        let handle = timer.clone();
        let spawned = PeriodicTimer::spawn(
            "self-pausing",
            Duration::from_secs(1),
            TimerState::Running,
            move || {
                let ticks = ticks.clone();
                let handle = handle.clone();
                async move {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    if let Some(timer) = handle.get() {
                        timer.pause();
                    }
                }
            },
        );
        timer.set(spawned).unwrap();

        time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timer.get().unwrap().state(), TimerState::Paused);
    }
}
