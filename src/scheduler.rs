//! Timers and time sources
//!
//! Everything in the crate that waits on the wall clock goes through a
//! [`Scheduler`], so the owner of a timer can always cancel it and tests can
//! drive time by hand.

use chrono::{DateTime, Utc};
use log::trace;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// A unit of deferred work
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Produces a fresh [`Task`] for every tick of a repeating timer
pub type RepeatingTask = Arc<dyn Fn() -> Task + Send + Sync>;

/// Identifies an armed timer so that it can be cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Raw timer id
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Arms and cancels timers
pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;

    /// Run a task produced by `task` every `period`, first tick after one period
    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> TimerHandle;

    /// Cancel a timer. Cancelling an unknown or already fired timer is a no-op.
    fn cancel(&self, handle: TimerHandle);
}

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Scheduler backed by spawned tokio tasks
///
/// Must be used from within a tokio runtime.
#[derive(Default)]
pub struct TokioScheduler {
    next_id: AtomicU64,
    timers: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl TokioScheduler {
    /// Create a new scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers that have neither fired nor been cancelled
    pub fn live_timers(&self) -> usize {
        let timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.values().filter(|h| !h.is_finished()).count()
    }

    fn register(&self, handle: JoinHandle<()>) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.retain(|_, h| !h.is_finished());
        timers.insert(id, handle);
        TimerHandle(id)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        trace!("Arming one-shot timer in {:?}", delay);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        self.register(handle)
    }

    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> TimerHandle {
        trace!("Arming repeating timer every {:?}", period);
        let period = period.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                task().await;
            }
        });
        self.register(handle)
    }

    fn cancel(&self, handle: TimerHandle) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(join) = timers.remove(&handle.0) {
            trace!("Cancelling timer {}", handle.0);
            join.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        let timers = self.timers.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, join) in timers.drain() {
            join.abort();
        }
    }
}
