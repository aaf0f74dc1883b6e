//! # Timer Registry & Executor
//!
//! Owns every active timer and the timed tasks that fire them. Each timer
//! gets one suspend-until-instant task for its terminal notification and one
//! per advance reminder; no task ever blocks a thread waiting. Cancellation
//! flips the timer state synchronously, and sleeping tasks discover it when
//! they wake.
//!
//! The cancel/fire race on a single timer is resolved by the per-timer
//! mutex: whichever side takes the lock first wins outright, so a
//! borderline-timed cancellation either fully cancels or the fire already
//! completed. The delivery sink is only awaited after the lock is released.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::ScheduleError;
use crate::features::reminders::{self, ReminderScheduler};
use crate::sink::{DeliverySink, DeliveryTarget};

/// Default cap on concurrently scheduled timers.
pub const DEFAULT_MAX_ACTIVE: usize = 10_000;

/// Opaque timer handle, used for cancellation and for correlating a
/// notification with its delivery target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(Uuid);

impl TimerId {
    fn new() -> Self {
        TimerId(Uuid::new_v4())
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TimerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(TimerId)
    }
}

/// Lifecycle of a timer. `Fired` and `Canceled` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    Scheduled,
    Fired,
    Canceled,
}

/// One advance reminder, as an offset before the target instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEntry {
    pub offset: Duration,
    pub fired: bool,
}

struct Timer {
    target: DateTime<Utc>,
    delivery: DeliveryTarget,
    state: TimerState,
    reminders: Vec<ReminderEntry>,
}

/// Read-only snapshot of a timer for listings and tests.
#[derive(Debug, Clone)]
pub struct TimerInfo {
    pub id: TimerId,
    pub target: DateTime<Utc>,
    pub state: TimerState,
    pub reminders: Vec<ReminderEntry>,
}

struct Inner {
    timers: DashMap<TimerId, Mutex<Timer>>,
    sink: Arc<dyn DeliverySink>,
    max_active: usize,
}

/// Thread-safe registry of active timers. Cheap to clone; clones share the
/// same underlying set.
#[derive(Clone)]
pub struct TimerRegistry {
    inner: Arc<Inner>,
}

impl TimerRegistry {
    pub fn new(sink: Arc<dyn DeliverySink>) -> Self {
        TimerRegistry::with_capacity(sink, DEFAULT_MAX_ACTIVE)
    }

    pub fn with_capacity(sink: Arc<dyn DeliverySink>, max_active: usize) -> Self {
        TimerRegistry {
            inner: Arc::new(Inner {
                timers: DashMap::new(),
                sink,
                max_active,
            }),
        }
    }

    /// Schedule a timer to fire at `target`. Returns synchronously once the
    /// timed tasks are arranged; fails synchronously if `target` is not in
    /// the future or the registry is at capacity.
    pub fn schedule(
        &self,
        target: DateTime<Utc>,
        delivery: DeliveryTarget,
    ) -> Result<TimerId, ScheduleError> {
        self.schedule_at(target, delivery, Utc::now())
    }

    /// [`schedule`](Self::schedule) with an explicit "now", so lead-time
    /// validation and reminder derivation are deterministic for callers that
    /// already hold a timestamp.
    pub fn schedule_at(
        &self,
        target: DateTime<Utc>,
        delivery: DeliveryTarget,
        now: DateTime<Utc>,
    ) -> Result<TimerId, ScheduleError> {
        let lead = target - now;
        if lead <= Duration::zero() {
            return Err(ScheduleError::InvalidTarget { target });
        }
        if self.inner.timers.len() >= self.inner.max_active {
            warn!(
                "refusing to schedule timer for {target}: {} active timers",
                self.inner.timers.len()
            );
            return Err(ScheduleError::Exhausted {
                limit: self.inner.max_active,
            });
        }

        let offsets = reminders::derive_schedule(lead);
        let id = TimerId::new();
        let timer = Timer {
            target,
            delivery,
            state: TimerState::Scheduled,
            reminders: offsets
                .iter()
                .map(|&offset| ReminderEntry {
                    offset,
                    fired: false,
                })
                .collect(),
        };
        self.inner.timers.insert(id, Mutex::new(timer));

        self.spawn_terminal(id, target, now);
        ReminderScheduler::spawn_all(self.clone(), id, target, &offsets, now);

        info!(
            "scheduled timer {id} for {target} with {} reminder(s)",
            offsets.len()
        );
        Ok(id)
    }

    /// Cancel a scheduled timer. All of its pending terminal and reminder
    /// wakes become no-ops. Returns `false` (and does nothing) if the timer
    /// is unknown or already terminal, so a second cancel is a no-op.
    pub fn cancel(&self, id: TimerId) -> bool {
        let canceled = {
            let Some(slot) = self.inner.timers.get(&id) else {
                return false;
            };
            let mut timer = lock_timer(slot.value());
            if timer.state == TimerState::Scheduled {
                timer.state = TimerState::Canceled;
                true
            } else {
                false
            }
        };
        if canceled {
            self.inner.timers.remove(&id);
            info!("timer {id} canceled");
        }
        canceled
    }

    /// Point the timer's notifications at a specific message, so the
    /// transport can update its "timer set" message in place on completion.
    pub fn attach_message(&self, id: TimerId, message: u64) -> bool {
        match self.inner.timers.get(&id) {
            Some(slot) => {
                lock_timer(slot.value()).delivery.message = Some(message);
                true
            }
            None => false,
        }
    }

    /// Current state of a timer, if it is still in the registry.
    pub fn state_of(&self, id: TimerId) -> Option<TimerState> {
        self.inner
            .timers
            .get(&id)
            .map(|slot| lock_timer(slot.value()).state)
    }

    /// Snapshot of a timer for listings.
    pub fn snapshot(&self, id: TimerId) -> Option<TimerInfo> {
        self.inner.timers.get(&id).map(|slot| {
            let timer = lock_timer(slot.value());
            TimerInfo {
                id,
                target: timer.target,
                state: timer.state,
                reminders: timer.reminders.clone(),
            }
        })
    }

    /// Snapshots of all active timers, soonest target first.
    pub fn active(&self) -> Vec<TimerInfo> {
        let mut infos: Vec<TimerInfo> = self
            .inner
            .timers
            .iter()
            .map(|entry| {
                let timer = lock_timer(entry.value());
                TimerInfo {
                    id: *entry.key(),
                    target: timer.target,
                    state: timer.state,
                    reminders: timer.reminders.clone(),
                }
            })
            .collect();
        infos.sort_by_key(|info| info.target);
        infos
    }

    pub fn active_count(&self) -> usize {
        self.inner.timers.len()
    }

    fn spawn_terminal(&self, id: TimerId, target: DateTime<Utc>, now: DateTime<Utc>) {
        let registry = self.clone();
        let wait = duration_until(target, now);
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            registry.fire_terminal(id).await;
        });
    }

    /// Terminal wake-up. Re-checks the timer state under its lock: a timer
    /// that was canceled in the meantime is left alone.
    async fn fire_terminal(&self, id: TimerId) {
        let fired = {
            let Some(slot) = self.inner.timers.get(&id) else {
                debug!("terminal wake for {id}: timer already gone");
                return;
            };
            let mut timer = lock_timer(slot.value());
            if timer.state != TimerState::Scheduled {
                debug!("terminal wake for {id}: state is {:?}, ignoring", timer.state);
                return;
            }
            timer.state = TimerState::Fired;
            (timer.delivery.clone(), timer.target)
        };
        self.inner.timers.remove(&id);
        info!("timer {id} fired (target {})", fired.1);
        self.inner.sink.notify_terminal(&fired.0, fired.1).await;
    }

    /// Reminder wake-up for reminder `index` of timer `id`. No-ops if the
    /// timer was canceled or already fired; never touches the primary state.
    pub(crate) async fn run_reminder(&self, id: TimerId, index: usize) {
        let delivery = {
            let Some(slot) = self.inner.timers.get(&id) else {
                debug!("reminder wake for {id}: timer already gone");
                return;
            };
            let mut timer = lock_timer(slot.value());
            if timer.state != TimerState::Scheduled {
                return;
            }
            match timer.reminders.get_mut(index) {
                Some(entry) => entry.fired = true,
                None => {
                    warn!("reminder index {index} out of range for timer {id}");
                    return;
                }
            }
            timer.delivery.clone()
        };
        debug!("reminder {index} fired for timer {id}");
        self.inner.sink.notify_reminder(&delivery).await;
    }
}

/// Wall-clock wait from `now` until `instant`, clamped at zero.
pub(crate) fn duration_until(instant: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (instant - now).to_std().unwrap_or(std::time::Duration::ZERO)
}

fn lock_timer(slot: &Mutex<Timer>) -> MutexGuard<'_, Timer> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
