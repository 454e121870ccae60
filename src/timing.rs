//! One-shot countdown with ordered sub-deadlines.
//!
//! A [`Timing`] owns a window of fixed duration. Callbacks can be registered at
//! an absolute offset into the window or at a portion of it; callbacks at or
//! past the window's end are end-of-window callbacks and fire exactly once when
//! the window closes.
//!
//! Once started, a single driver task sleeps until the earliest pending
//! deadline, takes the due callback out of the registry under the lock and runs
//! it with the lock released. [`Timing::end`] empties the registry under the
//! same lock, so on a single-threaded runtime nothing registered on a timing
//! runs after `end` has returned.

use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{self, Instant};

use crate::error::TimingError;

pub type Callback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pending,
    Running,
    Ended,
}

/// Shared handle to a countdown window. Clones refer to the same window.
#[derive(Clone)]
pub struct Timing {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    wake: Notify,
}

struct State {
    duration: Duration,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    next_id: u64,
    // Keyed by (offset, registration id): equal offsets fire in insertion order.
    scheduled: BTreeMap<(Duration, u64), Callback>,
    at_end: Vec<(u64, Callback)>,
}

enum Due {
    Callback(Callback),
    Expired(Vec<Callback>),
    Nothing,
    Finished,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pops the earliest sub-deadline callback if it is due. Once all of them
    /// are gone and the window has elapsed, ends the timing and hands back the
    /// end-of-window callbacks.
    fn take_due(&self, now: Instant) -> Due {
        let mut state = self.lock();
        let started_at = match (state.started_at, state.ended_at) {
            (Some(started_at), None) => started_at,
            _ => return Due::Finished,
        };
        let elapsed = now.saturating_duration_since(started_at);

        if let Some(entry) = state.scheduled.first_entry() {
            if entry.key().0 <= elapsed {
                return Due::Callback(entry.remove());
            }
        }

        if elapsed >= state.duration {
            state.ended_at = Some(now);
            state.scheduled.clear();
            let handlers = mem::take(&mut state.at_end)
                .into_iter()
                .map(|(_, handler)| handler)
                .collect();
            return Due::Expired(handlers);
        }

        Due::Nothing
    }
}

async fn drive(shared: Arc<Shared>) {
    loop {
        let deadline = {
            let state = shared.lock();
            let started_at = match (state.started_at, state.ended_at) {
                (Some(started_at), None) => started_at,
                _ => return,
            };
            let offset = state
                .scheduled
                .keys()
                .next()
                .map(|(offset, _)| *offset)
                .unwrap_or(state.duration);
            started_at + offset
        };

        tokio::select! {
            _ = time::sleep_until(deadline) => {}
            // A registration or `end` changed the registry; recompute.
            _ = shared.wake.notified() => continue,
        }

        match shared.take_due(Instant::now()) {
            Due::Callback(callback) => callback(),
            Due::Expired(handlers) => {
                log::debug!("timing window expired, running {} end handlers", handlers.len());
                for handler in handlers {
                    handler();
                }
                return;
            }
            Due::Nothing => {}
            Due::Finished => return,
        }
    }
}

impl Timing {
    pub fn new(duration: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    duration,
                    started_at: None,
                    ended_at: None,
                    next_id: 0,
                    scheduled: BTreeMap::new(),
                    at_end: Vec::new(),
                }),
                wake: Notify::new(),
            }),
        }
    }

    /// Starts the countdown and spawns its driver on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(&self) -> Result<(), TimingError> {
        {
            let mut state = self.shared.lock();
            if state.started_at.is_some() {
                return Err(TimingError::AlreadyStarted);
            }
            state.started_at = Some(Instant::now());
            log::debug!(
                "timing started: {:?} window, {} sub-deadlines, {} end handlers",
                state.duration,
                state.scheduled.len(),
                state.at_end.len()
            );
        }
        tokio::spawn(drive(Arc::clone(&self.shared)));
        Ok(())
    }

    /// Cancels every pending callback and freezes the elapsed time.
    pub fn end(&self) -> Result<(), TimingError> {
        let cancelled = {
            let mut state = self.shared.lock();
            if state.ended_at.is_some() {
                return Err(TimingError::AlreadyEnded);
            }
            if state.started_at.is_none() {
                return Err(TimingError::NotStarted);
            }
            state.ended_at = Some(Instant::now());
            (
                mem::take(&mut state.scheduled),
                mem::take(&mut state.at_end),
            )
        };
        log::debug!(
            "timing ended early, cancelled {} callbacks",
            cancelled.0.len() + cancelled.1.len()
        );
        // Dropped outside the lock: callbacks may own handles to this timing.
        drop(cancelled);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Runs `callback` once, `offset` after the start.
    ///
    /// An offset at or past the duration makes this an end-of-window callback.
    /// On a running timing the offset still counts from the start, not from the
    /// call; an offset already in the past fires on the next driver turn.
    /// Registering on an ended timing does nothing and yields an inert token.
    pub fn register_at<F>(&self, offset: Duration, callback: F) -> ScheduleToken
    where
        F: FnOnce() + Send + 'static,
    {
        let (id, slot, running) = {
            let mut state = self.shared.lock();
            let id = state.next_id;
            state.next_id += 1;

            if state.ended_at.is_some() {
                log::warn!("ignoring callback at {:?}: timing already ended", offset);
                return ScheduleToken {
                    id,
                    slot: Slot::Inert,
                    shared: Weak::new(),
                };
            }

            let slot = if offset >= state.duration {
                state.at_end.push((id, Box::new(callback)));
                Slot::AtEnd
            } else {
                state.scheduled.insert((offset, id), Box::new(callback));
                Slot::At(offset)
            };
            (id, slot, state.started_at.is_some())
        };

        if running && matches!(slot, Slot::At(_)) {
            self.shared.wake.notify_one();
        }

        ScheduleToken {
            id,
            slot,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// [`register_at`](Self::register_at) with the offset given as a fraction
    /// of the duration. `1.0` and above land on the end of the window.
    pub fn register_portion<F>(&self, portion: f64, callback: F) -> Result<ScheduleToken, TimingError>
    where
        F: FnOnce() + Send + 'static,
    {
        if !portion.is_finite() || portion < 0.0 {
            return Err(TimingError::InvalidPortion(portion));
        }
        let duration = self.duration();
        let offset = if portion >= 1.0 {
            duration
        } else {
            // Rounded in nanoseconds so that e.g. 2/3 of 3s is exactly 2s.
            Duration::from_nanos((duration.as_nanos() as f64 * portion).round() as u64)
        };
        Ok(self.register_at(offset, callback))
    }

    pub fn on_end<F>(&self, handler: F) -> ScheduleToken
    where
        F: FnOnce() + Send + 'static,
    {
        let duration = self.duration();
        self.register_at(duration, handler)
    }

    pub fn duration(&self) -> Duration {
        self.shared.lock().duration
    }

    pub fn phase(&self) -> Phase {
        let state = self.shared.lock();
        match (state.started_at, state.ended_at) {
            (None, _) => Phase::Pending,
            (Some(_), None) => Phase::Running,
            (Some(_), Some(_)) => Phase::Ended,
        }
    }

    pub fn elapsed(&self) -> Duration {
        let state = self.shared.lock();
        match (state.started_at, state.ended_at) {
            (None, _) => Duration::ZERO,
            (Some(started_at), Some(ended_at)) => ended_at.saturating_duration_since(started_at),
            (Some(started_at), None) => started_at.elapsed(),
        }
    }

    pub fn remaining(&self) -> Duration {
        self.duration().saturating_sub(self.elapsed())
    }

    /// Elapsed time as a fraction of the duration.
    pub fn elapsed_portion(&self) -> f64 {
        let duration = self.duration();
        if duration.is_zero() {
            return if self.phase() == Phase::Pending { 0.0 } else { 1.0 };
        }
        self.elapsed().as_secs_f64() / duration.as_secs_f64()
    }
}

impl fmt::Debug for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timing")
            .field("duration", &self.duration())
            .field("phase", &self.phase())
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    At(Duration),
    AtEnd,
    Inert,
}

/// Handle to a single registration on a [`Timing`].
#[derive(Debug, Clone)]
pub struct ScheduleToken {
    id: u64,
    slot: Slot,
    shared: Weak<Shared>,
}

impl ScheduleToken {
    /// Removes the registration if it has not fired or been cancelled yet.
    pub fn cancel(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let removed = {
            let mut state = shared.lock();
            match self.slot {
                Slot::At(offset) => state.scheduled.remove(&(offset, self.id)),
                Slot::AtEnd => state
                    .at_end
                    .iter()
                    .position(|(id, _)| *id == self.id)
                    .map(|idx| state.at_end.remove(idx).1),
                Slot::Inert => None,
            }
        };
        removed.is_some()
    }
}
