//! Time sources and repeating-callback schedulers.
//!
//! The timer never touches a global clock or spawns anything itself. It is
//! handed a [`Driver`]: something that can tell the current time
//! ([`Clock`]) and run a callback on a fixed cadence ([`Scheduler`]).
//!
//! - [`TokioClock`]: real time on a tokio `LocalSet`.
//! - [`SimulatedClock`]: manual time for tests and dry runs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Milliseconds since an arbitrary, fixed origin. Must never go backwards.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Runs a callback repeatedly until the returned handle is cancelled.
pub trait Scheduler {
    fn every(&self, cadence: Duration, callback: Box<dyn FnMut()>) -> ClockHandle;
}

/// A clock that can also schedule. This is what the timer needs.
pub trait Driver: Clock + Scheduler {}

impl<T: Clock + Scheduler + ?Sized> Driver for T {}

/// Cancellation handle for a scheduled callback.
///
/// Cancelling twice is a no-op. Dropping the handle cancels.
pub struct ClockHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl ClockHandle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.fire();
    }
}

impl fmt::Debug for ClockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClockHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

// ── Tokio ───────────────────────────────────────────────────────────

/// Real-time driver backed by tokio.
///
/// Callbacks run on `tokio::task::spawn_local`, so scheduling must happen
/// inside a `tokio::task::LocalSet`. Time is read from `tokio::time`,
/// which lets paused-time tests advance it.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

impl Scheduler for TokioClock {
    fn every(&self, cadence: Duration, mut callback: Box<dyn FnMut()>) -> ClockHandle {
        let task = tokio::task::spawn_local(async move {
            let first = tokio::time::Instant::now() + cadence;
            let mut interval = tokio::time::interval_at(first, cadence);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                callback();
            }
        });
        ClockHandle::new(move || task.abort())
    }
}

// ── Simulated ───────────────────────────────────────────────────────

/// Manually advanced clock and scheduler.
///
/// Cloning shares the same timeline.
#[derive(Clone, Default)]
pub struct SimulatedClock {
    inner: Rc<SimInner>,
}

#[derive(Default)]
struct SimInner {
    now: Cell<u64>,
    next_id: Cell<u64>,
    tasks: RefCell<Vec<SimTask>>,
}

struct SimTask {
    id: u64,
    cadence_ms: u64,
    due: u64,
    /// Taken out while the callback runs.
    callback: Option<Box<dyn FnMut()>>,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks still scheduled.
    pub fn pending(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// Move time forward by `ms`, then fire every callback that has come
    /// due. Each fires at most once, however far behind it was, and its
    /// next run is one cadence after the new time. This is how a stalled
    /// event loop delivers late ticks.
    pub fn advance(&self, ms: u64) {
        let now = self.inner.now.get().saturating_add(ms);
        self.inner.now.set(now);

        let due: Vec<u64> = self
            .inner
            .tasks
            .borrow()
            .iter()
            .filter(|t| t.due <= now)
            .map(|t| t.id)
            .collect();

        for id in due {
            let callback = {
                let mut tasks = self.inner.tasks.borrow_mut();
                match tasks.iter_mut().find(|t| t.id == id) {
                    Some(task) => {
                        task.due = now.saturating_add(task.cadence_ms);
                        task.callback.take()
                    }
                    // Cancelled by an earlier callback in this batch.
                    None => continue,
                }
            };
            if let Some(mut callback) = callback {
                callback();
                let mut tasks = self.inner.tasks.borrow_mut();
                if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
                    task.callback = Some(callback);
                }
            }
        }
    }

    /// Advance by `total_ms`, stopping at every due time on the way so each
    /// callback fires exactly on schedule.
    pub fn run_for(&self, total_ms: u64) {
        let mut remaining = total_ms;
        while remaining > 0 {
            let now = self.inner.now.get();
            let next_due = self.inner.tasks.borrow().iter().map(|t| t.due).min();
            let step = match next_due {
                Some(due) => due.saturating_sub(now).clamp(1, remaining),
                None => remaining,
            };
            self.advance(step);
            remaining -= step;
        }
    }
}

impl Clock for SimulatedClock {
    fn now_ms(&self) -> u64 {
        self.inner.now.get()
    }
}

impl Scheduler for SimulatedClock {
    fn every(&self, cadence: Duration, callback: Box<dyn FnMut()>) -> ClockHandle {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let cadence_ms = (cadence.as_millis() as u64).max(1);
        self.inner.tasks.borrow_mut().push(SimTask {
            id,
            cadence_ms,
            due: self.inner.now.get().saturating_add(cadence_ms),
            callback: Some(callback),
        });

        let weak: Weak<SimInner> = Rc::downgrade(&self.inner);
        ClockHandle::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.tasks.borrow_mut().retain(|t| t.id != id);
            }
        })
    }
}

impl fmt::Debug for SimulatedClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedClock")
            .field("now", &self.inner.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}
