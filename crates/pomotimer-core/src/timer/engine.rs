//! Pomodoro timer state machine.
//!
//! The timer owns no thread. It asks its [`Driver`] for a repeating clock
//! callback while running and measures elapsed time as wall-clock deltas
//! between callbacks, so a late callback never loses time.
//!
//! ## States
//!
//! ```text
//! Stopped(phase) --start(p)--> Running(p)
//! Running(p) --pause--> Stopped(p)            elapsed kept
//! Stopped(p) --resume--> Running(p)           0 < elapsed < duration
//! Running(p) --phase runs out--> Stopped(p)   elapsed = 0, PhaseEnded fired
//! any --reset--> Stopped(focus)
//! ```
//!
//! "Running" means exactly "a clock handle is installed".
//!
//! ## Usage
//!
//! ```ignore
//! let timer = PomodoroTimer::new(PomodoroConfig::default(), TokioClock::new())?;
//! let weak = timer.downgrade();
//! timer.events().subscribe(TimerEventKind::PhaseEnded, move |ev| {
//!     if let (TimerEvent::PhaseEnded { next, .. }, Some(t)) = (ev, weak.upgrade()) {
//!         t.start(*next);
//!     }
//! });
//! timer.start(PomodoroPhase::Focus);
//! ```

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{PomodoroConfig, PomodoroPhase};
use crate::clock::{ClockHandle, Driver};
use crate::emitter::EventEmitter;
use crate::error::{ConfigError, TimerError};
use crate::events::TimerEvent;

pub const DEFAULT_CADENCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerOptions {
    /// How often the clock callback recomputes elapsed time.
    pub cadence: Duration,
    /// Phase the timer sits on before the first `start`.
    pub initial_phase: PomodoroPhase,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
            initial_phase: PomodoroPhase::Focus,
        }
    }
}

/// Serializable view of the timer at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub phase: PomodoroPhase,
    pub running: bool,
    pub milliseconds_passed: u64,
    pub milliseconds_left: u64,
    pub phase_milliseconds: u64,
    pub short_breaks_done: u32,
    pub next_phase: PomodoroPhase,
}

struct TimerCore {
    config: PomodoroConfig,
    current_phase: PomodoroPhase,
    milliseconds_passed: u64,
    short_breaks_done: u32,
    clock_handle: Option<ClockHandle>,
    /// Driver time of the last accounted clock callback (or of install).
    last_tick_ms: u64,
    /// Bumped on every install so callbacks from an old clock are ignored.
    generation: u64,
}

impl TimerCore {
    fn phase_milliseconds(&self) -> u64 {
        self.config.phase_milliseconds(self.current_phase)
    }

    fn milliseconds_left(&self) -> u64 {
        self.phase_milliseconds()
            .saturating_sub(self.milliseconds_passed)
    }

    fn next_phase(&self) -> PomodoroPhase {
        match self.current_phase {
            PomodoroPhase::ShortBreak | PomodoroPhase::LongBreak => PomodoroPhase::Focus,
            PomodoroPhase::Focus => {
                if self.short_breaks_done < self.config.short_breaks_count {
                    PomodoroPhase::ShortBreak
                } else {
                    PomodoroPhase::LongBreak
                }
            }
        }
    }
}

struct Shared {
    core: RefCell<TimerCore>,
    events: EventEmitter<TimerEvent>,
    driver: Rc<dyn Driver>,
    cadence: Duration,
}

enum TickOutcome {
    Stale,
    Running { milliseconds_left: u64 },
    Ended {
        prev: PomodoroPhase,
        next: PomodoroPhase,
        handle: Option<ClockHandle>,
    },
}

/// Handle to a pomodoro timer.
///
/// Clones share the same timer. Event handlers that need to call back into
/// the timer should hold a [`WeakTimer`] (see [`PomodoroTimer::downgrade`]);
/// a strong clone inside a handler keeps the timer alive forever.
#[derive(Clone)]
pub struct PomodoroTimer {
    shared: Rc<Shared>,
}

/// Non-owning handle, for use inside event handlers.
#[derive(Clone)]
pub struct WeakTimer {
    shared: Weak<Shared>,
}

impl WeakTimer {
    pub fn upgrade(&self) -> Option<PomodoroTimer> {
        self.shared.upgrade().map(|shared| PomodoroTimer { shared })
    }
}

impl PomodoroTimer {
    pub fn new<D: Driver + 'static>(config: PomodoroConfig, driver: D) -> Result<Self, ConfigError> {
        Self::with_options(config, driver, TimerOptions::default())
    }

    pub fn with_options<D: Driver + 'static>(
        config: PomodoroConfig,
        driver: D,
        options: TimerOptions,
    ) -> Result<Self, ConfigError> {
        Self::from_shared_driver(config, Rc::new(driver), options)
    }

    /// Build a timer on a driver that other code keeps a handle to.
    pub fn from_shared_driver(
        config: PomodoroConfig,
        driver: Rc<dyn Driver>,
        options: TimerOptions,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if options.cadence.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "cadence".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(Self {
            shared: Rc::new(Shared {
                core: RefCell::new(TimerCore {
                    config,
                    current_phase: options.initial_phase,
                    milliseconds_passed: 0,
                    short_breaks_done: 0,
                    clock_handle: None,
                    last_tick_ms: 0,
                    generation: 0,
                }),
                events: EventEmitter::new(),
                driver,
                cadence: options.cadence,
            }),
        })
    }

    pub fn downgrade(&self) -> WeakTimer {
        WeakTimer {
            shared: Rc::downgrade(&self.shared),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn events(&self) -> &EventEmitter<TimerEvent> {
        &self.shared.events
    }

    fn core(&self) -> Ref<'_, TimerCore> {
        self.shared.core.borrow()
    }

    pub fn config(&self) -> PomodoroConfig {
        self.core().config
    }

    pub fn current_phase(&self) -> PomodoroPhase {
        self.core().current_phase
    }

    pub fn milliseconds_passed(&self) -> u64 {
        self.core().milliseconds_passed
    }

    pub fn short_breaks_done(&self) -> u32 {
        self.core().short_breaks_done
    }

    pub fn is_running(&self) -> bool {
        self.core().clock_handle.is_some()
    }

    pub fn cadence(&self) -> Duration {
        self.shared.cadence
    }

    pub fn current_phase_milliseconds(&self) -> u64 {
        self.core().phase_milliseconds()
    }

    pub fn current_phase_milliseconds_left(&self) -> u64 {
        self.core().milliseconds_left()
    }

    /// Phase that follows the current one. Never mutates anything.
    pub fn next_phase(&self) -> PomodoroPhase {
        self.core().next_phase()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let core = self.core();
        TimerSnapshot {
            phase: core.current_phase,
            running: core.clock_handle.is_some(),
            milliseconds_passed: core.milliseconds_passed,
            milliseconds_left: core.milliseconds_left(),
            phase_milliseconds: core.phase_milliseconds(),
            short_breaks_done: core.short_breaks_done,
            next_phase: core.next_phase(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start `phase` from zero. A running clock is replaced, not paused,
    /// so no `Paused` event fires.
    pub fn start(&self, phase: PomodoroPhase) {
        let stale = {
            let mut core = self.shared.core.borrow_mut();
            let stale = core.clock_handle.take();
            core.current_phase = phase;
            core.milliseconds_passed = 0;
            match phase {
                PomodoroPhase::ShortBreak => core.short_breaks_done += 1,
                PomodoroPhase::LongBreak => core.short_breaks_done = 0,
                PomodoroPhase::Focus => {}
            }
            stale
        };
        if let Some(handle) = stale {
            handle.cancel();
        }
        self.install_clock();

        tracing::debug!(%phase, "phase started");
        self.shared.events.emit(TimerEvent::Started { phase });
    }

    /// Start the current phase over from zero.
    pub fn restart(&self) {
        let phase = self.current_phase();
        self.start(phase);
    }

    pub fn pause(&self) -> Result<(), TimerError> {
        let (handle, milliseconds_left) = {
            let mut core = self.shared.core.borrow_mut();
            match core.clock_handle.take() {
                Some(handle) => (handle, core.milliseconds_left()),
                None => {
                    drop(core);
                    return Err(diagnose(TimerError::NotRunning));
                }
            }
        };
        handle.cancel();

        tracing::debug!(milliseconds_left, "timer paused");
        self.shared
            .events
            .emit(TimerEvent::Paused { milliseconds_left });
        Ok(())
    }

    /// Continue a paused phase from where it stopped.
    pub fn resume(&self) -> Result<(), TimerError> {
        let milliseconds_left = {
            let core = self.shared.core.borrow();
            let duration_ms = core.phase_milliseconds();
            let refusal = if core.clock_handle.is_some() {
                Some(TimerError::AlreadyRunning)
            } else if core.milliseconds_passed == 0 {
                Some(TimerError::NothingToResume {
                    phase: core.current_phase,
                })
            } else if core.milliseconds_passed >= duration_ms {
                Some(TimerError::PhaseAlreadyCompleted {
                    phase: core.current_phase,
                    passed_ms: core.milliseconds_passed,
                    duration_ms,
                })
            } else {
                None
            };
            if let Some(err) = refusal {
                drop(core);
                return Err(diagnose(err));
            }
            core.milliseconds_left()
        };
        self.install_clock();

        tracing::debug!(milliseconds_left, "timer resumed");
        self.shared
            .events
            .emit(TimerEvent::Resumed { milliseconds_left });
        Ok(())
    }

    /// Stop and go back to a fresh focus phase. Emits nothing.
    pub fn reset(&self) {
        let stale = {
            let mut core = self.shared.core.borrow_mut();
            core.current_phase = PomodoroPhase::Focus;
            core.milliseconds_passed = 0;
            core.short_breaks_done = 0;
            core.clock_handle.take()
        };
        if let Some(handle) = stale {
            handle.cancel();
        }
        tracing::debug!("timer reset");
    }

    /// Replace durations and the short-break budget.
    ///
    /// Elapsed time is left alone; the next clock callback measures it
    /// against the new duration, which may end the phase right away.
    pub fn update_config(&self, config: PomodoroConfig) -> Result<(), TimerError> {
        if let Err(err) = config.validate() {
            return Err(diagnose(TimerError::InvalidConfig(err)));
        }
        self.shared.core.borrow_mut().config = config;
        tracing::debug!(?config, "configuration updated");
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn install_clock(&self) {
        let previous = {
            let mut core = self.shared.core.borrow_mut();
            core.generation += 1;
            core.last_tick_ms = self.shared.driver.now_ms();
            core.clock_handle.take()
        };
        if let Some(handle) = previous {
            handle.cancel();
        }

        let generation = self.shared.core.borrow().generation;
        let weak = Rc::downgrade(&self.shared);
        let handle = self.shared.driver.every(
            self.shared.cadence,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    PomodoroTimer { shared }.on_clock(generation);
                }
            }),
        );
        self.shared.core.borrow_mut().clock_handle = Some(handle);
    }

    fn on_clock(&self, generation: u64) {
        let now = self.shared.driver.now_ms();
        let outcome = {
            let mut core = self.shared.core.borrow_mut();
            if core.generation != generation || core.clock_handle.is_none() {
                TickOutcome::Stale
            } else {
                let delta = now.saturating_sub(core.last_tick_ms);
                core.last_tick_ms = now;
                core.milliseconds_passed = core.milliseconds_passed.saturating_add(delta);
                let milliseconds_left = core.milliseconds_left();
                if milliseconds_left == 0 {
                    core.milliseconds_passed = 0;
                    TickOutcome::Ended {
                        prev: core.current_phase,
                        next: core.next_phase(),
                        handle: core.clock_handle.take(),
                    }
                } else {
                    TickOutcome::Running { milliseconds_left }
                }
            }
        };

        match outcome {
            TickOutcome::Stale => {
                tracing::trace!(generation, "ignoring callback from a replaced clock");
            }
            TickOutcome::Running { milliseconds_left } => {
                tracing::trace!(milliseconds_left, "tick");
                self.shared.events.emit(TimerEvent::Tick { milliseconds_left });
            }
            TickOutcome::Ended { prev, next, handle } => {
                if let Some(handle) = handle {
                    handle.cancel();
                }
                tracing::info!(%prev, %next, "phase ended");
                self.shared
                    .events
                    .emit(TimerEvent::Tick { milliseconds_left: 0 });
                self.shared.events.emit(TimerEvent::PhaseEnded { prev, next });
            }
        }
    }
}

fn diagnose(err: TimerError) -> TimerError {
    tracing::warn!(error = %err, "ignored timer call");
    err
}

impl fmt::Debug for PomodoroTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PomodoroTimer")
            .field("snapshot", &self.snapshot())
            .field("cadence", &self.shared.cadence)
            .finish()
    }
}

impl fmt::Debug for WeakTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakTimer")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}
