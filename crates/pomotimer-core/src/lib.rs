//! # Pomotimer Core Library
//!
//! Business logic for the Pomotimer pomodoro timer. The CLI binary is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: a phase state machine (focus, short break, long break) that
//!   measures elapsed time as wall-clock deltas on a fixed cadence and
//!   broadcasts lifecycle events
//! - **Emitter**: typed, synchronous publish/subscribe used for those events
//! - **Clock**: injected time source and repeating scheduler, with tokio and
//!   simulated implementations
//! - **Storage**: versioned TOML settings
//!
//! ## Key Components
//!
//! - [`PomodoroTimer`]: core timer state machine
//! - [`EventEmitter`]: event dispatch
//! - [`SimulatedClock`] / [`TokioClock`]: drivers
//! - [`Settings`]: application configuration management
//! - [`parse_timer`]: millisecond decomposition for display
//!
//! Everything here is single-threaded (`Rc`/`RefCell`); run the tokio driver
//! on a `LocalSet`.

pub mod clock;
pub mod duration;
pub mod emitter;
pub mod error;
pub mod events;
pub mod form;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ClockHandle, Driver, Scheduler, SimulatedClock, TokioClock};
pub use duration::{parse_timer, ParsedTimer};
pub use emitter::{Event, EventEmitter, SubscriptionId};
pub use error::{ConfigError, CoreError, EmitterError, RegistryError, TimerError};
pub use events::{TimerEvent, TimerEventKind};
pub use form::{FieldDefinition, FieldType, FieldValue, FormRegistry};
pub use storage::{Settings, CURRENT_SETTINGS_VERSION};
pub use timer::{
    PomodoroConfig, PomodoroPhase, PomodoroTimer, TimerOptions, TimerSnapshot, WeakTimer,
};
