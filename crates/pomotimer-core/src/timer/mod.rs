mod config;
mod engine;

pub use config::{PomodoroConfig, PomodoroPhase};
pub use engine::{PomodoroTimer, TimerOptions, TimerSnapshot, WeakTimer, DEFAULT_CADENCE};
