//! Core error types for pomotimer-core.
//!
//! Two tiers exist. Usage errors (`TimerError`, `EmitterError`) are returned
//! from calls that turned into no-ops and are also logged as diagnostics;
//! the object stays usable. Structural errors (`RegistryError`,
//! `ConfigError`) halt whatever operation hit them.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::PomodoroPhase;

/// Core error type for pomotimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    #[error("Event emitter error: {0}")]
    Emitter(#[from] EmitterError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Form registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Misuse of the timer. The call was a no-op.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer is not running, nothing to pause")]
    NotRunning,

    #[error("timer is already running")]
    AlreadyRunning,

    /// Elapsed time is zero: there is no paused phase. Use `start()`.
    #[error("nothing to resume in phase {phase}, use start() instead")]
    NothingToResume { phase: PomodoroPhase },

    /// Elapsed time already covers the whole phase. Use `start()`.
    #[error("phase {phase} already completed ({passed_ms} ms of {duration_ms} ms), use start() instead")]
    PhaseAlreadyCompleted {
        phase: PomodoroPhase,
        passed_ms: u64,
        duration_ms: u64,
    },

    #[error("rejected configuration update: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Misuse of an event emitter. The call was a no-op.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitterError {
    #[error("no listener found for event \"{kind}\" with id {id}")]
    UnknownSubscription { kind: String, id: u64 },
}

/// Configuration-specific errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// Form registry errors. These point at a programming mistake in the
/// integrating code and are not meant to be recovered from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Field with name \"{0}\" is already registered")]
    DuplicateField(String),

    #[error("No field registered with name \"{0}\"")]
    UnknownField(String),

    #[error("Cannot parse '{raw}' as {expected} for field \"{name}\"")]
    InvalidValue {
        name: String,
        expected: &'static str,
        raw: String,
    },

    #[error("Form is disabled")]
    Disabled,
}
