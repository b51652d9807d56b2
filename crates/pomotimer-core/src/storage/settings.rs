//! TOML-based application settings.
//!
//! Stores the pomodoro durations, the phase a fresh timer sits on, and
//! display preferences. Lives at `<config dir>/pomotimer/settings.toml`.
//!
//! The file carries a schema version. A file written by an older schema, or
//! one that does not parse or validate, is reported and replaced by
//! defaults rather than migrated or repaired.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::config_dir;
use crate::error::{ConfigError, CoreError, RegistryError};
use crate::form::{FieldDefinition, FieldType, FieldValue, FormRegistry};
use crate::timer::{PomodoroConfig, PomodoroPhase, TimerOptions};

pub const CURRENT_SETTINGS_VERSION: u32 = 1;

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub initial_phase: PomodoroPhase,
    #[serde(default)]
    pub show_milliseconds: bool,
    #[serde(default)]
    pub pomodoro: PomodoroConfig,
}

fn current_version() -> u32 {
    CURRENT_SETTINGS_VERSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_SETTINGS_VERSION,
            initial_phase: PomodoroPhase::Focus,
            show_milliseconds: false,
            pomodoro: PomodoroConfig::default(),
        }
    }
}

impl Settings {
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(config_dir()?.join(SETTINGS_FILE))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Read settings from `path`.
    ///
    /// A missing, malformed, invalid or outdated file yields defaults; all
    /// but the missing file are logged at error level.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but cannot be read.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };

        let settings: Settings = match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                let err = ConfigError::ParseFailed(e.to_string());
                tracing::error!(path = %path.display(), error = %err, "unreadable settings, using defaults");
                return Ok(Self::default());
            }
        };
        if settings.version < CURRENT_SETTINGS_VERSION {
            tracing::error!(
                path = %path.display(),
                stored = settings.version,
                current = CURRENT_SETTINGS_VERSION,
                "stored settings version is outdated, ignoring it"
            );
            return Ok(Self::default());
        }
        if let Err(err) = settings.pomodoro.validate() {
            tracing::error!(path = %path.display(), error = %err, "invalid settings, using defaults");
            return Ok(Self::default());
        }
        Ok(settings)
    }

    /// Write settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn timer_options(&self) -> TimerOptions {
        TimerOptions {
            initial_phase: self.initial_phase,
            ..TimerOptions::default()
        }
    }

    /// The editable fields, keyed the way `get`/`set` expect.
    pub fn form() -> Result<FormRegistry, RegistryError> {
        let mut form = FormRegistry::new();
        form.register(FieldDefinition::new("pomodoro.focus_minutes", FieldType::Number))?;
        form.register(FieldDefinition::new("pomodoro.short_break_minutes", FieldType::Number))?;
        form.register(FieldDefinition::new("pomodoro.short_breaks_count", FieldType::Number))?;
        form.register(FieldDefinition::new("pomodoro.long_break_minutes", FieldType::Number))?;
        form.register(FieldDefinition::new("initial_phase", FieldType::String))?;
        form.register(FieldDefinition::new("show_milliseconds", FieldType::Boolean))?;
        Ok(form)
    }

    /// Get a value as a string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut current = serde_json::to_value(self).ok()?;
        for part in key.split('.') {
            current = current.get(part)?.clone();
        }
        match current {
            serde_json::Value::String(s) => Some(s),
            // Whole minutes print as `25`, not `25.0`.
            serde_json::Value::Number(n) => {
                Some(n.as_f64().map_or_else(|| n.to_string(), |f| f.to_string()))
            }
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a value by key. The value is parsed with the field type `form`
    /// declares for it, and the result must still be a valid config.
    ///
    /// On error nothing changes.
    pub fn set(&mut self, form: &FormRegistry, key: &str, raw: &str) -> Result<(), CoreError> {
        let value = form.parse_value(key, raw)?;
        let mut next = self.clone();
        match (key, value) {
            ("pomodoro.focus_minutes", FieldValue::Number(n)) => {
                next.pomodoro.focus_minutes = n;
            }
            ("pomodoro.short_break_minutes", FieldValue::Number(n)) => {
                next.pomodoro.short_break_minutes = n;
            }
            ("pomodoro.short_breaks_count", FieldValue::Number(n)) => {
                next.pomodoro.short_breaks_count = whole_number(key, n)?;
            }
            ("pomodoro.long_break_minutes", FieldValue::Number(n)) => {
                next.pomodoro.long_break_minutes = n;
            }
            ("initial_phase", FieldValue::String(s)) => {
                next.initial_phase = s.parse()?;
            }
            ("show_milliseconds", FieldValue::Boolean(b)) => {
                next.show_milliseconds = b;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string()).into()),
        }
        next.pomodoro.validate()?;
        *self = next;
        Ok(())
    }
}

fn whole_number(key: &str, n: f64) -> Result<u32, ConfigError> {
    if n.fract() != 0.0 || n < 0.0 || n > f64::from(u32::MAX) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a whole non-negative number, got {n}"),
        });
    }
    Ok(n as u32)
}
