use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::duration::MINUTES;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PomodoroPhase {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
}

impl PomodoroPhase {
    pub const ALL: [PomodoroPhase; 3] = [Self::Focus, Self::ShortBreak, Self::LongBreak];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::ShortBreak => "shortBreak",
            Self::LongBreak => "longBreak",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Focus => "Focus",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for PomodoroPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PomodoroPhase {
    type Err = ConfigError;

    /// Accepts `focus`, `shortBreak`, `short-break`, `short_break`, `short`
    /// and the same spellings for the long break, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "focus" => Ok(Self::Focus),
            "shortbreak" | "short" => Ok(Self::ShortBreak),
            "longbreak" | "long" => Ok(Self::LongBreak),
            _ => Err(ConfigError::InvalidValue {
                key: "phase".into(),
                message: format!("unknown phase '{s}'"),
            }),
        }
    }
}

/// Phase durations and the short-break budget between long breaks.
///
/// Durations are minutes and may be fractional (`0.5` is thirty seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PomodoroConfig {
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: f64,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: f64,
    /// Short breaks taken before the next break becomes a long one.
    #[serde(default = "default_short_breaks_count")]
    pub short_breaks_count: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: f64,
}

fn default_focus_minutes() -> f64 {
    25.0
}
fn default_short_break_minutes() -> f64 {
    5.0
}
fn default_short_breaks_count() -> u32 {
    3
}
fn default_long_break_minutes() -> f64 {
    15.0
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            short_break_minutes: default_short_break_minutes(),
            short_breaks_count: default_short_breaks_count(),
            long_break_minutes: default_long_break_minutes(),
        }
    }
}

impl PomodoroConfig {
    pub fn phase_minutes(&self, phase: PomodoroPhase) -> f64 {
        match phase {
            PomodoroPhase::Focus => self.focus_minutes,
            PomodoroPhase::ShortBreak => self.short_break_minutes,
            PomodoroPhase::LongBreak => self.long_break_minutes,
        }
    }

    /// Rounded to the nearest millisecond.
    pub fn phase_milliseconds(&self, phase: PomodoroPhase) -> u64 {
        (self.phase_minutes(phase) * MINUTES as f64).round() as u64
    }

    /// Every phase must last a finite, positive number of minutes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("focus_minutes", self.focus_minutes),
            ("short_break_minutes", self.short_break_minutes),
            ("long_break_minutes", self.long_break_minutes),
        ];
        for (key, minutes) in durations {
            if !minutes.is_finite() || minutes <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be a positive number of minutes".into(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_parses_common_spellings() {
        assert_eq!("focus".parse::<PomodoroPhase>().unwrap(), PomodoroPhase::Focus);
        assert_eq!("shortBreak".parse::<PomodoroPhase>().unwrap(), PomodoroPhase::ShortBreak);
        assert_eq!("short-break".parse::<PomodoroPhase>().unwrap(), PomodoroPhase::ShortBreak);
        assert_eq!("LONG_BREAK".parse::<PomodoroPhase>().unwrap(), PomodoroPhase::LongBreak);
        assert!("nap".parse::<PomodoroPhase>().is_err());
    }

    #[test]
    fn phase_serializes_camel_case() {
        let json = serde_json::to_string(&PomodoroPhase::ShortBreak).unwrap();
        assert_eq!(json, "\"shortBreak\"");
        for phase in PomodoroPhase::ALL {
            assert_eq!(phase.as_str().parse::<PomodoroPhase>().unwrap(), phase);
        }
    }

    #[test]
    fn zero_minute_phase_is_rejected() {
        let cfg = PomodoroConfig {
            short_break_minutes: 0.0,
            ..PomodoroConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "short_break_minutes"
        ));
    }

    #[test]
    fn negative_and_non_finite_minutes_are_rejected() {
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let cfg = PomodoroConfig {
                long_break_minutes: bad,
                ..PomodoroConfig::default()
            };
            assert!(cfg.validate().is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn fractional_minutes_are_allowed() {
        let cfg = PomodoroConfig {
            short_break_minutes: 0.5,
            focus_minutes: 1.0 / 3.0,
            ..PomodoroConfig::default()
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.phase_milliseconds(PomodoroPhase::ShortBreak), 30_000);
        assert_eq!(cfg.phase_milliseconds(PomodoroPhase::Focus), 20_000);
    }

    #[test]
    fn zero_short_breaks_is_allowed() {
        let cfg = PomodoroConfig {
            short_breaks_count: 0,
            ..PomodoroConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn phase_milliseconds_multiplies_minutes() {
        let cfg = PomodoroConfig::default();
        assert_eq!(cfg.phase_milliseconds(PomodoroPhase::Focus), 25 * 60_000);
        assert_eq!(cfg.phase_milliseconds(PomodoroPhase::ShortBreak), 5 * 60_000);
        assert_eq!(cfg.phase_milliseconds(PomodoroPhase::LongBreak), 15 * 60_000);
    }
}
