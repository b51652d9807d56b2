//! Millisecond count → clock components.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const HOURS: u64 = 1000 * 60 * 60;
pub const MINUTES: u64 = 1000 * 60;
pub const SECONDS: u64 = 1000;

/// A millisecond count split into hours, minutes, seconds and milliseconds.
///
/// Every component is the remainder left after the larger units are taken
/// out. `hours` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTimer {
    pub total_milliseconds: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub milliseconds: u64,
}

pub fn parse_timer(total_ms: u64) -> ParsedTimer {
    let hours = total_ms / HOURS;
    let rest = total_ms % HOURS;
    let minutes = rest / MINUTES;
    let rest = rest % MINUTES;
    let seconds = rest / SECONDS;
    let milliseconds = rest % SECONDS;
    ParsedTimer {
        total_milliseconds: total_ms,
        hours,
        minutes,
        seconds,
        milliseconds,
    }
}

impl ParsedTimer {
    /// `MM:SS`, or `H:MM:SS` once there is at least one hour.
    /// `show_milliseconds` appends `.mmm`.
    pub fn format(&self, show_milliseconds: bool) -> String {
        let mut out = if self.hours > 0 {
            format!("{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
        } else {
            format!("{:02}:{:02}", self.minutes, self.seconds)
        };
        if show_milliseconds {
            out.push_str(&format!(".{:03}", self.milliseconds));
        }
        out
    }
}

impl fmt::Display for ParsedTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}
