use std::fmt;

use serde::{Deserialize, Serialize};

use crate::emitter::Event;
use crate::timer::PomodoroPhase;

/// Every observable state change of a [`crate::PomodoroTimer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    Started {
        phase: PomodoroPhase,
    },
    Paused {
        milliseconds_left: u64,
    },
    Resumed {
        milliseconds_left: u64,
    },
    Tick {
        milliseconds_left: u64,
    },
    /// The phase ran out. The timer stays on `prev`, stopped, until
    /// someone calls `start(next)`.
    ///
    /// Always preceded by a final `Tick { milliseconds_left: 0 }`, sent
    /// after the clock is already stopped, so a handler that calls `start`
    /// here sees no further tick from the finished phase.
    PhaseEnded {
        prev: PomodoroPhase,
        next: PomodoroPhase,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerEventKind {
    Started,
    Paused,
    Resumed,
    Tick,
    PhaseEnded,
}

impl TimerEventKind {
    pub const ALL: [TimerEventKind; 5] = [
        Self::Started,
        Self::Paused,
        Self::Resumed,
        Self::Tick,
        Self::PhaseEnded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Resumed => "resumed",
            Self::Tick => "tick",
            Self::PhaseEnded => "phaseEnded",
        }
    }
}

impl fmt::Display for TimerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event for TimerEvent {
    type Kind = TimerEventKind;

    fn kind(&self) -> TimerEventKind {
        match self {
            Self::Started { .. } => TimerEventKind::Started,
            Self::Paused { .. } => TimerEventKind::Paused,
            Self::Resumed { .. } => TimerEventKind::Resumed,
            Self::Tick { .. } => TimerEventKind::Tick,
            Self::PhaseEnded { .. } => TimerEventKind::PhaseEnded,
        }
    }
}
