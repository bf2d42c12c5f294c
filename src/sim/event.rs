/// Events in, effects out.
///
/// `SessionEvent`s are everything that can drive the session: player intents
/// and the results of work the session asked for earlier. `Effect`s are the
/// work itself, carried out by `sim::runtime` (or inspected directly in tests).

use std::fmt;
use std::time::Duration;

use crate::domain::cell::Position;
use crate::sim::level::GenerationParams;
use crate::sim::session::AttemptId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimerKind {
    /// End of the reveal window.
    Observation,
    /// Return to the start after a wrong step.
    FailReset,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// Begin `level` from Idle or Completed.
    Start { level: u32 },
    /// Throw away the current attempt and regenerate the same level.
    Restart,
    MazeGenerated { attempt: AttemptId, maze_data: String },
    GenerationFailed { attempt: AttemptId, reason: String },
    TimerFired { attempt: AttemptId, timer: TimerKind },
    Move(Position),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Abort every in-flight provider call and timer.
    CancelPending,
    RequestMaze { attempt: AttemptId, params: GenerationParams },
    Schedule { attempt: AttemptId, timer: TimerKind, after: Duration },
    Notify(Notice),
}

/// Transient, player-facing messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    GenerationFailed { reason: String },
    WrongStep,
    LevelComplete { level: u32, awarded: u32 },
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::GenerationFailed { .. } => "Error",
            Notice::WrongStep => "Wrong Step!",
            Notice::LevelComplete { .. } => "Level Complete",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::GenerationFailed { .. } | Notice::WrongStep)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::GenerationFailed { .. } => {
                write!(f, "Could not generate the next level. Please try again.")
            }
            Notice::WrongStep => write!(f, "The memory fades... returning to the start."),
            Notice::LevelComplete { level, awarded } => {
                write!(f, "Level {level} cleared: +{awarded}")
            }
        }
    }
}
