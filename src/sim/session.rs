/// GameSession: the complete state of one play session.
///
/// ## Lifecycle
///   - `level` / `score` persist across levels; only a fresh session resets them.
///   - `maze` / `player_position` / `player_path` are cleared at the start of
///     every level attempt.
///   - `attempt` increases on every start or restart. Provider results and
///     timers carry the attempt they belong to; `step` drops any whose
///     attempt is not the current one.
///
/// The session is only mutated by `sim::step::step`. Readers (the renderer)
/// may look at it at any time between steps.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::TimingConfig;
use crate::domain::cell::Position;
use crate::domain::maze::ParsedMaze;
use crate::sim::view::{self, ColoredCell};

/// Tag for one level-start request.
pub type AttemptId = u64;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum GamePhase {
    Idle,
    Generating,
    Observation,
    Movement,
    Failed,
    Completed,
}

impl GamePhase {
    /// Move intents are only honored while the player is retracing.
    pub fn accepts_moves(self) -> bool {
        match self {
            GamePhase::Movement => true,
            GamePhase::Idle
            | GamePhase::Generating
            | GamePhase::Observation
            | GamePhase::Failed
            | GamePhase::Completed => false,
        }
    }

    /// Entry points into `Generating` for a new (or next) level.
    pub fn can_start(self) -> bool {
        match self {
            GamePhase::Idle | GamePhase::Completed => true,
            GamePhase::Generating
            | GamePhase::Observation
            | GamePhase::Movement
            | GamePhase::Failed => false,
        }
    }

    /// Phases in which the current level may be thrown away and regenerated.
    pub fn can_restart(self) -> bool {
        match self {
            GamePhase::Generating
            | GamePhase::Observation
            | GamePhase::Movement
            | GamePhase::Failed => true,
            GamePhase::Idle | GamePhase::Completed => false,
        }
    }

    /// Is the path hidden (dimmed) from the player?
    pub fn hides_path(self) -> bool {
        match self {
            GamePhase::Movement | GamePhase::Failed => true,
            GamePhase::Idle
            | GamePhase::Generating
            | GamePhase::Observation
            | GamePhase::Completed => false,
        }
    }

    pub fn status_line(self) -> &'static str {
        match self {
            GamePhase::Idle => "Press Start to enter the maze.",
            GamePhase::Generating => "Generating neurospace...",
            GamePhase::Observation => "Memorize the sequence...",
            GamePhase::Movement => "Your turn. Recreate the path.",
            GamePhase::Failed => "Path incorrect. Resetting...",
            GamePhase::Completed => "Memory restored! Well done.",
        }
    }
}

/// Dwell durations for the two timed phases.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PhaseTiming {
    pub observation: Duration,
    pub fail_reset: Duration,
}

impl Default for PhaseTiming {
    fn default() -> Self {
        PhaseTiming {
            observation: Duration::from_millis(3000),
            fail_reset: Duration::from_millis(1500),
        }
    }
}

impl From<&TimingConfig> for PhaseTiming {
    fn from(cfg: &TimingConfig) -> Self {
        PhaseTiming {
            observation: Duration::from_millis(cfg.observation_ms),
            fail_reset: Duration::from_millis(cfg.fail_reset_ms),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameSession {
    pub level: u32,
    pub score: u32,
    pub phase: GamePhase,
    pub maze: Option<ParsedMaze>,
    pub player_position: Option<Position>,
    pub player_path: Vec<Position>,
    pub is_wrong_move: bool,

    // ── Attempt tracking ──
    pub attempt: AttemptId,
    /// Level requested by the current attempt. Committed to `level` only
    /// once its maze arrives.
    pub pending_level: u32,

    pub timing: PhaseTiming,
}

impl GameSession {
    pub fn new(timing: PhaseTiming) -> Self {
        GameSession {
            level: 1,
            score: 0,
            phase: GamePhase::Idle,
            maze: None,
            player_position: None,
            player_path: vec![],
            is_wrong_move: false,
            attempt: 0,
            pending_level: 1,
            timing,
        }
    }

    /// Level the "start" control should request from the current phase.
    pub fn next_level(&self) -> u32 {
        match self.phase {
            GamePhase::Completed => self.level.saturating_add(1),
            _ => self.level,
        }
    }

    /// Last confirmed position on the path, where relative moves start from.
    pub fn path_head(&self) -> Option<Position> {
        self.player_path.last().copied()
    }

    pub fn is_on_path(&self, pos: Position) -> bool {
        self.player_path.contains(&pos)
    }

    /// Per-cell display colors for the current maze and phase.
    /// Recomputed on every call. The camouflage noise is seeded from
    /// `noise_seed`, so frames of an unchanged session look the same.
    pub fn colored_grid(&self) -> Vec<Vec<ColoredCell<'_>>> {
        let mut rng = StdRng::seed_from_u64(self.noise_seed());
        view::colored_grid(self.maze.as_ref(), self.phase, self.level, &mut rng)
    }

    /// Changes whenever the maze, phase or level does.
    fn noise_seed(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        (self.attempt, self.phase, self.level).hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for GameSession {
    fn default() -> Self {
        GameSession::new(PhaseTiming::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_idle_at_level_one() {
        let s = GameSession::default();
        assert_eq!(s.phase, GamePhase::Idle);
        assert_eq!(s.level, 1);
        assert_eq!(s.score, 0);
        assert!(s.player_path.is_empty());
        assert_eq!(s.next_level(), 1);
    }

    #[test]
    fn completed_session_offers_next_level() {
        let mut s = GameSession::default();
        s.level = 4;
        s.phase = GamePhase::Completed;
        assert_eq!(s.next_level(), 5);

        s.level = u32::MAX;
        assert_eq!(s.next_level(), u32::MAX);
    }

    #[test]
    fn only_movement_accepts_moves() {
        use GamePhase::*;
        for p in [Idle, Generating, Observation, Failed, Completed] {
            assert!(!p.accepts_moves(), "{p:?}");
        }
        assert!(Movement.accepts_moves());
    }

    #[test]
    fn start_and_restart_partition_phases() {
        use GamePhase::*;
        for p in [Idle, Generating, Observation, Movement, Failed, Completed] {
            assert_ne!(p.can_start(), p.can_restart(), "{p:?}");
        }
    }

    #[test]
    fn colors_hold_still_until_the_state_changes() {
        let mut s = GameSession::default();
        s.level = 7;
        s.attempt = 3;
        s.phase = GamePhase::Movement;
        s.maze = Some(crate::domain::maze::parse("#####\n#S1E#\n#   #\n#####"));

        let colors = |s: &GameSession| -> Vec<_> {
            s.colored_grid().iter().flatten().map(|c| c.color).collect()
        };
        let first = colors(&s);
        assert_ne!(s.colored_grid()[2][1].color, crate::domain::color::MUTED_FLOOR);
        assert_eq!(first, colors(&s));
        assert_eq!(first, colors(&s.clone()));
    }

    #[test]
    fn timing_from_config() {
        let cfg = TimingConfig {
            tick_rate_ms: 50,
            observation_ms: 1200,
            fail_reset_ms: 300,
            generation_timeout_ms: 5000,
        };
        let t = PhaseTiming::from(&cfg);
        assert_eq!(t.observation, Duration::from_millis(1200));
        assert_eq!(t.fail_reset, Duration::from_millis(300));
    }
}
