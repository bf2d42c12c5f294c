/// The step function: applies one event to the session.
///
/// Transitions:
///   Idle | Completed          --Start-->          Generating
///   Generating..Failed        --Restart-->        Generating
///   Generating                --MazeGenerated-->  Observation
///   Generating                --GenerationFailed--> Idle
///   Observation               --timer-->          Movement
///   Movement                  --Move(match)-->    Movement | Completed
///   Movement                  --Move(mismatch)--> Failed
///   Failed                    --timer-->          Movement
///
/// Anything else is a no-op. Results and timers whose attempt is not the
/// current one are dropped here; this is the only place that check lives.

use log::debug;

use crate::domain::cell::Position;
use crate::domain::maze;
use super::event::{Effect, Notice, SessionEvent, TimerKind};
use super::level::GenerationParams;
use super::session::{AttemptId, GamePhase, GameSession};

/// Points per completed level, multiplied by the level number.
const POINTS_PER_LEVEL: u32 = 10;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(session: &mut GameSession, event: SessionEvent) -> Vec<Effect> {
    let mut effects = Vec::new();

    match event {
        SessionEvent::Start { level } => {
            if session.phase.can_start() {
                begin_attempt(session, level.max(1), &mut effects);
            }
        }
        SessionEvent::Restart => {
            if session.phase.can_restart() {
                let level = session.pending_level;
                begin_attempt(session, level, &mut effects);
            }
        }
        SessionEvent::MazeGenerated { attempt, maze_data } => {
            if is_current(session, attempt, GamePhase::Generating) {
                resolve_maze(session, &maze_data, &mut effects);
            }
        }
        SessionEvent::GenerationFailed { attempt, reason } => {
            if is_current(session, attempt, GamePhase::Generating) {
                resolve_generation_failure(session, reason, &mut effects);
            }
        }
        SessionEvent::TimerFired { attempt, timer } => match timer {
            TimerKind::Observation => {
                if is_current(session, attempt, GamePhase::Observation) {
                    transition(session, GamePhase::Movement);
                }
            }
            TimerKind::FailReset => {
                if is_current(session, attempt, GamePhase::Failed) {
                    resolve_fail_reset(session);
                }
            }
        },
        SessionEvent::Move(pos) => resolve_move(session, pos, &mut effects),
    }

    effects
}

// ══════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════

fn transition(session: &mut GameSession, to: GamePhase) {
    debug!("attempt {}: {:?} -> {:?}", session.attempt, session.phase, to);
    session.phase = to;
}

/// Does an attempt-tagged event still apply?
fn is_current(session: &GameSession, attempt: AttemptId, expected: GamePhase) -> bool {
    if attempt != session.attempt {
        debug!("dropping result of stale attempt {attempt} (current {})", session.attempt);
        return false;
    }
    if session.phase != expected {
        debug!("dropping {:?}-phase result while {:?}", expected, session.phase);
        return false;
    }
    true
}

fn reset_to_start(session: &mut GameSession) {
    match session.maze.as_ref().map(|m| m.start_pos) {
        Some(start) => {
            session.player_position = Some(start);
            session.player_path = vec![start];
        }
        None => {
            session.player_position = None;
            session.player_path.clear();
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Level attempts
// ══════════════════════════════════════════════════════════════

fn begin_attempt(session: &mut GameSession, level: u32, effects: &mut Vec<Effect>) {
    session.attempt += 1;
    session.pending_level = level;
    session.maze = None;
    session.player_position = None;
    session.player_path.clear();
    session.is_wrong_move = false;
    transition(session, GamePhase::Generating);

    effects.push(Effect::CancelPending);
    effects.push(Effect::RequestMaze {
        attempt: session.attempt,
        params: GenerationParams::for_level(level),
    });
}

fn resolve_maze(session: &mut GameSession, maze_data: &str, effects: &mut Vec<Effect>) {
    let parsed = maze::parse(maze_data);
    debug!(
        "maze {}x{}, {} path cells, start {:?}, end {:?}",
        parsed.width(),
        parsed.height(),
        parsed.path_sequence.len(),
        parsed.start_pos,
        parsed.end_pos,
    );

    session.level = session.pending_level;
    session.maze = Some(parsed);
    reset_to_start(session);
    transition(session, GamePhase::Observation);

    effects.push(Effect::Schedule {
        attempt: session.attempt,
        timer: TimerKind::Observation,
        after: session.timing.observation,
    });
}

fn resolve_generation_failure(session: &mut GameSession, reason: String, effects: &mut Vec<Effect>) {
    transition(session, GamePhase::Idle);
    effects.push(Effect::Notify(Notice::GenerationFailed { reason }));
}

fn resolve_fail_reset(session: &mut GameSession) {
    reset_to_start(session);
    session.is_wrong_move = false;
    transition(session, GamePhase::Movement);
}

// ══════════════════════════════════════════════════════════════
// Move validation
// ══════════════════════════════════════════════════════════════

/// Check a move against the path order.
///
/// The next required number is `path_sequence[player_path.len()]`: it is
/// indexed by how long the path history is, not by where the player stands.
/// Once the sequence has no entry at that index, the end cell is the only
/// step that still matches. An empty sequence never matches anything.
fn resolve_move(session: &mut GameSession, pos: Position, effects: &mut Vec<Effect>) {
    if !session.phase.accepts_moves() {
        return;
    }
    let Some(maze) = session.maze.as_ref() else { return };
    let Some(cell) = maze.cell(pos) else { return };
    if cell.is_wall {
        return;
    }

    let expected = maze.path_sequence.get(session.player_path.len()).copied();
    let matched = match expected {
        Some(n) => cell.path_number == Some(n),
        None => cell.is_end && !maze.path_sequence.is_empty(),
    };
    let reached_end = cell.is_end;

    if matched {
        session.player_path.push(pos);
        session.player_position = Some(pos);
        debug!("step {} ok at {:?}", session.player_path.len() - 1, pos);

        if reached_end {
            let awarded = POINTS_PER_LEVEL.saturating_mul(session.level);
            session.score = session.score.saturating_add(awarded);
            transition(session, GamePhase::Completed);
            effects.push(Effect::Notify(Notice::LevelComplete { level: session.level, awarded }));
        }
    } else {
        debug!("wrong step at {:?}: expected {:?}, found {:?}", pos, expected, cell.path_number);
        session.is_wrong_move = true;
        transition(session, GamePhase::Failed);
        effects.push(Effect::Notify(Notice::WrongStep));
        effects.push(Effect::Schedule {
            attempt: session.attempt,
            timer: TimerKind::FailReset,
            after: session.timing.fail_reset,
        });
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::MazeCell;

    const CORRIDOR: &str = "#####\n#S12E#\n#####\nColors:\n1: red\n2: blue";
    const DECOY: &str = "#######\n#S123E#\n#0    #\n#######";

    /// Run Start + MazeGenerated + observation timer for `raw`.
    fn session_in_movement(raw: &str) -> GameSession {
        let mut s = GameSession::default();
        step(&mut s, SessionEvent::Start { level: 1 });
        step(&mut s, SessionEvent::MazeGenerated { attempt: 1, maze_data: raw.into() });
        fire(&mut s, TimerKind::Observation);
        assert_eq!(s.phase, GamePhase::Movement);
        s
    }

    fn mv(s: &mut GameSession, x: i32, y: i32) -> Vec<Effect> {
        step(s, SessionEvent::Move(Position::new(x, y)))
    }

    fn fire(s: &mut GameSession, timer: TimerKind) {
        let attempt = s.attempt;
        step(s, SessionEvent::TimerFired { attempt, timer });
    }

    // ── Start / generation ──

    #[test]
    fn start_requests_maze_with_difficulty() {
        let mut s = GameSession::default();
        let fx = step(&mut s, SessionEvent::Start { level: 3 });
        assert_eq!(s.phase, GamePhase::Generating);
        assert_eq!(s.attempt, 1);
        assert_eq!(fx[0], Effect::CancelPending);
        match &fx[1] {
            Effect::RequestMaze { attempt, params } => {
                assert_eq!(*attempt, 1);
                assert_eq!(params.maze_complexity, 4);
                assert_eq!(params.path_length, 8);
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn start_ignored_mid_level() {
        let mut s = session_in_movement(CORRIDOR);
        let attempt = s.attempt;
        assert!(step(&mut s, SessionEvent::Start { level: 5 }).is_empty());
        assert_eq!(s.attempt, attempt);
        assert_eq!(s.phase, GamePhase::Movement);
    }

    #[test]
    fn maze_arrival_enters_observation() {
        let mut s = GameSession::default();
        step(&mut s, SessionEvent::Start { level: 2 });
        let fx = step(&mut s, SessionEvent::MazeGenerated { attempt: 1, maze_data: CORRIDOR.into() });
        assert_eq!(s.phase, GamePhase::Observation);
        assert_eq!(s.level, 2);
        assert_eq!(s.player_position, Some(Position::new(1, 1)));
        assert_eq!(s.player_path, vec![Position::new(1, 1)]);
        assert_eq!(
            fx,
            vec![Effect::Schedule {
                attempt: 1,
                timer: TimerKind::Observation,
                after: s.timing.observation,
            }]
        );
    }

    #[test]
    fn generation_failure_returns_to_idle_with_counters_intact() {
        let mut s = GameSession::default();
        s.level = 3;
        s.score = 40;
        s.phase = GamePhase::Completed;
        step(&mut s, SessionEvent::Start { level: 4 });
        let fx = step(&mut s, SessionEvent::GenerationFailed { attempt: 1, reason: "offline".into() });
        assert_eq!(s.phase, GamePhase::Idle);
        assert_eq!(s.level, 3);
        assert_eq!(s.score, 40);
        assert!(s.maze.is_none());
        assert!(matches!(fx[0], Effect::Notify(Notice::GenerationFailed { .. })));
    }

    #[test]
    fn stale_results_are_dropped() {
        let mut s = GameSession::default();
        step(&mut s, SessionEvent::Start { level: 1 });
        step(&mut s, SessionEvent::Restart);
        assert_eq!(s.attempt, 2);

        let fx = step(&mut s, SessionEvent::MazeGenerated { attempt: 1, maze_data: CORRIDOR.into() });
        assert!(fx.is_empty());
        assert_eq!(s.phase, GamePhase::Generating);
        assert!(s.maze.is_none());

        step(&mut s, SessionEvent::GenerationFailed { attempt: 1, reason: "late".into() });
        assert_eq!(s.phase, GamePhase::Generating);
    }

    #[test]
    fn stale_observation_timer_is_dropped() {
        let mut s = GameSession::default();
        step(&mut s, SessionEvent::Start { level: 1 });
        step(&mut s, SessionEvent::MazeGenerated { attempt: 1, maze_data: CORRIDOR.into() });
        step(&mut s, SessionEvent::Restart);
        step(&mut s, SessionEvent::MazeGenerated { attempt: 2, maze_data: CORRIDOR.into() });

        step(&mut s, SessionEvent::TimerFired { attempt: 1, timer: TimerKind::Observation });
        assert_eq!(s.phase, GamePhase::Observation);
        fire(&mut s, TimerKind::Observation);
        assert_eq!(s.phase, GamePhase::Movement);
    }

    #[test]
    fn out_of_phase_timer_is_dropped() {
        let mut s = session_in_movement(CORRIDOR);
        fire(&mut s, TimerKind::FailReset);
        fire(&mut s, TimerKind::Observation);
        assert_eq!(s.phase, GamePhase::Movement);
    }

    #[test]
    fn restart_keeps_pending_level() {
        let mut s = GameSession::default();
        s.phase = GamePhase::Completed;
        s.level = 2;
        step(&mut s, SessionEvent::Start { level: 3 });
        step(&mut s, SessionEvent::Restart);
        match step(&mut s, SessionEvent::Restart).pop() {
            Some(Effect::RequestMaze { params, .. }) => assert_eq!(params.level, 3),
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn start_level_is_at_least_one() {
        let mut s = GameSession::default();
        step(&mut s, SessionEvent::Start { level: 0 });
        assert_eq!(s.pending_level, 1);
    }

    // ── Moves ──

    #[test]
    fn move_matches_by_history_length() {
        // History [S] has length 1, so the first required number is sequence[1] = 2.
        let mut s = session_in_movement(CORRIDOR);
        mv(&mut s, 3, 1);
        assert_eq!(s.phase, GamePhase::Movement);
        assert_eq!(s.player_path.len(), 2);
        assert_eq!(s.player_position, Some(Position::new(3, 1)));
    }

    #[test]
    fn move_onto_earlier_number_fails() {
        let mut s = session_in_movement(CORRIDOR);
        let fx = mv(&mut s, 2, 1);
        assert_eq!(s.phase, GamePhase::Failed);
        assert!(s.is_wrong_move);
        assert_eq!(s.player_path.len(), 1);
        assert!(fx.contains(&Effect::Notify(Notice::WrongStep)));
        assert!(fx.iter().any(|e| matches!(
            e,
            Effect::Schedule { timer: TimerKind::FailReset, .. }
        )));
    }

    #[test]
    fn move_onto_unnumbered_cell_fails() {
        let mut s = session_in_movement("#####\n#S12E#\n#. ###");
        mv(&mut s, 1, 2);
        assert_eq!(s.phase, GamePhase::Failed);
    }

    #[test]
    fn numbered_end_cell_completes() {
        let mut s = session_in_movement(CORRIDOR);
        // Make the `2` cell double as the end.
        if let Some(maze) = s.maze.as_mut() {
            maze.grid[1][3].is_end = true;
        }
        let fx = mv(&mut s, 3, 1);
        assert_eq!(s.phase, GamePhase::Completed);
        assert_eq!(s.score, 10);
        assert!(fx.contains(&Effect::Notify(Notice::LevelComplete { level: 1, awarded: 10 })));
    }

    #[test]
    fn end_cell_closes_exhausted_sequence() {
        let mut s = session_in_movement(DECOY);
        for x in 2..=4 {
            mv(&mut s, x, 1);
            assert_eq!(s.phase, GamePhase::Movement, "step onto x={x}");
        }
        mv(&mut s, 5, 1);
        assert_eq!(s.phase, GamePhase::Completed);
        assert_eq!(s.player_path.len(), 5);
    }

    #[test]
    fn end_cell_too_early_fails() {
        let mut s = session_in_movement(DECOY);
        mv(&mut s, 5, 1);
        assert_eq!(s.phase, GamePhase::Failed);
    }

    #[test]
    fn empty_sequence_is_unwinnable() {
        let mut s = session_in_movement("#####\n#S  E#\n#####");
        mv(&mut s, 4, 1);
        assert_eq!(s.phase, GamePhase::Failed);
        assert_eq!(s.score, 0);
    }

    #[test]
    fn walls_and_out_of_bounds_are_ignored() {
        let mut s = session_in_movement(CORRIDOR);
        for (x, y) in [(0, 0), (1, 0), (-1, 1), (9, 1), (2, 7), (-1, -1)] {
            assert!(mv(&mut s, x, y).is_empty());
        }
        assert_eq!(s.phase, GamePhase::Movement);
        assert_eq!(s.player_path, vec![Position::new(1, 1)]);
    }

    #[test]
    fn ragged_rows_bound_moves() {
        let mut s = session_in_movement("#S23E#\n#\n#0####");
        assert!(mv(&mut s, 2, 1).is_empty());
        assert_eq!(s.phase, GamePhase::Movement);
    }

    #[test]
    fn moves_outside_movement_never_mutate_path() {
        let mut s = GameSession::default();
        mv(&mut s, 1, 1);
        assert!(s.player_path.is_empty());

        step(&mut s, SessionEvent::Start { level: 1 });
        step(&mut s, SessionEvent::MazeGenerated { attempt: 1, maze_data: CORRIDOR.into() });
        let before = (s.player_position, s.player_path.clone());
        mv(&mut s, 3, 1);
        assert_eq!(s.phase, GamePhase::Observation);
        assert_eq!((s.player_position, s.player_path.clone()), before);

        fire(&mut s, TimerKind::Observation);
        mv(&mut s, 2, 1);
        assert_eq!(s.phase, GamePhase::Failed);
        let before = (s.player_position, s.player_path.clone());
        mv(&mut s, 3, 1);
        assert_eq!((s.player_position, s.player_path.clone()), before);
    }

    #[test]
    fn fail_reset_returns_to_start() {
        let mut s = session_in_movement(DECOY);
        mv(&mut s, 2, 1);
        mv(&mut s, 3, 1);
        mv(&mut s, 1, 2);
        assert_eq!(s.phase, GamePhase::Failed);

        fire(&mut s, TimerKind::FailReset);
        assert_eq!(s.phase, GamePhase::Movement);
        assert!(!s.is_wrong_move);
        assert_eq!(s.player_path, vec![Position::new(1, 1)]);
        assert_eq!(s.player_position, Some(Position::new(1, 1)));
    }

    #[test]
    fn missing_start_keeps_sentinel_in_history() {
        let mut s = session_in_movement("#0123E#");
        assert_eq!(s.player_path, vec![Position::SENTINEL]);
        mv(&mut s, 2, 0);
        assert_eq!(s.phase, GamePhase::Movement);
    }

    #[test]
    fn score_accumulates_per_level_and_ignores_failures() {
        let mut s = GameSession::default();
        for level in 1..=3 {
            let next = s.next_level();
            step(&mut s, SessionEvent::Start { level: next });
            let attempt = s.attempt;
            step(&mut s, SessionEvent::MazeGenerated { attempt, maze_data: DECOY.into() });
            fire(&mut s, TimerKind::Observation);

            mv(&mut s, 5, 1);
            fire(&mut s, TimerKind::FailReset);

            for x in 2..=5 {
                mv(&mut s, x, 1);
            }
            assert_eq!(s.phase, GamePhase::Completed);
            assert_eq!(s.level, level);
        }
        assert_eq!(s.score, 10 + 20 + 30);
    }

    #[test]
    fn huge_level_score_saturates() {
        let mut s = GameSession::default();
        step(&mut s, SessionEvent::Start { level: 500_000_000 });
        step(&mut s, SessionEvent::MazeGenerated { attempt: 1, maze_data: "#S01E#".into() });
        fire(&mut s, TimerKind::Observation);
        s.score = u32::MAX - 5;

        mv(&mut s, 3, 0);
        let fx = mv(&mut s, 4, 0);
        assert_eq!(s.phase, GamePhase::Completed);
        assert_eq!(s.score, u32::MAX);
        assert!(fx.contains(&Effect::Notify(Notice::LevelComplete {
            level: 500_000_000,
            awarded: u32::MAX,
        })));
    }

    #[test]
    fn duplicate_numbers_match_any_cell() {
        // Two `1` cells: either satisfies the first required number.
        let raw = "#####\n#S1E#\n#01##\n#####";
        let mut s = session_in_movement(raw);
        mv(&mut s, 2, 2);
        assert_eq!(s.phase, GamePhase::Movement);
        mv(&mut s, 2, 1);
        assert_eq!(s.phase, GamePhase::Movement);
        mv(&mut s, 3, 1);
        assert_eq!(s.phase, GamePhase::Completed);
    }

    #[test]
    fn cell_roles_survive_parse() {
        let s = session_in_movement(CORRIDOR);
        let maze = s.maze.as_ref().unwrap();
        let end: &MazeCell = maze.cell(maze.end_pos).unwrap();
        assert!(end.is_end);
        assert_eq!(end.path_number, None);
    }
}
