/// Derived render state: what color each cell shows right now.
///
/// A pure function of (maze, phase, level). Nothing is cached; callers
/// recompute whenever they draw. The rng is only consulted for camouflage
/// noise on floor cells at high levels.

use rand::Rng;

use crate::domain::cell::MazeCell;
use crate::domain::color::{self, HexColor, MUTED_FLOOR, NEUTRAL};
use crate::domain::maze::ParsedMaze;
use super::session::GamePhase;

/// Levels above this camouflage the hidden floor.
const CAMOUFLAGE_LEVEL: u32 = 6;

#[derive(Clone, Copy, Debug)]
pub struct ColoredCell<'a> {
    pub cell: &'a MazeCell,
    pub color: HexColor,
}

/// Undimmed color: legend color for numbered path cells, neutral otherwise.
pub fn base_color(maze: &ParsedMaze, cell: &MazeCell) -> HexColor {
    match cell.path_number {
        Some(n) if cell.is_path => color::name_to_hex(maze.color_name(n).unwrap_or(""), n),
        _ => NEUTRAL,
    }
}

pub fn display_color<R: Rng + ?Sized>(
    maze: &ParsedMaze,
    cell: &MazeCell,
    phase: GamePhase,
    level: u32,
    rng: &mut R,
) -> HexColor {
    let base = base_color(maze, cell);
    if !phase.hides_path() {
        return base;
    }

    if cell.is_path {
        color::dim_color(base)
    } else if level > CAMOUFLAGE_LEVEL && !cell.is_wall {
        color::noise_color(color::dim_color(base), rng)
    } else {
        MUTED_FLOOR
    }
}

pub fn colored_grid<'a, R: Rng + ?Sized>(
    maze: Option<&'a ParsedMaze>,
    phase: GamePhase,
    level: u32,
    rng: &mut R,
) -> Vec<Vec<ColoredCell<'a>>> {
    let Some(maze) = maze else { return vec![] };
    maze.grid
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| ColoredCell {
                    cell,
                    color: display_color(maze, cell, phase, level, rng),
                })
                .collect()
        })
        .collect()
}
