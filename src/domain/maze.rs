/// Maze description parser.
///
/// ## Format
///   ```
///   #######
///   #S1234#
///   #     #
///   #567E #
///   #######
///   Colors:
///   1: Electric Indigo
///   2: Luminous Vivid Violet
///   ```
///
/// Everything before the first `Colors:` marker is layout, one cell per
/// character (see `MazeCell::from_char`). Legend lines are `<int>: <name>`.
///
/// `parse` is total: it never fails, whatever the input. Missing pieces fall
/// back to empty collections and `Position::SENTINEL`. Rows keep their own
/// length, so the grid may be ragged; index it through `cell()`.

use std::collections::BTreeMap;

use super::cell::{MazeCell, Position};

const LEGEND_MARKER: &str = "Colors:";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedMaze {
    pub grid: Vec<Vec<MazeCell>>,
    /// Path numbers, ascending; one entry per numbered cell.
    pub path_sequence: Vec<u32>,
    pub colors: BTreeMap<u32, String>,
    pub start_pos: Position,
    pub end_pos: Position,
}

impl ParsedMaze {
    pub fn height(&self) -> usize {
        self.grid.len()
    }

    /// Length of the longest row.
    pub fn width(&self) -> usize {
        self.grid.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Bounds-checked lookup; `None` off the grid, past a short row, or for
    /// the sentinel.
    pub fn cell(&self, pos: Position) -> Option<&MazeCell> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        self.grid.get(pos.y as usize)?.get(pos.x as usize)
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        self.cell(pos).is_some()
    }

    /// Legend name for a path number, if the legend had one.
    pub fn color_name(&self, number: u32) -> Option<&str> {
        self.colors.get(&number).map(String::as_str)
    }
}

pub fn parse(raw: &str) -> ParsedMaze {
    let mut sections = raw.split(LEGEND_MARKER);
    let layout = sections.next().unwrap_or("");
    let legend = sections.next();

    let mut start_pos = Position::SENTINEL;
    let mut end_pos = Position::SENTINEL;
    let mut numbered: Vec<u32> = Vec::new();

    let grid: Vec<Vec<MazeCell>> = layout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(y, line)| {
            line.chars()
                .enumerate()
                .map(|(x, ch)| {
                    let cell = MazeCell::from_char(ch, x, y);
                    if cell.is_start && start_pos.is_sentinel() {
                        start_pos = cell.position();
                    }
                    if cell.is_end && end_pos.is_sentinel() {
                        end_pos = cell.position();
                    }
                    if let Some(n) = cell.path_number {
                        numbered.push(n);
                    }
                    cell
                })
                .collect()
        })
        .collect();

    // Stable: equal numbers keep row-major order.
    numbered.sort();

    ParsedMaze {
        grid,
        path_sequence: numbered,
        colors: legend.map(parse_legend).unwrap_or_default(),
        start_pos,
        end_pos,
    }
}

fn parse_legend(section: &str) -> BTreeMap<u32, String> {
    let mut colors = BTreeMap::new();
    for line in section.lines() {
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() != 2 {
            continue;
        }
        if let Ok(n) = parts[0].trim().parse::<u32>() {
            colors.insert(n, parts[1].trim().to_string());
        }
    }
    colors
}
