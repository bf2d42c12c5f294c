/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame into the `front` buffer
///   2. Compare each cell with the `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. Batch everything with `queue!` and flush once at the end
///   5. Swap front/back
///
/// Each maze cell is two terminal columns wide; its background is the
/// cell's current display color from `GameSession::colored_grid`.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use crate::domain::color::HexColor;
use crate::sim::event::Notice;
use crate::sim::session::{GamePhase, GameSession};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for every cell outside the maze. Using the same
    /// RGB for `Clear` and for cells keeps VTE terminals from showing gaps
    /// between rows.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, Cell::BASE_BG));
        }
    }

    fn put_centered(&mut self, y: usize, s: &str, fg: Color) {
        let len = s.chars().count();
        self.put_str(self.width.saturating_sub(len) / 2, y, s, fg);
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Frame composition ──

/// Terminal columns per maze cell.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const NOTICE_ROW: usize = 1;
const MAP_ROW: usize = 3;

const TITLE_FG: Color = Color::Rgb { r: 140, g: 200, b: 255 };
const DIM_FG: Color = Color::Rgb { r: 120, g: 120, b: 140 };
const ERROR_FG: Color = Color::Rgb { r: 255, g: 90, b: 90 };
const OK_FG: Color = Color::Rgb { r: 110, g: 230, b: 140 };

/// Per-frame extras that are not part of the session.
pub struct Overlay<'a> {
    pub notice: Option<&'a Notice>,
    pub source: &'a str,
    /// Frame counter, drives the wrong-step shake.
    pub tick: u32,
}

fn term_color(c: HexColor) -> Color {
    Color::Rgb { r: c.r, g: c.g, b: c.b }
}

/// Black or white, whichever reads better on `bg`.
fn contrast_fg(bg: HexColor) -> Color {
    let luma = 299 * bg.r as u32 + 587 * bg.g as u32 + 114 * bg.b as u32;
    if luma > 150_000 { Color::Black } else { Color::White }
}

fn compose_frame(buf: &mut FrameBuffer, session: &GameSession, overlay: &Overlay<'_>) {
    buf.clear();
    compose_hud(buf, session, overlay);

    if session.maze.is_some() {
        compose_maze(buf, session, overlay);
    } else {
        compose_lobby(buf, session);
    }

    let help = match session.phase {
        GamePhase::Idle => "[Enter] Start   [Q] Quit",
        GamePhase::Completed => "[Enter] Next level   [Q] Quit",
        GamePhase::Generating | GamePhase::Observation => "[R] Restart level   [Q] Quit",
        GamePhase::Movement | GamePhase::Failed => "[Arrows/WASD] Step   [R] Restart level   [Q] Quit",
    };
    buf.put_centered(buf.height.saturating_sub(1), help, DIM_FG);
}

fn compose_hud(buf: &mut FrameBuffer, session: &GameSession, overlay: &Overlay<'_>) {
    buf.put_str(1, HUD_ROW, "CHROMATIC RECALL", TITLE_FG);
    let stats = format!("LEVEL {:>2}   SCORE {:>5}   {}", session.level, session.score, overlay.source);
    buf.put_str(20, HUD_ROW, &stats, Color::White);

    let status = session.phase.status_line();
    let fg = match session.phase {
        GamePhase::Failed => ERROR_FG,
        GamePhase::Completed => OK_FG,
        _ => DIM_FG,
    };
    buf.put_str(1, NOTICE_ROW, status, fg);

    if let Some(notice) = overlay.notice {
        let text = format!("{}: {}", notice.title(), notice);
        let fg = if notice.is_error() { ERROR_FG } else { OK_FG };
        let x = buf.width.saturating_sub(text.chars().count() + 1);
        buf.put_str(x.max(status.len() + 3), NOTICE_ROW, &text, fg);
    }
}

fn compose_lobby(buf: &mut FrameBuffer, session: &GameSession) {
    let mid = MAP_ROW + buf.height.saturating_sub(MAP_ROW + 2) / 2;
    let lines: &[&str] = match session.phase {
        GamePhase::Generating => &["Generating neurospace..."],
        _ => &[
            "Memorize the colored path from S to the goal.",
            "When it fades, retrace it step by step.",
        ],
    };
    for (i, line) in lines.iter().enumerate() {
        buf.put_centered(mid + i, line, Color::White);
    }
}

fn compose_maze(buf: &mut FrameBuffer, session: &GameSession, overlay: &Overlay<'_>) {
    let grid = session.colored_grid();
    let maze_w = grid.iter().map(Vec::len).max().unwrap_or(0) * CELL_W;
    let shake = usize::from(session.is_wrong_move && overlay.tick % 2 == 0);
    let left = buf.width.saturating_sub(maze_w) / 2 + shake;
    let show_trail = matches!(
        session.phase,
        GamePhase::Movement | GamePhase::Failed | GamePhase::Completed
    );

    for (gy, row) in grid.iter().enumerate() {
        for (gx, colored) in row.iter().enumerate() {
            let cell = colored.cell;
            let pos = cell.position();
            let bg = term_color(colored.color);
            let fg = contrast_fg(colored.color);

            let glyph = if show_trail && session.player_position == Some(pos) {
                if session.is_wrong_move { 'X' } else { '@' }
            } else if cell.is_start {
                'S'
            } else if cell.is_end {
                '*'
            } else if show_trail && session.is_on_path(pos) {
                '.'
            } else {
                ' '
            };
            let fg = if glyph == 'X' { ERROR_FG } else { fg };

            let col = left + gx * CELL_W;
            let y = MAP_ROW + gy;
            buf.set(col, y, Cell::new(glyph, fg, bg));
            buf.set(col + 1, y, Cell::new(' ', fg, bg));
        }
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        self.sync_size(false)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, session: &GameSession, overlay: &Overlay<'_>) -> io::Result<()> {
        self.sync_size(true)?;
        compose_frame(&mut self.front, session, overlay);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    /// Track the terminal size; a change forces a full repaint.
    fn sync_size(&mut self, clear: bool) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize == self.term_w && th as usize == self.term_h {
            return Ok(());
        }
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        if clear {
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }
        Ok(())
    }

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors, never ResetColor: the terminal default may
        // differ from BASE_BG.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::Position;
    use crate::sim::event::SessionEvent;
    use crate::sim::step::step;

    const RAW: &str = "#######\n#S123E#\n#0    #\n#######\nColors:\n1: red";

    fn overlay() -> Overlay<'static> {
        Overlay { notice: None, source: "test", tick: 1 }
    }

    fn compose(session: &GameSession, overlay: &Overlay<'_>) -> FrameBuffer {
        let mut buf = FrameBuffer::new(60, 16);
        compose_frame(&mut buf, session, overlay);
        buf
    }

    fn observing() -> GameSession {
        let mut s = GameSession::default();
        step(&mut s, SessionEvent::Start { level: 1 });
        step(&mut s, SessionEvent::MazeGenerated { attempt: 1, maze_data: RAW.into() });
        s
    }

    #[test]
    fn hud_shows_level_score_and_status() {
        let buf = compose(&GameSession::default(), &overlay());
        assert!(buf.row_text(HUD_ROW).contains("LEVEL  1"));
        assert!(buf.row_text(HUD_ROW).contains("SCORE     0"));
        assert!(buf.row_text(NOTICE_ROW).contains(GamePhase::Idle.status_line()));
        assert!(buf.row_text(15).contains("[Enter] Start"));
    }

    #[test]
    fn maze_cells_are_two_columns_of_display_color() {
        let s = observing();
        let buf = compose(&s, &overlay());
        // 7 cells * 2 columns, centered in 60.
        let left = (60 - 14) / 2;
        let one = buf.get(left + 2 * CELL_W, MAP_ROW + 1);
        let red = Color::Rgb { r: 255, g: 0, b: 0 };
        assert_eq!(one.bg, red);
        assert_eq!(buf.get(left + 2 * CELL_W + 1, MAP_ROW + 1).bg, red);
        assert_eq!(buf.get(left + CELL_W, MAP_ROW + 1).ch, 'S');
        assert_eq!(buf.get(left + 5 * CELL_W, MAP_ROW + 1).ch, '*');
    }

    #[test]
    fn notice_is_shown() {
        let notice = Notice::WrongStep;
        let o = Overlay { notice: Some(&notice), source: "test", tick: 0 };
        let buf = compose(&GameSession::default(), &o);
        assert!(buf.row_text(NOTICE_ROW).contains("Wrong Step!"));
    }

    #[test]
    fn wrong_step_marks_the_head_and_shakes() {
        let mut s = observing();
        s.phase = GamePhase::Movement;
        step(&mut s, SessionEvent::Move(Position::new(1, 2)));
        assert!(s.is_wrong_move);

        let still = compose(&s, &overlay());
        assert!(still.row_text(MAP_ROW + 1).contains('X'));

        let shaken = compose(&s, &Overlay { notice: None, source: "test", tick: 2 });
        let col = |buf: &FrameBuffer| buf.row_text(MAP_ROW + 1).chars().position(|c| c == 'X');
        assert_eq!(col(&shaken), col(&still).map(|c| c + 1));
    }

    #[test]
    fn glyphs_are_single_width_ascii() {
        let mut s = observing();
        s.phase = GamePhase::Movement;
        step(&mut s, SessionEvent::Move(Position::new(2, 1)));
        let buf = compose(&s, &overlay());
        for y in MAP_ROW..MAP_ROW + 4 {
            assert!(buf.row_text(y).is_ascii(), "row {y}: {}", buf.row_text(y));
        }
        assert!(buf.row_text(MAP_ROW + 1).contains("S @"));
    }

    #[test]
    fn unchanged_session_redraws_identically() {
        let mut s = observing();
        s.level = 7;
        s.phase = GamePhase::Movement;
        let first = compose(&s, &overlay());
        let second = compose(&s, &overlay());
        assert_eq!(first.cells, second.cells);
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let s = observing();
        let mut buf = FrameBuffer::new(3, 2);
        compose_frame(&mut buf, &s, &overlay());
        let mut empty = FrameBuffer::new(0, 0);
        compose_frame(&mut empty, &s, &overlay());
    }

    #[test]
    fn contrast_picks_readable_text() {
        assert_eq!(contrast_fg(HexColor::new(255, 255, 0)), Color::Black);
        assert_eq!(contrast_fg(HexColor::new(20, 20, 60)), Color::White);
    }
}
