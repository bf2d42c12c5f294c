/// Maze cells and grid positions.
/// A cell's role is decided once, from its source character, and then
/// queried through methods so the rules live in one place.

/// Grid coordinate. Signed so that move intents can point off the board
/// and so that `SENTINEL` can mark "not found".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const SENTINEL: Position = Position { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    pub fn is_sentinel(self) -> bool {
        self == Position::SENTINEL
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Position::new(self.x + dx, self.y + dy)
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::SENTINEL
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MazeCell {
    pub ch: char,
    pub x: usize,
    pub y: usize,
    pub is_wall: bool,
    pub is_start: bool,
    pub is_end: bool,
    pub is_path: bool,
    /// Set iff the source character was an ASCII digit.
    pub path_number: Option<u32>,
}

impl MazeCell {
    /// Classify one layout character.
    ///
    ///   '#'    wall
    ///   'S'    start
    ///   'E'    end
    ///   '0'-'9' numbered path cell
    ///   ' '    blank floor
    ///   other  unnumbered path cell
    pub fn from_char(ch: char, x: usize, y: usize) -> Self {
        let path_number = ch.to_digit(10);
        let (is_wall, is_start, is_end, is_path) = match ch {
            '#' => (true, false, false, false),
            'S' => (false, true, false, false),
            'E' => (false, false, true, false),
            ' ' => (false, false, false, false),
            _ => (false, false, false, true),
        };
        MazeCell { ch, x, y, is_wall, is_start, is_end, is_path, path_number }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x as i32, self.y as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_becomes_numbered_path() {
        let c = MazeCell::from_char('7', 2, 3);
        assert!(c.is_path);
        assert_eq!(c.path_number, Some(7));
        assert_eq!(c.position(), Position::new(2, 3));
    }

    #[test]
    fn roles_are_exclusive() {
        for (ch, expected) in [('#', 1), ('S', 1), ('E', 1), (' ', 0), ('.', 1), ('4', 1)] {
            let c = MazeCell::from_char(ch, 0, 0);
            let roles = [c.is_wall, c.is_start, c.is_end, c.is_path];
            assert_eq!(roles.iter().filter(|r| **r).count(), expected, "char {ch:?}");
        }
    }

    #[test]
    fn only_ascii_digits_are_numbered() {
        assert_eq!(MazeCell::from_char('x', 0, 0).path_number, None);
        assert_eq!(MazeCell::from_char('٣', 0, 0).path_number, None);
        assert!(MazeCell::from_char('.', 0, 0).is_path);
    }

    #[test]
    fn sentinel_is_default() {
        assert!(Position::default().is_sentinel());
        assert!(!Position::new(0, 0).is_sentinel());
    }
}
