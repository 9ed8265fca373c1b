//! Board representation, capture rules and scoring.
//!
//! This module contains:
//! - Player colors and cell values
//! - The eight compass directions used by the capture scan
//! - The 8x8 board with legality checks, move application and scoring

use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Width and height of the board
pub const BOARD_SIZE: usize = 8;

/// Number of cells on the board
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// A player color. Black always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
}

impl Color {
    /// Both colors in turn order
    pub const ALL: [Color; 2] = [Color::Black, Color::White];

    /// The other color
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => write!(f, "Black"),
            Color::White => write!(f, "White"),
        }
    }
}

/// Contents of a single board cell.
///
/// Serialized as `""`, `"black"` or `"white"`, which is what browser clients
/// render directly as CSS classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    #[serde(rename = "")]
    Empty,
    #[serde(rename = "black")]
    Black,
    #[serde(rename = "white")]
    White,
}

impl Cell {
    /// Color of the piece in this cell, if any
    pub fn color(self) -> Option<Color> {
        match self {
            Cell::Empty => None,
            Cell::Black => Some(Color::Black),
            Cell::White => Some(Color::White),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

impl From<Color> for Cell {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => Cell::Black,
            Color::White => Cell::White,
        }
    }
}

/// A unit step on the grid. `dx` moves along a row, `dy` moves between rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Direction {
    pub dx: i8,
    pub dy: i8,
}

impl Direction {
    pub const NORTH: Direction = Direction { dx: 0, dy: -1 };
    pub const NORTH_EAST: Direction = Direction { dx: 1, dy: -1 };
    pub const EAST: Direction = Direction { dx: 1, dy: 0 };
    pub const SOUTH_EAST: Direction = Direction { dx: 1, dy: 1 };
    pub const SOUTH: Direction = Direction { dx: 0, dy: 1 };
    pub const SOUTH_WEST: Direction = Direction { dx: -1, dy: 1 };
    pub const WEST: Direction = Direction { dx: -1, dy: 0 };
    pub const NORTH_WEST: Direction = Direction { dx: -1, dy: -1 };

    /// All eight compass directions, clockwise from North
    pub const ALL: [Direction; 8] = [
        Direction::NORTH,
        Direction::NORTH_EAST,
        Direction::EAST,
        Direction::SOUTH_EAST,
        Direction::SOUTH,
        Direction::SOUTH_WEST,
        Direction::WEST,
        Direction::NORTH_WEST,
    ];

    /// Index of the neighbouring cell in this direction, or `None` off the board
    pub fn step(self, index: usize) -> Option<usize> {
        let row = (index / BOARD_SIZE) as isize + self.dy as isize;
        let col = (index % BOARD_SIZE) as isize + self.dx as isize;
        let size = BOARD_SIZE as isize;

        if (0..size).contains(&row) && (0..size).contains(&col) {
            Some((row * size + col) as usize)
        } else {
            None
        }
    }
}

/// Final (or current) piece count and who it favours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub black: usize,
    pub white: usize,
    pub verdict: Verdict,
}

/// Result of comparing piece counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    BlackWins,
    WhiteWins,
    Draw,
}

impl Verdict {
    /// The winning color, or `None` on a draw
    pub fn winner(self) -> Option<Color> {
        match self {
            Verdict::BlackWins => Some(Color::Black),
            Verdict::WhiteWins => Some(Color::White),
            Verdict::Draw => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::BlackWins => write!(f, "Black wins!"),
            Verdict::WhiteWins => write!(f, "White wins!"),
            Verdict::Draw => write!(f, "Draw!"),
        }
    }
}

/// The 8x8 playing surface, addressed row-major by `0..64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

impl Board {
    /// A board with no pieces on it
    pub fn empty() -> Self {
        Self {
            cells: [Cell::Empty; CELL_COUNT],
        }
    }

    /// The standard opening position: two pieces of each color in the centre
    pub fn standard() -> Self {
        let mut board = Self::empty();
        board.cells[27] = Cell::White;
        board.cells[28] = Cell::Black;
        board.cells[35] = Cell::Black;
        board.cells[36] = Cell::White;
        board
    }

    /// Build a board from raw cells
    pub fn from_cells(cells: [Cell; CELL_COUNT]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Put a piece (or clear a cell) without any rule checks
    pub fn set(&mut self, index: usize, cell: Cell) {
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = cell;
        }
    }

    /// Number of pieces of the given color
    pub fn count(&self, player: Color) -> usize {
        let cell = Cell::from(player);
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// Number of non-empty cells
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// Opponent cells that a piece of `player` at `index` would capture in
    /// `direction`. Empty unless the run of opponent cells is closed off by
    /// one of `player`'s own pieces.
    fn capture_span(&self, index: usize, direction: Direction, player: Color) -> Vec<usize> {
        let own = Cell::from(player);
        let opponent = Cell::from(player.opponent());
        let mut span = Vec::new();
        let mut cursor = direction.step(index);

        while let Some(i) = cursor {
            match self.cells[i] {
                c if c == opponent => span.push(i),
                c if c == own => return span,
                _ => return Vec::new(),
            }
            cursor = direction.step(i);
        }

        // Ran off the board without reaching an own piece
        Vec::new()
    }

    /// Whether placing `player` at `index` captures at least one piece in
    /// `direction`.
    pub fn captures_in_direction(&self, index: usize, direction: Direction, player: Color) -> bool {
        index < CELL_COUNT && !self.capture_span(index, direction, player).is_empty()
    }

    /// A move is legal on an empty, in-range cell that captures in at least
    /// one direction.
    pub fn is_legal_move(&self, index: usize, player: Color) -> bool {
        match self.get(index) {
            Some(Cell::Empty) => Direction::ALL
                .iter()
                .any(|&dir| self.captures_in_direction(index, dir, player)),
            _ => false,
        }
    }

    /// Place `player` at `index` and flip every captured piece.
    ///
    /// The move must already be known to be legal; this does not re-validate.
    /// Returns the indices that were flipped.
    pub fn apply_move(&mut self, index: usize, player: Color) -> Vec<usize> {
        let mut flipped = Vec::new();

        for direction in Direction::ALL {
            let span = self.capture_span(index, direction, player);
            for &i in &span {
                self.cells[i] = Cell::from(player);
            }
            flipped.extend(span);
        }

        self.set(index, Cell::from(player));
        flipped
    }

    /// Every index where `player` may currently move, in ascending order
    pub fn legal_moves(&self, player: Color) -> Vec<usize> {
        (0..CELL_COUNT)
            .filter(|&i| self.is_legal_move(i, player))
            .collect()
    }

    pub fn has_any_legal_move(&self, player: Color) -> bool {
        (0..CELL_COUNT).any(|i| self.is_legal_move(i, player))
    }

    /// Count pieces and compare. Valid at any point in the game.
    pub fn score(&self) -> Score {
        let black = self.count(Color::Black);
        let white = self.count(Color::White);
        let verdict = if black > white {
            Verdict::BlackWins
        } else if white > black {
            Verdict::WhiteWins
        } else {
            Verdict::Draw
        };

        Score {
            black,
            white,
            verdict,
        }
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(CELL_COUNT))?;
        for cell in &self.cells {
            seq.serialize_element(cell)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cells: Vec<Cell> = Vec::deserialize(deserializer)?;
        let len = cells.len();
        let cells: [Cell; CELL_COUNT] = cells.try_into().map_err(|_| {
            D::Error::invalid_length(len, &"a board of exactly 64 cells")
        })?;
        Ok(Self { cells })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_standard_position() {
        let board = Board::standard();
        assert_eq!(board.get(27), Some(Cell::White));
        assert_eq!(board.get(28), Some(Cell::Black));
        assert_eq!(board.get(35), Some(Cell::Black));
        assert_eq!(board.get(36), Some(Cell::White));
        assert_eq!(board.occupied(), 4);
    }

    #[test]
    fn test_opening_moves_for_black() {
        let board = Board::standard();
        assert_eq!(board.legal_moves(Color::Black), vec![19, 26, 37, 44]);
        assert!(!board.is_legal_move(0, Color::Black));
    }

    #[test]
    fn test_opening_moves_for_white() {
        let board = Board::standard();
        assert_eq!(board.legal_moves(Color::White), vec![20, 29, 34, 43]);
    }

    #[test]
    fn test_occupied_cells_are_never_legal() {
        let board = Board::standard();
        for index in [27, 28, 35, 36] {
            for player in Color::ALL {
                assert!(!board.is_legal_move(index, player));
            }
        }
    }

    #[test]
    fn test_out_of_range_index_is_not_legal() {
        let board = Board::standard();
        assert!(!board.is_legal_move(64, Color::Black));
        assert!(!board.is_legal_move(usize::MAX, Color::White));
    }

    #[test]
    fn test_black_opens_at_19() {
        let mut board = Board::standard();
        let flipped = board.apply_move(19, Color::Black);

        assert_eq!(flipped, vec![27]);
        assert_eq!(board.get(19), Some(Cell::Black));
        assert_eq!(board.get(20), Some(Cell::Empty));
        assert_eq!(board.get(27), Some(Cell::Black));
        assert_eq!(board.get(28), Some(Cell::Black));
        assert_eq!(board.get(35), Some(Cell::Black));
        assert_eq!(board.get(36), Some(Cell::White));
        assert_eq!(board.occupied(), 5);
    }

    #[test]
    fn test_adjacent_own_piece_is_not_a_capture() {
        let mut board = Board::empty();
        board.set(1, Cell::Black);
        assert!(!board.captures_in_direction(0, Direction::EAST, Color::Black));
    }

    #[test]
    fn test_run_to_edge_is_not_a_capture() {
        let mut board = Board::empty();
        board.set(1, Cell::White);
        board.set(2, Cell::White);
        // Nothing closes the run before the edge of the row
        for i in 3..8 {
            board.set(i, Cell::White);
        }
        assert!(!board.captures_in_direction(0, Direction::EAST, Color::Black));
    }

    #[test]
    fn test_scan_does_not_wrap_rows() {
        let mut board = Board::empty();
        // White at the end of row 0, black at the start of row 1
        board.set(7, Cell::White);
        board.set(8, Cell::Black);
        assert!(!board.captures_in_direction(6, Direction::EAST, Color::Black));
        assert!(!board.is_legal_move(6, Color::Black));
    }

    #[test]
    fn test_long_diagonal_capture() {
        let mut board = Board::empty();
        for i in [9, 18, 27, 36, 45, 54] {
            board.set(i, Cell::White);
        }
        board.set(63, Cell::Black);

        assert!(board.is_legal_move(0, Color::Black));
        let flipped = board.apply_move(0, Color::Black);
        assert_eq!(flipped, vec![9, 18, 27, 36, 45, 54]);
        assert_eq!(board.count(Color::Black), 8);
        assert_eq!(board.count(Color::White), 0);
    }

    #[test]
    fn test_multiple_directions_flip_together() {
        let mut board = Board::empty();
        // Centre at 27 with captures to the east and south
        board.set(28, Cell::White);
        board.set(29, Cell::Black);
        board.set(35, Cell::White);
        board.set(43, Cell::Black);
        // A run in the west that is not closed off
        board.set(26, Cell::White);

        let flipped = board.apply_move(27, Color::Black);
        assert_eq!(flipped, vec![28, 35]);
        assert_eq!(board.get(26), Some(Cell::White));
    }

    #[test]
    fn test_score_all_black() {
        let board = Board::from_cells([Cell::Black; CELL_COUNT]);
        assert_eq!(
            board.score(),
            Score {
                black: 64,
                white: 0,
                verdict: Verdict::BlackWins
            }
        );
    }

    #[test]
    fn test_score_even_split_is_draw() {
        let mut cells = [Cell::Black; CELL_COUNT];
        for cell in cells.iter_mut().skip(32) {
            *cell = Cell::White;
        }
        let score = Board::from_cells(cells).score();
        assert_eq!(score.black, 32);
        assert_eq!(score.white, 32);
        assert_eq!(score.verdict, Verdict::Draw);
        assert_eq!(score.verdict.winner(), None);
    }

    #[test]
    fn test_board_serializes_as_strings() {
        let json = serde_json::to_value(Board::standard()).unwrap();
        let cells = json.as_array().unwrap();
        assert_eq!(cells.len(), 64);
        assert_eq!(cells[0], "");
        assert_eq!(cells[27], "white");
        assert_eq!(cells[28], "black");

        let back: Board = serde_json::from_value(json).unwrap();
        assert_eq!(back, Board::standard());
    }

    #[test]
    fn test_short_board_is_rejected() {
        let result: Result<Board, _> = serde_json::from_str(r#"["", "black"]"#);
        assert!(result.is_err());
    }
}
