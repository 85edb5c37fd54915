use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::EngineError;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// All four directions in wire order (`Up=0, Down=1, Left=2, Right=3`).
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    /// Unit step `(d_row, d_col)` a tile takes when sliding in this direction.
    #[inline]
    pub fn vector(self) -> (isize, isize) {
        match self {
            Move::Up => (-1, 0),
            Move::Down => (1, 0),
            Move::Left => (0, -1),
            Move::Right => (0, 1),
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            Move::Up => 0,
            Move::Down => 1,
            Move::Left => 2,
            Move::Right => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Move {
    type Err = EngineError;

    /// Parse one of `up`, `down`, `left`, `right` (case-insensitive).
    ///
    /// ```
    /// use mini_2048::engine::{EngineError, Move};
    /// assert_eq!("Left".parse::<Move>(), Ok(Move::Left));
    /// assert!(matches!("north".parse::<Move>(), Err(EngineError::InvalidDirection(_))));
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Move::Up),
            "down" => Ok(Move::Down),
            "left" => Ok(Move::Left),
            "right" => Ok(Move::Right),
            _ => Err(EngineError::InvalidDirection(s.to_string())),
        }
    }
}

impl TryFrom<u8> for Move {
    type Error = EngineError;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        match b {
            0 => Ok(Move::Up),
            1 => Ok(Move::Down),
            2 => Ok(Move::Left),
            3 => Ok(Move::Right),
            other => Err(EngineError::InvalidDirection(other.to_string())),
        }
    }
}

/// Cell coordinates, row-major from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

/// Stable tile identity, unique for the lifetime of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u64);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single numbered piece on the board.
///
/// `is_new` and `is_merged` are presentation hints for the render that
/// follows a move; the engine clears them before computing the next move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub value: u32,
    pub position: Position,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_merged: bool,
}

impl Tile {
    pub fn new(id: TileId, value: u32, position: Position) -> Self {
        Tile { id, value, position, is_new: false, is_merged: false }
    }

    pub(crate) fn spawned(id: TileId, value: u32, position: Position) -> Self {
        Tile { id, value, position, is_new: true, is_merged: false }
    }

    #[inline]
    pub(crate) fn clear_flags(&mut self) {
        self.is_new = false;
        self.is_merged = false;
    }
}

/// Square grid of optional tiles, at most one per cell.
///
/// Cells are stored row-major; a tile's `position` always matches the cell
/// that holds it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Tile>>,
}

impl Board {
    /// Smallest grid on which a game can be started (two seed tiles).
    pub const MIN_SIZE: usize = 2;

    /// An empty `size`×`size` board.
    pub fn empty(size: usize) -> Result<Self, EngineError> {
        if size < Self::MIN_SIZE {
            return Err(EngineError::InvalidSize(size));
        }
        Ok(Board { size, cells: vec![None; size * size] })
    }

    /// Build a board from rows of values, `0` meaning an empty cell.
    ///
    /// Tile ids are handed out in row-major order starting at 0.
    ///
    /// ```
    /// use mini_2048::engine::Board;
    /// let b = Board::from_rows(&[[2, 2], [0, 4]]).unwrap();
    /// assert_eq!(b.tile_count(), 3);
    /// assert_eq!(b.value_at(1, 1), 4);
    /// ```
    pub fn from_rows<R: AsRef<[u32]>>(rows: &[R]) -> Result<Self, EngineError> {
        let size = rows.len();
        let mut board = Board::empty(size)?;
        let mut next_id = 0;
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != size {
                return Err(EngineError::RaggedRow { row, len: values.len(), expected: size });
            }
            for (col, &value) in values.iter().enumerate() {
                if value == 0 {
                    continue;
                }
                if value < 2 || !value.is_power_of_two() {
                    return Err(EngineError::InvalidTile { row, col, value });
                }
                board.place(Tile::new(TileId(next_id), value, Position::new(row, col)));
                next_id += 1;
            }
        }
        Ok(board)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn index(&self, pos: Position) -> usize {
        debug_assert!(pos.row < self.size && pos.col < self.size);
        pos.row * self.size + pos.col
    }

    /// Tile at `pos`, if any. Out-of-range positions are empty.
    #[inline]
    pub fn get(&self, pos: Position) -> Option<&Tile> {
        if pos.row >= self.size || pos.col >= self.size {
            return None;
        }
        self.cells[self.index(pos)].as_ref()
    }

    /// Value at `(row, col)`, `0` when empty.
    #[inline]
    pub fn value_at(&self, row: usize, col: usize) -> u32 {
        self.get(Position::new(row, col)).map_or(0, |t| t.value)
    }

    /// Put `tile` in the cell named by its own position, replacing any occupant.
    pub(crate) fn place(&mut self, tile: Tile) {
        let idx = self.index(tile.position);
        self.cells[idx] = Some(tile);
    }

    pub(crate) fn take(&mut self, pos: Position) -> Option<Tile> {
        let idx = self.index(pos);
        self.cells[idx].take()
    }

    pub(crate) fn get_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        let idx = self.index(pos);
        self.cells[idx].as_mut()
    }

    pub(crate) fn clear_flags(&mut self) {
        for tile in self.cells.iter_mut().flatten() {
            tile.clear_flags();
        }
    }

    /// Iterate over tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.cells.iter().flatten()
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    #[inline]
    pub fn count_empty(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    /// Empty cells in row-major order.
    pub fn empty_positions(&self) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(idx, _)| Position::new(idx / self.size, idx % self.size))
            .collect()
    }

    /// Highest tile value on the board, `0` for an empty board.
    pub fn highest_tile(&self) -> u32 {
        self.tiles().map(|t| t.value).max().unwrap_or(0)
    }

    /// Largest tile id in use, if any tile is present.
    pub fn max_tile_id(&self) -> Option<TileId> {
        self.tiles().map(|t| t.id).max()
    }

    /// Values row by row, `0` for empty cells.
    pub fn rows(&self) -> Vec<Vec<u32>> {
        (0..self.size)
            .map(|row| (0..self.size).map(|col| self.value_at(row, col)).collect())
            .collect()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({}x{}, {:?})", self.size, self.size, self.rows())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = "-".repeat(self.size * 8);
        writeln!(f)?;
        for (row_idx, row) in self.rows().iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|&v| format_val(v)).collect();
            writeln!(f, "{}", cells.join("|"))?;
            if row_idx + 1 < self.size {
                writeln!(f, "{}", separator)?;
            }
        }
        Ok(())
    }
}

fn format_val(val: u32) -> String {
    match val {
        0 => String::from("       "),
        v => format!("{:^7}", v),
    }
}
