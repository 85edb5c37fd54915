use super::state::{Board, Move, Position, Tile};

/// Result of sliding/merging a board in one direction, before any spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    /// Board after the slide. Presentation flags from the previous render
    /// are cleared; tiles merged by this slide carry `is_merged`.
    pub board: Board,
    /// Sum of the values produced by merges.
    pub score_delta: u64,
    /// Number of merged pairs.
    pub merges: u32,
    /// True if any tile changed position or value.
    pub moved: bool,
}

/// Slide/merge tiles in the given direction. No randomness.
///
/// Tiles nearest the destination edge are resolved first; a tile that
/// merged during this slide will not merge again.
///
/// ```
/// use mini_2048::engine::{shift, Board, Move};
/// let b = Board::from_rows(&[[2, 2, 2, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
/// let s = shift(&b, Move::Left);
/// assert_eq!(s.board.rows()[0], vec![4, 2, 0, 0]);
/// assert_eq!(s.score_delta, 4);
/// ```
pub fn shift(board: &Board, dir: Move) -> Shift {
    let size = board.size();
    let mut grid = board.clone();
    grid.clear_flags();

    let (d_row, d_col) = dir.vector();
    let rows = traversal(size, d_row);
    let cols = traversal(size, d_col);

    let mut score_delta = 0;
    let mut merges = 0;
    let mut moved = false;

    for &row in &rows {
        for &col in &cols {
            let from = Position::new(row, col);
            let Some(tile) = grid.take(from) else { continue };

            let mut to = from;
            while let Some(next) = step(to, dir, size) {
                if grid.get(next).is_some() {
                    break;
                }
                to = next;
            }

            if let Some(next) = step(to, dir, size) {
                if let Some(target) = grid.get_mut(next) {
                    if !target.is_merged && mergeable(target.value, tile.value) {
                        target.value *= 2;
                        target.is_merged = true;
                        score_delta += u64::from(target.value);
                        merges += 1;
                        moved = true;
                        continue;
                    }
                }
            }

            if to != from {
                moved = true;
            }
            grid.place(Tile { position: to, ..tile });
        }
    }

    Shift { board: grid, score_delta, merges, moved }
}

/// True if any empty cell exists or two orthogonal neighbours can merge.
pub fn can_move(board: &Board) -> bool {
    if board.count_empty() > 0 {
        return true;
    }
    let size = board.size();
    for row in 0..size {
        for col in 0..size {
            let value = board.value_at(row, col);
            if col + 1 < size && mergeable(board.value_at(row, col + 1), value) {
                return true;
            }
            if row + 1 < size && mergeable(board.value_at(row + 1, col), value) {
                return true;
            }
        }
    }
    false
}

/// True if no move in any direction is possible.
#[inline]
pub fn is_game_over(board: &Board) -> bool {
    !can_move(board)
}

// Equal tiles merge unless the doubled value would not fit in a `u32`.
#[inline]
fn mergeable(a: u32, b: u32) -> bool {
    a == b && a.checked_mul(2).is_some()
}

// Scan order along one axis: towards +1 means start from the far end.
fn traversal(size: usize, delta: isize) -> Vec<usize> {
    if delta == 1 {
        (0..size).rev().collect()
    } else {
        (0..size).collect()
    }
}

fn step(pos: Position, dir: Move, size: usize) -> Option<Position> {
    let (d_row, d_col) = dir.vector();
    let row = pos.row.checked_add_signed(d_row)?;
    let col = pos.col.checked_add_signed(d_col)?;
    (row < size && col < size).then_some(Position::new(row, col))
}
