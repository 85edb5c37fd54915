//! Engine module: the 2048 board, slide/merge rules, spawning and
//! terminal detection.
//!
//! - `Board` is the square grid of identified tiles.
//! - `GameState` owns a board plus score and flags; moves return a new state.
//! - Randomness enters only through a [`SpawnSource`].
//!
//! ```
//! use mini_2048::engine::{self, Move, RngSpawner};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut spawner = RngSpawner::new(StdRng::seed_from_u64(42));
//! let mut game = engine::new_game(engine::DEFAULT_SIZE, &mut spawner).unwrap();
//! for dir in [Move::Left, Move::Up, Move::Right, Move::Down] {
//!     game = engine::make_move(&game, dir, &mut spawner).unwrap();
//! }
//! assert!(game.board().tile_count() >= 2);
//! ```

mod game;
mod ops;
mod spawn;
pub mod state;

pub use game::{make_move, new_game, GameState, MoveOutcome, DEFAULT_SIZE, WIN_TILE};
pub use ops::{can_move, is_game_over, shift, Shift};
pub use spawn::{RngSpawner, ScriptedSpawner, SpawnSource};
pub use state::{Board, Move, Position, Tile, TileId};

/// Errors raised by the engine. None of them touch the state they were
/// raised for; callers are expected to drop the input and carry on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid direction: {0:?}")]
    InvalidDirection(String),
    #[error("no empty cell left to spawn a tile")]
    NoLegalSpawnTarget,
    #[error("grid size must be at least 2, got {0}")]
    InvalidSize(usize),
    #[error("row {row} has {len} cells, expected {expected}")]
    RaggedRow { row: usize, len: usize, expected: usize },
    #[error("invalid tile value {value} at ({row}, {col})")]
    InvalidTile { row: usize, col: usize, value: u32 },
}
