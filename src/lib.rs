//! mini-2048: the 2048 board engine behind the mini app, plus the thin host
//! pieces around it.
//!
//! This crate provides:
//! - A tile-identity `Board` and an owned `GameState` whose moves return new states (`engine`)
//! - Key and swipe classification (`input`)
//! - A session host with the payment gate and persisted best score (`session`)
//! - Weekly leaderboard bucketing and stores (`leaderboard`)
//! - Replayable game traces (`trace`) and TOML configuration (`config`)
//!
//! Quick start:
//! ```
//! use mini_2048::engine::{GameState, Move, RngSpawner};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Deterministic game with a seeded RNG
//! let mut spawner = RngSpawner::new(StdRng::seed_from_u64(42));
//! let mut game = GameState::new(4, &mut spawner).unwrap();
//! while !game.is_game_over() && game.moves() < 8 {
//!     let dir = Move::ALL.into_iter().find(|&d| game.can_shift(d)).unwrap();
//!     game = game.make_move(dir, &mut spawner).unwrap();
//! }
//! assert!(game.moves() > 0);
//! ```
//!
pub mod config;
pub mod engine;
pub mod input;
pub mod leaderboard;
pub mod session;
pub mod trace;
