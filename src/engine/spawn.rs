//! Random draws used by the engine, kept behind a trait so games can be
//! seeded, replayed, or scripted in tests.

use std::collections::VecDeque;

use log::warn;
use rand::Rng;

use super::state::Position;

/// Source of the two random draws the engine needs when it spawns a tile.
pub trait SpawnSource {
    /// Pick one of `empty` (never empty itself), returning its index.
    fn choose_cell(&mut self, empty: &[Position]) -> usize;

    /// Value for a new tile: 2 or 4.
    fn choose_value(&mut self) -> u32;
}

impl<S: SpawnSource + ?Sized> SpawnSource for &mut S {
    fn choose_cell(&mut self, empty: &[Position]) -> usize {
        (**self).choose_cell(empty)
    }

    fn choose_value(&mut self) -> u32 {
        (**self).choose_value()
    }
}

/// Uniform cell, 2 (90%) or 4 (10%) value, drawn from any `rand::Rng`.
///
/// ```
/// use mini_2048::engine::{RngSpawner, SpawnSource};
/// use rand::{rngs::StdRng, SeedableRng};
/// let mut s = RngSpawner::new(StdRng::seed_from_u64(7));
/// assert!(matches!(s.choose_value(), 2 | 4));
/// ```
#[derive(Debug, Clone)]
pub struct RngSpawner<R> {
    rng: R,
}

impl<R: Rng> RngSpawner<R> {
    pub fn new(rng: R) -> Self {
        RngSpawner { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl<R: Rng> SpawnSource for RngSpawner<R> {
    fn choose_cell(&mut self, empty: &[Position]) -> usize {
        self.rng.gen_range(0..empty.len())
    }

    fn choose_value(&mut self) -> u32 {
        generate_random_tile(&mut self.rng)
    }
}

#[inline]
pub(crate) fn generate_random_tile<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    if rng.gen_range(0..10) < 9 {
        2
    } else {
        4
    }
}

/// Plays back a fixed list of spawns.
///
/// Each entry names the cell and value of one spawn. A named cell that is
/// not empty falls back to the first empty cell, is logged as a warning and
/// counted in [`ScriptedSpawner::misplaced`]. Once the script runs out every
/// spawn is a 2 in the first empty cell.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSpawner {
    script: VecDeque<(Position, u32)>,
    pending_value: Option<u32>,
    misplaced: usize,
}

impl ScriptedSpawner {
    pub fn new<I: IntoIterator<Item = (Position, u32)>>(spawns: I) -> Self {
        ScriptedSpawner { script: spawns.into_iter().collect(), pending_value: None, misplaced: 0 }
    }

    /// Spawns not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Scripted spawns whose cell was occupied when they were played.
    pub fn misplaced(&self) -> usize {
        self.misplaced
    }
}

impl SpawnSource for ScriptedSpawner {
    fn choose_cell(&mut self, empty: &[Position]) -> usize {
        match self.script.pop_front() {
            Some((pos, value)) => {
                self.pending_value = Some(value);
                empty.iter().position(|&p| p == pos).unwrap_or_else(|| {
                    warn!("scripted spawn at ({}, {}) is occupied, using first empty cell", pos.row, pos.col);
                    self.misplaced += 1;
                    0
                })
            }
            None => {
                self.pending_value = None;
                0
            }
        }
    }

    fn choose_value(&mut self) -> u32 {
        self.pending_value.take().unwrap_or(2)
    }
}
