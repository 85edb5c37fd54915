use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use super::ops::{can_move, shift, Shift};
use super::spawn::SpawnSource;
use super::state::{Board, Move, Tile, TileId};
use super::EngineError;

/// Tile value that sets the win flag.
pub const WIN_TILE: u32 = 2048;
/// Grid size used by the app.
pub const DEFAULT_SIZE: usize = 4;

const SEED_TILES: usize = 2;

/// Complete state of one game session.
///
/// Values are never mutated in place by the engine: [`GameState::apply_move`]
/// and [`GameState::restart`] return a new state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    board: Board,
    score: u64,
    best_score: u64,
    game_over: bool,
    won: bool,
    next_id: u64,
    moves: u32,
}

/// What a call to [`GameState::apply_move`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub state: GameState,
    /// False for a no-op: `state` is then identical to the input.
    pub changed: bool,
    pub score_delta: u64,
    pub merges: u32,
    pub spawned: Option<Tile>,
    /// True only on the move that first reached [`WIN_TILE`].
    pub just_won: bool,
}

impl MoveOutcome {
    fn unchanged(state: GameState) -> Self {
        MoveOutcome { state, changed: false, score_delta: 0, merges: 0, spawned: None, just_won: false }
    }
}

impl GameState {
    /// Start a game on an empty `size`×`size` board with two seed tiles.
    ///
    /// ```
    /// use mini_2048::engine::{GameState, RngSpawner};
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut spawner = RngSpawner::new(StdRng::seed_from_u64(42));
    /// let g = GameState::new(4, &mut spawner).unwrap();
    /// assert_eq!(g.board().tile_count(), 2);
    /// assert_eq!(g.score(), 0);
    /// assert!(!g.is_game_over() && !g.has_won());
    /// ```
    pub fn new<S: SpawnSource + ?Sized>(size: usize, spawner: &mut S) -> Result<Self, EngineError> {
        let mut state = GameState {
            board: Board::empty(size)?,
            score: 0,
            best_score: 0,
            game_over: false,
            won: false,
            next_id: 0,
            moves: 0,
        };
        for _ in 0..SEED_TILES {
            state.spawn_tile(spawner)?;
        }
        state.game_over = !can_move(&state.board);
        debug!("new {size}x{size} game: {:?}", state.board);
        Ok(state)
    }

    /// Wrap an existing board, e.g. a fixture or a restored snapshot.
    ///
    /// Flags are derived from the board: won if a tile has reached
    /// [`WIN_TILE`], game over if no move is possible.
    pub fn from_board(board: Board, score: u64) -> Self {
        let next_id = board.max_tile_id().map_or(0, |id| id.0 + 1);
        GameState {
            won: board.highest_tile() >= WIN_TILE,
            game_over: !can_move(&board),
            board,
            score,
            best_score: score,
            next_id,
            moves: 0,
        }
    }

    /// Carry a best score over from earlier sessions.
    pub fn with_best_score(mut self, best: u64) -> Self {
        self.best_score = self.best_score.max(best);
        self
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.board.size()
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[inline]
    pub fn best_score(&self) -> u64 {
        self.best_score
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    #[inline]
    pub fn has_won(&self) -> bool {
        self.won
    }

    /// Number of effective moves made in this game.
    #[inline]
    pub fn moves(&self) -> u32 {
        self.moves
    }

    /// Would moving in `dir` change anything?
    pub fn can_shift(&self, dir: Move) -> bool {
        !self.game_over && shift(&self.board, dir).moved
    }

    /// Slide/merge in `dir`, then spawn one tile if anything changed.
    ///
    /// A move that changes nothing, or any move after game over, returns the
    /// input state untouched and draws nothing from `spawner`.
    pub fn apply_move<S: SpawnSource + ?Sized>(
        &self,
        dir: Move,
        spawner: &mut S,
    ) -> Result<MoveOutcome, EngineError> {
        if self.game_over {
            debug!("ignoring {dir}: game is over");
            return Ok(MoveOutcome::unchanged(self.clone()));
        }
        let Shift { board, score_delta, merges, moved } = shift(&self.board, dir);
        if !moved {
            debug!("ignoring {dir}: nothing moves");
            return Ok(MoveOutcome::unchanged(self.clone()));
        }

        let mut next = GameState {
            board,
            score: self.score + score_delta,
            best_score: self.best_score,
            game_over: false,
            won: self.won,
            next_id: self.next_id,
            moves: self.moves + 1,
        };
        let just_won = !self.won && next.board.highest_tile() >= WIN_TILE;
        next.won |= just_won;
        let spawned = next.spawn_tile(spawner)?;
        next.best_score = next.best_score.max(next.score);
        next.game_over = !can_move(&next.board);

        debug!("{dir}: +{score_delta} ({merges} merges), spawned {} at {:?}", spawned.value, spawned.position);
        if just_won {
            info!("reached {WIN_TILE} after {} moves, score {}", next.moves, next.score);
        }
        if next.game_over {
            info!("game over after {} moves, score {}", next.moves, next.score);
        }

        Ok(MoveOutcome { state: next, changed: true, score_delta, merges, spawned: Some(spawned), just_won })
    }

    /// Like [`apply_move`](Self::apply_move) but only returns the new state.
    ///
    /// ```
    /// use mini_2048::engine::{Board, GameState, Move, ScriptedSpawner, Position};
    /// let board = Board::from_rows(&[[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
    /// let mut spawner = ScriptedSpawner::new([(Position::new(3, 3), 2)]);
    /// let g = GameState::from_board(board, 0).make_move(Move::Left, &mut spawner).unwrap();
    /// assert_eq!(g.board().rows()[0], vec![4, 0, 0, 0]);
    /// assert_eq!(g.board().value_at(3, 3), 2);
    /// assert_eq!(g.score(), 4);
    /// ```
    pub fn make_move<S: SpawnSource + ?Sized>(self, dir: Move, spawner: &mut S) -> Result<Self, EngineError> {
        Ok(self.apply_move(dir, spawner)?.state)
    }

    /// A fresh game of the same size that keeps only the best score.
    pub fn restart<S: SpawnSource + ?Sized>(&self, spawner: &mut S) -> Result<Self, EngineError> {
        Ok(GameState::new(self.size(), spawner)?.with_best_score(self.best_score))
    }

    fn spawn_tile<S: SpawnSource + ?Sized>(&mut self, spawner: &mut S) -> Result<Tile, EngineError> {
        let empty = self.board.empty_positions();
        if empty.is_empty() {
            error!("spawn requested on a full board: {:?}", self.board);
            return Err(EngineError::NoLegalSpawnTarget);
        }
        let idx = spawner.choose_cell(&empty).min(empty.len() - 1);
        let tile = Tile::spawned(TileId(self.next_id), spawner.choose_value(), empty[idx]);
        self.next_id += 1;
        self.board.place(tile);
        Ok(tile)
    }
}

/// Start a new game. See [`GameState::new`].
pub fn new_game<S: SpawnSource + ?Sized>(size: usize, spawner: &mut S) -> Result<GameState, EngineError> {
    GameState::new(size, spawner)
}

/// Apply one move to `state`. See [`GameState::apply_move`].
pub fn make_move<S: SpawnSource + ?Sized>(
    state: &GameState,
    dir: Move,
    spawner: &mut S,
) -> Result<GameState, EngineError> {
    Ok(state.apply_move(dir, spawner)?.state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::engine::{Position, RngSpawner, ScriptedSpawner};

    fn state<R: AsRef<[u32]>>(rows: &[R]) -> GameState {
        GameState::from_board(Board::from_rows(rows).unwrap(), 0)
    }

    fn spawn_at(row: usize, col: usize, value: u32) -> ScriptedSpawner {
        ScriptedSpawner::new([(Position::new(row, col), value)])
    }

    #[test]
    fn new_game_places_two_distinct_tiles() {
        for seed in 0..200 {
            let mut spawner = RngSpawner::new(StdRng::seed_from_u64(seed));
            let g = new_game(DEFAULT_SIZE, &mut spawner).unwrap();
            let tiles: Vec<_> = g.board().tiles().collect();
            assert_eq!(tiles.len(), 2);
            assert_ne!(tiles[0].position, tiles[1].position);
            assert_ne!(tiles[0].id, tiles[1].id);
            assert!(tiles.iter().all(|t| matches!(t.value, 2 | 4) && t.is_new));
            assert_eq!((g.score(), g.is_game_over(), g.has_won(), g.moves()), (0, false, false, 0));
        }
    }

    #[test]
    fn new_game_rejects_tiny_grids() {
        let mut spawner = ScriptedSpawner::default();
        assert_eq!(new_game(1, &mut spawner), Err(EngineError::InvalidSize(1)));
        assert_eq!(new_game(0, &mut spawner), Err(EngineError::InvalidSize(0)));
    }

    #[test]
    fn pair_merges_left_and_spawns() {
        let g = state(&[[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let out = g.apply_move(Move::Left, &mut spawn_at(2, 1, 2)).unwrap();
        assert!(out.changed);
        assert_eq!(out.state.board().rows()[0], vec![4, 0, 0, 0]);
        assert_eq!(out.state.board().value_at(2, 1), 2);
        assert_eq!(out.state.board().tile_count(), 2);
        assert_eq!(out.state.score(), 4);
        assert_eq!((out.score_delta, out.merges), (4, 1));
        let spawned = out.spawned.unwrap();
        assert_eq!(spawned.id, TileId(2));
        assert!(spawned.is_new);
    }

    #[test]
    fn triple_merges_only_leading_pair() {
        let g = state(&[[2, 2, 2, 0], [0; 4], [0; 4], [0; 4]]);
        let out = g.apply_move(Move::Left, &mut spawn_at(3, 3, 2)).unwrap();
        assert_eq!(out.state.board().rows()[0], vec![4, 2, 0, 0]);
        assert_eq!(out.state.score(), 4);
        assert_eq!(out.merges, 1);
    }

    #[test]
    fn no_op_move_leaves_state_identical() {
        let g = state(&[[2, 4, 0, 0], [8, 0, 0, 0], [0; 4], [0; 4]]);
        let mut spawner = spawn_at(3, 3, 2);
        let out = g.apply_move(Move::Left, &mut spawner).unwrap();
        assert!(!out.changed);
        assert_eq!(out.state, g);
        assert_eq!(out.spawned, None);
        assert_eq!(spawner.remaining(), 1);
    }

    #[test]
    fn full_board_without_pairs_is_terminal() {
        let g = state(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(g.is_game_over());
        let mut spawner = spawn_at(0, 0, 2);
        for dir in Move::ALL {
            assert!(!g.can_shift(dir));
            assert_eq!(g.clone().make_move(dir, &mut spawner).unwrap(), g);
        }
        assert_eq!(spawner.remaining(), 1);
    }

    #[test]
    fn moves_after_game_over_are_ignored() {
        // Terminal flag set even though a merge would be geometrically possible.
        let mut g = state(&[[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        g.game_over = true;
        let out = g.apply_move(Move::Left, &mut spawn_at(3, 3, 2)).unwrap();
        assert!(!out.changed);
        assert_eq!(out.state, g);
    }

    #[test]
    fn terminal_detected_after_spawn() {
        let g = state(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [2, 4, 2, 0]]);
        assert!(!g.is_game_over());
        let g = g.make_move(Move::Right, &mut spawn_at(3, 0, 4)).unwrap();
        assert_eq!(g.board().rows()[3], vec![4, 2, 4, 2]);
        assert!(g.is_game_over());
    }

    #[test]
    fn reaching_2048_sets_win_and_play_continues() {
        let g = state(&[[1024, 1024, 0, 0], [2, 0, 0, 0], [0; 4], [0; 4]]).with_best_score(0);
        assert!(!g.has_won());
        let out = g.apply_move(Move::Left, &mut spawn_at(3, 3, 2)).unwrap();
        assert!(out.just_won);
        assert!(out.state.has_won());
        assert!(!out.state.is_game_over());
        assert_eq!(out.state.score(), 2048);

        let out = out.state.apply_move(Move::Down, &mut spawn_at(0, 3, 2)).unwrap();
        assert!(out.changed);
        assert!(!out.just_won);
        assert!(out.state.has_won());
        assert_eq!(out.state.score(), 2048);
        assert_eq!(out.state.moves(), 2);
    }

    #[test]
    fn flags_last_one_render() {
        let g = state(&[[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let g = g.make_move(Move::Left, &mut spawn_at(3, 3, 2)).unwrap();
        assert!(g.board().get(Position::new(0, 0)).unwrap().is_merged);
        let g = g.make_move(Move::Right, &mut spawn_at(1, 0, 2)).unwrap();
        let flagged: Vec<_> = g.board().tiles().filter(|t| t.is_new || t.is_merged).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].position, Position::new(1, 0));
        assert!(flagged[0].is_new);
    }

    #[test]
    fn best_score_tracks_and_survives_restart() {
        let g = state(&[[8, 8, 0, 0], [0; 4], [0; 4], [0; 4]]).with_best_score(10);
        assert_eq!(g.best_score(), 10);
        let g = g.make_move(Move::Left, &mut spawn_at(3, 3, 2)).unwrap();
        assert_eq!(g.best_score(), 16);

        let mut spawner = RngSpawner::new(StdRng::seed_from_u64(3));
        let fresh = g.restart(&mut spawner).unwrap();
        assert_eq!(fresh.score(), 0);
        assert_eq!(fresh.best_score(), 16);
        assert_eq!(fresh.board().tile_count(), 2);
        assert!(!fresh.has_won() && !fresh.is_game_over());
    }

    #[test]
    fn random_play_keeps_invariants() {
        let mut rng = StdRng::seed_from_u64(2048);
        for seed in 0..20 {
            let mut spawner = RngSpawner::new(StdRng::seed_from_u64(seed));
            let mut g = new_game(DEFAULT_SIZE, &mut spawner).unwrap();
            let mut steps = 0;
            while !g.is_game_over() && steps < 2_000 {
                let dir = Move::ALL[rng.gen_range(0..4)];
                let before = g.clone();
                let out = g.apply_move(dir, &mut spawner).unwrap();
                let after = &out.state;

                let positions: HashSet<_> = after.board().tiles().map(|t| t.position).collect();
                let ids: HashSet<_> = after.board().tiles().map(|t| t.id).collect();
                assert!(after.board().tile_count() <= 16);
                assert_eq!(positions.len(), after.board().tile_count());
                assert_eq!(ids.len(), after.board().tile_count());
                assert!(after.board().tiles().all(|t| t.value >= 2 && t.value.is_power_of_two()));
                assert!(before.has_won() <= after.has_won());

                if out.changed {
                    assert_eq!(after.score(), before.score() + out.score_delta);
                    assert_eq!(
                        after.board().tile_count(),
                        before.board().tile_count() - out.merges as usize + 1
                    );
                } else {
                    assert_eq!(after, &before);
                }
                g = out.state;
                steps += 1;
            }
        }
    }
}
