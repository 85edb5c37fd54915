//! Session host: owns the current game, the payment gate and the best score.
//!
//! The engine itself knows nothing about payments or storage; this is the
//! thin layer a UI drives.
//!
//! ```
//! use mini_2048::engine::{Move, RngSpawner};
//! use mini_2048::session::{MemoryBestScore, Session, SessionError};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let spawner = RngSpawner::new(StdRng::seed_from_u64(9));
//! let mut session = Session::new(4, spawner, MemoryBestScore::default());
//! assert!(matches!(session.start(), Err(SessionError::PaymentRequired)));
//! session.confirm_payment(true);
//! session.start().unwrap();
//! session.input(Move::Left).unwrap();
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, GameState, Move, MoveOutcome, SpawnSource};
use crate::leaderboard::{week_bucket, LeaderboardError, LeaderboardStore};

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("payment not confirmed; a new game cannot start")]
    PaymentRequired,
    #[error("no game in progress")]
    NoActiveGame,
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),
    #[error("best score io error: {0}")]
    Io(#[from] io::Error),
    #[error("best score file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the best score lives between sessions.
pub trait BestScoreStore {
    fn load(&self) -> Result<u64, SessionError>;
    fn save(&mut self, best: u64) -> Result<(), SessionError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryBestScore(pub u64);

impl BestScoreStore for MemoryBestScore {
    fn load(&self) -> Result<u64, SessionError> {
        Ok(self.0)
    }

    fn save(&mut self, best: u64) -> Result<(), SessionError> {
        self.0 = best;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BestScoreFile {
    best_score: u64,
}

/// Best score kept in a small JSON file (`{"best_score": 1234}`).
///
/// A missing file reads as 0.
#[derive(Debug, Clone)]
pub struct FileBestScore {
    path: PathBuf,
}

impl FileBestScore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileBestScore { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BestScoreStore for FileBestScore {
    fn load(&self) -> Result<u64, SessionError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice::<BestScoreFile>(&bytes)?.best_score),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, best: u64) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&BestScoreFile { best_score: best })?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Result of feeding one directional input to a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputReport {
    pub changed: bool,
    pub score: u64,
    pub score_delta: u64,
    pub best_score: u64,
    pub just_won: bool,
    pub game_over: bool,
}

/// One player's session: at most one active game at a time.
pub struct Session<S, B> {
    size: usize,
    spawner: S,
    best: B,
    best_score: u64,
    may_start: bool,
    game: Option<GameState>,
}

impl<S: SpawnSource, B: BestScoreStore> Session<S, B> {
    /// Create a session; the persisted best score is loaded eagerly and a
    /// store that cannot be read counts as 0.
    pub fn new(size: usize, spawner: S, best: B) -> Self {
        let best_score = best.load().unwrap_or_else(|e| {
            warn!("could not load best score, starting from 0: {e}");
            0
        });
        Session { size, spawner, best, best_score, may_start: false, game: None }
    }

    /// Feed the external payment confirmation. A failure closes the gate.
    pub fn confirm_payment(&mut self, confirmed: bool) {
        if confirmed != self.may_start {
            info!("payment gate {}", if confirmed { "opened" } else { "closed" });
        }
        self.may_start = confirmed;
    }

    #[inline]
    pub fn may_start(&self) -> bool {
        self.may_start
    }

    /// Start (or restart) a game. Requires a confirmed payment.
    pub fn start(&mut self) -> Result<&GameState, SessionError> {
        if !self.may_start {
            return Err(SessionError::PaymentRequired);
        }
        let state = GameState::new(self.size, &mut self.spawner)?.with_best_score(self.best_score);
        info!("new game started ({}x{}), best score {}", self.size, self.size, self.best_score);
        Ok(&*self.game.insert(state))
    }

    /// Swap the random source, e.g. to reseed before recording a new game.
    pub fn replace_spawner(&mut self, spawner: S) -> S {
        std::mem::replace(&mut self.spawner, spawner)
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    #[inline]
    pub fn best_score(&self) -> u64 {
        self.best_score
    }

    /// Apply one direction to the active game and persist a new best score.
    pub fn input(&mut self, dir: Move) -> Result<InputReport, SessionError> {
        let game = self.game.as_ref().ok_or(SessionError::NoActiveGame)?;
        let MoveOutcome { state, changed, score_delta, just_won, .. } = game.apply_move(dir, &mut self.spawner)?;
        if state.score() > self.best_score {
            self.best_score = state.score();
            if let Err(e) = self.best.save(self.best_score) {
                warn!("could not persist best score {}: {e}", self.best_score);
            }
        }
        let report = InputReport {
            changed,
            score: state.score(),
            score_delta,
            best_score: self.best_score,
            just_won,
            game_over: state.is_game_over(),
        };
        self.game = Some(state);
        Ok(report)
    }

    /// Parse a direction name and apply it; unknown names leave everything untouched.
    pub fn input_named(&mut self, dir: &str) -> Result<InputReport, SessionError> {
        let dir: Move = dir.parse()?;
        self.input(dir)
    }

    /// Submit the active game's score to the weekly leaderboard.
    pub fn submit_score<L: LeaderboardStore + ?Sized>(
        &self,
        leaderboard: &mut L,
        player: &str,
        now: DateTime<Utc>,
        utc_offset_minutes: i32,
    ) -> Result<bool, SessionError> {
        let game = self.game.as_ref().ok_or(SessionError::NoActiveGame)?;
        let week = week_bucket(now, utc_offset_minutes);
        let improved = leaderboard.submit(player, game.score(), week)?;
        debug!("submitted {} for {player} in week {week}: improved={improved}", game.score());
        Ok(improved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Board, Position, ScriptedSpawner};
    use crate::leaderboard::MemoryLeaderboard;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn scripted(spawns: &[(usize, usize, u32)]) -> ScriptedSpawner {
        ScriptedSpawner::new(spawns.iter().map(|&(r, c, v)| (Position::new(r, c), v)))
    }

    fn paid_session(spawns: &[(usize, usize, u32)], best: u64) -> Session<ScriptedSpawner, MemoryBestScore> {
        let mut s = Session::new(4, scripted(spawns), MemoryBestScore(best));
        s.confirm_payment(true);
        s
    }

    #[test]
    fn start_requires_payment() {
        let mut s = Session::new(4, ScriptedSpawner::default(), MemoryBestScore::default());
        assert!(matches!(s.start(), Err(SessionError::PaymentRequired)));
        s.confirm_payment(true);
        assert!(s.start().is_ok());
        s.confirm_payment(false);
        assert!(matches!(s.start(), Err(SessionError::PaymentRequired)));
        // The running game is not affected by the gate.
        assert!(s.game().is_some());
    }

    #[test]
    fn input_without_game_is_rejected() {
        let mut s = paid_session(&[], 0);
        assert!(matches!(s.input(Move::Up), Err(SessionError::NoActiveGame)));
    }

    #[test]
    fn invalid_direction_leaves_game_untouched() {
        let mut s = paid_session(&[(0, 0, 2), (0, 1, 2)], 0);
        s.start().unwrap();
        let before = s.game().cloned();
        assert!(matches!(
            s.input_named("sideways"),
            Err(SessionError::Engine(EngineError::InvalidDirection(_)))
        ));
        assert_eq!(s.game().cloned(), before);
    }

    #[test]
    fn best_score_persists_on_improvement() {
        // Seeds at (0,0) and (0,1), both 2: a left move merges them.
        let mut s = paid_session(&[(0, 0, 2), (0, 1, 2), (3, 3, 2)], 2);
        s.start().unwrap();
        let report = s.input(Move::Left).unwrap();
        assert!(report.changed);
        assert_eq!(report.score, 4);
        assert_eq!(report.best_score, 4);
        assert_eq!(s.best.0, 4);

        // Restart keeps the best score, resets the game score.
        let g = s.start().unwrap();
        assert_eq!((g.score(), g.best_score()), (0, 4));
    }

    #[test]
    fn file_best_score_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut store = FileBestScore::new(dir.path().join("nested").join("best.json"));
        assert_eq!(store.load().unwrap(), 0);
        store.save(8192).unwrap();
        assert_eq!(store.load().unwrap(), 8192);

        fs::write(store.path(), b"not json").unwrap();
        assert!(matches!(store.load(), Err(SessionError::Json(_))));
        // Unreadable best score does not block a session.
        let s = Session::new(4, ScriptedSpawner::default(), store);
        assert_eq!(s.best_score(), 0);
    }

    #[test]
    fn submits_current_score_to_week_bucket() {
        let mut s = paid_session(&[(0, 0, 2), (0, 1, 2), (3, 3, 2)], 0);
        s.start().unwrap();
        s.input(Move::Left).unwrap();
        let mut lb = MemoryLeaderboard::default();
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap();
        assert!(s.submit_score(&mut lb, "0xabc", now, 0).unwrap());
        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        assert_eq!(lb.best_for("0xabc", monday).unwrap(), Some(4));
    }

    #[test]
    fn game_over_input_is_a_no_op() {
        let mut s = paid_session(&[], 0);
        let board = Board::from_rows(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
        s.game = Some(GameState::from_board(board, 100));
        let report = s.input(Move::Up).unwrap();
        assert!(!report.changed);
        assert!(report.game_over);
        assert_eq!(report.score, 100);
    }
}
