//! Weekly leaderboard: week bucketing and stores that keep one best score
//! per player per week.
//!
//! ```
//! use chrono::NaiveDate;
//! use mini_2048::leaderboard::{week_start, LeaderboardStore, MemoryLeaderboard};
//!
//! let week = week_start(NaiveDate::from_ymd_opt(2025, 3, 5).unwrap());
//! let mut board = MemoryLeaderboard::default();
//! board.submit("0xaaa", 1200, week).unwrap();
//! board.submit("0xbbb", 3400, week).unwrap();
//! board.submit("0xaaa", 800, week).unwrap();
//! let top = board.top(week, 10).unwrap();
//! assert_eq!(top[0].player, "0xbbb");
//! assert_eq!(top[1].score, 1200);
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

mod sqlite;
mod week;

pub use sqlite::SqliteLeaderboard;
pub use week::{parse_week, week_bucket, week_key, week_start, WEEK_KEY_FORMAT};

/// Default number of standings shown.
pub const DEFAULT_TOP_N: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum LeaderboardError {
    #[error("player identity must not be empty")]
    EmptyPlayer,
    #[error("score {0} does not fit the store")]
    ScoreOutOfRange(u64),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// One row of a weekly ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// 1-based.
    pub rank: usize,
    pub player: String,
    pub score: u64,
}

/// Storage for weekly best scores.
///
/// Weeks are identified by their Monday (see [`week_start`]); callers pass
/// any date and stores bucket it.
pub trait LeaderboardStore {
    /// Record `score` for `player`. Returns true if it is the player's new
    /// best for that week.
    fn submit(&mut self, player: &str, score: u64, week: NaiveDate) -> Result<bool, LeaderboardError>;

    /// Best `limit` players of the week, highest score first, ties by player id.
    fn top(&self, week: NaiveDate, limit: usize) -> Result<Vec<Standing>, LeaderboardError>;

    /// The player's best score for the week, if any.
    fn best_for(&self, player: &str, week: NaiveDate) -> Result<Option<u64>, LeaderboardError>;
}

/// Abbreviate a wallet address for display: `0x1234...abcd`.
///
/// ```
/// use mini_2048::leaderboard::format_address;
/// assert_eq!(format_address("0xb4bd7d410543cb27f42c562ab3ff5dc12fbdd42f"), "0xb4bd...d42f");
/// assert_eq!(format_address(""), "Anonymous");
/// ```
pub fn format_address(address: &str) -> String {
    let chars: Vec<char> = address.trim().chars().collect();
    if chars.is_empty() {
        return "Anonymous".to_string();
    }
    if chars.len() <= 10 {
        return chars.into_iter().collect();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub(crate) fn normalize_player(player: &str) -> Result<&str, LeaderboardError> {
    let player = player.trim();
    if player.is_empty() {
        return Err(LeaderboardError::EmptyPlayer);
    }
    Ok(player)
}

fn rank<I: IntoIterator<Item = (String, u64)>>(entries: I, limit: usize) -> Vec<Standing> {
    let mut entries: Vec<_> = entries.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, (player, score))| Standing { rank: idx + 1, player, score })
        .collect()
}

/// In-process store; contents are lost with the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryLeaderboard {
    weeks: HashMap<NaiveDate, HashMap<String, u64>>,
}

impl LeaderboardStore for MemoryLeaderboard {
    fn submit(&mut self, player: &str, score: u64, week: NaiveDate) -> Result<bool, LeaderboardError> {
        let player = normalize_player(player)?;
        let week = week_start(week);
        let improved = match self.weeks.entry(week).or_default().entry(player.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(score);
                true
            }
            Entry::Occupied(mut slot) => {
                let better = score > *slot.get();
                if better {
                    slot.insert(score);
                }
                better
            }
        };
        debug!("submit {player} {score} for {week}: improved={improved}");
        Ok(improved)
    }

    fn top(&self, week: NaiveDate, limit: usize) -> Result<Vec<Standing>, LeaderboardError> {
        let Some(scores) = self.weeks.get(&week_start(week)) else {
            return Ok(Vec::new());
        };
        Ok(rank(scores.iter().map(|(p, &s)| (p.clone(), s)), limit))
    }

    fn best_for(&self, player: &str, week: NaiveDate) -> Result<Option<u64>, LeaderboardError> {
        let player = normalize_player(player)?;
        Ok(self.weeks.get(&week_start(week)).and_then(|w| w.get(player)).copied())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    /// Contract shared by every store implementation.
    pub(crate) fn exercise_store<S: LeaderboardStore>(store: &mut S) {
        let week = monday();
        let next_week = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        assert!(store.submit("carol", 500, week).unwrap());
        assert!(store.submit("alice", 900, week).unwrap());
        assert!(store.submit("bob", 900, week).unwrap());
        assert!(!store.submit("alice", 300, week).unwrap());
        assert!(store.submit("carol", 1500, week).unwrap());
        // Thursday of the same week lands in the same bucket.
        assert!(!store.submit("alice", 900, NaiveDate::from_ymd_opt(2025, 3, 6).unwrap()).unwrap());
        assert!(store.submit("dave", 10_000, next_week).unwrap());

        let top = store.top(week, 10).unwrap();
        let rows: Vec<_> = top.iter().map(|s| (s.rank, s.player.as_str(), s.score)).collect();
        assert_eq!(rows, vec![(1, "carol", 1500), (2, "alice", 900), (3, "bob", 900)]);

        let top2 = store.top(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(), 2).unwrap();
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[1].player, "alice");

        assert_eq!(store.best_for("alice", week).unwrap(), Some(900));
        assert_eq!(store.best_for("dave", week).unwrap(), None);
        assert_eq!(store.best_for("dave", next_week).unwrap(), Some(10_000));
        assert!(store.top(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(), 5).unwrap().is_empty());

        // A first submission counts as a new best even when it scores nothing.
        let quiet_week = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        assert!(store.submit("erin", 0, quiet_week).unwrap());
        assert!(!store.submit("erin", 0, quiet_week).unwrap());
        assert_eq!(store.best_for("erin", quiet_week).unwrap(), Some(0));

        assert!(matches!(store.submit("   ", 10, week), Err(LeaderboardError::EmptyPlayer)));
    }

    #[test]
    fn memory_store_contract() {
        exercise_store(&mut MemoryLeaderboard::default());
    }

    #[test]
    fn format_address_edges() {
        assert_eq!(format_address("0x1234"), "0x1234");
        assert_eq!(format_address("  "), "Anonymous");
        assert_eq!(format_address("0x833589fCD6eDb6E08f4c7C32D4f71b1566dA8b16"), "0x8335...8b16");
    }
}
