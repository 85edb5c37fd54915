use std::path::Path;

use chrono::{NaiveDate, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use super::{normalize_player, rank, week_key, LeaderboardError, LeaderboardStore, Standing};

/// Leaderboard persisted in a SQLite database.
///
/// Schema:
/// - weekly_scores(week TEXT, player TEXT, score INTEGER, updated_at INTEGER),
///   primary key (week, player); `week` is the Monday as `YYYY-MM-DD`.
pub struct SqliteLeaderboard {
    conn: Connection,
}

impl SqliteLeaderboard {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LeaderboardError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, LeaderboardError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, LeaderboardError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weekly_scores (
                week TEXT NOT NULL,
                player TEXT NOT NULL,
                score INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (week, player)
            );
            "#,
        )?;
        Ok(Self { conn })
    }
}

impl LeaderboardStore for SqliteLeaderboard {
    fn submit(&mut self, player: &str, score: u64, week: NaiveDate) -> Result<bool, LeaderboardError> {
        let player = normalize_player(player)?;
        let score_db = i64::try_from(score).map_err(|_| LeaderboardError::ScoreOutOfRange(score))?;
        let week = week_key(week);
        let changed = self.conn.execute(
            "INSERT INTO weekly_scores (week, player, score, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(week, player) DO UPDATE SET score=excluded.score, updated_at=excluded.updated_at
             WHERE excluded.score > weekly_scores.score",
            params![week, player, score_db, Utc::now().timestamp()],
        )?;
        debug!("submit {player} {score} for {week}: rows changed={changed}");
        Ok(changed > 0)
    }

    fn top(&self, week: NaiveDate, limit: usize) -> Result<Vec<Standing>, LeaderboardError> {
        let limit_db = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT player, score FROM weekly_scores WHERE week = ?1
             ORDER BY score DESC, player ASC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![week_key(week), limit_db], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?.max(0) as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        // Already ordered; `rank` keeps the same order and assigns positions.
        Ok(rank(rows, limit))
    }

    fn best_for(&self, player: &str, week: NaiveDate) -> Result<Option<u64>, LeaderboardError> {
        let player = normalize_player(player)?;
        let best = self
            .conn
            .query_row(
                "SELECT score FROM weekly_scores WHERE week = ?1 AND player = ?2",
                params![week_key(week), player],
                |r| r.get::<_, i64>(0),
            )
            .optional()?;
        Ok(best.map(|s| s.max(0) as u64))
    }
}
