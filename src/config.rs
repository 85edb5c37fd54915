//! TOML configuration for the binaries.
//!
//! ```toml
//! [game]
//! size = 4
//!
//! [input]
//! swipe_threshold = 20.0
//!
//! [leaderboard]
//! db_path = "leaderboard.db"
//! top_n = 10
//! utc_offset_minutes = 0
//!
//! [storage]
//! best_score_path = "best_score.json"
//! traces_dir = "traces"
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::Board;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub game: Game,
    #[serde(default)]
    pub input: Input,
    #[serde(default)]
    pub leaderboard: Leaderboard,
    #[serde(default)]
    pub storage: Storage,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Game {
    #[serde(default = "defaults::size")]
    pub size: usize,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Input {
    /// Minimum swipe length in pixels.
    #[serde(default = "defaults::swipe_threshold")]
    pub swipe_threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Leaderboard {
    #[serde(default = "defaults::db_path")]
    pub db_path: PathBuf,
    #[serde(default = "defaults::top_n")]
    pub top_n: usize,
    /// Offset from UTC used to decide when a week starts.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Storage {
    #[serde(default = "defaults::best_score_path")]
    pub best_score_path: PathBuf,
    #[serde(default)]
    pub traces_dir: Option<PathBuf>,
}

impl Default for Game {
    fn default() -> Self {
        Self { size: defaults::size() }
    }
}

impl Default for Input {
    fn default() -> Self {
        Self { swipe_threshold: defaults::swipe_threshold() }
    }
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self { db_path: defaults::db_path(), top_n: defaults::top_n(), utc_offset_minutes: 0 }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self { best_score_path: defaults::best_score_path(), traces_dir: None }
    }
}

impl Config {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_toml(p),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.game.size < Board::MIN_SIZE {
            return Err(ConfigError::Invalid(format!(
                "game.size must be at least {}, got {}",
                Board::MIN_SIZE,
                self.game.size
            )));
        }
        if !self.input.swipe_threshold.is_finite() || self.input.swipe_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "input.swipe_threshold must be a non-negative number, got {}",
                self.input.swipe_threshold
            )));
        }
        if self.leaderboard.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::Invalid(format!(
                "leaderboard.utc_offset_minutes must be within ±1440, got {}",
                self.leaderboard.utc_offset_minutes
            )));
        }
        Ok(())
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn size() -> usize { crate::engine::DEFAULT_SIZE }
    pub fn swipe_threshold() -> f64 { crate::input::DEFAULT_SWIPE_THRESHOLD }
    pub fn db_path() -> PathBuf { PathBuf::from("leaderboard.db") }
    pub fn top_n() -> usize { crate::leaderboard::DEFAULT_TOP_N }
    pub fn best_score_path() -> PathBuf { PathBuf::from("best_score.json") }
}
