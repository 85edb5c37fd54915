//! Compact game traces: enough to replay a game exactly (seed + moves),
//! plus a small summary for listings.
//!
//! Layout: `M2K1` magic, one version byte, postcard-encoded [`GameTrace`],
//! then a little-endian CRC32C of everything before it.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, GameState, Move, RngSpawner};

const MAGIC: &[u8; 4] = b"M2K1";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1;
const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub size: usize,
    pub seed: u64,
    pub start_unix_s: u64,
    pub final_score: u64,
    pub highest_tile: u32,
    pub won: bool,
    pub player: Option<String>,
}

/// A finished (or abandoned) game. `moves` holds effective moves only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTrace {
    pub meta: Meta,
    pub moves: Vec<Move>,
}

#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid magic or version")]
    MagicOrVersion,
    #[error("file too short or malformed")]
    Malformed,
    #[error("checksum mismatch")]
    Checksum,
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("recorded move {step} ({dir}) changes nothing on replay")]
    IneffectiveMove { step: usize, dir: Move },
    #[error("replayed score {actual} does not match recorded {expected}")]
    ScoreMismatch { expected: u64, actual: u64 },
}

/// Collects effective moves while a game is played.
#[derive(Debug, Clone)]
pub struct TraceRecorder {
    size: usize,
    seed: u64,
    start_unix_s: u64,
    player: Option<String>,
    moves: Vec<Move>,
}

impl TraceRecorder {
    pub fn new(size: usize, seed: u64) -> Self {
        TraceRecorder {
            size,
            seed,
            start_unix_s: now_unix_seconds(),
            player: None,
            moves: Vec::with_capacity(1024),
        }
    }

    pub fn with_player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into());
        self
    }

    pub fn record(&mut self, dir: Move) {
        self.moves.push(dir);
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Close the trace against the state the game ended in.
    pub fn finish(self, state: &GameState) -> GameTrace {
        GameTrace {
            meta: Meta {
                size: self.size,
                seed: self.seed,
                start_unix_s: self.start_unix_s,
                final_score: state.score(),
                highest_tile: state.board().highest_tile(),
                won: state.has_won(),
                player: self.player,
            },
            moves: self.moves,
        }
    }
}

pub fn encode_trace(trace: &GameTrace) -> Result<Vec<u8>, TraceError> {
    let mut buf = Vec::with_capacity(HEADER_LEN + trace.moves.len() + 64);
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&postcard::to_allocvec(trace)?);
    let checksum = crc32c::crc32c(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    Ok(buf)
}

pub fn parse_trace_bytes(bytes: &[u8]) -> Result<GameTrace, TraceError> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(TraceError::Malformed);
    }
    // Validate checksum first so truncation never reaches the decoder.
    let (content, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    let file_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    if file_crc != crc32c::crc32c(content) {
        return Err(TraceError::Checksum);
    }
    if &content[..4] != MAGIC || content[4] != VERSION {
        return Err(TraceError::MagicOrVersion);
    }
    Ok(postcard::from_bytes(&content[HEADER_LEN..])?)
}

pub fn write_trace_to_path<P: AsRef<Path>>(path: P, trace: &GameTrace) -> Result<(), TraceError> {
    let bytes = encode_trace(trace)?;
    if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

pub fn read_trace_from_path<P: AsRef<Path>>(path: P) -> Result<GameTrace, TraceError> {
    let data = fs::read(path)?;
    parse_trace_bytes(&data)
}

/// Spawner used for a recorded game: seeded `StdRng`.
pub fn seeded_spawner(seed: u64) -> RngSpawner<StdRng> {
    RngSpawner::new(StdRng::seed_from_u64(seed))
}

/// Re-run a trace from its seed and check it lands on the recorded score.
pub fn replay(trace: &GameTrace) -> Result<GameState, TraceError> {
    let mut spawner = seeded_spawner(trace.meta.seed);
    let mut state = GameState::new(trace.meta.size, &mut spawner)?;
    for (step, &dir) in trace.moves.iter().enumerate() {
        let out = state.apply_move(dir, &mut spawner)?;
        if !out.changed {
            return Err(TraceError::IneffectiveMove { step, dir });
        }
        state = out.state;
    }
    if state.score() != trace.meta.final_score {
        return Err(TraceError::ScoreMismatch { expected: trace.meta.final_score, actual: state.score() });
    }
    debug!("replayed {} moves, score {}", trace.moves.len(), state.score());
    Ok(state)
}

pub fn now_unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    /// Play `max_moves` cycling through the directions, recording effective ones.
    fn play(seed: u64, max_moves: usize) -> (GameTrace, GameState) {
        let mut spawner = seeded_spawner(seed);
        let mut state = GameState::new(4, &mut spawner).unwrap();
        let mut rec = TraceRecorder::new(4, seed).with_player("0xabc");
        for i in 0..max_moves {
            let dir = Move::ALL[i % 4];
            let out = state.apply_move(dir, &mut spawner).unwrap();
            if out.changed {
                rec.record(dir);
            }
            state = out.state;
        }
        (rec.finish(&state), state)
    }

    #[test]
    fn round_trip_file() {
        let (trace, _) = play(11, 60);
        let tmp = NamedTempFile::new().unwrap();
        write_trace_to_path(tmp.path(), &trace).unwrap();
        assert_eq!(read_trace_from_path(tmp.path()).unwrap(), trace);
    }

    #[test]
    fn replay_is_deterministic() {
        let (trace, state) = play(5, 200);
        assert!(!trace.moves.is_empty());
        let replayed = replay(&trace).unwrap();
        assert_eq!(replayed.board(), state.board());
        assert_eq!(replayed.score(), state.score());
    }

    #[test]
    fn replay_detects_tampering() {
        let (mut trace, _) = play(5, 50);
        trace.meta.final_score += 4;
        assert!(matches!(replay(&trace), Err(TraceError::ScoreMismatch { .. })));
    }

    #[test]
    fn replay_rejects_ineffective_moves() {
        // Keep pushing left until left no longer changes the board.
        let seed = 3;
        let mut spawner = seeded_spawner(seed);
        let mut state = GameState::new(4, &mut spawner).unwrap();
        let mut rec = TraceRecorder::new(4, seed);
        while state.can_shift(Move::Left) {
            assert!(rec.len() < 10_000, "left never got stuck");
            state = state.make_move(Move::Left, &mut spawner).unwrap();
            rec.record(Move::Left);
        }
        let pushed = rec.len();
        rec.record(Move::Left);
        let trace = rec.finish(&state);
        assert!(matches!(
            replay(&trace),
            Err(TraceError::IneffectiveMove { step, dir: Move::Left }) if step == pushed
        ));
    }

    #[test]
    fn size_survives_round_trip() {
        let seed = 8;
        let mut spawner = seeded_spawner(seed);
        let state = GameState::new(6, &mut spawner).unwrap();
        let trace = TraceRecorder::new(6, seed).finish(&state);
        let decoded = parse_trace_bytes(&encode_trace(&trace).unwrap()).unwrap();
        assert_eq!(decoded.meta.size, 6);
        assert_eq!(replay(&decoded).unwrap().board(), state.board());
    }

    #[test]
    fn checksum_mismatch() {
        let (trace, _) = play(1, 10);
        let mut bytes = encode_trace(&trace).unwrap();
        bytes[HEADER_LEN] ^= 0xFF;
        assert!(matches!(parse_trace_bytes(&bytes), Err(TraceError::Checksum)));
    }

    #[test]
    fn malformed_and_bad_magic() {
        assert!(matches!(parse_trace_bytes(b"M2K"), Err(TraceError::Malformed)));

        let (trace, _) = play(1, 10);
        let mut bytes = encode_trace(&trace).unwrap();
        bytes[0] = b'X';
        let body_len = bytes.len() - CHECKSUM_LEN;
        let crc = crc32c::crc32c(&bytes[..body_len]);
        bytes[body_len..].copy_from_slice(&crc.to_le_bytes());
        assert!(matches!(parse_trace_bytes(&bytes), Err(TraceError::MagicOrVersion)));
    }
}
