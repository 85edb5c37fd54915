use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use mini_2048::config::Config;
use mini_2048::engine::{GameState, Move};
use mini_2048::leaderboard::{week_bucket, LeaderboardStore, SqliteLeaderboard};
use mini_2048::trace::{self, GameTrace, TraceRecorder};

#[derive(Debug, Parser)]
#[command(name = "simulate", about = "Self-play 2048 games with a random policy, in parallel")]
struct Args {
    /// TOML config file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of games to play
    #[arg(short = 'n', long, default_value_t = 100)]
    games: u64,

    /// Seed of the first game; game i uses `base_seed + i`
    #[arg(long, default_value_t = 0)]
    base_seed: u64,

    /// Stop a game after this many moves
    #[arg(long)]
    max_moves: Option<u32>,

    /// Write one trace per game into this directory
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Submit every game to the configured leaderboard as `sim-<seed>`
    #[arg(long)]
    submit: bool,

    /// Number of worker threads (defaults to Rayon default)
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Suppress the progress bar
    #[arg(long)]
    quiet: bool,
}

struct GameSummary {
    trace: GameTrace,
    highest_tile: u32,
    score: u64,
    won: bool,
}

/// Play one game, choosing uniformly among the directions that change the board.
fn run_single_game(size: usize, seed: u64, max_moves: Option<u32>) -> Result<GameSummary> {
    let mut spawner = trace::seeded_spawner(seed);
    let mut policy = StdRng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
    let mut state = GameState::new(size, &mut spawner)?;
    let mut recorder = TraceRecorder::new(size, seed).with_player(format!("sim-{seed}"));

    while !state.is_game_over() {
        if max_moves.is_some_and(|limit| state.moves() >= limit) {
            break;
        }
        let legal: Vec<Move> = Move::ALL.into_iter().filter(|&d| state.can_shift(d)).collect();
        if legal.is_empty() {
            break;
        }
        let dir = legal[policy.gen_range(0..legal.len())];
        state = state.make_move(dir, &mut spawner)?;
        recorder.record(dir);
    }

    Ok(GameSummary {
        highest_tile: state.board().highest_tile(),
        score: state.score(),
        won: state.has_won(),
        trace: recorder.finish(&state),
    })
}

fn write_trace(dir: &Path, game: &GameSummary) -> Result<()> {
    let path = dir.join(format!("sim-{:08}.m2k", game.trace.meta.seed));
    trace::write_trace_to_path(&path, &game.trace).with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cfg = Config::load(args.config.as_deref()).context("loading config")?;

    if let Some(n) = args.workers {
        rayon::ThreadPoolBuilder::new().num_threads(n).build_global()?;
    }
    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir)?;
    }

    let pb = if args.quiet { ProgressBar::hidden() } else { ProgressBar::new(args.games) };
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} games ({eta})")?
            .progress_chars("=>-"),
    );

    let start = Instant::now();
    let size = cfg.game.size;
    let games: Vec<GameSummary> = (0..args.games)
        .into_par_iter()
        .map(|i| {
            let game = run_single_game(size, args.base_seed.wrapping_add(i), args.max_moves)?;
            if let Some(dir) = &args.out_dir {
                write_trace(dir, &game)?;
            }
            pb.inc(1);
            Ok(game)
        })
        .collect::<Result<Vec<_>>>()?;
    pb.finish_and_clear();
    let elapsed = start.elapsed().as_secs_f64().max(1e-6);

    if args.submit {
        let mut lb = SqliteLeaderboard::open(&cfg.leaderboard.db_path)
            .with_context(|| format!("opening {}", cfg.leaderboard.db_path.display()))?;
        let week = week_bucket(Utc::now(), cfg.leaderboard.utc_offset_minutes);
        for game in &games {
            lb.submit(&format!("sim-{}", game.trace.meta.seed), game.score, week)?;
        }
        info!("submitted {} games to week {week}", games.len());
    }

    let total_moves: usize = games.iter().map(|g| g.trace.moves.len()).sum();
    let total_score: u64 = games.iter().map(|g| g.score).sum();
    let wins = games.iter().filter(|g| g.won).count();
    let best = games.iter().map(|g| g.score).max().unwrap_or(0);
    let mut tiles: BTreeMap<u32, usize> = BTreeMap::new();
    for g in &games {
        *tiles.entry(g.highest_tile).or_default() += 1;
    }

    let n = games.len().max(1) as f64;
    println!(
        "Games: {} | moves/sec: {:.1} | mean score: {:.1} | best score: {} | wins: {}",
        games.len(),
        total_moves as f64 / elapsed,
        total_score as f64 / n,
        best,
        wins
    );
    for (tile, count) in tiles.iter().rev() {
        println!("  highest tile {:>6}: {:>6} ({:.1}%)", tile, count, 100.0 * *count as f64 / n);
    }
    Ok(())
}
