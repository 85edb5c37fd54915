use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};
use rand::rngs::StdRng;
use serde_json::json;

use mini_2048::config::Config;
use mini_2048::engine::{GameState, RngSpawner};
use mini_2048::input::key_to_move;
use mini_2048::leaderboard::{format_address, parse_week, week_bucket, LeaderboardStore, SqliteLeaderboard};
use mini_2048::session::{FileBestScore, Session};
use mini_2048::trace::{self, TraceRecorder};

#[derive(Debug, Parser)]
#[command(
    name = "mini-2048",
    version,
    about = "Play 2048 in the terminal, replay recorded games, list the weekly leaderboard"
)]
struct Cli {
    /// TOML config file (defaults apply when omitted)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive play: w/a/s/d or up/down/left/right, n for a new game, q to quit
    Play {
        /// Seed for the first game (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
        /// Player identity used for leaderboard submissions
        #[arg(long)]
        player: Option<String>,
        /// Write a trace of every finished game to `storage.traces_dir`
        #[arg(long)]
        record: bool,
    },
    /// Replay a recorded trace and verify its final score
    Replay {
        path: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the standings of a week
    Leaderboard {
        /// Any date of the week (YYYY-MM-DD); current week when omitted
        #[arg(long)]
        week: Option<String>,
        /// Number of entries (defaults to `leaderboard.top_n`)
        #[arg(long)]
        top: Option<usize>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

type TerminalSession = Session<RngSpawner<StdRng>, FileBestScore>;

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cfg = Config::load(cli.config.as_deref()).context("loading config")?;

    match cli.cmd {
        Command::Play { seed, player, record } => play(&cfg, seed, player, record),
        Command::Replay { path, json } => replay(&path, json),
        Command::Leaderboard { week, top, json } => leaderboard(&cfg, week, top, json),
    }
}

fn play(cfg: &Config, seed: Option<u64>, player: Option<String>, record: bool) -> Result<()> {
    if record && cfg.storage.traces_dir.is_none() {
        warn!("--record given but storage.traces_dir is not configured; traces will not be written");
    }
    let mut seed = seed.unwrap_or_else(rand::random);
    let mut session: TerminalSession = Session::new(
        cfg.game.size,
        trace::seeded_spawner(seed),
        FileBestScore::new(&cfg.storage.best_score_path),
    );
    // No wallet in the terminal: local play opens the gate directly.
    session.confirm_payment(true);
    let mut recorder = start_game(&mut session, seed, player.as_deref())?;
    print_game(session.game());

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        for token in line.split_whitespace() {
            match token {
                "q" | "quit" => {
                    finish_game(cfg, &session, recorder, player.as_deref(), record)?;
                    return Ok(());
                }
                "n" | "new" => {
                    finish_game(cfg, &session, recorder, player.as_deref(), record)?;
                    seed = rand::random();
                    session.replace_spawner(trace::seeded_spawner(seed));
                    recorder = start_game(&mut session, seed, player.as_deref())?;
                }
                key => match key_to_move(key) {
                    Some(dir) => {
                        let report = session.input(dir)?;
                        if report.changed {
                            recorder.record(dir);
                        }
                        if report.just_won {
                            println!("You reached 2048! Keep going.");
                        }
                        if report.game_over {
                            println!("Game over. n for a new game, q to quit.");
                        }
                    }
                    None => warn!("ignoring input {key:?}"),
                },
            }
        }
        print_game(session.game());
    }
    finish_game(cfg, &session, recorder, player.as_deref(), record)
}

fn start_game(session: &mut TerminalSession, seed: u64, player: Option<&str>) -> Result<TraceRecorder> {
    let size = session.start()?.size();
    info!("game seed {seed}");
    let recorder = TraceRecorder::new(size, seed);
    Ok(match player {
        Some(p) => recorder.with_player(p),
        None => recorder,
    })
}

fn finish_game(
    cfg: &Config,
    session: &TerminalSession,
    recorder: TraceRecorder,
    player: Option<&str>,
    record: bool,
) -> Result<()> {
    let Some(game) = session.game() else { return Ok(()) };
    if recorder.is_empty() {
        return Ok(());
    }
    if let Some(player) = player {
        let mut lb = SqliteLeaderboard::open(&cfg.leaderboard.db_path)
            .with_context(|| format!("opening {}", cfg.leaderboard.db_path.display()))?;
        let improved = session.submit_score(&mut lb, player, Utc::now(), cfg.leaderboard.utc_offset_minutes)?;
        info!("submitted score {} for {} (new weekly best: {improved})", game.score(), format_address(player));
    }
    if let (true, Some(dir)) = (record, cfg.storage.traces_dir.as_ref()) {
        let game_trace = recorder.finish(game);
        let path = dir.join(format!("game-{}-{}.m2k", game_trace.meta.start_unix_s, game_trace.meta.seed));
        trace::write_trace_to_path(&path, &game_trace).with_context(|| format!("writing {}", path.display()))?;
        info!("trace written to {}", path.display());
    }
    Ok(())
}

fn print_game(game: Option<&GameState>) {
    let Some(game) = game else { return };
    println!("{}", game.board());
    println!("Score: {} | Best: {} | Moves: {}", game.score(), game.best_score(), game.moves());
    let _ = io::stdout().flush();
}

fn replay(path: &Path, as_json: bool) -> Result<()> {
    let game_trace = trace::read_trace_from_path(path).with_context(|| format!("reading {}", path.display()))?;
    let state = trace::replay(&game_trace).with_context(|| format!("replaying {}", path.display()))?;
    if as_json {
        let out = json!({
            "meta": {
                "size": game_trace.meta.size,
                "seed": game_trace.meta.seed,
                "start_unix_s": game_trace.meta.start_unix_s,
                "player": game_trace.meta.player,
            },
            "moves": game_trace.moves.len(),
            "score": state.score(),
            "highest_tile": state.board().highest_tile(),
            "won": state.has_won(),
            "game_over": state.is_game_over(),
            "rows": state.board().rows(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", state.board());
        println!(
            "Replayed {} moves | score: {} | highest tile: {} | won: {}",
            game_trace.moves.len(),
            state.score(),
            state.board().highest_tile(),
            state.has_won()
        );
    }
    Ok(())
}

fn leaderboard(cfg: &Config, week: Option<String>, top: Option<usize>, as_json: bool) -> Result<()> {
    let week = match week {
        Some(w) => parse_week(&w).with_context(|| format!("invalid week {w:?}"))?,
        None => week_bucket(Utc::now(), cfg.leaderboard.utc_offset_minutes),
    };
    let lb = SqliteLeaderboard::open(&cfg.leaderboard.db_path)
        .with_context(|| format!("opening {}", cfg.leaderboard.db_path.display()))?;
    let standings = lb.top(week, top.unwrap_or(cfg.leaderboard.top_n))?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&json!({ "week": week.to_string(), "standings": standings }))?);
        return Ok(());
    }
    println!("Week of {week}");
    if standings.is_empty() {
        println!("No scores yet.");
    }
    for s in standings {
        println!("{:>3}. {:<16} {:>8}", s.rank, format_address(&s.player), s.score);
    }
    Ok(())
}
