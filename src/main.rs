//! # Connect 4 MCTS Arena
//!
//! Plays a series of games between two difficulty profiles and prints every
//! final board and the overall tally. Games run in parallel on a rayon pool;
//! each game is single-threaded.
//!
//! ## Usage
//! Run with `cargo run --release --bin play -- --first hard --second normal --games 10`
//! for best performance.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use mcts::config::{self, AppConfig, Difficulty};
use mcts::game_controller::{self, GameRecord, SeriesTally};
use mcts::games::connect4::{Connect4State, GameStatus, PLAYER_A, PLAYER_B};
use mcts::logging::init_logging;
use mcts::players::MctsPlayer;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Profile of the first participant (normal, hard, god)
    #[clap(short, long, default_value_t = Difficulty::Hard)]
    first: Difficulty,

    /// Profile of the second participant
    #[clap(short, long, default_value_t = Difficulty::Normal)]
    second: Difficulty,

    /// Number of games; the first participant opens the even ones
    #[clap(short, long, default_value_t = 2)]
    games: u32,

    /// Base seed for all players; random if omitted
    #[clap(long)]
    seed: Option<u64>,

    /// Config file instead of the connect4.toml search
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Worker threads for parallel games
    #[clap(short = 'n', long, default_value_t = num_cpus::get())]
    threads: usize,

    /// Only print the tally
    #[clap(short, long, action = clap::ArgAction::SetTrue)]
    quiet: bool,
}

fn load(args: &Args) -> Result<AppConfig> {
    match &args.config {
        Some(path) => config::load_from_path(path)
            .map(config::apply_env_overrides)
            .with_context(|| format!("loading {}", path.display())),
        None => config::load_config().context("loading configuration"),
    }
}

/// Renders a board with colored discs, top row first.
fn render_board(state: &Connect4State) -> String {
    let mut out = String::new();
    for line in state.to_string().lines() {
        let row: Vec<String> = line
            .split_whitespace()
            .map(|cell| match cell {
                "X" => "X".red().bold().to_string(),
                "O" => "O".yellow().bold().to_string(),
                "." => ".".dimmed().to_string(),
                other => other.to_string(),
            })
            .collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}

fn color_name(player: i32) -> &'static str {
    if player == PLAYER_A {
        "X"
    } else {
        "O"
    }
}

fn describe(record: &GameRecord, first: Difficulty, second: Difficulty) -> String {
    let second_color = if record.first_color == PLAYER_A { PLAYER_B } else { PLAYER_A };
    let result = match record.status {
        GameStatus::Won(w) if w == record.first_color => format!("{} ({}) wins", first, color_name(w)).green(),
        GameStatus::Won(w) => format!("{} ({}) wins", second, color_name(w)).red(),
        GameStatus::Draw => "draw".cyan(),
        GameStatus::InProgress => "unfinished".normal(),
    };
    format!(
        "{} as {} vs {} as {}: {} after {} moves [{}]",
        first,
        color_name(record.first_color),
        second,
        color_name(second_color),
        result,
        record.moves.len(),
        record
            .moves
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    )
}

fn main() -> Result<()> {
    let args = Args::parse();
    let app_config = load(&args)?;
    init_logging(&app_config.log.level);

    let first_config = app_config.profile(args.first).clone();
    let second_config = app_config.profile(args.second).clone();
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(
        first = %args.first,
        second = %args.second,
        games = args.games,
        seed,
        threads = args.threads,
        "starting arena"
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(args.threads.max(1))
        .build()
        .context("building thread pool")?;

    let start = Instant::now();
    let records: Vec<GameRecord> = pool.install(|| {
        (0..args.games)
            .into_par_iter()
            .map(|index| {
                let game_seed = seed.wrapping_add(u64::from(index).wrapping_mul(1_000_003));
                let mut first = MctsPlayer::with_seed(first_config.clone(), game_seed);
                let mut second = MctsPlayer::with_seed(second_config.clone(), game_seed ^ 0x5eed);
                game_controller::play_series_game(index, &mut first, &mut second)
            })
            .collect()
    });

    let mut tally = SeriesTally::default();
    for (index, record) in records.iter().enumerate() {
        tally.record(record.status, record.first_color);
        if !args.quiet {
            println!("{}", format!("Game {}", index + 1).bold());
            println!("{}", describe(record, args.first, args.second));
            println!("{}", render_board(&record.final_state));
        }
    }

    println!("{}", "Tally".bold().underline());
    println!("  {:<8} wins: {}", args.first.to_string(), tally.first_wins);
    println!("  {:<8} wins: {}", args.second.to_string(), tally.second_wins);
    println!("  draws        : {}", tally.draws);
    println!("  seed         : {}", seed);
    println!("  time         : {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}
