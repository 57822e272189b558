use anyhow::{Context, Result};
use clap::Parser;
use mcts::config::{self, Difficulty};
use mcts::games::connect4::Connect4State;
use mcts::logging::init_logging;
use mcts::search::{Mcts, SearchStats};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Profile to benchmark (default: all)
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Searches per profile (default: 3)
    #[arg(long, default_value_t = 3)]
    searches: u32,

    /// Override max_count of every profile
    #[arg(long)]
    simulations: Option<u32>,

    /// Seed of the rollout player (default: 42)
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let app_config = config::load_config().context("loading configuration")?;
    init_logging(&app_config.log.level);

    println!("Connect 4 MCTS - Benchmark Tool");
    println!("===============================");
    println!("Searches per profile: {}", args.searches);
    println!("Seed: {}", args.seed);
    println!("-------------------------------");

    #[cfg(debug_assertions)]
    println!("WARNING: Running in debug mode. Performance will be significantly lower.\nUse --release for accurate benchmarks.\n");

    let difficulties = match args.difficulty {
        Some(d) => vec![d],
        None => Difficulty::ALL.to_vec(),
    };

    let game = Connect4State::new();
    for difficulty in difficulties {
        let mut search_config = app_config.profile(difficulty).clone().with_reuse_tree(false);
        if let Some(n) = args.simulations {
            search_config = search_config.with_max_count(n);
        }
        search_config
            .validate()
            .with_context(|| format!("invalid {} profile", difficulty))?;

        println!("\nRunning {} ({} simulations, depth {})...", difficulty, search_config.max_count, search_config.max_depth);
        let mut mcts = Mcts::with_seed(search_config, args.seed);

        let start = Instant::now();
        let mut total = SearchStats {
            simulations: 0,
            tree_size: 0,
            elapsed: Duration::ZERO,
        };
        let mut last_action = None;
        let mut last_probability = 0.0;
        for _ in 0..args.searches {
            let result = mcts.search(&game);
            total.simulations += result.stats.simulations;
            total.tree_size = total.tree_size.max(result.stats.tree_size);
            last_action = Some(result.action);
            last_probability = result.winning_probability;
        }
        total.elapsed = start.elapsed();

        print_stats(difficulty, &total);
        if let Some(action) = last_action {
            println!("  Opening move: {} (winning probability {:.3})", action, last_probability);
        }
    }

    Ok(())
}

fn print_stats(difficulty: Difficulty, stats: &SearchStats) {
    println!("{} Results:", difficulty);
    println!("  Simulations: {}", stats.simulations);
    println!("  Largest tree: {} nodes", stats.tree_size);
    println!("  Time: {:.3}s", stats.elapsed.as_secs_f64());
    println!("  SPS: {:.0} sims/sec", stats.simulations_per_second());
}
