//! Headless evolution runner
//!
//! Runs a full evolution to completion without a window and prints the
//! final leaderboard. The best creature can be saved to a `*.creature` file
//! and fed back into later runs.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use shinka::{GenerationConfig, GenerationManager, GenerationState, FIXED_TIME_STEP};

#[derive(Parser, Debug)]
#[command(name = "shinka", about = "Evolve box creatures toward locomotion")]
struct Args {
    /// Number of generations to run
    #[arg(long, default_value_t = 10)]
    generations: u32,

    /// Evaluation window per generation, in seconds
    #[arg(long, default_value_t = 15.0)]
    duration: f32,

    /// Population size
    #[arg(long, default_value_t = 50)]
    population: usize,

    /// Survivors kept at each generation boundary
    #[arg(long, default_value_t = 10)]
    survivors: usize,

    /// Per-field mutation probability
    #[arg(long, default_value_t = 0.3)]
    mutation_chance: f32,

    /// Multiplicative mutation severity
    #[arg(long, default_value_t = 0.5)]
    mutation_severity: f32,

    /// RNG seed; the same seed reproduces the same run
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Creature files to preload into the inspection pool
    #[arg(long)]
    load: Vec<PathBuf>,

    /// Seed the initial population from the loaded creatures
    #[arg(long)]
    seed_from_loaded: bool,

    /// Where to save the best evolved creature
    #[arg(long)]
    save_best: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut manager = GenerationManager::new(args.seed);
    for path in &args.load {
        manager.load_creature(path)?;
    }

    manager.start(GenerationConfig {
        generation_count: args.generations,
        generation_duration: args.duration,
        survivor_count: args.survivors,
        mutation_chance: args.mutation_chance,
        mutation_severity: args.mutation_severity,
        population_size: args.population,
        seed_from_loaded: args.seed_from_loaded,
    });

    while manager.state() == GenerationState::Running {
        manager.simulate(FIXED_TIME_STEP);
    }
    manager.update();

    println!("rank  fitness");
    for (rank, fitness) in manager.result_fitness_ranking().iter().enumerate() {
        println!("{:>4}  {:>8.3}", rank + 1, fitness);
    }

    if let Some(path) = args.save_best {
        let best = manager.result_creature(0)?;
        shinka_creature::save_creature(best, &path)?;
        println!("saved best creature to {}", path.display());
    }

    Ok(())
}
