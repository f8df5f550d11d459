use std::path::PathBuf;

use anyhow::Context as _;
use breakcue_agent::DuelingDqnAgent;
use breakcue_sim::SimulationDriver;

use crate::util;

use super::AppContext;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    /// Number of games to simulate
    #[arg(long, default_value_t = 100)]
    games: usize,
    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
    /// Agent checkpoint, loaded if it exists and written after the run
    #[arg(long)]
    checkpoint: Option<PathBuf>,
    /// Exploration rate (overrides the configuration file)
    #[arg(long)]
    exploration_rate: Option<f64>,
    /// Output file path for the per-game results
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(ctx: &AppContext, arg: &SimulateArg) -> anyhow::Result<()> {
    let SimulateArg {
        games,
        seed,
        checkpoint,
        exploration_rate,
        output,
    } = arg;

    let mut rng = super::rng_from_seed(*seed);
    let mut agent = DuelingDqnAgent::new(ctx.config.agent.clone(), &mut rng);
    if let Some(path) = checkpoint.as_deref().filter(|path| path.exists()) {
        agent
            .load(path)
            .with_context(|| format!("Failed to resume from {}", path.display()))?;
        eprintln!("Resumed agent from {}", path.display());
    }

    let exploration_rate = exploration_rate.unwrap_or(ctx.config.exploration_rate);
    let config = ctx.config.simulation_config(exploration_rate);
    let mut driver = SimulationDriver::new(ctx.store.clone(), agent, config, rng);

    eprintln!("Simulating {games} games...");
    let outcomes = driver.run(*games)?;
    let wins = outcomes.iter().filter(|o| o.win).count();

    eprintln!("Simulation completed");
    eprintln!("  Games:   {}", outcomes.len());
    eprintln!("  Wins:    {wins}");
    eprintln!("  Epsilon: {:.4}", driver.agent().epsilon());

    if let Some(path) = checkpoint {
        driver.agent().save(path)?;
        eprintln!("  Checkpoint: {}", path.display());
    }

    util::save_json(&outcomes, output.as_deref())
}
