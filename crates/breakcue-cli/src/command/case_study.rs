use std::path::PathBuf;

use breakcue_agent::DuelingDqnAgent;
use breakcue_analysis::TrendAnalyzer;
use breakcue_sim::{CASE_STUDY_EXPLORATION_RATE, CaseStudy, SimulationDriver};

use super::AppContext;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CaseStudyArg {
    /// Games to simulate per roster member
    #[arg(long, default_value_t = 50)]
    games_per_player: usize,
    /// Directory receiving the checkpoint, profiles and trend summary
    #[arg(long, default_value = "results")]
    results: PathBuf,
    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
}

pub(crate) fn run(ctx: &AppContext, arg: &CaseStudyArg) -> anyhow::Result<()> {
    let CaseStudyArg {
        games_per_player,
        results,
        seed,
    } = arg;

    let mut rng = super::rng_from_seed(*seed);
    let agent = DuelingDqnAgent::new(ctx.config.agent.clone(), &mut rng);
    let config = ctx.config.simulation_config(CASE_STUDY_EXPLORATION_RATE);
    let driver = SimulationDriver::new(ctx.store.clone(), agent, config, rng);
    let analyzer = TrendAnalyzer::new(ctx.config.trend_window);
    let mut study = CaseStudy::new(driver, analyzer, results);

    eprintln!(
        "Running case study: {games_per_player} games per player, {} players",
        study.driver().roster().len()
    );
    let report = study.run(*games_per_player)?;

    eprintln!("Case study complete! Results in {}", results.display());
    eprintln!("  Games: {}", report.games_played);
    eprintln!("  Wins:  {}", report.wins);
    eprintln!("  Checkpoint: {}", report.checkpoint.display());
    for (player_id, trend) in &report.trends {
        eprintln!(
            "  {player_id}: accuracy slope {:+.4}, foul slope {:+.4}, improving: {}",
            trend.accuracy_slope, trend.foul_slope, trend.improving
        );
    }
    Ok(())
}
