use std::{path::PathBuf, sync::Arc};

use breakcue_profile::{JsonDirStore, PlayerProfile, ProfileStore};
use clap::{Parser, Subcommand};
use rand::SeedableRng as _;
use rand_pcg::Pcg64Mcg;

use crate::{config::AppConfig, logging};

use self::{
    case_study::CaseStudyArg,
    profile::{AnalyzeArg, AnomaliesArg, RecentArg, RecordArg, SmoothArg, SummaryArg},
    simulate::SimulateArg,
};

mod case_study;
mod profile;
mod simulate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Profile store directory (overrides the configuration file)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Log level: error, warn, info, debug or trace
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Simulate games and train the decision agent
    Simulate(#[clap(flatten)] SimulateArg),
    /// Reset the store, simulate every roster member and export the results
    CaseStudy(#[clap(flatten)] CaseStudyArg),
    /// Fold one game record into a player's profile
    Record(#[clap(flatten)] RecordArg),
    /// Report whether a player is improving
    Analyze(#[clap(flatten)] AnalyzeArg),
    /// Smooth every trend series of a player
    Smooth(#[clap(flatten)] SmoothArg),
    /// List outlier games in one trend series
    Anomalies(#[clap(flatten)] AnomaliesArg),
    /// Show the latest games of a player
    Recent(#[clap(flatten)] RecentArg),
    /// Descriptive statistics of trend series
    Summary(#[clap(flatten)] SummaryArg),
}

/// Settings and resources shared by every subcommand.
#[derive(Debug)]
pub(crate) struct AppContext {
    config: AppConfig,
    store: Arc<dyn ProfileStore>,
}

impl AppContext {
    fn open_profile(&self, player_id: &str) -> anyhow::Result<PlayerProfile> {
        let profile =
            PlayerProfile::open(player_id, Arc::clone(&self.store), self.config.cache_policy())?;
        Ok(profile)
    }
}

fn rng_from_seed(seed: Option<u64>) -> Pcg64Mcg {
    match seed {
        Some(seed) => Pcg64Mcg::seed_from_u64(seed),
        None => Pcg64Mcg::from_os_rng(),
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(store) = args.store {
        config.store_dir = store;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    logging::init(logging::parse_level(&config.log_level)?)?;

    let store = Arc::new(JsonDirStore::new(config.store_dir.clone()));
    let ctx = AppContext { config, store };
    match args.mode {
        Mode::Simulate(arg) => simulate::run(&ctx, &arg)?,
        Mode::CaseStudy(arg) => case_study::run(&ctx, &arg)?,
        Mode::Record(arg) => profile::run_record(&ctx, &arg)?,
        Mode::Analyze(arg) => profile::run_analyze(&ctx, &arg)?,
        Mode::Smooth(arg) => profile::run_smooth(&ctx, &arg)?,
        Mode::Anomalies(arg) => profile::run_anomalies(&ctx, &arg)?,
        Mode::Recent(arg) => profile::run_recent(&ctx, &arg)?,
        Mode::Summary(arg) => profile::run_summary(&ctx, &arg)?,
    }
    Ok(())
}
