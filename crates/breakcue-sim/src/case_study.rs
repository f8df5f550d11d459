use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};

use breakcue_analysis::{TrendAnalyzer, TrendReport};
use rand::Rng;
use serde::Serialize;

use crate::{SimulationDriver, SimulationError};

/// File name of the agent checkpoint inside the results directory.
pub const CHECKPOINT_FILE: &str = "agent_checkpoint.json";
/// File name of the per-player trend reports inside the results directory.
pub const TREND_SUMMARY_FILE: &str = "trend_summary.json";

/// Exploration rate used by the case study, higher than the driver default.
pub const CASE_STUDY_EXPLORATION_RATE: f64 = 0.2;

/// Files written by one [`CaseStudy::run`].
#[derive(Debug, Clone)]
pub struct CaseStudyReport {
    pub games_played: usize,
    pub wins: usize,
    pub checkpoint: PathBuf,
    pub profiles: Vec<PathBuf>,
    pub trend_summary: PathBuf,
    pub trends: BTreeMap<String, TrendReport>,
}

/// End-to-end run: fresh store, simulation, checkpoint and JSON exports.
#[derive(Debug)]
pub struct CaseStudy<R> {
    driver: SimulationDriver<R>,
    analyzer: TrendAnalyzer,
    results_dir: PathBuf,
}

impl<R> CaseStudy<R>
where
    R: Rng,
{
    pub fn new(
        driver: SimulationDriver<R>,
        analyzer: TrendAnalyzer,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            driver,
            analyzer,
            results_dir: results_dir.into(),
        }
    }

    #[must_use]
    pub fn driver(&self) -> &SimulationDriver<R> {
        &self.driver
    }

    /// Resets the driver, simulates `games_per_player` games per roster
    /// member on average, and writes into the results directory:
    ///
    /// - `agent_checkpoint.json`: the trained agent
    /// - `<player_id>_profile.json`: each roster member's profile document
    /// - `trend_summary.json`: one trend report per roster member
    pub fn run(&mut self, games_per_player: usize) -> Result<CaseStudyReport, SimulationError> {
        fs::create_dir_all(&self.results_dir).map_err(|source| SimulationError::Io {
            path: self.results_dir.clone(),
            source,
        })?;

        self.driver.reset()?;
        let games = games_per_player * self.driver.roster().len();
        let outcomes = self.driver.run(games)?;

        let checkpoint = self.results_dir.join(CHECKPOINT_FILE);
        self.driver.agent().save(&checkpoint)?;

        let roster = self.driver.roster().to_vec();
        let mut profiles = Vec::with_capacity(roster.len());
        let mut trends = BTreeMap::new();
        for player_id in roster {
            let document = self.driver.profile(&player_id)?.data().clone();
            let path = self.results_dir.join(format!("{player_id}_profile.json"));
            write_json(&path, &document)?;
            profiles.push(path);
            trends.insert(player_id, self.analyzer.analyze(&document));
        }

        let trend_summary = self.results_dir.join(TREND_SUMMARY_FILE);
        write_json(&trend_summary, &trends)?;

        tracing::info!(
            games,
            results_dir = %self.results_dir.display(),
            "case study complete"
        );
        Ok(CaseStudyReport {
            games_played: outcomes.len(),
            wins: outcomes.iter().filter(|o| o.win).count(),
            checkpoint,
            profiles,
            trend_summary,
            trends,
        })
    }
}

fn write_json<T>(path: &Path, value: &T) -> Result<(), SimulationError>
where
    T: Serialize,
{
    let io_error = |source| SimulationError::Io {
        path: path.to_owned(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| SimulationError::Json {
        path: path.to_owned(),
        source,
    })?;
    writeln!(writer).map_err(io_error)?;
    writer.flush().map_err(io_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use breakcue_profile::{MemoryProfileStore, ProfileDocument};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::{SimulationConfig, driver::tests::small_agent};

    #[test]
    fn test_case_study_exports_results() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        let agent = small_agent(&mut rng);
        let store = Arc::new(MemoryProfileStore::new());
        let config = SimulationConfig {
            exploration_rate: CASE_STUDY_EXPLORATION_RATE,
            ..SimulationConfig::default()
        };
        let driver = SimulationDriver::new(store.clone(), agent, config, rng);
        let mut study = CaseStudy::new(driver, TrendAnalyzer::default(), &results);

        let report = study.run(4).unwrap();
        assert_eq!(report.games_played, 12);
        assert!(report.checkpoint.is_file());
        assert_eq!(report.profiles.len(), 3);
        assert_eq!(report.trends.len(), 3);

        let mut total = 0;
        for path in &report.profiles {
            let text = fs::read_to_string(path).unwrap();
            let doc: ProfileDocument = serde_json::from_str(&text).unwrap();
            total += doc.games_played;
        }
        assert_eq!(total, 12);

        let summary: BTreeMap<String, TrendReport> =
            serde_json::from_str(&fs::read_to_string(&report.trend_summary).unwrap()).unwrap();
        assert!(summary.keys().eq(report.trends.keys()));

        // a second run starts from an empty store
        let report = study.run(1).unwrap();
        let games: u64 = report
            .profiles
            .iter()
            .map(|path| {
                let doc: ProfileDocument =
                    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
                doc.games_played
            })
            .sum();
        assert_eq!(games, 3);
    }
}
