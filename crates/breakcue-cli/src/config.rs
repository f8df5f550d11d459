use std::path::{Path, PathBuf};

use breakcue_agent::AgentParams;
use breakcue_analysis::DEFAULT_WINDOW;
use breakcue_profile::CachePolicy;
use breakcue_sim::{DEFAULT_EXPLORATION_RATE, DEFAULT_ROSTER, SimulationConfig};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::util;

/// Application settings, read from the JSON file given with `--config`.
///
/// Every field is optional in the file; missing ones take the defaults
/// below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding one `<player_id>.json` document per player.
    pub store_dir: PathBuf,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u32,
    pub roster: Vec<String>,
    pub exploration_rate: f64,
    pub trend_window: usize,
    pub agent: AgentParams,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("profiles"),
            cache_enabled: true,
            cache_ttl_secs: 300,
            roster: DEFAULT_ROSTER.iter().map(|&id| id.to_owned()).collect(),
            exploration_rate: DEFAULT_EXPLORATION_RATE,
            trend_window: DEFAULT_WINDOW,
            agent: AgentParams::default(),
            log_level: "info".to_owned(),
        }
    }
}

impl AppConfig {
    /// Reads `path`, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => util::read_json_file("config", path),
            None => Ok(Self::default()),
        }
    }

    #[must_use]
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            enabled: self.cache_enabled,
            ttl: TimeDelta::seconds(i64::from(self.cache_ttl_secs)),
        }
    }

    #[must_use]
    pub fn simulation_config(&self, exploration_rate: f64) -> SimulationConfig {
        SimulationConfig {
            roster: self.roster.clone(),
            exploration_rate,
            cache: self.cache_policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "store_dir": "data", "cache_ttl_secs": 5, "agent": { "batch_size": 8 } }"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.store_dir, PathBuf::from("data"));
        assert_eq!(config.cache_policy().ttl, TimeDelta::seconds(5));
        assert!(config.cache_policy().enabled);
        assert_eq!(config.agent.batch_size, 8);
        assert_eq!(config.agent.memory_size, 50_000);
        assert_eq!(config.roster.len(), 3);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("none.json"))).is_err());
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }
}
