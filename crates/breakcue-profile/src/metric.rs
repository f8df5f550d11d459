use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the per-game trend series kept on a profile.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    #[display("accuracy")]
    Accuracy,
    #[display("fouls")]
    Fouls,
    #[display("shot_power")]
    ShotPower,
    #[display("aggressiveness")]
    Aggressiveness,
    #[display("win")]
    Win,
}

impl TrendMetric {
    pub const ALL: [Self; 5] = [
        Self::Accuracy,
        Self::Fouls,
        Self::ShotPower,
        Self::Aggressiveness,
        Self::Win,
    ];

    /// Name of the series field in the profile document.
    #[must_use]
    pub const fn document_key(self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy_trend",
            Self::Fouls => "foul_trend",
            Self::ShotPower => "shot_power_trend",
            Self::Aggressiveness => "aggressiveness_trend",
            Self::Win => "win_trend",
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("unknown trend metric '{name}'")]
pub struct ParseTrendMetricError {
    pub name: String,
}

impl FromStr for TrendMetric {
    type Err = ParseTrendMetricError;

    /// Accepts the short name (`shot_power`, `shot-power`) or the document
    /// key (`shot_power_trend`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| normalized == m.to_string() || normalized == m.document_key())
            .ok_or_else(|| ParseTrendMetricError {
                name: s.to_owned(),
            })
    }
}

/// Smoothing applied by [`PlayerProfile::get_smoothed_trends`](crate::PlayerProfile::get_smoothed_trends).
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr,
)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMethod {
    /// Trailing simple moving average over the window.
    #[default]
    Simple,
    /// Exponentially weighted moving average with the default factor.
    Ewma,
}
