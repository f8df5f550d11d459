use serde::{Deserialize, Serialize};

/// Telemetry of one completed game, as folded into a profile.
///
/// Every field is optional when deserializing: partial telemetry is
/// accepted and missing values count as zero (or a loss).
///
/// ```
/// use breakcue_profile::GameRecord;
///
/// let record: GameRecord = serde_json::from_str(r#"{ "accuracy": 0.8, "win": true }"#).unwrap();
/// assert_eq!(record.fouls, 0);
/// assert!(record.win);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRecord {
    /// Fraction of successful shots, in `[0, 1]`.
    pub accuracy: f64,
    pub fouls: u32,
    pub shot_power: f64,
    pub aggressive_shots: u32,
    pub defensive_shots: u32,
    pub win: bool,
}

impl GameRecord {
    /// Share of aggressive shots among all classified shots.
    ///
    /// Zero when no shot was classified.
    #[must_use]
    pub fn aggressiveness(&self) -> f64 {
        aggressiveness(self.aggressive_shots, self.defensive_shots)
    }

    /// Name of the first telemetry field holding NaN or an infinity.
    #[must_use]
    pub fn non_finite_field(&self) -> Option<&'static str> {
        [("accuracy", self.accuracy), ("shot_power", self.shot_power)]
            .into_iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(name, _)| name)
    }
}

/// Computes `aggressive / (aggressive + defensive)`, or 0 when both are zero.
#[must_use]
pub fn aggressiveness(aggressive_shots: u32, defensive_shots: u32) -> f64 {
    let total = u64::from(aggressive_shots) + u64::from(defensive_shots);
    if total == 0 {
        return 0.0;
    }
    #[expect(clippy::cast_precision_loss)]
    let total = total as f64;
    f64::from(aggressive_shots) / total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggressiveness() {
        assert_eq!(aggressiveness(0, 0), 0.0);
        assert_eq!(aggressiveness(3, 1), 0.75);
        assert_eq!(aggressiveness(0, 7), 0.0);
        assert_eq!(aggressiveness(u32::MAX, 0), 1.0);
    }

    #[test]
    fn test_non_finite_field() {
        assert_eq!(GameRecord::default().non_finite_field(), None);
        let record = GameRecord {
            shot_power: f64::INFINITY,
            ..GameRecord::default()
        };
        assert_eq!(record.non_finite_field(), Some("shot_power"));
        let record = GameRecord {
            accuracy: f64::NAN,
            shot_power: f64::NAN,
            ..GameRecord::default()
        };
        assert_eq!(record.non_finite_field(), Some("accuracy"));
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let record: GameRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, GameRecord::default());

        let record: GameRecord =
            serde_json::from_str(r#"{ "shot_power": 55.0, "unknown": [1, 2] }"#).unwrap();
        assert_eq!(record.shot_power, 55.0);
        assert!(!record.win);
    }
}
