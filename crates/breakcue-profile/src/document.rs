//! The durable profile record and its incremental update.
//!
//! A [`ProfileDocument`] is the flat record persisted once per player. It
//! holds cumulative counters, four progressive averages, five parallel trend
//! series (one entry per game), a structured per-game history and the log of
//! broken win streaks.
//!
//! # Incremental Update
//!
//! [`ProfileDocument::apply_game`] folds one game into the record. Each
//! average is updated with the weighted incremental mean
//!
//! ```text
//! avg' = (avg * (n - 1) + x) / n
//! ```
//!
//! where `n` is the game count after the increment, so after `n` games every
//! average equals the arithmetic mean of the `n` observations.
//!
//! # Invariants
//!
//! - every trend series and `performance_trend` has `games_played` entries
//! - `highest_consecutive_wins >= consecutive_wins`
//! - `win_rate == total_wins / max(1, total_wins + total_losses)`
//! - `streaks` grows only when a loss ends an active win streak
//!
//! # Serialization
//!
//! Documents serialize to a flat JSON object. Missing fields deserialize to
//! zeroed defaults and unknown fields are ignored, so documents written by
//! older or newer versions still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GameRecord, TrendMetric};

/// A schemaless document as exchanged with a [`ProfileStore`](crate::ProfileStore).
pub type Document = serde_json::Map<String, serde_json::Value>;

/// One entry of the structured per-game history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEntry {
    /// 1-based index of the game within the profile.
    pub game_number: u64,
    pub accuracy: f64,
    pub fouls: u32,
    pub shot_power: f64,
    pub aggression: f64,
    pub win: bool,
    pub timestamp: DateTime<Utc>,
}

/// A win streak that was ended by a loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    /// Number of consecutive wins in the streak.
    pub streak: u64,
    /// Game number of the loss that ended the streak.
    pub ended_at_game: u64,
    pub timestamp: DateTime<Utc>,
}

/// Persisted performance record of one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDocument {
    pub player_id: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,

    pub games_played: u64,
    pub total_wins: u64,
    pub total_losses: u64,
    pub consecutive_wins: u64,
    pub highest_consecutive_wins: u64,
    pub win_rate: f64,

    pub average_accuracy: f64,
    pub average_fouls: f64,
    pub average_shot_power: f64,
    pub aggressiveness_score: f64,

    pub performance_trend: Vec<PerformanceEntry>,
    pub accuracy_trend: Vec<f64>,
    pub foul_trend: Vec<u32>,
    pub shot_power_trend: Vec<f64>,
    pub aggressiveness_trend: Vec<f64>,
    pub win_trend: Vec<u8>,
    pub streaks: Vec<StreakRecord>,
}

impl ProfileDocument {
    /// Creates a zeroed document for `player_id`.
    #[must_use]
    pub fn new(player_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            player_id: player_id.into(),
            created_at: now,
            last_updated: now,
            ..Self::default()
        }
    }

    /// Folds one completed game into the document.
    ///
    /// `now` stamps the history entry, any streak record produced by this
    /// game and `last_updated`.
    pub fn apply_game(&mut self, game: &GameRecord, now: DateTime<Utc>) {
        self.games_played += 1;
        let n = self.games_played;

        self.average_accuracy = progressive_average(self.average_accuracy, game.accuracy, n);
        self.average_fouls = progressive_average(self.average_fouls, f64::from(game.fouls), n);
        self.average_shot_power =
            progressive_average(self.average_shot_power, game.shot_power, n);

        let aggression = game.aggressiveness();
        self.aggressiveness_score = progressive_average(self.aggressiveness_score, aggression, n);

        if game.win {
            self.total_wins += 1;
            self.consecutive_wins += 1;
            self.highest_consecutive_wins =
                self.highest_consecutive_wins.max(self.consecutive_wins);
        } else {
            if self.consecutive_wins > 0 {
                self.streaks.push(StreakRecord {
                    streak: self.consecutive_wins,
                    ended_at_game: n,
                    timestamp: now,
                });
            }
            self.consecutive_wins = 0;
            self.total_losses += 1;
        }

        #[expect(clippy::cast_precision_loss)]
        let win_rate = self.total_wins as f64 / (self.total_wins + self.total_losses).max(1) as f64;
        self.win_rate = win_rate;

        self.performance_trend.push(PerformanceEntry {
            game_number: n,
            accuracy: game.accuracy,
            fouls: game.fouls,
            shot_power: game.shot_power,
            aggression,
            win: game.win,
            timestamp: now,
        });
        self.accuracy_trend.push(game.accuracy);
        self.foul_trend.push(game.fouls);
        self.shot_power_trend.push(game.shot_power);
        self.aggressiveness_trend.push(aggression);
        self.win_trend.push(u8::from(game.win));
        self.last_updated = now;
    }

    /// Returns one trend series as floating-point values.
    #[must_use]
    pub fn series(&self, metric: TrendMetric) -> Vec<f64> {
        match metric {
            TrendMetric::Accuracy => self.accuracy_trend.clone(),
            TrendMetric::Fouls => self.foul_trend.iter().copied().map(f64::from).collect(),
            TrendMetric::ShotPower => self.shot_power_trend.clone(),
            TrendMetric::Aggressiveness => self.aggressiveness_trend.clone(),
            TrendMetric::Win => self.win_trend.iter().copied().map(f64::from).collect(),
        }
    }

    /// Converts the document into its schemaless JSON object form.
    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(serde::ser::Error::custom(
                "profile document did not serialize to a JSON object",
            )),
        }
    }

    /// Parses a schemaless document. Missing fields take zeroed defaults.
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(document))
    }
}

/// Incremental mean: `(avg * (n - 1) + value) / n`, `n` being the count
/// including `value`.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn progressive_average(current: f64, value: f64, n: u64) -> f64 {
    let n = n as f64;
    (current * (n - 1.0) + value) / n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(accuracy: f64, fouls: u32, win: bool) -> GameRecord {
        GameRecord {
            accuracy,
            fouls,
            shot_power: 50.0,
            aggressive_shots: 6,
            defensive_shots: 4,
            win,
        }
    }

    fn apply_all(wins: &[bool]) -> ProfileDocument {
        let now = Utc::now();
        let mut doc = ProfileDocument::new("p", now);
        for &win in wins {
            doc.apply_game(&game(0.5, 1, win), now);
        }
        doc
    }

    #[test]
    fn test_progressive_average_matches_mean() {
        let values = [0.13, 0.97, 0.42, 0.0, 0.55, 0.81, 0.29];
        let mut avg = 0.0;
        for (i, v) in values.iter().enumerate() {
            avg = progressive_average(avg, *v, i as u64 + 1);
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        assert!((avg - mean).abs() < 1e-12);
    }

    #[test]
    fn test_averages_after_games() {
        let now = Utc::now();
        let mut doc = ProfileDocument::new("p", now);
        doc.apply_game(&game(0.2, 4, true), now);
        doc.apply_game(&game(0.6, 0, false), now);
        doc.apply_game(
            &GameRecord {
                aggressive_shots: 0,
                defensive_shots: 0,
                ..game(0.7, 2, true)
            },
            now,
        );

        assert_eq!(doc.games_played, 3);
        assert!((doc.average_accuracy - 0.5).abs() < 1e-12);
        assert!((doc.average_fouls - 2.0).abs() < 1e-12);
        assert!((doc.average_shot_power - 50.0).abs() < 1e-12);
        assert!((doc.aggressiveness_score - 0.4).abs() < 1e-12);
        assert_eq!(doc.aggressiveness_trend, vec![0.6, 0.6, 0.0]);
    }

    #[test]
    fn test_trend_lengths_follow_game_count() {
        let doc = apply_all(&[true, false, false, true, true]);
        let n = usize::try_from(doc.games_played).unwrap();
        assert_eq!(n, 5);
        assert_eq!(doc.performance_trend.len(), n);
        for metric in TrendMetric::ALL {
            assert_eq!(doc.series(metric).len(), n, "{metric}");
        }
        assert_eq!(doc.win_trend, vec![1, 0, 0, 1, 1]);
        let numbers: Vec<_> = doc.performance_trend.iter().map(|e| e.game_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_streak_log_only_on_loss_after_win() {
        let doc = apply_all(&[true, true, false, false, true, false, true, true, true]);
        let log: Vec<_> = doc
            .streaks
            .iter()
            .map(|s| (s.streak, s.ended_at_game))
            .collect();
        assert_eq!(log, vec![(2, 3), (1, 6)]);
        assert_eq!(doc.consecutive_wins, 3);
        assert_eq!(doc.highest_consecutive_wins, 3);
        assert_eq!(doc.total_wins, 6);
        assert_eq!(doc.total_losses, 3);
    }

    #[test]
    fn test_highest_streak_never_below_current() {
        let pattern = [true, true, true, false, true, true, false, true];
        let now = Utc::now();
        let mut doc = ProfileDocument::new("p", now);
        for win in pattern {
            doc.apply_game(&game(0.5, 0, win), now);
            assert!(doc.highest_consecutive_wins >= doc.consecutive_wins);
            assert!((0.0..=1.0).contains(&doc.win_rate));
        }
        assert_eq!(doc.highest_consecutive_wins, 3);
    }

    #[test]
    fn test_win_rate() {
        assert_eq!(ProfileDocument::default().win_rate, 0.0);
        let doc = apply_all(&[true, false, false, true]);
        assert_eq!(doc.win_rate, 0.5);
        let doc = apply_all(&[false, false]);
        assert_eq!(doc.win_rate, 0.0);
    }

    #[test]
    fn test_document_round_trip_and_partial_parse() {
        let doc = apply_all(&[true, false]);
        let map = doc.to_document().unwrap();
        assert_eq!(map["games_played"], serde_json::json!(2));
        assert_eq!(ProfileDocument::from_document(map).unwrap(), doc);

        let mut partial = Document::new();
        partial.insert("player_id".into(), "old".into());
        partial.insert("total_wins".into(), 7.into());
        partial.insert("_id".into(), "6630f0c2".into());
        let parsed = ProfileDocument::from_document(partial).unwrap();
        assert_eq!(parsed.player_id, "old");
        assert_eq!(parsed.total_wins, 7);
        assert!(parsed.accuracy_trend.is_empty());
    }
}
