use std::{collections::BTreeMap, sync::Arc};

use breakcue_stats::{
    anomaly,
    descriptive::DescriptiveStats,
    smoothing::{self, DEFAULT_EWMA_ALPHA},
};
use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    Document, GameRecord, PerformanceEntry, ProfileDocument, ProfileError, ProfileStore,
    SmoothingMethod, TrendMetric,
};

/// Smoothed copies of every trend series, keyed by metric.
pub type SmoothedTrends = BTreeMap<TrendMetric, Vec<f64>>;

/// Freshness policy for the in-memory copy of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// When false, every [`PlayerProfile::load`] hits the store.
    pub enabled: bool,
    /// How long a load stays fresh.
    pub ttl: TimeDelta,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: TimeDelta::seconds(300),
        }
    }
}

impl CachePolicy {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// A player's performance profile, backed by a [`ProfileStore`].
///
/// The profile is the single writer of its document: every mutation goes
/// through [`record_game`](Self::record_game), which reloads, updates and
/// writes the whole document back before returning.
#[derive(Debug)]
pub struct PlayerProfile {
    store: Arc<dyn ProfileStore>,
    cache: CachePolicy,
    cache_timestamp: Option<DateTime<Utc>>,
    data: ProfileDocument,
}

impl PlayerProfile {
    /// Creates a zeroed in-memory profile. Nothing is read from the store
    /// until the first [`load`](Self::load).
    pub fn new(player_id: impl Into<String>, store: Arc<dyn ProfileStore>, cache: CachePolicy) -> Self {
        Self {
            store,
            cache,
            cache_timestamp: None,
            data: ProfileDocument::new(player_id, Utc::now()),
        }
    }

    /// Creates a profile and loads its persisted state.
    pub fn open(
        player_id: impl Into<String>,
        store: Arc<dyn ProfileStore>,
        cache: CachePolicy,
    ) -> Result<Self, ProfileError> {
        let mut profile = Self::new(player_id, store, cache);
        profile.load()?;
        Ok(profile)
    }

    #[must_use]
    pub fn player_id(&self) -> &str {
        &self.data.player_id
    }

    /// Current in-memory snapshot of the profile document.
    #[must_use]
    pub fn data(&self) -> &ProfileDocument {
        &self.data
    }

    /// Forces the next [`load`](Self::load) to hit the store.
    pub fn invalidate_cache(&mut self) {
        self.cache_timestamp = None;
    }

    /// Refreshes the profile from the store unless the cached copy is fresh.
    pub fn load(&mut self) -> Result<(), ProfileError> {
        self.load_at(Utc::now())
    }

    /// [`load`](Self::load) against an explicit clock reading.
    ///
    /// Persisted fields overwrite in-memory ones; fields absent from the
    /// persisted document keep their current value. A missing document
    /// leaves the profile unchanged. The cache timestamp is set to `now`.
    pub fn load_at(&mut self, now: DateTime<Utc>) -> Result<(), ProfileError> {
        if self.is_cache_fresh(now) {
            tracing::debug!(player_id = %self.player_id(), "using cached profile");
            return Ok(());
        }

        let persisted = self.store.fetch(self.player_id()).map_err(|source| {
            tracing::error!(player_id = %self.player_id(), error = %source, "failed to load profile");
            ProfileError::Load {
                player_id: self.player_id().to_owned(),
                source,
            }
        })?;
        if let Some(persisted) = persisted {
            self.data = self.merged_with(persisted)?;
        }
        self.cache_timestamp = Some(now);
        tracing::info!(player_id = %self.player_id(), games_played = self.data.games_played, "profile loaded");
        Ok(())
    }

    fn is_cache_fresh(&self, now: DateTime<Utc>) -> bool {
        self.cache.enabled
            && self
                .cache_timestamp
                .is_some_and(|loaded_at| now - loaded_at < self.cache.ttl)
    }

    fn merged_with(&self, persisted: Document) -> Result<ProfileDocument, ProfileError> {
        let schema_err = |source| ProfileError::Schema {
            player_id: self.player_id().to_owned(),
            source,
        };
        let mut merged = self.data.to_document().map_err(schema_err)?;
        for (key, value) in persisted {
            if key != "player_id" {
                merged.insert(key, value);
            }
        }
        ProfileDocument::from_document(merged).map_err(schema_err)
    }

    /// Folds one completed game into the profile and persists it.
    ///
    /// The profile is reloaded first (subject to the cache policy), then the
    /// updated document is written to the store, replacing the previous one.
    /// Only after the write succeeds does the in-memory copy change, so on
    /// success both copies are identical and hold exactly one more game, and
    /// on failure the profile is left as it was. Records carrying NaN or
    /// infinite telemetry are rejected before anything is read or written.
    pub fn record_game(&mut self, game: &GameRecord) -> Result<(), ProfileError> {
        if let Some(field) = game.non_finite_field() {
            return Err(ProfileError::NonFiniteTelemetry {
                player_id: self.player_id().to_owned(),
                field,
            });
        }
        self.load()?;

        let mut next = self.data.clone();
        next.apply_game(game, Utc::now());
        self.persist(&next)?;
        self.data = next;
        Ok(())
    }

    fn persist(&self, document: &ProfileDocument) -> Result<(), ProfileError> {
        let player_id = self.player_id();
        let map = document.to_document().map_err(|source| ProfileError::Schema {
            player_id: player_id.to_owned(),
            source,
        })?;
        self.store.upsert(player_id, &map).map_err(|source| {
            tracing::error!(%player_id, error = %source, "failed to save profile");
            ProfileError::Persist {
                player_id: player_id.to_owned(),
                source,
            }
        })?;
        tracing::info!(%player_id, games_played = document.games_played, "profile saved");
        Ok(())
    }

    /// Returns the last `count` per-game history entries, oldest first.
    #[must_use]
    pub fn get_recent_performance(&self, count: usize) -> &[PerformanceEntry] {
        let history = &self.data.performance_trend;
        &history[history.len().saturating_sub(count)..]
    }

    /// Smooths every trend series.
    ///
    /// With [`SmoothingMethod::Simple`], series with at least `window` points
    /// are replaced by their trailing moving average and shorter series are
    /// returned as-is. With [`SmoothingMethod::Ewma`], `window` is ignored and
    /// the default smoothing factor is used.
    #[must_use]
    pub fn get_smoothed_trends(&self, window: usize, method: SmoothingMethod) -> SmoothedTrends {
        TrendMetric::ALL
            .into_iter()
            .map(|metric| {
                let series = self.data.series(metric);
                let smoothed = match method {
                    SmoothingMethod::Simple => smoothing::moving_average(&series, window),
                    SmoothingMethod::Ewma => smoothing::ewma(&series, DEFAULT_EWMA_ALPHA),
                };
                (metric, smoothed)
            })
            .collect()
    }

    /// Returns the indices of games whose `metric` value lies more than
    /// `threshold` sample standard deviations from the mean.
    ///
    /// Empty for fewer than two games and for constant series.
    #[must_use]
    pub fn detect_anomalies(&self, threshold: f64, metric: TrendMetric) -> Vec<usize> {
        anomaly::zscore_outliers(&self.data.series(metric), threshold)
    }

    /// Descriptive statistics of one trend series, `None` before the first game.
    #[must_use]
    pub fn metric_summary(&self, metric: TrendMetric) -> Option<DescriptiveStats> {
        DescriptiveStats::new(self.data.series(metric))
    }
}

#[cfg(test)]
mod tests {
    use breakcue_stats::anomaly::DEFAULT_Z_THRESHOLD;
    use serde_json::json;

    use super::*;
    use crate::{JsonDirStore, MemoryProfileStore, StoreError};

    fn game(accuracy: f64, win: bool) -> GameRecord {
        GameRecord {
            accuracy,
            fouls: 1,
            shot_power: 60.0,
            aggressive_shots: 5,
            defensive_shots: 5,
            win,
        }
    }

    fn memory_store() -> Arc<MemoryProfileStore> {
        Arc::new(MemoryProfileStore::new())
    }

    #[derive(Debug, Default)]
    struct ReadOnlyStore {
        inner: MemoryProfileStore,
    }

    impl ProfileStore for ReadOnlyStore {
        fn fetch(&self, player_id: &str) -> Result<Option<Document>, StoreError> {
            self.inner.fetch(player_id)
        }

        fn upsert(&self, _: &str, _: &Document) -> Result<(), StoreError> {
            Err(StoreError::Unavailable {
                reason: "read-only".to_owned(),
            })
        }

        fn clear(&self) -> Result<(), StoreError> {
            self.inner.clear()
        }
    }

    #[test]
    fn test_three_winning_games() {
        let store = memory_store();
        let mut profile = PlayerProfile::new("user123", store.clone(), CachePolicy::default());
        for accuracy in [0.5, 0.7, 0.9] {
            profile.record_game(&game(accuracy, true)).unwrap();
        }

        let data = profile.data();
        assert_eq!(data.games_played, 3);
        assert!((data.average_accuracy - 0.7).abs() < 1e-12);
        assert_eq!(data.win_rate, 1.0);
        assert_eq!(data.highest_consecutive_wins, 3);
        assert_eq!(data.accuracy_trend, vec![0.5, 0.7, 0.9]);

        let persisted = store.fetch("user123").unwrap().unwrap();
        assert_eq!(ProfileDocument::from_document(persisted).unwrap(), *data);
    }

    #[test]
    fn test_fresh_profile_without_document_stays_zeroed() {
        let profile = PlayerProfile::open("nobody", memory_store(), CachePolicy::default()).unwrap();
        assert_eq!(profile.player_id(), "nobody");
        assert_eq!(profile.data().games_played, 0);
        assert!(profile.get_recent_performance(10).is_empty());
    }

    #[test]
    fn test_load_merges_persisted_fields() {
        let store = memory_store();
        let persisted = json!({
            "player_id": "someone-else",
            "games_played": 2,
            "total_wins": 2,
            "accuracy_trend": [0.4, 0.6],
            "legacy_field": true,
        });
        let serde_json::Value::Object(persisted) = persisted else {
            unreachable!()
        };
        store.upsert("p1", &persisted).unwrap();

        let profile = PlayerProfile::open("p1", store, CachePolicy::default()).unwrap();
        assert_eq!(profile.player_id(), "p1");
        assert_eq!(profile.data().games_played, 2);
        assert_eq!(profile.data().total_wins, 2);
        assert_eq!(profile.data().accuracy_trend, vec![0.4, 0.6]);
        assert_eq!(profile.data().total_losses, 0);
    }

    #[test]
    fn test_cache_window() {
        let store = memory_store();
        let writer_store: Arc<dyn ProfileStore> = store.clone();
        let now = Utc::now();

        let mut reader = PlayerProfile::new("p", store.clone(), CachePolicy::default());
        reader.load_at(now).unwrap();

        let mut writer = PlayerProfile::new("p", writer_store, CachePolicy::default());
        writer.record_game(&game(0.8, true)).unwrap();

        reader.load_at(now + TimeDelta::seconds(10)).unwrap();
        assert_eq!(reader.data().games_played, 0, "cached copy is still fresh");

        reader.load_at(now + TimeDelta::seconds(300)).unwrap();
        assert_eq!(reader.data().games_played, 1);
    }

    #[test]
    fn test_disabled_cache_always_reloads() {
        let store = memory_store();
        let now = Utc::now();
        let mut reader = PlayerProfile::new("p", store.clone(), CachePolicy::disabled());
        reader.load_at(now).unwrap();

        let mut writer = PlayerProfile::new("p", store, CachePolicy::default());
        writer.record_game(&game(0.8, false)).unwrap();

        reader.load_at(now).unwrap();
        assert_eq!(reader.data().total_losses, 1);
    }

    #[test]
    fn test_invalidate_cache() {
        let store = memory_store();
        let mut reader = PlayerProfile::open("p", store.clone(), CachePolicy::default()).unwrap();
        PlayerProfile::new("p", store, CachePolicy::default())
            .record_game(&game(0.3, true))
            .unwrap();

        reader.load().unwrap();
        assert_eq!(reader.data().games_played, 0);
        reader.invalidate_cache();
        reader.load().unwrap();
        assert_eq!(reader.data().games_played, 1);
    }

    #[test]
    fn test_failed_write_leaves_profile_unchanged() {
        let store = Arc::new(ReadOnlyStore::default());
        let mut profile = PlayerProfile::new("p", store, CachePolicy::default());
        let err = profile.record_game(&game(0.9, true)).unwrap_err();
        assert!(matches!(err, ProfileError::Persist { .. }));
        assert_eq!(profile.data().games_played, 0);
        assert!(profile.data().accuracy_trend.is_empty());
    }

    #[test]
    fn test_json_store_reload_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonDirStore::new(dir.path()));
        let mut profile = PlayerProfile::new("p", store.clone(), CachePolicy::default());
        profile.record_game(&game(109.0 / 997.0, true)).unwrap();

        let reopened = PlayerProfile::open("p", store, CachePolicy::default()).unwrap();
        assert_eq!(reopened.data(), profile.data());
    }

    #[test]
    fn test_averages_survive_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonDirStore::new(dir.path()));
        let mut persisted = PlayerProfile::new("p", store, CachePolicy::disabled());
        let mut in_memory = PlayerProfile::new("p", memory_store(), CachePolicy::disabled());

        let inputs: Vec<f64> = (1..=200).map(|i| f64::from(i * 37 % 101) / 97.0).collect();
        for (i, &accuracy) in inputs.iter().enumerate() {
            let record = game(accuracy, i % 3 == 0);
            persisted.record_game(&record).unwrap();
            in_memory.record_game(&record).unwrap();
        }

        let data = persisted.data();
        assert_eq!(data.games_played, 200);
        assert_eq!(data.accuracy_trend, inputs);
        assert_eq!(data.average_accuracy, in_memory.data().average_accuracy);
        #[expect(clippy::cast_precision_loss)]
        let mean = inputs.iter().sum::<f64>() / inputs.len() as f64;
        assert!((data.average_accuracy - mean).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_telemetry_is_rejected() {
        let store = memory_store();
        let mut profile = PlayerProfile::new("p", store.clone(), CachePolicy::default());
        let err = profile.record_game(&game(f64::NAN, true)).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::NonFiniteTelemetry {
                field: "accuracy",
                ..
            }
        ));
        assert_eq!(profile.data().games_played, 0);
        assert!(store.is_empty());

        profile.record_game(&game(0.4, true)).unwrap();
        assert_eq!(profile.data().accuracy_trend, vec![0.4]);
    }

    #[test]
    fn test_recent_performance() {
        let mut profile = PlayerProfile::new("p", memory_store(), CachePolicy::default());
        for i in 0..5 {
            profile.record_game(&game(f64::from(i) / 10.0, i % 2 == 0)).unwrap();
        }
        let recent = profile.get_recent_performance(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].game_number, 4);
        assert_eq!(recent[1].game_number, 5);
        assert_eq!(profile.get_recent_performance(50).len(), 5);
        assert!(profile.get_recent_performance(0).is_empty());
    }

    #[test]
    fn test_smoothed_trends() {
        let mut profile = PlayerProfile::new("p", memory_store(), CachePolicy::default());
        for accuracy in [0.2, 0.4, 0.6] {
            profile.record_game(&game(accuracy, true)).unwrap();
        }

        let below_window = profile.get_smoothed_trends(5, SmoothingMethod::Simple);
        assert_eq!(below_window.len(), TrendMetric::ALL.len());
        assert_eq!(below_window[&TrendMetric::Accuracy], vec![0.2, 0.4, 0.6]);
        assert_eq!(below_window[&TrendMetric::Win], vec![1.0, 1.0, 1.0]);

        let simple = profile.get_smoothed_trends(2, SmoothingMethod::Simple);
        let accuracy = &simple[&TrendMetric::Accuracy];
        assert_eq!(accuracy.len(), 2);
        assert!((accuracy[0] - 0.3).abs() < 1e-12);
        assert!((accuracy[1] - 0.5).abs() < 1e-12);

        let ewma = profile.get_smoothed_trends(2, SmoothingMethod::Ewma);
        assert_eq!(ewma[&TrendMetric::Accuracy].len(), 3);
        assert_eq!(ewma[&TrendMetric::Fouls], vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_anomalies() {
        let mut profile = PlayerProfile::new("p", memory_store(), CachePolicy::disabled());
        assert!(profile.detect_anomalies(DEFAULT_Z_THRESHOLD, TrendMetric::Accuracy).is_empty());

        for _ in 0..12 {
            profile.record_game(&game(0.6, true)).unwrap();
        }
        assert!(profile.detect_anomalies(DEFAULT_Z_THRESHOLD, TrendMetric::Accuracy).is_empty());

        profile.record_game(&game(0.0, false)).unwrap();
        assert_eq!(
            profile.detect_anomalies(DEFAULT_Z_THRESHOLD, TrendMetric::Accuracy),
            vec![12]
        );
        assert_eq!(
            profile.detect_anomalies(DEFAULT_Z_THRESHOLD, TrendMetric::Win),
            vec![12]
        );
    }

    #[test]
    fn test_metric_summary() {
        let mut profile = PlayerProfile::new("p", memory_store(), CachePolicy::default());
        assert!(profile.metric_summary(TrendMetric::ShotPower).is_none());
        profile.record_game(&game(0.5, true)).unwrap();
        let summary = profile.metric_summary(TrendMetric::ShotPower).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.mean, 60.0);
    }
}
