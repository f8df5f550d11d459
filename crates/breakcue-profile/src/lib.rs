//! Player performance profiles.
//!
//! A [`PlayerProfile`] keeps one player's continuously evolving performance
//! record: cumulative win/loss counters and streaks, progressive averages of
//! per-game telemetry, and one trend series per metric. It derives smoothed
//! trends and z-score anomalies from that record on demand.
//!
//! # Architecture
//!
//! ```text
//! GameRecord (telemetry of one game)
//!     ↓ record_game
//! PlayerProfile ── load / persist ──→ ProfileStore (injected)
//!     ↓ owns                              ├─ MemoryProfileStore
//! ProfileDocument                         └─ JsonDirStore
//!     ↓ series(metric)
//! smoothing / anomaly detection (breakcue-stats)
//! ```
//!
//! # Persistence Model
//!
//! - **Write-through**: every [`PlayerProfile::record_game`] writes the full
//!   document back before returning
//! - **Reload before write**: the profile is reloaded at the start of each
//!   update unless its cached copy is within the [`CachePolicy`] window
//! - **Single writer**: concurrent writers to the same player identifier are
//!   not coordinated
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use breakcue_profile::{CachePolicy, GameRecord, MemoryProfileStore, PlayerProfile};
//!
//! let store = Arc::new(MemoryProfileStore::new());
//! let mut profile = PlayerProfile::new("user123", store, CachePolicy::default());
//! profile
//!     .record_game(&GameRecord { accuracy: 0.8, win: true, ..GameRecord::default() })
//!     .unwrap();
//! assert_eq!(profile.data().games_played, 1);
//! assert_eq!(profile.data().win_rate, 1.0);
//! ```

pub use self::{
    document::{Document, PerformanceEntry, ProfileDocument, StreakRecord, progressive_average},
    metric::{ParseTrendMetricError, SmoothingMethod, TrendMetric},
    profile::{CachePolicy, PlayerProfile, SmoothedTrends},
    record::{GameRecord, aggressiveness},
    store::{JsonDirStore, MemoryProfileStore, ProfileStore, StoreError},
};

pub mod document;
mod metric;
mod profile;
mod record;
pub mod store;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ProfileError {
    #[display("failed to load profile '{player_id}'")]
    Load {
        player_id: String,
        source: StoreError,
    },
    #[display("failed to persist profile '{player_id}'")]
    Persist {
        player_id: String,
        source: StoreError,
    },
    #[display("game record for '{player_id}' has a non-finite {field}")]
    NonFiniteTelemetry {
        player_id: String,
        field: &'static str,
    },
    #[display("profile document for '{player_id}' does not match the profile schema")]
    Schema {
        player_id: String,
        source: serde_json::Error,
    },
}
