//! Improvement trends of player profiles.
//!
//! This crate reads a snapshot of a [`ProfileDocument`] and reports whether
//! the player is improving: accuracy must trend upward while fouls trend
//! downward. Both slopes come from an ordinary least squares fit of the
//! series against the game index.
//!
//! The analyzer holds no state of its own besides its smoothing window and
//! never touches the profile store.

pub mod trend;

pub use self::trend::{DEFAULT_WINDOW, TrendAnalyzer, TrendReport};

#[doc(no_inline)]
pub use breakcue_profile::ProfileDocument;
