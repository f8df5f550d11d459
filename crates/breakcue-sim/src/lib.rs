//! Synthetic game simulation driving the decision agent.
//!
//! Each simulated game reads a player's profile, turns it into a state
//! vector, lets the [`DuelingDqnAgent`](breakcue_agent::DuelingDqnAgent) pick
//! an action, draws a win from a synthetic probability, and feeds the result
//! back into both the profile and the agent's replay memory:
//!
//! ```text
//! PlayerProfile ──derive_state──→ state ──act──→ action
//!       ↑                           │
//!       │                           ├─ win ~ win_probability(state)
//!  record_game                      ├─ next_state = perturb(state)
//!       │                           ↓
//!  GameRecord ←──────────────── remember(transition) ──→ replay()
//! ```
//!
//! [`SimulationDriver::run`] trains the agent once after every game.
//! [`CaseStudy`] wraps a full run with a store reset and JSON exports.

use std::{io, path::PathBuf};

use breakcue_agent::AgentError;
use breakcue_profile::{ProfileError, StoreError};

pub use self::{
    case_study::{
        CASE_STUDY_EXPLORATION_RATE, CHECKPOINT_FILE, CaseStudy, CaseStudyReport,
        TREND_SUMMARY_FILE,
    },
    driver::{
        DEFAULT_EXPLORATION_RATE, DEFAULT_ROSTER, GameOutcome, SimulationConfig, SimulationDriver,
    },
    state::{STATE_SIZE, derive_state, perturb, win_probability},
};

mod case_study;
mod driver;
mod state;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum SimulationError {
    #[display("roster is empty")]
    #[from(skip)]
    EmptyRoster,
    #[display("profile update failed")]
    Profile { source: ProfileError },
    #[display("profile store operation failed")]
    Store { source: StoreError },
    #[display("agent checkpoint failed")]
    Agent { source: AgentError },
    #[display("failed to write {}", path.display())]
    #[from(skip)]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to serialize {}", path.display())]
    #[from(skip)]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}
