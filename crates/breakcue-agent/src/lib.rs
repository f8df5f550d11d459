//! Dueling Q-learning decision agent.
//!
//! [`DuelingDqnAgent`] chooses among a fixed set of discrete actions from a
//! numeric state vector. It scores actions with a [`DuelingNetwork`], explores
//! with an epsilon-greedy policy, learns from uniformly sampled mini-batches
//! of stored [`Transition`]s, and bootstraps future value from a separate
//! target network that is only refreshed by [`DuelingDqnAgent::update_target`].
//!
//! # Example
//!
//! ```
//! use breakcue_agent::{AgentParams, DuelingDqnAgent, Transition};
//!
//! let mut rng = rand::rng();
//! let params = AgentParams {
//!     hidden_sizes: vec![8],
//!     head_size: 4,
//!     batch_size: 2,
//!     ..AgentParams::default()
//! };
//! let mut agent = DuelingDqnAgent::new(params, &mut rng);
//!
//! let state = vec![0.5, 0.1, 0.6, 0.4, 0.2];
//! let action = agent.act(&state, true, &mut rng);
//! assert!(action < 3);
//!
//! for _ in 0..2 {
//!     agent.remember(Transition {
//!         state: state.clone(),
//!         action,
//!         reward: 1.0,
//!         next_state: state.clone(),
//!         terminal: true,
//!     });
//! }
//! assert!(agent.replay(&mut rng).is_some());
//! agent.update_target();
//! ```

use std::{io, path::PathBuf};

pub use self::{
    agent::{AgentParams, DuelingDqnAgent},
    network::{DuelingNetwork, DuelingOutput},
    replay::{ReplayBuffer, Transition},
};

mod agent;
pub mod network;
mod optimizer;
mod replay;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum AgentError {
    #[display("failed to access checkpoint {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to parse checkpoint {}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("checkpoint {} has inconsistent layer shapes", path.display())]
    Corrupt { path: PathBuf },
    #[display(
        "checkpoint {} expects {found_state} inputs and {found_actions} actions, agent has {expected_state} and {expected_actions}",
        path.display()
    )]
    ShapeMismatch {
        path: PathBuf,
        expected_state: usize,
        expected_actions: usize,
        found_state: usize,
        found_actions: usize,
    },
}
