use std::{collections::BTreeMap, sync::Arc};

use breakcue_agent::{DuelingDqnAgent, Transition};
use breakcue_profile::{CachePolicy, GameRecord, PlayerProfile, ProfileStore};
use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

use crate::{
    SimulationError,
    state::{self, STATE_SIZE},
};

/// Players simulated when no roster is configured.
pub const DEFAULT_ROSTER: [&str; 3] = ["user123", "user456", "user789"];

/// Probability of letting the agent explore in a simulated game.
pub const DEFAULT_EXPLORATION_RATE: f64 = 0.1;

const SHOT_COUNT_MIN: u32 = 5;
const SHOT_COUNT_MAX: u32 = 15;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub roster: Vec<String>,
    /// Probability that a game's action is chosen with the agent's
    /// epsilon-greedy exploration enabled.
    pub exploration_rate: f64,
    pub cache: CachePolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            roster: DEFAULT_ROSTER.iter().map(|&id| id.to_owned()).collect(),
            exploration_rate: DEFAULT_EXPLORATION_RATE,
            cache: CachePolicy::default(),
        }
    }
}

/// Result of one simulated game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub player_id: String,
    pub action: usize,
    pub win: bool,
    pub reward: f32,
}

/// Couples profile updates and agent training in one synchronous loop.
///
/// The driver owns the agent, the random source and one [`PlayerProfile`]
/// per simulated player, so cached profiles survive across games.
#[derive(Debug)]
pub struct SimulationDriver<R> {
    store: Arc<dyn ProfileStore>,
    config: SimulationConfig,
    agent: DuelingDqnAgent,
    rng: R,
    profiles: BTreeMap<String, PlayerProfile>,
}

impl<R> SimulationDriver<R>
where
    R: Rng,
{
    /// # Panics
    ///
    /// Panics if the agent does not take [`STATE_SIZE`] inputs.
    pub fn new(
        store: Arc<dyn ProfileStore>,
        agent: DuelingDqnAgent,
        config: SimulationConfig,
        rng: R,
    ) -> Self {
        assert_eq!(
            agent.params().state_size,
            STATE_SIZE,
            "agent state size does not match the simulation state"
        );
        Self {
            store,
            config,
            agent,
            rng,
            profiles: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn agent(&self) -> &DuelingDqnAgent {
        &self.agent
    }

    #[must_use]
    pub fn roster(&self) -> &[String] {
        &self.config.roster
    }

    /// The driver's profile for `player_id`, refreshed from the store.
    pub fn profile(&mut self, player_id: &str) -> Result<&PlayerProfile, SimulationError> {
        let profile = profile_entry(&mut self.profiles, &self.store, self.config.cache, player_id);
        profile.load()?;
        Ok(profile)
    }

    /// Plays one synthetic game for `player_id`.
    ///
    /// The agent picks an action for the player's current state, the game is
    /// won with [`win_probability`](state::win_probability), and the
    /// game record is stored. The transition (terminal on a win) reaches the
    /// agent's memory only once the profile update succeeded.
    pub fn simulate_game(&mut self, player_id: &str) -> Result<GameOutcome, SimulationError> {
        let Self {
            store,
            config,
            agent,
            rng,
            profiles,
        } = self;
        let profile = profile_entry(profiles, store, config.cache, player_id);
        profile.load()?;

        let state = state::derive_state(profile.data(), rng);
        let explore = rng.random::<f64>() < config.exploration_rate;
        let action = agent.act(&state, explore, rng);

        let win = rng.random::<f64>() < state::win_probability(&state);
        let reward = if win { 1.0 } else { -1.0 };
        let next_state = state::perturb(&state, rng);

        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let fouls = (state[1] * 10.0) as u32;
        let game = GameRecord {
            accuracy: f64::from(state[0]),
            fouls,
            shot_power: f64::from(state[2]) * 100.0,
            aggressive_shots: rng.random_range(SHOT_COUNT_MIN..=SHOT_COUNT_MAX),
            defensive_shots: rng.random_range(SHOT_COUNT_MIN..=SHOT_COUNT_MAX),
            win,
        };
        profile.record_game(&game)?;
        agent.remember(Transition {
            state: state.to_vec(),
            action,
            reward,
            next_state: next_state.to_vec(),
            terminal: win,
        });

        tracing::debug!(%player_id, action, win, "simulated game");
        Ok(GameOutcome {
            player_id: player_id.to_owned(),
            action,
            win,
            reward,
        })
    }

    /// Simulates `games` games for uniformly chosen roster members, training
    /// the agent once after each game.
    pub fn run(&mut self, games: usize) -> Result<Vec<GameOutcome>, SimulationError> {
        let mut outcomes = Vec::with_capacity(games);
        for _ in 0..games {
            let player_id = self
                .config
                .roster
                .choose(&mut self.rng)
                .ok_or(SimulationError::EmptyRoster)?
                .clone();
            outcomes.push(self.simulate_game(&player_id)?);
            if let Some(loss) = self.agent.replay(&mut self.rng) {
                tracing::trace!(loss, epsilon = self.agent.epsilon(), "trained agent");
            }
        }
        let wins = outcomes.iter().filter(|o| o.win).count();
        tracing::info!(games, wins, epsilon = self.agent.epsilon(), "simulation finished");
        Ok(outcomes)
    }

    /// Deletes every stored profile, drops the cached ones and synchronizes
    /// the agent's target network.
    pub fn reset(&mut self) -> Result<(), SimulationError> {
        self.store.clear()?;
        self.profiles.clear();
        self.agent.update_target();
        tracing::info!("simulation reset");
        Ok(())
    }
}

fn profile_entry<'a>(
    profiles: &'a mut BTreeMap<String, PlayerProfile>,
    store: &Arc<dyn ProfileStore>,
    cache: CachePolicy,
    player_id: &str,
) -> &'a mut PlayerProfile {
    profiles
        .entry(player_id.to_owned())
        .or_insert_with(|| PlayerProfile::new(player_id, Arc::clone(store), cache))
}
