use std::{
    fs::File,
    io::{BufReader, BufWriter, Write as _},
    path::Path,
};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    AgentError,
    network::{DuelingNetwork, DuelingOutput, NetworkGrad},
    optimizer::Adam,
    replay::{ReplayBuffer, Transition},
};

/// Hyperparameters of a [`DuelingDqnAgent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    pub state_size: usize,
    pub action_count: usize,
    /// Widths of the shared trunk layers.
    pub hidden_sizes: Vec<usize>,
    /// Width of the hidden layer in the value and advantage heads.
    pub head_size: usize,
    pub learning_rate: f32,
    pub discount_factor: f32,
    pub epsilon: f32,
    pub epsilon_min: f32,
    pub epsilon_decay: f32,
    pub memory_size: usize,
    pub batch_size: usize,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            state_size: 5,
            action_count: 3,
            hidden_sizes: vec![256, 256],
            head_size: 128,
            learning_rate: 0.001,
            discount_factor: 0.95,
            epsilon: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
            memory_size: 50_000,
            batch_size: 64,
        }
    }
}

/// Epsilon-greedy dueling Q-learning agent with experience replay and a
/// target network that is only synchronized on request.
#[derive(Debug, Clone)]
pub struct DuelingDqnAgent {
    params: AgentParams,
    epsilon: f32,
    model: DuelingNetwork,
    target_model: DuelingNetwork,
    optimizer: Adam,
    memory: ReplayBuffer,
}

impl DuelingDqnAgent {
    /// Creates an agent with a randomly initialized model. The target model
    /// starts as an exact copy.
    pub fn new<R>(params: AgentParams, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        assert!(params.state_size > 0, "state size must be non-zero");
        assert!(params.action_count > 0, "action count must be non-zero");
        assert!(params.batch_size > 0, "batch size must be non-zero");
        let model = DuelingNetwork::new(
            params.state_size,
            params.action_count,
            &params.hidden_sizes,
            params.head_size,
            rng,
        );
        Self {
            epsilon: params.epsilon,
            target_model: model.clone(),
            model,
            optimizer: Adam::new(params.learning_rate),
            memory: ReplayBuffer::new(params.memory_size),
            params,
        }
    }

    #[must_use]
    pub fn params(&self) -> &AgentParams {
        &self.params
    }

    #[must_use]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    #[must_use]
    pub fn model(&self) -> &DuelingNetwork {
        &self.model
    }

    #[must_use]
    pub fn target_model(&self) -> &DuelingNetwork {
        &self.target_model
    }

    /// Value, advantages and combined scores of the online model.
    #[must_use]
    pub fn evaluate(&self, state: &[f32]) -> DuelingOutput {
        self.model.evaluate(state)
    }

    /// Picks an action for `state`.
    ///
    /// With `explore` set, a uniformly random action is taken with
    /// probability epsilon; otherwise the highest scoring action is taken,
    /// ties going to the lowest index.
    pub fn act<R>(&self, state: &[f32], explore: bool, rng: &mut R) -> usize
    where
        R: Rng + ?Sized,
    {
        if explore && rng.random::<f32>() < self.epsilon {
            let action = rng.random_range(0..self.params.action_count);
            tracing::debug!(action, "random action");
            return action;
        }
        argmax(&self.model.q_values(state))
    }

    pub fn remember(&mut self, transition: Transition) {
        assert!(
            transition.action < self.params.action_count,
            "action {} out of range",
            transition.action
        );
        self.memory.push(transition);
    }

    /// Trains the model on one uniformly sampled mini-batch and decays
    /// epsilon.
    ///
    /// Returns the mean Huber loss of the batch, or `None` without touching
    /// any state when fewer than `batch_size` transitions are stored.
    pub fn replay<R>(&mut self, rng: &mut R) -> Option<f32>
    where
        R: Rng + ?Sized,
    {
        let batch_size = self.params.batch_size;
        if self.memory.len() < batch_size {
            return None;
        }

        #[expect(clippy::cast_precision_loss)]
        let scale = 1.0 / (batch_size * self.params.action_count) as f32;
        let mut grads = NetworkGrad::zeros_like(&self.model);
        let mut loss = 0.0;
        for transition in self.memory.sample(rng, batch_size) {
            let target = if transition.terminal {
                transition.reward
            } else {
                let next = self.target_model.q_values(&transition.next_state);
                transition.reward + self.params.discount_factor * max(&next)
            };

            // Only the taken action's score differs from its target.
            let trace = self.model.forward_trace(&transition.state);
            let error = trace.output().q_values[transition.action] - target;
            loss += huber(error);
            let mut grad_q = vec![0.0; self.params.action_count];
            grad_q[transition.action] = huber_grad(error) * scale;
            self.model.backward(&trace, &grad_q, &mut grads);
        }
        self.optimizer.step(&mut self.model, &grads);

        self.epsilon = (self.epsilon * self.params.epsilon_decay).max(self.params.epsilon_min);
        Some(loss * scale)
    }

    /// Copies the online model's parameters into the target model.
    pub fn update_target(&mut self) {
        self.target_model.clone_from(&self.model);
        tracing::debug!("synchronized target network");
    }

    /// Writes the online model's parameters to `path` as JSON.
    pub fn save(&self, path: &Path) -> Result<(), AgentError> {
        let io_error = |source| AgentError::Io {
            path: path.to_owned(),
            source,
        };
        let file = File::create(path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &self.model).map_err(|source| AgentError::Json {
            path: path.to_owned(),
            source,
        })?;
        writer.flush().map_err(io_error)?;
        tracing::info!(path = %path.display(), "saved agent checkpoint");
        Ok(())
    }

    /// Replaces the online model with parameters read from `path` and
    /// resynchronizes the target model.
    ///
    /// The checkpoint must match this agent's state size and action count;
    /// on any error the agent is left unchanged.
    pub fn load(&mut self, path: &Path) -> Result<(), AgentError> {
        let file = File::open(path).map_err(|source| AgentError::Io {
            path: path.to_owned(),
            source,
        })?;
        let model: DuelingNetwork =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| AgentError::Json {
                path: path.to_owned(),
                source,
            })?;
        if !model.is_consistent() {
            return Err(AgentError::Corrupt {
                path: path.to_owned(),
            });
        }
        if model.state_size() != self.params.state_size
            || model.action_count() != self.params.action_count
        {
            return Err(AgentError::ShapeMismatch {
                path: path.to_owned(),
                expected_state: self.params.state_size,
                expected_actions: self.params.action_count,
                found_state: model.state_size(),
                found_actions: model.action_count(),
            });
        }

        self.model = model;
        self.optimizer = Adam::new(self.params.learning_rate);
        self.update_target();
        tracing::info!(path = %path.display(), "loaded agent checkpoint");
        Ok(())
    }
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn max(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

/// Huber loss with a threshold of one.
fn huber(error: f32) -> f32 {
    let abs = error.abs();
    if abs <= 1.0 { 0.5 * error * error } else { abs - 0.5 }
}

fn huber_grad(error: f32) -> f32 {
    error.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn small_params() -> AgentParams {
        AgentParams {
            hidden_sizes: vec![16, 16],
            head_size: 8,
            learning_rate: 0.01,
            batch_size: 4,
            memory_size: 100,
            ..AgentParams::default()
        }
    }

    fn transition(action: usize, reward: f32, terminal: bool) -> Transition {
        Transition {
            state: vec![0.5, 0.1, 0.6, 0.4, 0.2],
            action,
            reward,
            next_state: vec![0.5, 0.1, 0.6, 0.4, 0.2],
            terminal,
        }
    }

    #[test]
    fn test_huber() {
        assert_eq!(huber(0.5), 0.125);
        assert_eq!(huber(-3.0), 2.5);
        assert_eq!(huber_grad(0.25), 0.25);
        assert_eq!(huber_grad(-4.0), -1.0);
    }

    #[test]
    fn test_argmax_prefers_first_tie() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), 1);
        assert_eq!(argmax(&[2.0]), 0);
    }

    #[test]
    fn test_greedy_action_without_exploration() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let mut agent = DuelingDqnAgent::new(small_params(), &mut rng);
        let state = [0.3, 0.2, 0.5, 0.6, 0.1];
        let best = argmax(&agent.evaluate(&state).q_values);

        assert_eq!(agent.epsilon(), 1.0);
        for _ in 0..20 {
            assert_eq!(agent.act(&state, false, &mut rng), best);
        }
        agent.set_epsilon(0.0);
        for _ in 0..20 {
            assert_eq!(agent.act(&state, true, &mut rng), best);
        }
    }

    #[test]
    fn test_full_exploration_is_uniform() {
        let mut rng = Pcg64Mcg::seed_from_u64(2);
        let agent = DuelingDqnAgent::new(small_params(), &mut rng);
        let state = [0.3, 0.2, 0.5, 0.6, 0.1];
        let mut counts = [0_u32; 3];
        for _ in 0..3000 {
            counts[agent.act(&state, true, &mut rng)] += 1;
        }
        for count in counts {
            assert!((800..=1200).contains(&count), "{counts:?}");
        }
    }

    #[test]
    fn test_replay_below_batch_size_is_noop() {
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        let mut agent = DuelingDqnAgent::new(small_params(), &mut rng);
        for _ in 0..3 {
            agent.remember(transition(0, 1.0, true));
        }
        let before = agent.model().clone();
        assert_eq!(agent.replay(&mut rng), None);
        assert_eq!(agent.model(), &before);
        assert_eq!(agent.epsilon(), 1.0);
    }

    #[test]
    fn test_replay_decays_epsilon_to_floor() {
        let mut rng = Pcg64Mcg::seed_from_u64(4);
        let mut agent = DuelingDqnAgent::new(small_params(), &mut rng);
        for _ in 0..4 {
            agent.remember(transition(1, 0.0, false));
        }
        assert!(agent.replay(&mut rng).is_some());
        assert!((agent.epsilon() - 0.995).abs() < 1e-6);

        agent.set_epsilon(0.01005);
        agent.replay(&mut rng);
        assert_eq!(agent.epsilon(), 0.01);
        agent.replay(&mut rng);
        assert_eq!(agent.epsilon(), 0.01);
    }

    #[test]
    fn test_replay_fits_terminal_reward() {
        let mut rng = Pcg64Mcg::seed_from_u64(5);
        let mut agent = DuelingDqnAgent::new(small_params(), &mut rng);
        for _ in 0..8 {
            agent.remember(transition(2, 1.0, true));
        }
        let first_loss = agent.replay(&mut rng).unwrap();
        let mut last_loss = first_loss;
        for _ in 0..500 {
            last_loss = agent.replay(&mut rng).unwrap();
        }
        assert!(last_loss < first_loss);
        let q = agent.evaluate(&transition(2, 1.0, true).state).q_values[2];
        assert!((q - 1.0).abs() < 0.1, "q = {q}");
    }

    #[test]
    fn test_update_target_syncs_models() {
        let mut rng = Pcg64Mcg::seed_from_u64(6);
        let mut agent = DuelingDqnAgent::new(small_params(), &mut rng);
        assert_eq!(agent.model(), agent.target_model());
        for _ in 0..4 {
            agent.remember(transition(0, 1.0, true));
        }
        agent.replay(&mut rng);
        assert_ne!(agent.model(), agent.target_model());
        agent.update_target();
        assert_eq!(agent.model(), agent.target_model());
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let trained = DuelingDqnAgent::new(small_params(), &mut rng);
        trained.save(&path).unwrap();

        let mut restored = DuelingDqnAgent::new(small_params(), &mut rng);
        assert_ne!(restored.model(), trained.model());
        restored.load(&path).unwrap();
        assert_eq!(restored.model(), trained.model());
        assert_eq!(restored.target_model(), trained.model());
    }

    #[test]
    fn test_load_rejects_other_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");
        let mut rng = Pcg64Mcg::seed_from_u64(8);
        let four_actions = DuelingDqnAgent::new(
            AgentParams {
                action_count: 4,
                ..small_params()
            },
            &mut rng,
        );
        four_actions.save(&path).unwrap();

        let mut agent = DuelingDqnAgent::new(small_params(), &mut rng);
        let before = agent.model().clone();
        let err = agent.load(&path).unwrap_err();
        assert!(matches!(
            err,
            AgentError::ShapeMismatch {
                found_actions: 4,
                expected_actions: 3,
                ..
            }
        ));
        assert_eq!(agent.model(), &before);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = Pcg64Mcg::seed_from_u64(9);
        let mut agent = DuelingDqnAgent::new(small_params(), &mut rng);
        let err = agent.load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, AgentError::Io { .. }));
    }
}
