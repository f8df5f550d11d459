//! Dueling value network.
//!
//! The network maps a state vector to one score per action through three
//! stacks of fully connected layers:
//!
//! ```text
//! state ─→ trunk (ReLU, ReLU) ─┬─→ value head (ReLU → 1)          = V
//!                              └─→ advantage head (ReLU → actions) = A
//!
//! Q[a] = V + A[a] - mean(A)
//! ```
//!
//! Centering the advantages on their mean makes the decomposition
//! identifiable: the mean score over actions always equals the value.
//!
//! Gradients are accumulated into a [`NetworkGrad`] by
//! [`DuelingNetwork::backward`] and applied by the
//! [`Adam`](crate::optimizer::Adam) optimizer.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply(self, z: f32) -> f32 {
        match self {
            Self::Relu => z.max(0.0),
            Self::Linear => z,
        }
    }

    /// Derivative expressed in terms of the activation output.
    fn derivative(self, output: f32) -> f32 {
        match self {
            Self::Relu => {
                if output > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Linear => 1.0,
        }
    }
}

/// A fully connected layer. Weights are stored row-major, one row per output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub(crate) inputs: usize,
    pub(crate) outputs: usize,
    pub(crate) activation: Activation,
    pub(crate) weights: Vec<f32>,
    pub(crate) biases: Vec<f32>,
}

impl Dense {
    /// Creates a layer with Glorot-uniform weights and zero biases.
    pub fn glorot<R>(inputs: usize, outputs: usize, activation: Activation, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        assert!(inputs > 0 && outputs > 0, "layer dimensions must be non-zero");
        #[expect(clippy::cast_precision_loss)]
        let limit = (6.0 / (inputs + outputs) as f32).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.random_range(-limit..=limit))
            .collect();
        Self {
            inputs,
            outputs,
            activation,
            weights,
            biases: vec![0.0; outputs],
        }
    }

    fn is_consistent(&self) -> bool {
        self.inputs > 0
            && self.outputs > 0
            && self.weights.len() == self.inputs * self.outputs
            && self.biases.len() == self.outputs
    }

    #[must_use]
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        debug_assert_eq!(input.len(), self.inputs);
        self.weights
            .chunks_exact(self.inputs)
            .zip(&self.biases)
            .map(|(row, bias)| {
                let z = row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + bias;
                self.activation.apply(z)
            })
            .collect()
    }

    /// Accumulates parameter gradients into `grad` and returns the gradient
    /// with respect to `input`.
    fn backward(
        &self,
        input: &[f32],
        output: &[f32],
        grad_output: &[f32],
        grad: &mut DenseGrad,
    ) -> Vec<f32> {
        let mut grad_input = vec![0.0; self.inputs];
        let rows = self.weights.chunks_exact(self.inputs);
        let grad_rows = grad.weights.chunks_exact_mut(self.inputs);
        for (((row, grad_row), (y, g)), grad_bias) in rows
            .zip(grad_rows)
            .zip(output.iter().zip(grad_output))
            .zip(&mut grad.biases)
        {
            let delta = g * self.activation.derivative(*y);
            *grad_bias += delta;
            for (((gw, x), gi), w) in grad_row
                .iter_mut()
                .zip(input)
                .zip(&mut grad_input)
                .zip(row)
            {
                *gw += delta * x;
                *gi += delta * w;
            }
        }
        grad_input
    }
}

/// Gradient buffers shaped like a [`Dense`] layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseGrad {
    pub(crate) weights: Vec<f32>,
    pub(crate) biases: Vec<f32>,
}

impl DenseGrad {
    fn zeros_like(layer: &Dense) -> Self {
        Self {
            weights: vec![0.0; layer.weights.len()],
            biases: vec![0.0; layer.biases.len()],
        }
    }
}

/// Runs `input` through `layers`, returning every activation including the input.
fn forward_stack(layers: &[Dense], input: Vec<f32>) -> Vec<Vec<f32>> {
    let mut activations = Vec::with_capacity(layers.len() + 1);
    activations.push(input);
    for layer in layers {
        let next = layer.forward(&activations[activations.len() - 1]);
        activations.push(next);
    }
    activations
}

fn backward_stack(
    layers: &[Dense],
    activations: &[Vec<f32>],
    grad_output: Vec<f32>,
    grads: &mut [DenseGrad],
) -> Vec<f32> {
    let mut grad = grad_output;
    for (i, layer) in layers.iter().enumerate().rev() {
        grad = layer.backward(&activations[i], &activations[i + 1], &grad, &mut grads[i]);
    }
    grad
}

fn stack_output_width(layers: &[Dense], inputs: usize) -> Option<usize> {
    layers.iter().try_fold(inputs, |width, layer| {
        (layer.is_consistent() && layer.inputs == width).then_some(layer.outputs)
    })
}

/// Value, advantages and combined scores for one state.
#[derive(Debug, Clone, PartialEq)]
pub struct DuelingOutput {
    pub value: f32,
    pub advantages: Vec<f32>,
    pub q_values: Vec<f32>,
}

/// Every intermediate activation of one forward pass, kept for backpropagation.
#[derive(Debug, Clone)]
pub struct ForwardTrace {
    trunk: Vec<Vec<f32>>,
    value: Vec<Vec<f32>>,
    advantage: Vec<Vec<f32>>,
    output: DuelingOutput,
}

impl ForwardTrace {
    #[must_use]
    pub fn output(&self) -> &DuelingOutput {
        &self.output
    }
}

/// Dueling action-value approximator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelingNetwork {
    state_size: usize,
    action_count: usize,
    trunk: Vec<Dense>,
    value: Vec<Dense>,
    advantage: Vec<Dense>,
}

impl DuelingNetwork {
    /// Creates a randomly initialized network.
    ///
    /// `hidden_sizes` are the widths of the shared trunk layers and
    /// `head_size` the width of the hidden layer in each head.
    pub fn new<R>(
        state_size: usize,
        action_count: usize,
        hidden_sizes: &[usize],
        head_size: usize,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut trunk = Vec::with_capacity(hidden_sizes.len());
        let mut width = state_size;
        for &hidden in hidden_sizes {
            trunk.push(Dense::glorot(width, hidden, Activation::Relu, rng));
            width = hidden;
        }
        let value = vec![
            Dense::glorot(width, head_size, Activation::Relu, rng),
            Dense::glorot(head_size, 1, Activation::Linear, rng),
        ];
        let advantage = vec![
            Dense::glorot(width, head_size, Activation::Relu, rng),
            Dense::glorot(head_size, action_count, Activation::Linear, rng),
        ];
        Self {
            state_size,
            action_count,
            trunk,
            value,
            advantage,
        }
    }

    #[must_use]
    pub fn state_size(&self) -> usize {
        self.state_size
    }

    #[must_use]
    pub fn action_count(&self) -> usize {
        self.action_count
    }

    /// Checks that layer dimensions chain from `state_size` to a single value
    /// and `action_count` advantages. Deserialized networks must pass this
    /// before use.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let Some(feature_width) = stack_output_width(&self.trunk, self.state_size) else {
            return false;
        };
        self.action_count > 0
            && !self.value.is_empty()
            && !self.advantage.is_empty()
            && stack_output_width(&self.value, feature_width) == Some(1)
            && stack_output_width(&self.advantage, feature_width) == Some(self.action_count)
    }

    /// Scores every action for `state`.
    #[must_use]
    pub fn q_values(&self, state: &[f32]) -> Vec<f32> {
        self.evaluate(state).q_values
    }

    #[must_use]
    pub fn evaluate(&self, state: &[f32]) -> DuelingOutput {
        self.forward_trace(state).output
    }

    #[must_use]
    pub fn forward_trace(&self, state: &[f32]) -> ForwardTrace {
        assert_eq!(state.len(), self.state_size, "state vector has wrong length");
        let trunk = forward_stack(&self.trunk, state.to_vec());
        let features = &trunk[trunk.len() - 1];
        let value = forward_stack(&self.value, features.clone());
        let advantage = forward_stack(&self.advantage, features.clone());

        let v = value[value.len() - 1][0];
        let advantages = advantage[advantage.len() - 1].clone();
        #[expect(clippy::cast_precision_loss)]
        let mean = advantages.iter().sum::<f32>() / advantages.len() as f32;
        let q_values = advantages.iter().map(|a| v + (a - mean)).collect();

        ForwardTrace {
            trunk,
            value,
            advantage,
            output: DuelingOutput {
                value: v,
                advantages,
                q_values,
            },
        }
    }

    /// Backpropagates `grad_q` (gradient of the loss with respect to the
    /// combined scores) through the pass recorded in `trace`.
    pub fn backward(&self, trace: &ForwardTrace, grad_q: &[f32], grads: &mut NetworkGrad) {
        debug_assert_eq!(grad_q.len(), self.action_count);
        let grad_value = grad_q.iter().sum::<f32>();
        #[expect(clippy::cast_precision_loss)]
        let grad_mean = grad_value / grad_q.len() as f32;
        let grad_advantage = grad_q.iter().map(|g| g - grad_mean).collect();

        let from_value = backward_stack(&self.value, &trace.value, vec![grad_value], &mut grads.value);
        let from_advantage = backward_stack(
            &self.advantage,
            &trace.advantage,
            grad_advantage,
            &mut grads.advantage,
        );
        let grad_features = from_value
            .iter()
            .zip(&from_advantage)
            .map(|(a, b)| a + b)
            .collect();
        backward_stack(&self.trunk, &trace.trunk, grad_features, &mut grads.trunk);
    }

    /// All layers in a fixed order: trunk, value head, advantage head.
    pub(crate) fn layers(&self) -> impl Iterator<Item = &Dense> {
        self.trunk.iter().chain(&self.value).chain(&self.advantage)
    }

    pub(crate) fn layers_mut(&mut self) -> impl Iterator<Item = &mut Dense> {
        self.trunk
            .iter_mut()
            .chain(&mut self.value)
            .chain(&mut self.advantage)
    }
}

/// Accumulated gradients for every layer of a [`DuelingNetwork`].
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkGrad {
    trunk: Vec<DenseGrad>,
    value: Vec<DenseGrad>,
    advantage: Vec<DenseGrad>,
}

impl NetworkGrad {
    #[must_use]
    pub fn zeros_like(network: &DuelingNetwork) -> Self {
        let zeros = |layers: &[Dense]| layers.iter().map(DenseGrad::zeros_like).collect();
        Self {
            trunk: zeros(&network.trunk),
            value: zeros(&network.value),
            advantage: zeros(&network.advantage),
        }
    }

    /// Same order as [`DuelingNetwork::layers`].
    pub(crate) fn layers(&self) -> impl Iterator<Item = &DenseGrad> {
        self.trunk.iter().chain(&self.value).chain(&self.advantage)
    }
}
