use crate::network::{Dense, DenseGrad, DuelingNetwork, NetworkGrad};

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-7;

#[derive(Debug, Clone)]
struct Moments {
    weights_m: Vec<f32>,
    weights_v: Vec<f32>,
    biases_m: Vec<f32>,
    biases_v: Vec<f32>,
}

impl Moments {
    fn zeros_like(layer: &Dense) -> Self {
        Self {
            weights_m: vec![0.0; layer.weights.len()],
            weights_v: vec![0.0; layer.weights.len()],
            biases_m: vec![0.0; layer.biases.len()],
            biases_v: vec![0.0; layer.biases.len()],
        }
    }
}

/// Adam optimizer with bias-corrected step size.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1_power: f32,
    beta2_power: f32,
    moments: Vec<Moments>,
}

impl Adam {
    #[must_use]
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1_power: 1.0,
            beta2_power: 1.0,
            moments: vec![],
        }
    }

    /// Applies one gradient step to `network`.
    ///
    /// Moment buffers are allocated on the first step and must keep matching
    /// the network's layer shapes afterwards; create a fresh optimizer when
    /// the network is replaced.
    pub fn step(&mut self, network: &mut DuelingNetwork, grads: &NetworkGrad) {
        if self.moments.is_empty() {
            self.moments = network.layers().map(Moments::zeros_like).collect();
        }
        self.beta1_power *= BETA1;
        self.beta2_power *= BETA2;
        let step_size =
            self.learning_rate * (1.0 - self.beta2_power).sqrt() / (1.0 - self.beta1_power);

        for ((layer, grad), moments) in network
            .layers_mut()
            .zip(grads.layers())
            .zip(&mut self.moments)
        {
            update(layer, grad, moments, step_size);
        }
    }
}

fn update(layer: &mut Dense, grad: &DenseGrad, moments: &mut Moments, step_size: f32) {
    update_slice(
        &mut layer.weights,
        &grad.weights,
        &mut moments.weights_m,
        &mut moments.weights_v,
        step_size,
    );
    update_slice(
        &mut layer.biases,
        &grad.biases,
        &mut moments.biases_m,
        &mut moments.biases_v,
        step_size,
    );
}

fn update_slice(params: &mut [f32], grads: &[f32], m: &mut [f32], v: &mut [f32], step_size: f32) {
    for (((p, g), m), v) in params.iter_mut().zip(grads).zip(m).zip(v) {
        *m = BETA1 * *m + (1.0 - BETA1) * g;
        *v = BETA2 * *v + (1.0 - BETA2) * g * g;
        *p -= step_size * *m / (v.sqrt() + EPSILON);
    }
}
