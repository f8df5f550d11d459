use breakcue_profile::ProfileDocument;
use rand::Rng;
use rand_distr::StandardNormal;

/// Length of the state vector fed to the agent.
pub const STATE_SIZE: usize = 5;

const ACCURACY_NOISE: f64 = 0.05;
const FOUL_DIVISOR: f64 = 10.0;
const SHOT_POWER_MIN: f64 = 0.3;
const SHOT_POWER_MAX: f64 = 0.9;
const NEXT_STATE_NOISE: f32 = 0.02;

/// Builds the agent's view of a player: `[accuracy, fouls, shot power,
/// aggressiveness, win rate]`.
///
/// Accuracy is drawn around the profile average to model per-shot
/// variability, fouls are scaled down by ten, and shot power is a fresh
/// uniform draw in `[0.3, 0.9)`.
#[expect(clippy::cast_possible_truncation)]
pub fn derive_state<R>(profile: &ProfileDocument, rng: &mut R) -> [f32; STATE_SIZE]
where
    R: Rng + ?Sized,
{
    let noise: f64 = rng.sample(StandardNormal);
    let accuracy = (profile.average_accuracy + ACCURACY_NOISE * noise).clamp(0.0, 1.0);
    let fouls = profile.average_fouls / FOUL_DIVISOR;
    let shot_power = rng.random_range(SHOT_POWER_MIN..SHOT_POWER_MAX);
    [
        accuracy as f32,
        fouls as f32,
        shot_power as f32,
        profile.aggressiveness_score as f32,
        profile.win_rate as f32,
    ]
}

/// Synthetic chance of winning, increasing in accuracy and aggressiveness.
#[must_use]
pub fn win_probability(state: &[f32; STATE_SIZE]) -> f64 {
    let accuracy = f64::from(state[0]);
    let aggressiveness = f64::from(state[3]);
    (0.4 + 0.6 * accuracy + 0.2 * (aggressiveness - 0.5)).clamp(0.05, 0.95)
}

/// Adds small Gaussian noise to every component, clipped to `[0, 1]`.
pub fn perturb<R>(state: &[f32; STATE_SIZE], rng: &mut R) -> [f32; STATE_SIZE]
where
    R: Rng + ?Sized,
{
    state.map(|x| {
        let noise: f32 = rng.sample(StandardNormal);
        (x + NEXT_STATE_NOISE * noise).clamp(0.0, 1.0)
    })
}
