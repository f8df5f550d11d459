use std::collections::VecDeque;

use rand::{Rng, seq::index};

/// One step of experience.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
    /// No bootstrapped future value is added to the reward.
    pub terminal: bool,
}

/// Bounded FIFO of transitions; the oldest entry is evicted at capacity.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    capacity: usize,
    transitions: VecDeque<Transition>,
}

impl ReplayBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be non-zero");
        Self {
            capacity,
            transitions: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn push(&mut self, transition: Transition) {
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    /// Draws up to `count` distinct transitions uniformly at random.
    pub fn sample<R>(&self, rng: &mut R, count: usize) -> Vec<&Transition>
    where
        R: Rng + ?Sized,
    {
        let count = count.min(self.transitions.len());
        index::sample(rng, self.transitions.len(), count)
            .into_iter()
            .map(|i| &self.transitions[i])
            .collect()
    }
}
