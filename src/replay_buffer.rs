//! Experience replay.
//!
//! A fixed-capacity ring of [`Transition`]s. Once full, every insertion
//! evicts the oldest transition. Sampling draws indices uniformly with
//! replacement from the occupied slots only.

use ndarray::{s, Array1, Array3, Array4};
use rand::Rng;

use crate::error::{DuelError, Result};

pub type Observation = Array3<f32>;
pub type Action = usize;

/// Slots reserved up front; larger buffers grow on demand up to capacity.
const PREALLOCATED_SLOTS: usize = 4096;

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub prior_observation: Observation,
    pub action: Action,
    pub reward: f32,
    pub next_observation: Observation,
    pub terminal: bool,
}

/// Index-aligned columns gathered from a [`ReplayBuffer`]: row `i` of every
/// field belongs to the transition stored at `indices[i]`.
#[derive(Clone, Debug)]
pub struct Batch {
    /// `[batch, height, width, channels]`
    pub prior_observations: Array4<f32>,
    pub actions: Vec<Action>,
    pub rewards: Array1<f32>,
    /// `[batch, height, width, channels]`
    pub next_observations: Array4<f32>,
    pub terminals: Vec<bool>,
    pub indices: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    slots: Vec<Transition>,
    capacity: usize,
    cursor: usize,
    observation_shape: [usize; 3],
}

impl ReplayBuffer {
    /// Create an empty buffer for observations of shape `(height, width, channels)`.
    pub fn new(capacity: usize, observation_shape: [usize; 3]) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        ReplayBuffer {
            slots: Vec::with_capacity(capacity.min(PREALLOCATED_SLOTS)),
            capacity,
            cursor: 0,
            observation_shape,
        }
    }

    /// Store a transition, overwriting the oldest one when full.
    pub fn insert(
        &mut self,
        prior_observation: Observation,
        action: Action,
        reward: f32,
        next_observation: Observation,
        terminal: bool,
    ) {
        self.push(Transition {
            prior_observation,
            action,
            reward,
            next_observation,
            terminal,
        });
    }

    pub fn push(&mut self, transition: Transition) {
        debug_assert_eq!(transition.prior_observation.shape(), &self.observation_shape[..]);
        debug_assert_eq!(transition.next_observation.shape(), &self.observation_shape[..]);

        if self.slots.len() < self.capacity {
            self.slots.push(transition);
        } else {
            self.slots[self.cursor] = transition;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    /// Number of valid transitions stored.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub fn observation_shape(&self) -> [usize; 3] {
        self.observation_shape
    }

    /// Slot the next insertion writes to.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Transition stored in `slot`, if that slot has been written.
    pub fn get(&self, slot: usize) -> Option<&Transition> {
        self.slots.get(slot)
    }

    /// Stored transitions from oldest to newest.
    pub fn iter_chronological(&self) -> impl Iterator<Item = &Transition> {
        let split = if self.is_full() { self.cursor } else { 0 };
        self.slots[split..].iter().chain(self.slots[..split].iter())
    }

    /// Draw `batch_size` transitions uniformly at random, with replacement.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Batch> {
        if batch_size > self.slots.len() {
            return Err(DuelError::InsufficientReplayData {
                requested: batch_size,
                available: self.slots.len(),
            });
        }

        let indices: Vec<usize> = (0..batch_size)
            .map(|_| rng.gen_range(0..self.slots.len()))
            .collect();
        Ok(self.gather(&indices))
    }

    /// Collect the transitions at `indices` into a [`Batch`], preserving order.
    pub fn gather(&self, indices: &[usize]) -> Batch {
        let [height, width, channels] = self.observation_shape;
        let batch_size = indices.len();

        let mut prior_observations = Array4::zeros((batch_size, height, width, channels));
        let mut next_observations = Array4::zeros((batch_size, height, width, channels));
        let mut actions = Vec::with_capacity(batch_size);
        let mut rewards = Array1::zeros(batch_size);
        let mut terminals = Vec::with_capacity(batch_size);

        for (row, &index) in indices.iter().enumerate() {
            let transition = &self.slots[index];
            prior_observations
                .slice_mut(s![row, .., .., ..])
                .assign(&transition.prior_observation);
            next_observations
                .slice_mut(s![row, .., .., ..])
                .assign(&transition.next_observation);
            actions.push(transition.action);
            rewards[row] = transition.reward;
            terminals.push(transition.terminal);
        }

        Batch {
            prior_observations,
            actions,
            rewards,
            next_observations,
            terminals,
            indices: indices.to_vec(),
        }
    }
}
