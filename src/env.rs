//! Environments the trainer can drive.
//!
//! The trainer only needs the [`Environment`] trait: a fixed observation
//! shape, a fixed number of discrete actions, `reset` and `step`.
//! [`GridWorld`] is the built-in image environment.

use std::collections::BTreeMap;

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::error::{DuelError, Result};
use crate::replay_buffer::{Action, Observation};

/// Outcome of one environment step.
#[derive(Clone, Debug)]
pub struct Step {
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
    pub info: BTreeMap<String, f32>,
}

pub trait Environment {
    /// Observation shape as (height, width, channels)
    fn observation_shape(&self) -> [usize; 3];

    fn num_actions(&self) -> usize;

    fn reset(&mut self) -> Result<Observation>;

    fn step(&mut self, action: Action) -> Result<Step>;

    /// A uniformly random legal action.
    fn sample_action(&mut self, rng: &mut dyn RngCore) -> Action {
        rng.gen_range(0..self.num_actions())
    }

    fn render(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub const GRID_ACTIONS: usize = 4;

/// Pixel intensities of the three channels.
const AGENT_PIXEL: f32 = 255.0;
const GOAL_PIXEL: f32 = 255.0;
const BACKGROUND_PIXEL: f32 = 64.0;

const GOAL_REWARD: f32 = 1.0;
const STEP_REWARD: f32 = -0.01;

/// An agent walks an `N x N` grid towards a fixed goal in the bottom-right corner.
///
/// Observations are `N x N x 3` images: channel 0 marks the agent, channel 1
/// the goal, channel 2 is a flat background. Actions are up, down, left and
/// right; moves into a wall leave the agent in place. Reaching the goal pays
/// +1 and ends the episode, every other step costs 0.01. The agent starts on
/// a random cell other than the goal.
pub struct GridWorld {
    size: usize,
    agent: (usize, usize),
    goal: (usize, usize),
    steps: usize,
    done: bool,
    rng: StdRng,
}

impl GridWorld {
    pub fn new(size: usize, seed: Option<u64>) -> Result<Self> {
        if size < 2 {
            return Err(DuelError::invalid_configuration(
                "grid_size".to_string(),
                format!("{} is too small, need at least 2", size),
            ));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(GridWorld {
            size,
            agent: (0, 0),
            goal: (size - 1, size - 1),
            steps: 0,
            done: true,
            rng,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn agent_position(&self) -> (usize, usize) {
        self.agent
    }

    pub fn goal_position(&self) -> (usize, usize) {
        self.goal
    }

    /// Place the agent explicitly, e.g. for a deterministic start.
    pub fn set_agent_position(&mut self, position: (usize, usize)) -> Result<()> {
        if position.0 >= self.size || position.1 >= self.size {
            return Err(DuelError::Environment(format!(
                "position {:?} is outside a {}x{} grid",
                position, self.size, self.size
            )));
        }
        self.agent = position;
        self.done = position == self.goal;
        Ok(())
    }

    pub fn observation(&self) -> Observation {
        let mut frame = Array3::zeros((self.size, self.size, 3));
        frame.index_axis_mut(ndarray::Axis(2), 2).fill(BACKGROUND_PIXEL);
        frame[[self.goal.0, self.goal.1, 1]] = GOAL_PIXEL;
        frame[[self.agent.0, self.agent.1, 0]] = AGENT_PIXEL;
        frame
    }

    fn moved(&self, action: Action) -> Result<(usize, usize)> {
        let (row, col) = self.agent;
        let last = self.size - 1;
        match action {
            0 => Ok((row.saturating_sub(1), col)),
            1 => Ok(((row + 1).min(last), col)),
            2 => Ok((row, col.saturating_sub(1))),
            3 => Ok((row, (col + 1).min(last))),
            other => Err(DuelError::Environment(format!(
                "invalid action {}, expected 0..{}",
                other, GRID_ACTIONS
            ))),
        }
    }
}

impl Environment for GridWorld {
    fn observation_shape(&self) -> [usize; 3] {
        [self.size, self.size, 3]
    }

    fn num_actions(&self) -> usize {
        GRID_ACTIONS
    }

    fn reset(&mut self) -> Result<Observation> {
        let cells = self.size * self.size;
        // Every cell but the goal, which is the last one.
        let start = self.rng.gen_range(0..cells - 1);
        self.agent = (start / self.size, start % self.size);
        self.steps = 0;
        self.done = false;
        Ok(self.observation())
    }

    fn step(&mut self, action: Action) -> Result<Step> {
        if self.done {
            return Err(DuelError::Environment(
                "step called on a finished episode, reset first".to_string(),
            ));
        }
        self.agent = self.moved(action)?;
        self.steps += 1;
        self.done = self.agent == self.goal;

        let reward = if self.done { GOAL_REWARD } else { STEP_REWARD };
        let mut info = BTreeMap::new();
        info.insert("steps".to_string(), self.steps as f32);
        let distance = self.goal.0.abs_diff(self.agent.0) + self.goal.1.abs_diff(self.agent.1);
        info.insert("distance".to_string(), distance as f32);

        Ok(Step {
            observation: self.observation(),
            reward,
            done: self.done,
            info,
        })
    }

    fn render(&mut self) -> Result<()> {
        let mut frame = String::with_capacity((self.size + 1) * self.size);
        for row in 0..self.size {
            for col in 0..self.size {
                let cell = if (row, col) == self.agent {
                    'A'
                } else if (row, col) == self.goal {
                    'G'
                } else {
                    '.'
                };
                frame.push(cell);
            }
            frame.push('\n');
        }
        eprint!("{}", frame);
        Ok(())
    }
}
