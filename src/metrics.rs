//! Per-episode statistics.

use serde::{Serialize, Deserialize};

/// One row of the episode log. Field order is the column order of the CSV log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub episode_reward: f32,
    /// Mean episode reward over all episodes so far, this one included
    pub average_reward: f32,
    pub min_reward: f32,
    pub max_reward: f32,
    pub last_exploration_rate: f32,
    pub total_train_steps: usize,
    pub replay_memory_count: usize,
    /// Mean of the greedy max-Q estimates seen this episode, NaN if none
    pub meanq: f32,
    /// Mean training loss this episode, NaN if no training step ran
    pub meancost: f32,
    /// Wall-clock seconds
    pub episode_time: f64,
    pub episode_steps: usize,
    pub steps_per_second: f64,
}

impl EpisodeSummary {
    pub const HEADER: [&'static str; 13] = [
        "episode",
        "episode_reward",
        "average_reward",
        "min_reward",
        "max_reward",
        "last_exploration_rate",
        "total_train_steps",
        "replay_memory_count",
        "meanq",
        "meancost",
        "episode_time",
        "episode_steps",
        "steps_per_second",
    ];
}

/// Mean of `values`, NaN when empty.
pub fn mean_or_nan(values: &[f32]) -> f32 {
    if values.is_empty() {
        f32::NAN
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// Rewards of every finished episode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeStats {
    rewards: Vec<f32>,
}

impl EpisodeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, episode_reward: f32) {
        self.rewards.push(episode_reward);
    }

    pub fn episodes(&self) -> usize {
        self.rewards.len()
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    pub fn average(&self) -> f32 {
        mean_or_nan(&self.rewards)
    }

    pub fn min(&self) -> f32 {
        self.rewards.iter().copied().fold(f32::NAN, f32::min)
    }

    pub fn max(&self) -> f32 {
        self.rewards.iter().copied().fold(f32::NAN, f32::max)
    }
}
