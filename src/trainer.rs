//! The training controller.
//!
//! A [`Trainer`] owns the online and target Q-networks, the replay buffer and
//! the random generator. Each environment step it picks an epsilon-greedy
//! action, stores the transition, and then runs `train_repeat` training
//! iterations. An iteration samples a batch, computes TD targets against the
//! target network, takes one gradient step on the online network and blends
//! the target network towards it.

use std::path::Path;
use std::time::Instant;

use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{NetworkConfig, TrainerConfig};
use crate::env::Environment;
use crate::error::{DuelError, Result};
use crate::layers::dueling::first_argmax;
use crate::metrics::{mean_or_nan, EpisodeStats, EpisodeSummary};
use crate::network::QNetwork;
use crate::recorder::FrameRecorder;
use crate::replay_buffer::{Action, Batch, Observation, ReplayBuffer};
use crate::sink::EpisodeSink;

/// TD target for a single transition.
///
/// Terminal transitions bootstrap nothing: the target is the reward alone.
pub fn td_target(reward: f32, terminal: bool, max_next_q: f32, gamma: f32) -> f32 {
    if terminal {
        reward
    } else {
        reward + gamma * max_next_q
    }
}

/// Build the regression targets for a sampled batch.
///
/// Starts from the online predictions `qpre` and overwrites only the entry of
/// the action taken in each row, so the squared error is zero on every other
/// action. `qpost` holds the target network's predictions for the next
/// observations.
pub fn compute_targets(mut qpre: Array2<f32>, qpost: ArrayView2<f32>, batch: &Batch, gamma: f32) -> Array2<f32> {
    for (i, row) in qpost.outer_iter().enumerate() {
        let max_next_q = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        qpre[[i, batch.actions[i]]] = td_target(batch.rewards[i], batch.terminals[i], max_next_q, gamma);
    }
    qpre
}

pub struct Trainer<R: Rng = StdRng> {
    config: TrainerConfig,
    online: QNetwork,
    target: QNetwork,
    buffer: ReplayBuffer,
    rng: R,
    stats: EpisodeStats,
    total_train_steps: usize,
    sinks: Vec<Box<dyn EpisodeSink>>,
    recorder: Option<FrameRecorder>,
}

impl Trainer<StdRng> {
    /// Build a trainer for `env`, seeding the generator from `config.seed`
    /// or from entropy when no seed is set.
    pub fn new(config: TrainerConfig, env: &dyn Environment) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, env, rng)
    }
}

impl<R: Rng> Trainer<R> {
    /// Build a trainer drawing all of its randomness (weight init,
    /// exploration, replay sampling) from `rng`.
    pub fn with_rng(config: TrainerConfig, env: &dyn Environment, mut rng: R) -> Result<Self> {
        config.validate()?;
        let observation_shape = env.observation_shape();
        let network_config = NetworkConfig::from_trainer(&config, observation_shape, env.num_actions());

        let online = QNetwork::new(&network_config, &mut rng)?;
        let mut target = QNetwork::new(&network_config, &mut rng)?;
        target.set_parameters(&online.parameters())?;
        debug!("Q-network:\n{}", online.summary());

        let buffer = ReplayBuffer::new(config.replay_size, observation_shape);
        let recorder = match &config.record_dir {
            Some(dir) => Some(FrameRecorder::new(dir)?),
            None => None,
        };

        Ok(Trainer {
            config,
            online,
            target,
            buffer,
            rng,
            stats: EpisodeStats::new(),
            total_train_steps: 0,
            sinks: Vec::new(),
            recorder,
        })
    }

    pub fn add_sink<S: EpisodeSink + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn online(&self) -> &QNetwork {
        &self.online
    }

    pub fn target(&self) -> &QNetwork {
        &self.target
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut ReplayBuffer {
        &mut self.buffer
    }

    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    /// Training iterations that actually ran, skipped ones excluded.
    pub fn total_train_steps(&self) -> usize {
        self.total_train_steps
    }

    /// Load online weights from a checkpoint and copy them into the target.
    pub fn load_weights<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.online.load(path.as_ref())?;
        self.target.set_parameters(&self.online.parameters())?;
        info!("Loaded weights from {}", path.as_ref().display());
        Ok(())
    }

    pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.online.save(path.as_ref())?;
        info!("Saved weights to {}", path.as_ref().display());
        Ok(())
    }

    /// Epsilon-greedy action for `observation`.
    ///
    /// Returns the greedy branch's max Q-value alongside the action; the
    /// random branch has none.
    pub fn select_action(&mut self, env: &mut dyn Environment, observation: &Observation) -> Result<(Action, Option<f32>)> {
        if self.rng.gen::<f32>() < self.config.exploration {
            return Ok((env.sample_action(&mut self.rng), None));
        }
        let q = self.online.predict_one(observation.view())?;
        let (action, max_q) = first_argmax(q.iter())
            .ok_or_else(|| DuelError::dimension_mismatch("at least one Q-value", "none"))?;
        Ok((action, Some(max_q)))
    }

    /// One training iteration.
    ///
    /// Returns `None` without touching either network when the buffer holds
    /// fewer transitions than a batch.
    pub fn train_step(&mut self) -> Result<Option<f32>> {
        let batch = match self.buffer.sample(self.config.batch_size, &mut self.rng) {
            Ok(batch) => batch,
            Err(err) if err.is_insufficient_data() => {
                debug!("skipping training iteration: {}", err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let qpre = self.online.predict(batch.prior_observations.view())?;
        let qpost = self.target.predict(batch.next_observations.view())?;
        let targets = compute_targets(qpre, qpost.view(), &batch, self.config.gamma);

        let loss = self.online.update(batch.prior_observations.view(), targets.view())?;
        self.target.soft_update(&self.online, self.config.tau)?;
        self.total_train_steps += 1;
        Ok(Some(loss))
    }

    /// Play one episode, training as it goes. `episode` is 1-based.
    pub fn run_episode(&mut self, env: &mut dyn Environment, episode: usize) -> Result<EpisodeSummary> {
        let begin = Instant::now();
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.try_start_episode(episode);
        }

        let mut observation = env.reset()?;
        self.record(&observation);

        let mut episode_reward = 0.0;
        let mut maxqs = Vec::new();
        let mut costs = Vec::new();
        let mut steps = 0;

        for _ in 0..self.config.max_timesteps {
            if self.config.display {
                env.render()?;
            }

            let (action, max_q) = self.select_action(env, &observation)?;
            maxqs.extend(max_q);

            let step = env.step(action)?;
            episode_reward += step.reward;
            self.record(&step.observation);
            self.buffer.insert(observation, action, step.reward, step.observation.clone(), step.done);

            for _ in 0..self.config.train_repeat {
                costs.extend(self.train_step()?);
            }

            observation = step.observation;
            steps += 1;
            if step.done {
                break;
            }
        }

        info!(
            "Episode {} finished after {} timesteps, episode reward {}",
            episode, steps, episode_reward
        );
        self.stats.record(episode_reward);

        let elapsed = begin.elapsed().as_secs_f64();
        let summary = EpisodeSummary {
            episode,
            episode_reward,
            average_reward: self.stats.average(),
            min_reward: self.stats.min(),
            max_reward: self.stats.max(),
            last_exploration_rate: self.config.exploration,
            total_train_steps: self.total_train_steps,
            replay_memory_count: self.buffer.len(),
            meanq: mean_or_nan(&maxqs),
            meancost: mean_or_nan(&costs),
            episode_time: elapsed,
            episode_steps: steps,
            steps_per_second: if elapsed > 0.0 { steps as f64 / elapsed } else { 0.0 },
        };
        for sink in self.sinks.iter_mut() {
            sink.record(&summary)?;
        }
        Ok(summary)
    }

    /// Run `config.episodes` episodes and return the mean episode reward.
    pub fn run(&mut self, env: &mut dyn Environment) -> Result<f32> {
        for episode in 1..=self.config.episodes {
            self.run_episode(env, episode)?;
        }
        for sink in self.sinks.iter_mut() {
            sink.close()?;
        }
        let average = self.stats.average();
        info!("Average reward per episode {}", average);
        Ok(average)
    }

    fn record(&mut self, observation: &Observation) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.try_record_frame(observation.view());
        }
    }
}
