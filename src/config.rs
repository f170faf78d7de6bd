//! Run configuration.
//!
//! [`TrainerConfig`] is the immutable set of startup parameters handed to the
//! [`Trainer`](crate::trainer::Trainer). String-valued choices (activation,
//! optimizer, advantage policy) are resolved into closed enums before they get
//! here, so the only checks left are numeric ranges, done by
//! [`TrainerConfig::validate`].

use std::path::PathBuf;

use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{DuelError, Result};
use crate::layers::AdvantagePolicy;
use crate::optimizer::OptimizerKind;

/// One convolution in the network's feature extractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvSpec {
    pub filters: usize,
    pub kernel: (usize, usize),
    pub stride: (usize, usize),
}

impl ConvSpec {
    pub fn new(filters: usize, kernel: (usize, usize), stride: (usize, usize)) -> Self {
        ConvSpec { filters, kernel, stride }
    }

    /// 32 filters 4x4 stride 2, then 64 filters 4x4 stride 2.
    pub fn default_stack() -> Vec<ConvSpec> {
        vec![
            ConvSpec::new(32, (4, 4), (2, 2)),
            ConvSpec::new(64, (4, 4), (2, 2)),
        ]
    }
}

/// Startup parameters for a training run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub batch_size: usize,
    /// Width of each fully connected hidden layer
    pub hidden_size: usize,
    /// Number of fully connected hidden layers
    pub layers: usize,
    /// Gradient steps taken after every environment step
    pub train_repeat: usize,
    /// Discount factor, in [0, 1)
    pub gamma: f32,
    /// Soft target update coefficient, in (0, 1]
    pub tau: f32,
    pub episodes: usize,
    /// Replay buffer capacity
    pub replay_size: usize,
    pub max_timesteps: usize,
    pub activation: Activation,
    pub optimizer: OptimizerKind,
    /// Overrides the optimizer's default learning rate
    pub optimizer_lr: Option<f32>,
    /// Probability of taking a uniformly random action, in [0, 1]
    pub exploration: f32,
    pub advantage: AdvantagePolicy,
    pub conv: Vec<ConvSpec>,
    pub display: bool,
    pub seed: Option<u64>,
    pub record_dir: Option<PathBuf>,
    pub save_csv: Option<PathBuf>,
    pub save_weights: Option<PathBuf>,
    pub load_weights: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            batch_size: 32,
            hidden_size: 100,
            layers: 1,
            train_repeat: 4,
            gamma: 0.99,
            tau: 0.001,
            episodes: 1000,
            replay_size: 500_000,
            max_timesteps: 1000,
            activation: Activation::Relu,
            optimizer: OptimizerKind::Adam,
            optimizer_lr: None,
            exploration: 0.1,
            advantage: AdvantagePolicy::Naive,
            conv: ConvSpec::default_stack(),
            display: true,
            seed: None,
            record_dir: None,
            save_csv: None,
            save_weights: None,
            load_weights: None,
        }
    }
}

impl TrainerConfig {
    /// Reject values the training loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        positive("batch_size", self.batch_size)?;
        positive("hidden_size", self.hidden_size)?;
        positive("replay_size", self.replay_size)?;
        positive("max_timesteps", self.max_timesteps)?;

        if !(0.0..1.0).contains(&self.gamma) {
            return Err(DuelError::invalid_configuration(
                "gamma".to_string(),
                format!("{} is outside [0, 1)", self.gamma),
            ));
        }
        if !(self.tau > 0.0 && self.tau <= 1.0) {
            return Err(DuelError::invalid_configuration(
                "tau".to_string(),
                format!("{} is outside (0, 1]", self.tau),
            ));
        }
        if !(0.0..=1.0).contains(&self.exploration) {
            return Err(DuelError::invalid_configuration(
                "exploration".to_string(),
                format!("{} is outside [0, 1]", self.exploration),
            ));
        }
        if let Some(lr) = self.optimizer_lr {
            if !(lr > 0.0 && lr.is_finite()) {
                return Err(DuelError::invalid_configuration(
                    "optimizer_lr".to_string(),
                    format!("{} must be a positive finite number", lr),
                ));
            }
        }
        for spec in &self.conv {
            if spec.filters == 0 || spec.kernel.0 == 0 || spec.kernel.1 == 0
                || spec.stride.0 == 0 || spec.stride.1 == 0
            {
                return Err(DuelError::invalid_configuration(
                    "conv".to_string(),
                    format!("{:?} has a zero filter count, kernel or stride", spec),
                ));
            }
        }
        Ok(())
    }
}

fn positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(DuelError::invalid_configuration(
            name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Shape of the Q-network, derived from a [`TrainerConfig`] and the environment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Observation shape as (height, width, channels)
    pub observation_shape: [usize; 3],
    pub num_actions: usize,
    pub conv: Vec<ConvSpec>,
    pub hidden_size: usize,
    pub layers: usize,
    pub activation: Activation,
    pub advantage: AdvantagePolicy,
    pub optimizer: OptimizerKind,
    pub learning_rate: Option<f32>,
}

impl NetworkConfig {
    pub fn from_trainer(config: &TrainerConfig, observation_shape: [usize; 3], num_actions: usize) -> Self {
        NetworkConfig {
            observation_shape,
            num_actions,
            conv: config.conv.clone(),
            hidden_size: config.hidden_size,
            layers: config.layers,
            activation: config.activation,
            advantage: config.advantage,
            optimizer: config.optimizer,
            learning_rate: config.optimizer_lr,
        }
    }

    /// Check that every conv layer still has a full kernel's worth of input
    /// once the observation has been through the layers before it.
    pub fn validate(&self) -> Result<()> {
        let [mut height, mut width, _] = self.observation_shape;
        for (i, spec) in self.conv.iter().enumerate() {
            if height < spec.kernel.0 || width < spec.kernel.1 {
                return Err(DuelError::invalid_configuration(
                    "observation_shape".to_string(),
                    format!(
                        "{:?} shrinks to {}x{} before conv layer {}, which needs at least {}x{}",
                        self.observation_shape, height, width, i, spec.kernel.0, spec.kernel.1
                    ),
                ));
            }
            height = (height - spec.kernel.0) / spec.stride.0 + 1;
            width = (width - spec.kernel.1) / spec.stride.1 + 1;
        }
        Ok(())
    }
}
