//! Dueling DQN training CLI
//!
//! ```text
//! duel --episodes 200 --advantage avg --save_csv run.csv gridworld
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use duel::config::TrainerConfig;
use duel::env::{Environment, GridWorld};
use duel::error::DuelError;
use duel::sink::{CsvSink, LogSink};
use duel::trainer::Trainer;

/// Train a dueling deep Q-network on an image environment
#[derive(Parser, Debug)]
#[command(name = "duel", version, about, long_about = None, rename_all = "snake_case")]
struct Cli {
    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Width of each hidden dense layer
    #[arg(long, default_value_t = 100)]
    hidden_size: usize,

    /// Number of hidden dense layers
    #[arg(long, default_value_t = 1)]
    layers: usize,

    /// Training iterations per environment step
    #[arg(long, default_value_t = 4)]
    train_repeat: usize,

    #[arg(long, default_value_t = 0.99)]
    gamma: f32,

    /// Soft target update coefficient
    #[arg(long, default_value_t = 0.001)]
    tau: f32,

    #[arg(long, default_value_t = 1000)]
    episodes: usize,

    #[arg(long, default_value_t = 500_000)]
    replay_size: usize,

    #[arg(long, default_value_t = 1000)]
    max_timesteps: usize,

    /// relu or tanh
    #[arg(long, default_value = "relu")]
    activation: String,

    /// adam or rmsprop
    #[arg(long, default_value = "adam")]
    optimizer: String,

    /// Learning rate override for the optimizer
    #[arg(long)]
    optimizer_lr: Option<f32>,

    /// Probability of a random action
    #[arg(long, default_value_t = 0.1)]
    exploration: f32,

    /// naive, max or avg
    #[arg(long, default_value = "naive")]
    advantage: String,

    /// Render every step (the default)
    #[arg(long, overrides_with = "no_display")]
    display: bool,

    /// Do not render
    #[arg(long)]
    no_display: bool,

    /// Directory to record frames into
    #[arg(long)]
    gym_record: Option<PathBuf>,

    /// Write one CSV row per episode to this file
    #[arg(long)]
    save_csv: Option<PathBuf>,

    /// Save online network weights here when training ends
    #[arg(long)]
    save_weights: Option<PathBuf>,

    /// Start from weights saved by a previous run
    #[arg(long)]
    load_weights: Option<PathBuf>,

    /// Random seed, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Side length of the gridworld, at least 10 for the default conv stack
    #[arg(long, default_value_t = 16)]
    grid_size: usize,

    /// Environment to train on
    environment: String,
}

impl Cli {
    fn trainer_config(&self) -> duel::error::Result<TrainerConfig> {
        let config = TrainerConfig {
            batch_size: self.batch_size,
            hidden_size: self.hidden_size,
            layers: self.layers,
            train_repeat: self.train_repeat,
            gamma: self.gamma,
            tau: self.tau,
            episodes: self.episodes,
            replay_size: self.replay_size,
            max_timesteps: self.max_timesteps,
            activation: self.activation.parse()?,
            optimizer: self.optimizer.parse()?,
            optimizer_lr: self.optimizer_lr,
            exploration: self.exploration,
            advantage: self.advantage.parse()?,
            display: self.display || !self.no_display,
            seed: self.seed,
            record_dir: self.gym_record.clone(),
            save_csv: self.save_csv.clone(),
            save_weights: self.save_weights.clone(),
            load_weights: self.load_weights.clone(),
            ..TrainerConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

fn make_environment(name: &str, grid_size: usize, seed: Option<u64>) -> duel::error::Result<GridWorld> {
    match name {
        "gridworld" => GridWorld::new(grid_size, seed),
        other => Err(DuelError::invalid_configuration(
            "environment".to_string(),
            format!("unknown environment '{}', expected: gridworld", other),
        )),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = cli.trainer_config()?;
    debug!("configuration: {}", serde_json::to_string(&config)?);

    let mut env = make_environment(&cli.environment, cli.grid_size, config.seed)?;
    info!(
        "{}: observations {:?}, {} actions",
        cli.environment,
        env.observation_shape(),
        env.num_actions()
    );

    let mut trainer = Trainer::new(config.clone(), &env)?;
    trainer.add_sink(LogSink);
    if let Some(path) = &config.save_csv {
        let sink = CsvSink::create(path)
            .with_context(|| format!("failed to create episode log {}", path.display()))?;
        trainer.add_sink(sink);
    }
    if let Some(path) = &config.load_weights {
        trainer
            .load_weights(path)
            .with_context(|| format!("failed to load weights from {}", path.display()))?;
    }

    trainer.run(&mut env)?;

    if let Some(path) = &config.save_weights {
        trainer
            .save_weights(path)
            .with_context(|| format!("failed to save weights to {}", path.display()))?;
    }
    env.close()?;
    Ok(())
}
