//! # duel - Dueling Deep Q-Network training
//!
//! Trains a deep Q-network with a dueling output head on environments that
//! emit image observations and take discrete actions. The network learns from
//! an experience-replay ring buffer and bootstraps against a target network
//! that trails the online one through soft (Polyak) updates.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duel::config::TrainerConfig;
//! use duel::env::GridWorld;
//! use duel::sink::CsvSink;
//! use duel::trainer::Trainer;
//!
//! # fn main() -> duel::error::Result<()> {
//! let config = TrainerConfig {
//!     episodes: 50,
//!     display: false,
//!     seed: Some(7),
//!     ..TrainerConfig::default()
//! };
//! let mut env = GridWorld::new(16, Some(7))?;
//! let mut trainer = Trainer::new(config, &env)?;
//! trainer.add_sink(CsvSink::create("episodes.csv")?);
//! let average = trainer.run(&mut env)?;
//! println!("average reward {}", average);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions (ReLU, Tanh, Linear)
//! - [`config`] - Run configuration and its validation
//! - [`env`] - Environment trait and the built-in gridworld
//! - [`error`] - Error types and result handling
//! - [`layers`] - Network layers, including the dueling head
//! - [`loss`] - Mean-squared-error loss
//! - [`metrics`] - Per-episode statistics
//! - [`network`] - The Q-network
//! - [`optimizer`] - Adam and RMSProp
//! - [`recorder`] - Frame recording
//! - [`replay_buffer`] - Experience replay
//! - [`sink`] - Episode log destinations
//! - [`trainer`] - The training loop

pub mod activations;
pub mod config;
pub mod env;
pub mod error;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod recorder;
pub mod replay_buffer;
pub mod sink;
pub mod trainer;

pub use error::{DuelError, Result};

#[cfg(test)]
mod tests;
