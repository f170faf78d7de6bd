//! Gradient-descent optimizers.
//!
//! Optimizers see the network's parameters as one flat, ordered list of
//! arrays and keep their per-parameter state (moment estimates) in the same
//! order. The state is created lazily on the first step.

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayD;
use serde::{Serialize, Deserialize};

use crate::error::{DuelError, Result};

pub trait Optimizer {
    /// Apply one update to `parameters` given matching `gradients`.
    fn step(&mut self, parameters: Vec<&mut ArrayD<f32>>, gradients: &[ArrayD<f32>]) -> Result<()>;

    fn learning_rate(&self) -> f32;
}

/// Optimizer choice as named on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Adam,
    RMSProp,
}

impl FromStr for OptimizerKind {
    type Err = DuelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "adam" => Ok(OptimizerKind::Adam),
            "rmsprop" => Ok(OptimizerKind::RMSProp),
            other => Err(DuelError::invalid_configuration(
                "optimizer".to_string(),
                format!("unknown optimizer '{}', expected one of: adam, rmsprop", other),
            )),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizerKind::Adam => "adam",
            OptimizerKind::RMSProp => "rmsprop",
        };
        f.write_str(name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    Adam(Adam),
    RMSProp(RMSProp),
}

impl OptimizerWrapper {
    /// Build the optimizer for `kind`, using its default learning rate unless overridden.
    pub fn from_kind(kind: OptimizerKind, learning_rate: Option<f32>) -> Self {
        match kind {
            OptimizerKind::Adam => {
                let mut adam = Adam::default();
                if let Some(lr) = learning_rate {
                    adam.learning_rate = lr;
                }
                OptimizerWrapper::Adam(adam)
            }
            OptimizerKind::RMSProp => {
                let mut rmsprop = RMSProp::default();
                if let Some(lr) = learning_rate {
                    rmsprop.learning_rate = lr;
                }
                OptimizerWrapper::RMSProp(rmsprop)
            }
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            OptimizerWrapper::Adam(_) => OptimizerKind::Adam,
            OptimizerWrapper::RMSProp(_) => OptimizerKind::RMSProp,
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn step(&mut self, parameters: Vec<&mut ArrayD<f32>>, gradients: &[ArrayD<f32>]) -> Result<()> {
        match self {
            OptimizerWrapper::Adam(optimizer) => optimizer.step(parameters, gradients),
            OptimizerWrapper::RMSProp(optimizer) => optimizer.step(parameters, gradients),
        }
    }

    fn learning_rate(&self) -> f32 {
        match self {
            OptimizerWrapper::Adam(optimizer) => optimizer.learning_rate(),
            OptimizerWrapper::RMSProp(optimizer) => optimizer.learning_rate(),
        }
    }
}

fn check_shapes(parameters: &[&mut ArrayD<f32>], gradients: &[ArrayD<f32>]) -> Result<()> {
    if parameters.len() != gradients.len() {
        return Err(DuelError::dimension_mismatch(
            format!("{} gradients", parameters.len()),
            format!("{}", gradients.len()),
        ));
    }
    for (p, g) in parameters.iter().zip(gradients) {
        if p.shape() != g.shape() {
            return Err(DuelError::dimension_mismatch(
                format!("{:?}", p.shape()),
                format!("{:?}", g.shape()),
            ));
        }
    }
    Ok(())
}

/// Zeroed state slots matching `parameters`, rebuilt if the layout changed.
fn ensure_state(state: &mut Vec<ArrayD<f32>>, parameters: &[&mut ArrayD<f32>]) {
    let matches = state.len() == parameters.len()
        && state.iter().zip(parameters).all(|(s, p)| s.shape() == p.shape());
    if !matches {
        *state = parameters.iter().map(|p| ArrayD::zeros(p.raw_dim())).collect();
    }
}

/// Adam with bias-corrected step size.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m: Vec<ArrayD<f32>>,
    v: Vec<ArrayD<f32>>,
    pub t: u64,
}

impl Adam {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.001, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn step(&mut self, mut parameters: Vec<&mut ArrayD<f32>>, gradients: &[ArrayD<f32>]) -> Result<()> {
        check_shapes(&parameters, gradients)?;
        ensure_state(&mut self.m, &parameters);
        ensure_state(&mut self.v, &parameters);

        self.t += 1;
        let t = self.t as i32;
        let lr_t = self.learning_rate * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t));
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);

        for (((param, grad), m), v) in parameters
            .iter_mut()
            .zip(gradients)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            m.zip_mut_with(grad, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
            v.zip_mut_with(grad, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);
            ndarray::Zip::from(&mut **param)
                .and(&*m)
                .and(&*v)
                .for_each(|p, &m, &v| *p -= lr_t * m / (v.sqrt() + epsilon));
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

/// RMSProp optimizer
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RMSProp {
    pub learning_rate: f32,
    pub rho: f32,
    pub epsilon: f32,
    accumulators: Vec<ArrayD<f32>>,
}

impl RMSProp {
    pub fn new(learning_rate: f32, rho: f32, epsilon: f32) -> Self {
        RMSProp {
            learning_rate,
            rho,
            epsilon,
            accumulators: Vec::new(),
        }
    }
}

impl Default for RMSProp {
    fn default() -> Self {
        Self::new(0.001, 0.9, 1e-8)
    }
}

impl Optimizer for RMSProp {
    fn step(&mut self, mut parameters: Vec<&mut ArrayD<f32>>, gradients: &[ArrayD<f32>]) -> Result<()> {
        check_shapes(&parameters, gradients)?;
        ensure_state(&mut self.accumulators, &parameters);
        let (lr, rho, epsilon) = (self.learning_rate, self.rho, self.epsilon);

        for ((param, grad), acc) in parameters
            .iter_mut()
            .zip(gradients)
            .zip(self.accumulators.iter_mut())
        {
            // Update moving average of squared gradients
            acc.zip_mut_with(grad, |a, &g| *a = rho * *a + (1.0 - rho) * g * g);
            ndarray::Zip::from(&mut **param)
                .and(grad)
                .and(&*acc)
                .for_each(|p, &g, &a| *p -= lr * g / (a.sqrt() + epsilon));
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}
