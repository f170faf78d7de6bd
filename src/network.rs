use std::fs;
use std::path::Path;

use bincode::{serialize, deserialize};
use log::debug;
use ndarray::{Array1, Array2, ArrayD, ArrayView2, ArrayView3, ArrayView4, Axis, Ix2};
use rand::Rng;

use crate::activations::Activation;
use crate::config::NetworkConfig;
use crate::error::{DuelError, Result};
use crate::layers::{AdvantagePolicy, Conv2DLayer, DenseLayer, DuelingHead, FlattenLayer, Layer, RescaleLayer};
use crate::loss::{Loss, MeanSquaredError};
use crate::optimizer::{Optimizer, OptimizerWrapper};

/// The Q-function approximator.
///
/// Maps a batch of `[height, width, channels]` pixel observations to one
/// Q-value per action. The stack is: rescale to `[0, 1]` channels-first,
/// the configured convolutions, flatten, `layers` hidden dense layers, a
/// linear dense layer with `num_actions + 1` outputs, and the dueling head.
///
/// The online and target networks of a [`Trainer`](crate::trainer::Trainer)
/// are two instances built from the same [`NetworkConfig`]; the target only
/// ever changes through [`QNetwork::set_parameters`] and [`QNetwork::soft_update`].
pub struct QNetwork {
    layers: Vec<Box<dyn Layer>>,
    optimizer: OptimizerWrapper,
    loss: MeanSquaredError,
    observation_shape: [usize; 3],
    num_actions: usize,
    advantage: AdvantagePolicy,
}

impl Clone for QNetwork {
    fn clone(&self) -> Self {
        QNetwork {
            layers: self.layers.clone(),
            optimizer: self.optimizer.clone(),
            loss: self.loss,
            observation_shape: self.observation_shape,
            num_actions: self.num_actions,
            advantage: self.advantage,
        }
    }
}

impl QNetwork {
    /// Build a freshly initialized network.
    pub fn new<R: Rng>(config: &NetworkConfig, rng: &mut R) -> Result<Self> {
        if config.num_actions == 0 {
            return Err(DuelError::invalid_configuration(
                "num_actions".to_string(),
                "environment exposes no actions".to_string(),
            ));
        }
        config.validate()?;

        let mut layers: Vec<Box<dyn Layer>> = Vec::new();
        let rescale = RescaleLayer::new();
        let mut shape = rescale.output_shape(&config.observation_shape)?;
        layers.push(Box::new(rescale));

        for spec in &config.conv {
            let conv = Conv2DLayer::new(shape[0], spec.filters, spec.kernel, spec.stride, config.activation, rng);
            shape = conv.output_shape(&shape)?;
            layers.push(Box::new(conv));
        }

        let flatten = FlattenLayer::new();
        shape = flatten.output_shape(&shape)?;
        layers.push(Box::new(flatten));

        let mut width = shape[0];
        for _ in 0..config.layers {
            layers.push(Box::new(DenseLayer::new(width, config.hidden_size, config.activation, rng)));
            width = config.hidden_size;
        }
        layers.push(Box::new(DenseLayer::new(width, config.num_actions + 1, Activation::Linear, rng)));
        layers.push(Box::new(DuelingHead::new(config.advantage)));

        Ok(QNetwork {
            layers,
            optimizer: OptimizerWrapper::from_kind(config.optimizer, config.learning_rate),
            loss: MeanSquaredError,
            observation_shape: config.observation_shape,
            num_actions: config.num_actions,
            advantage: config.advantage,
        })
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    pub fn observation_shape(&self) -> [usize; 3] {
        self.observation_shape
    }

    pub fn advantage(&self) -> AdvantagePolicy {
        self.advantage
    }

    pub fn optimizer(&self) -> &OptimizerWrapper {
        &self.optimizer
    }

    /// Number of trainable scalars.
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|layer| layer.parameters())
            .map(|p| p.len())
            .sum()
    }

    /// One line per layer, for the startup log.
    pub fn summary(&self) -> String {
        let mut lines = Vec::with_capacity(self.layers.len() + 1);
        let mut shape = self.observation_shape.to_vec();
        for layer in &self.layers {
            let next = layer.output_shape(&shape).unwrap_or_default();
            let params: usize = layer.parameters().iter().map(|p| p.len()).sum();
            lines.push(format!("{:<8} {:?} -> {:?} ({} params)", layer.name(), shape, next, params));
            shape = next;
        }
        lines.push(format!("total params: {}", self.parameter_count()));
        lines.join("\n")
    }

    fn check_observations(&self, observations: &ArrayView4<f32>) -> Result<()> {
        let (_, h, w, c) = observations.dim();
        if [h, w, c] != self.observation_shape {
            return Err(DuelError::dimension_mismatch(
                format!("observations of shape {:?}", self.observation_shape),
                format!("{:?}", [h, w, c]),
            ));
        }
        Ok(())
    }

    fn forward(&mut self, observations: ArrayView4<f32>) -> Result<Array2<f32>> {
        self.check_observations(&observations)?;
        let mut current: ArrayD<f32> = observations.to_owned().into_dyn();
        for layer in &mut self.layers {
            current = layer.forward(current.view())?;
        }
        Ok(current.into_dimensionality::<Ix2>()?)
    }

    /// Q-values for a batch of observations, shape `[batch, num_actions]`.
    pub fn predict(&mut self, observations: ArrayView4<f32>) -> Result<Array2<f32>> {
        self.forward(observations)
    }

    /// Q-values for a single observation.
    pub fn predict_one(&mut self, observation: ArrayView3<f32>) -> Result<Array1<f32>> {
        let batch = observation.insert_axis(Axis(0));
        let q = self.forward(batch)?;
        Ok(q.index_axis_move(Axis(0), 0))
    }

    /// One gradient step towards `targets` under mean-squared error.
    ///
    /// Returns the loss of the forward pass that preceded the step.
    pub fn update(&mut self, observations: ArrayView4<f32>, targets: ArrayView2<f32>) -> Result<f32> {
        let predictions = self.forward(observations)?;
        if predictions.dim() != targets.dim() {
            return Err(DuelError::dimension_mismatch(
                format!("targets of shape {:?}", predictions.dim()),
                format!("{:?}", targets.dim()),
            ));
        }
        let loss = self.loss.compute_batch(predictions.view(), targets);
        let mut grad = self.loss.gradient_batch(predictions.view(), targets).into_dyn();

        let mut gradients: Vec<Vec<ArrayD<f32>>> = Vec::with_capacity(self.layers.len());
        for layer in self.layers.iter_mut().rev() {
            let (input_grad, param_grads) = layer.backward(grad.view())?;
            gradients.push(param_grads);
            grad = input_grad;
        }
        gradients.reverse();
        let gradients: Vec<ArrayD<f32>> = gradients.into_iter().flatten().collect();

        let parameters: Vec<&mut ArrayD<f32>> = self
            .layers
            .iter_mut()
            .flat_map(|layer| layer.parameters_mut())
            .collect();
        self.optimizer.step(parameters, &gradients)?;
        Ok(loss)
    }

    /// Copy of every trainable array, in layer order.
    pub fn parameters(&self) -> Vec<ArrayD<f32>> {
        self.layers
            .iter()
            .flat_map(|layer| layer.parameters())
            .cloned()
            .collect()
    }

    /// Overwrite every trainable array. Shapes must match [`QNetwork::parameters`].
    pub fn set_parameters(&mut self, parameters: &[ArrayD<f32>]) -> Result<()> {
        let mut own: Vec<&mut ArrayD<f32>> = self
            .layers
            .iter_mut()
            .flat_map(|layer| layer.parameters_mut())
            .collect();
        check_layout(&own, parameters)?;
        for (dst, src) in own.iter_mut().zip(parameters) {
            dst.assign(src);
        }
        Ok(())
    }

    /// Move this network's parameters towards `online`'s:
    /// `self = tau * online + (1 - tau) * self`.
    pub fn soft_update(&mut self, online: &QNetwork, tau: f32) -> Result<()> {
        let sources: Vec<&ArrayD<f32>> = online
            .layers
            .iter()
            .flat_map(|layer| layer.parameters())
            .collect();
        let mut targets: Vec<&mut ArrayD<f32>> = self
            .layers
            .iter_mut()
            .flat_map(|layer| layer.parameters_mut())
            .collect();
        if sources.len() != targets.len() {
            return Err(DuelError::dimension_mismatch(
                format!("{} parameter arrays", targets.len()),
                format!("{}", sources.len()),
            ));
        }
        for (target, source) in targets.iter_mut().zip(sources) {
            if target.shape() != source.shape() {
                return Err(DuelError::dimension_mismatch(
                    format!("{:?}", target.shape()),
                    format!("{:?}", source.shape()),
                ));
            }
            blend(target, source, tau);
        }
        Ok(())
    }

    /// Save the parameters to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let parameters = self.parameters();
        let serialized = serialize(&parameters)?;
        fs::write(path.as_ref(), serialized)?;
        debug!("saved {} parameter arrays to {}", parameters.len(), path.as_ref().display());
        Ok(())
    }

    /// Load parameters written by [`QNetwork::save`] into this network.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let data = fs::read(path.as_ref())?;
        let parameters: Vec<ArrayD<f32>> = deserialize(&data)?;
        self.set_parameters(&parameters)
    }
}

fn check_layout(own: &[&mut ArrayD<f32>], parameters: &[ArrayD<f32>]) -> Result<()> {
    if own.len() != parameters.len() {
        return Err(DuelError::dimension_mismatch(
            format!("{} parameter arrays", own.len()),
            format!("{}", parameters.len()),
        ));
    }
    for (dst, src) in own.iter().zip(parameters) {
        if dst.shape() != src.shape() {
            return Err(DuelError::dimension_mismatch(
                format!("{:?}", dst.shape()),
                format!("{:?}", src.shape()),
            ));
        }
    }
    Ok(())
}

/// `target = tau * online + (1 - tau) * target`, element-wise.
pub fn blend(target: &mut ArrayD<f32>, online: &ArrayD<f32>, tau: f32) {
    target.zip_mut_with(online, |t, &o| *t = tau * o + (1.0 - tau) * *t);
}

