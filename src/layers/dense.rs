use ndarray::{ArrayD, ArrayViewD, Axis, Ix1, Ix2};
use rand::Rng;

use crate::activations::Activation;
use crate::error::{DuelError, Result};
use super::initialization::{glorot_uniform, zeros};
use super::traits::Layer;

/// A fully connected (dense) layer in a neural network
#[derive(Clone)]
pub struct DenseLayer {
    /// Weights of shape (input_size, output_size)
    pub weights: ArrayD<f32>,
    /// Biases of shape (output_size,)
    pub biases: ArrayD<f32>,
    pub activation: Activation,
    pre_activation_output: Option<ArrayD<f32>>,
    inputs: Option<ArrayD<f32>>,
}

impl DenseLayer {
    /// Create a new dense layer with Glorot-uniform weights and zero biases.
    pub fn new<R: Rng>(input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> Self {
        let weights = glorot_uniform(&[input_size, output_size], input_size, output_size, rng);
        DenseLayer {
            weights,
            biases: zeros(output_size),
            activation,
            pre_activation_output: None,
            inputs: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }
}

impl Layer for DenseLayer {
    fn forward(&mut self, input: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let inputs = input.into_dimensionality::<Ix2>()?;
        if inputs.ncols() != self.input_size() {
            return Err(DuelError::dimension_mismatch(
                format!("{} input features", self.input_size()),
                format!("{}", inputs.ncols()),
            ));
        }
        let weights = self.weights.view().into_dimensionality::<Ix2>()?;
        let biases = self.biases.view().into_dimensionality::<Ix1>()?;

        let outputs = inputs.dot(&weights) + &biases.insert_axis(Axis(0));
        let mut outputs = outputs.into_dyn();
        self.inputs = Some(inputs.to_owned().into_dyn());
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply(&mut outputs);
        Ok(outputs)
    }

    fn backward(&mut self, output_grad: ArrayViewD<f32>) -> Result<(ArrayD<f32>, Vec<ArrayD<f32>>)> {
        let (inputs, pre_activation) = match (&self.inputs, &self.pre_activation_output) {
            (Some(inputs), Some(pre)) => (inputs, pre),
            _ => {
                return Err(DuelError::dimension_mismatch(
                    "a cached forward pass",
                    "backward called before forward",
                ))
            }
        };

        let activation_deriv = self.activation.derivative(pre_activation.view());
        let adjusted_error = (&output_grad * &activation_deriv).into_dimensionality::<Ix2>()?;
        let inputs = inputs.view().into_dimensionality::<Ix2>()?;
        let weights = self.weights.view().into_dimensionality::<Ix2>()?;

        let weight_gradients = inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));
        let input_gradients = adjusted_error.dot(&weights.t());

        Ok((
            input_gradients.into_dyn(),
            vec![weight_gradients.into_dyn(), bias_gradients.into_dyn()],
        ))
    }

    fn parameters(&self) -> Vec<&ArrayD<f32>> {
        vec![&self.weights, &self.biases]
    }

    fn parameters_mut(&mut self) -> Vec<&mut ArrayD<f32>> {
        vec![&mut self.weights, &mut self.biases]
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        if input_shape != [self.input_size()] {
            return Err(DuelError::dimension_mismatch(
                format!("[{}]", self.input_size()),
                format!("{:?}", input_shape),
            ));
        }
        Ok(vec![self.output_size()])
    }

    fn name(&self) -> &'static str {
        "dense"
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}

