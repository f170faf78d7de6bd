use ndarray::{ArrayD, ArrayViewD, IxDyn};

use crate::error::Result;
use super::traits::Layer;

/// Collapses every axis but the batch axis.
#[derive(Clone, Debug, Default)]
pub struct FlattenLayer {
    input_shape: Option<Vec<usize>>,
}

impl FlattenLayer {
    pub fn new() -> Self {
        FlattenLayer { input_shape: None }
    }
}

impl Layer for FlattenLayer {
    fn forward(&mut self, input: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let shape = input.shape().to_vec();
        let batch_size = shape.first().copied().unwrap_or(0);
        let features: usize = shape.iter().skip(1).product();
        let flat = ArrayD::from_shape_vec(IxDyn(&[batch_size, features]), input.iter().copied().collect())?;
        self.input_shape = Some(shape);
        Ok(flat)
    }

    fn backward(&mut self, output_grad: ArrayViewD<f32>) -> Result<(ArrayD<f32>, Vec<ArrayD<f32>>)> {
        let shape = self.input_shape.clone().unwrap_or_else(|| output_grad.shape().to_vec());
        let grad = ArrayD::from_shape_vec(IxDyn(&shape), output_grad.iter().copied().collect())?;
        Ok((grad, Vec::new()))
    }

    fn parameters(&self) -> Vec<&ArrayD<f32>> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut ArrayD<f32>> {
        Vec::new()
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        Ok(vec![input_shape.iter().product()])
    }

    fn name(&self) -> &'static str {
        "flatten"
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
