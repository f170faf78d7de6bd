use ndarray::{ArrayD, ArrayViewD, Ix4};

use crate::error::{DuelError, Result};
use super::traits::Layer;

/// Maps raw pixel observations `[batch, height, width, channels]` in `0..=255`
/// onto `[batch, channels, height, width]` in `0..=1`.
#[derive(Clone, Debug)]
pub struct RescaleLayer {
    pub scale: f32,
}

impl RescaleLayer {
    pub fn new() -> Self {
        RescaleLayer { scale: 1.0 / 255.0 }
    }
}

impl Default for RescaleLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for RescaleLayer {
    fn forward(&mut self, input: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let input = input.into_dimensionality::<Ix4>()?;
        let permuted = input.permuted_axes([0, 3, 1, 2]);
        Ok(permuted.mapv(|v| v * self.scale).into_dyn())
    }

    fn backward(&mut self, output_grad: ArrayViewD<f32>) -> Result<(ArrayD<f32>, Vec<ArrayD<f32>>)> {
        let grad = output_grad.into_dimensionality::<Ix4>()?;
        let restored = grad.permuted_axes([0, 2, 3, 1]);
        Ok((restored.mapv(|g| g * self.scale).into_dyn(), Vec::new()))
    }

    fn parameters(&self) -> Vec<&ArrayD<f32>> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut ArrayD<f32>> {
        Vec::new()
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        match input_shape {
            [height, width, channels] => Ok(vec![*channels, *height, *width]),
            _ => Err(DuelError::dimension_mismatch(
                "[height, width, channels]".to_string(),
                format!("{:?}", input_shape),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "rescale"
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
