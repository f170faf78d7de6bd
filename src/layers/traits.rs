use ndarray::{ArrayD, ArrayViewD};

use crate::error::Result;

/// Trait defining the interface for Q-network layers.
///
/// Inputs and outputs are batched: the leading axis is always the batch axis.
/// `forward` caches whatever `backward` needs, so a `backward` call refers to
/// the most recent `forward`.
pub trait Layer: Send + Sync {
    /// Perform forward propagation for a batch of inputs
    fn forward(&mut self, input: ArrayViewD<f32>) -> Result<ArrayD<f32>>;

    /// Perform backward propagation for a batch of output gradients.
    ///
    /// Returns the gradient with respect to the layer input, and one gradient
    /// per entry of [`Layer::parameters`], in the same order.
    fn backward(&mut self, output_grad: ArrayViewD<f32>) -> Result<(ArrayD<f32>, Vec<ArrayD<f32>>)>;

    /// Trainable parameters, weights before biases
    fn parameters(&self) -> Vec<&ArrayD<f32>>;

    /// Mutable access to the trainable parameters, same order as [`Layer::parameters`]
    fn parameters_mut(&mut self) -> Vec<&mut ArrayD<f32>>;

    /// Per-sample output shape for a per-sample input shape
    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>>;

    /// Short human-readable name, used in the network summary
    fn name(&self) -> &'static str;

    /// Clone the layer into a boxed trait object
    fn clone_box(&self) -> Box<dyn Layer>;
}

impl Clone for Box<dyn Layer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
