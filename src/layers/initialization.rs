use ndarray::{ArrayD, IxDyn};
use ndarray_rand::RandomExt;
use rand_distr::Uniform;
use rand::Rng;

/// Glorot/Xavier uniform initialization.
///
/// Draws from `U(-limit, limit)` with `limit = sqrt(6 / (fan_in + fan_out))`.
pub fn glorot_uniform<R: Rng>(shape: &[usize], fan_in: usize, fan_out: usize, rng: &mut R) -> ArrayD<f32> {
    let limit = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
    ArrayD::random_using(IxDyn(shape), Uniform::new_inclusive(-limit, limit), rng)
}

/// Biases start at zero.
pub fn zeros(size: usize) -> ArrayD<f32> {
    ArrayD::zeros(IxDyn(&[size]))
}
