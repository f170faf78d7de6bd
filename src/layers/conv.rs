//! Convolutional layer for image observations
//!
//! Valid (unpadded) strided 2-D convolution over `[batch, channels, height, width]`
//! inputs. Both passes go through an im2col/col2im unrolling so the inner work
//! is a single matrix product per sample.

use ndarray::{s, Array1, Array2, Array3, Array4, ArrayD, ArrayView2, ArrayView3, ArrayViewD, Axis, Ix1, Ix4, IxDyn};
use rand::Rng;

use crate::activations::Activation;
use crate::error::{DuelError, Result};
use super::initialization::{glorot_uniform, zeros};
use super::traits::Layer;

/// 2D Convolutional Layer
#[derive(Clone)]
pub struct Conv2DLayer {
    /// Convolution kernels [out_channels, in_channels, kernel_height, kernel_width]
    pub kernels: ArrayD<f32>,

    /// Bias terms for each output channel
    pub biases: ArrayD<f32>,

    pub activation: Activation,
    pub stride: (usize, usize),
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: (usize, usize),

    cached_input: Option<ArrayD<f32>>,
    cached_pre_activation: Option<ArrayD<f32>>,
}

impl Conv2DLayer {
    pub fn new<R: Rng>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let receptive = kernel_size.0 * kernel_size.1;
        let kernels = glorot_uniform(
            &[out_channels, in_channels, kernel_size.0, kernel_size.1],
            in_channels * receptive,
            out_channels * receptive,
            rng,
        );

        Conv2DLayer {
            kernels,
            biases: zeros(out_channels),
            activation,
            stride,
            in_channels,
            out_channels,
            kernel_size,
            cached_input: None,
            cached_pre_activation: None,
        }
    }

    fn output_hw(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        if height < self.kernel_size.0 || width < self.kernel_size.1 {
            return Err(DuelError::dimension_mismatch(
                format!("spatial size of at least {:?}", self.kernel_size),
                format!("({}, {})", height, width),
            ));
        }
        Ok((
            (height - self.kernel_size.0) / self.stride.0 + 1,
            (width - self.kernel_size.1) / self.stride.1 + 1,
        ))
    }

    /// Kernels flattened to [out_channels, in_channels * kh * kw]
    fn kernel_matrix(&self) -> Result<Array2<f32>> {
        let cols = self.in_channels * self.kernel_size.0 * self.kernel_size.1;
        Ok(Array2::from_shape_vec(
            (self.out_channels, cols),
            self.kernels.iter().copied().collect(),
        )?)
    }

    /// Unroll every receptive field of one sample into a row.
    fn im2col(&self, sample: ArrayView3<f32>, out_hw: (usize, usize)) -> Array2<f32> {
        let (kh, kw) = self.kernel_size;
        let mut cols = Array2::zeros((out_hw.0 * out_hw.1, self.in_channels * kh * kw));

        for oh in 0..out_hw.0 {
            for ow in 0..out_hw.1 {
                let h = oh * self.stride.0;
                let w = ow * self.stride.1;
                let patch = sample.slice(s![.., h..h + kh, w..w + kw]);
                let mut row = cols.row_mut(oh * out_hw.1 + ow);
                for (dst, &src) in row.iter_mut().zip(patch.iter()) {
                    *dst = src;
                }
            }
        }
        cols
    }

    /// Inverse of `im2col`: scatter-add rows back onto the sample grid.
    fn col2im(&self, cols: ArrayView2<f32>, in_hw: (usize, usize), out_hw: (usize, usize)) -> Array3<f32> {
        let (kh, kw) = self.kernel_size;
        let mut sample = Array3::zeros((self.in_channels, in_hw.0, in_hw.1));

        for oh in 0..out_hw.0 {
            for ow in 0..out_hw.1 {
                let h = oh * self.stride.0;
                let w = ow * self.stride.1;
                let mut patch = sample.slice_mut(s![.., h..h + kh, w..w + kw]);
                for (dst, &src) in patch.iter_mut().zip(cols.row(oh * out_hw.1 + ow).iter()) {
                    *dst += src;
                }
            }
        }
        sample
    }
}

impl Layer for Conv2DLayer {
    fn forward(&mut self, input: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let input = input.into_dimensionality::<Ix4>()?;
        let (batch_size, channels, height, width) = input.dim();
        if channels != self.in_channels {
            return Err(DuelError::dimension_mismatch(
                format!("{} input channels", self.in_channels),
                format!("{}", channels),
            ));
        }
        let out_hw = self.output_hw(height, width)?;
        let kernels = self.kernel_matrix()?;
        let biases = self.biases.view().into_dimensionality::<Ix1>()?;

        let mut output = Array4::zeros((batch_size, self.out_channels, out_hw.0, out_hw.1));
        for (b, sample) in input.axis_iter(Axis(0)).enumerate() {
            let cols = self.im2col(sample, out_hw);
            // [positions, out_channels]
            let conv = cols.dot(&kernels.t()) + &biases.insert_axis(Axis(0));
            let mut target = output.slice_mut(s![b, .., .., ..]);
            for ((oc, oh, ow), value) in target.indexed_iter_mut() {
                *value = conv[[oh * out_hw.1 + ow, oc]];
            }
        }

        let mut output = output.into_dyn();
        self.cached_input = Some(input.to_owned().into_dyn());
        self.cached_pre_activation = Some(output.clone());
        self.activation.apply(&mut output);
        Ok(output)
    }

    fn backward(&mut self, output_grad: ArrayViewD<f32>) -> Result<(ArrayD<f32>, Vec<ArrayD<f32>>)> {
        let (input, pre_activation) = match (&self.cached_input, &self.cached_pre_activation) {
            (Some(input), Some(pre)) => (input.view().into_dimensionality::<Ix4>()?, pre),
            _ => {
                return Err(DuelError::dimension_mismatch(
                    "a cached forward pass",
                    "backward called before forward",
                ))
            }
        };

        let grad = (&output_grad * &self.activation.derivative(pre_activation.view()))
            .into_dimensionality::<Ix4>()?;
        let (batch_size, _, height, width) = input.dim();
        let out_hw = (grad.dim().2, grad.dim().3);
        let kernels = self.kernel_matrix()?;

        let mut kernel_grads = Array2::<f32>::zeros(kernels.dim());
        let mut bias_grads = Array1::<f32>::zeros(self.out_channels);
        let mut input_grads = Array4::zeros((batch_size, self.in_channels, height, width));

        for b in 0..batch_size {
            let cols = self.im2col(input.index_axis(Axis(0), b), out_hw);
            // [positions, out_channels]
            let grad_b = Array2::from_shape_fn((out_hw.0 * out_hw.1, self.out_channels), |(p, oc)| {
                grad[[b, oc, p / out_hw.1, p % out_hw.1]]
            });

            kernel_grads += &grad_b.t().dot(&cols);
            bias_grads += &grad_b.sum_axis(Axis(0));

            let col_grads = grad_b.dot(&kernels);
            let sample_grad = self.col2im(col_grads.view(), (height, width), out_hw);
            input_grads.slice_mut(s![b, .., .., ..]).assign(&sample_grad);
        }

        let kernel_grads = ArrayD::from_shape_vec(
            IxDyn(self.kernels.shape()),
            kernel_grads.iter().copied().collect(),
        )?;

        Ok((input_grads.into_dyn(), vec![kernel_grads, bias_grads.into_dyn()]))
    }

    fn parameters(&self) -> Vec<&ArrayD<f32>> {
        vec![&self.kernels, &self.biases]
    }

    fn parameters_mut(&mut self) -> Vec<&mut ArrayD<f32>> {
        vec![&mut self.kernels, &mut self.biases]
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        match input_shape {
            [channels, height, width] if *channels == self.in_channels => {
                let (oh, ow) = self.output_hw(*height, *width)?;
                Ok(vec![self.out_channels, oh, ow])
            }
            _ => Err(DuelError::dimension_mismatch(
                format!("[{}, height, width]", self.in_channels),
                format!("{:?}", input_shape),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "conv2d"
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
