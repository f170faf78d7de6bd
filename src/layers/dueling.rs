//! Dueling output head.
//!
//! The last dense layer emits `num_actions + 1` raw values per sample: a state
//! value `v` followed by one advantage `a_i` per action. The head recombines
//! them into per-action Q-values according to an [`AdvantagePolicy`]. Both the
//! online and the target network carry the same head.

use std::fmt;
use std::str::FromStr;

use ndarray::{s, Array2, ArrayD, ArrayView2, ArrayViewD, Axis, Ix2};
use serde::{Serialize, Deserialize};

use crate::error::{DuelError, Result};
use super::traits::Layer;

/// How the value and advantage streams are recombined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdvantagePolicy {
    /// `q_i = v + a_i`
    #[default]
    Naive,
    /// `q_i = v + a_i - max_j a_j`
    Max,
    /// `q_i = v + a_i - mean_j a_j`
    Avg,
}

impl FromStr for AdvantagePolicy {
    type Err = DuelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "naive" => Ok(AdvantagePolicy::Naive),
            "max" => Ok(AdvantagePolicy::Max),
            "avg" => Ok(AdvantagePolicy::Avg),
            other => Err(DuelError::invalid_configuration(
                "advantage".to_string(),
                format!("unknown advantage policy '{}', expected one of: naive, max, avg", other),
            )),
        }
    }
}

impl fmt::Display for AdvantagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdvantagePolicy::Naive => "naive",
            AdvantagePolicy::Max => "max",
            AdvantagePolicy::Avg => "avg",
        };
        f.write_str(name)
    }
}

/// Index of the first maximum, so ties resolve the same way as `argmax`.
pub(crate) fn first_argmax<'a, I: IntoIterator<Item = &'a f32>>(values: I) -> Option<(usize, f32)> {
    values
        .into_iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
}

impl AdvantagePolicy {
    /// The action-independent amount subtracted from every advantage of a row.
    fn offset(&self, advantages: ndarray::ArrayView1<f32>) -> f32 {
        match self {
            AdvantagePolicy::Naive => 0.0,
            AdvantagePolicy::Max => first_argmax(advantages.iter()).map(|(_, v)| v).unwrap_or(0.0),
            AdvantagePolicy::Avg => advantages.mean().unwrap_or(0.0),
        }
    }

    /// Recombine raw `[batch, num_actions + 1]` outputs into `[batch, num_actions]` Q-values.
    pub fn combine(&self, raw: ArrayView2<f32>) -> Result<Array2<f32>> {
        if raw.ncols() < 2 {
            return Err(DuelError::dimension_mismatch(
                "at least 2 raw outputs (value + one advantage)".to_string(),
                format!("{}", raw.ncols()),
            ));
        }
        let num_actions = raw.ncols() - 1;
        let mut q = Array2::zeros((raw.nrows(), num_actions));

        for (raw_row, mut q_row) in raw.axis_iter(Axis(0)).zip(q.axis_iter_mut(Axis(0))) {
            let value = raw_row[0];
            let advantages = raw_row.slice(s![1..]);
            let offset = self.offset(advantages);
            for (q_i, &a_i) in q_row.iter_mut().zip(advantages.iter()) {
                *q_i = value + a_i - offset;
            }
        }
        Ok(q)
    }

    /// Gradient of the recombination with respect to the raw outputs.
    pub fn combine_backward(&self, raw: ArrayView2<f32>, grad: ArrayView2<f32>) -> Array2<f32> {
        let num_actions = grad.ncols();
        let mut raw_grad = Array2::zeros(raw.raw_dim());

        for ((raw_row, grad_row), mut out_row) in raw
            .axis_iter(Axis(0))
            .zip(grad.axis_iter(Axis(0)))
            .zip(raw_grad.axis_iter_mut(Axis(0)))
        {
            let total: f32 = grad_row.sum();
            out_row[0] = total;
            out_row.slice_mut(s![1..]).assign(&grad_row);

            match self {
                AdvantagePolicy::Naive => {}
                AdvantagePolicy::Avg => {
                    let share = total / num_actions as f32;
                    out_row.slice_mut(s![1..]).mapv_inplace(|g| g - share);
                }
                AdvantagePolicy::Max => {
                    if let Some((k, _)) = first_argmax(raw_row.slice(s![1..]).iter()) {
                        out_row[k + 1] -= total;
                    }
                }
            }
        }
        raw_grad
    }
}

/// Layer wrapper around [`AdvantagePolicy::combine`].
#[derive(Clone, Debug)]
pub struct DuelingHead {
    pub policy: AdvantagePolicy,
    raw: Option<Array2<f32>>,
}

impl DuelingHead {
    pub fn new(policy: AdvantagePolicy) -> Self {
        DuelingHead { policy, raw: None }
    }
}

impl Layer for DuelingHead {
    fn forward(&mut self, input: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let raw = input.into_dimensionality::<Ix2>()?;
        let q = self.policy.combine(raw)?;
        self.raw = Some(raw.to_owned());
        Ok(q.into_dyn())
    }

    fn backward(&mut self, output_grad: ArrayViewD<f32>) -> Result<(ArrayD<f32>, Vec<ArrayD<f32>>)> {
        let raw = self.raw.as_ref().ok_or_else(|| {
            DuelError::dimension_mismatch("a cached forward pass", "backward called before forward")
        })?;
        let grad = output_grad.into_dimensionality::<Ix2>()?;
        Ok((self.policy.combine_backward(raw.view(), grad).into_dyn(), Vec::new()))
    }

    fn parameters(&self) -> Vec<&ArrayD<f32>> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut ArrayD<f32>> {
        Vec::new()
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        match input_shape {
            [raw] if *raw >= 2 => Ok(vec![raw - 1]),
            _ => Err(DuelError::dimension_mismatch(
                "[num_actions + 1]".to_string(),
                format!("{:?}", input_shape),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "dueling"
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
