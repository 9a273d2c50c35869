//! Fully connected (linear) layer with explicit backward pass.
//!
//! Implements the transformation y = xW^T + b.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::init::kaiming_uniform;
use crate::primitives::Matrix;

/// Fully connected layer: y = xW^T + b
///
/// # Shape
///
/// - Input: `(batch, in_features)`
/// - Output: `(batch, out_features)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    /// Weight matrix, shape: `[out_features, in_features]`
    pub(crate) weight: Matrix<f32>,
    /// Bias vector, shape: `[out_features]`
    pub(crate) bias: Vec<f32>,
}

/// Parameter gradients of one [`Linear`] layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGrads {
    /// Same shape as the weight.
    pub weight: Matrix<f32>,
    /// Same length as the bias.
    pub bias: Vec<f32>,
}

impl Linear {
    /// Creates a layer with Kaiming-uniform weights and zero bias.
    #[must_use]
    pub fn new(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        Self {
            weight: kaiming_uniform(in_features, out_features, rng),
            bias: vec![0.0; out_features],
        }
    }

    /// Number of input features.
    #[must_use]
    pub fn in_features(&self) -> usize {
        self.weight.n_cols()
    }

    /// Number of output features.
    #[must_use]
    pub fn out_features(&self) -> usize {
        self.weight.n_rows()
    }

    /// Forward pass.
    ///
    /// # Panics
    ///
    /// Panics if `x` does not have `in_features` columns.
    #[must_use]
    pub fn forward(&self, x: &Matrix<f32>) -> Matrix<f32> {
        assert_eq!(x.n_cols(), self.in_features(), "input width");
        let mut out = Matrix::zeros(x.n_rows(), self.out_features());
        for (i, row) in x.iter_rows().enumerate() {
            for (o, y) in out.row_mut(i).iter_mut().enumerate() {
                *y = self.bias[o]
                    + self
                        .weight
                        .row(o)
                        .iter()
                        .zip(row)
                        .map(|(w, v)| w * v)
                        .sum::<f32>();
            }
        }
        out
    }

    /// Backward pass for upstream gradient `grad_out` (same shape as the
    /// forward output) given the forward input `x`.
    ///
    /// Returns the gradient with respect to `x` and the parameter gradients.
    #[must_use]
    pub fn backward(&self, x: &Matrix<f32>, grad_out: &Matrix<f32>) -> (Matrix<f32>, LinearGrads) {
        let (n_out, n_in) = self.weight.shape();
        let mut grad_in = Matrix::zeros(x.n_rows(), n_in);
        let mut grads = LinearGrads {
            weight: Matrix::zeros(n_out, n_in),
            bias: vec![0.0; n_out],
        };
        for (i, g_row) in grad_out.iter_rows().enumerate() {
            let x_row = x.row(i);
            for (o, &g) in g_row.iter().enumerate() {
                if g == 0.0 {
                    continue;
                }
                grads.bias[o] += g;
                for (gw, &v) in grads.weight.row_mut(o).iter_mut().zip(x_row) {
                    *gw += g * v;
                }
                for (gi, &w) in grad_in.row_mut(i).iter_mut().zip(self.weight.row(o)) {
                    *gi += g * w;
                }
            }
        }
        (grad_in, grads)
    }
}
