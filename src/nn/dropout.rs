//! Inverted dropout.
//!
//! # References
//!
//! - Srivastava, N., et al. (2014). Dropout: A simple way to prevent neural
//!   networks from overfitting. JMLR.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::primitives::Matrix;

/// Zeroes each activation with probability `p` and scales the survivors by
/// `1 / (1 - p)`, so the expected activation is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dropout {
    p: f32,
}

impl Dropout {
    /// Creates a dropout layer; `p` is clamped to `[0, 1)`.
    #[must_use]
    pub fn new(p: f32) -> Self {
        Self {
            p: p.clamp(0.0, 0.999),
        }
    }

    /// Drop probability.
    #[must_use]
    pub fn probability(&self) -> f32 {
        self.p
    }

    /// Samples a scaling mask of the given shape, or `None` when `p == 0`.
    #[must_use]
    pub fn sample_mask(&self, rows: usize, cols: usize, rng: &mut StdRng) -> Option<Matrix<f32>> {
        if self.p == 0.0 {
            return None;
        }
        let keep = 1.0 / (1.0 - self.p);
        let mut mask = Matrix::zeros(rows, cols);
        for m in mask.as_mut_slice() {
            if rng.gen::<f32>() >= self.p {
                *m = keep;
            }
        }
        Some(mask)
    }
}

/// Multiplies `x` element-wise by `mask` in place.
pub(crate) fn apply_mask(x: &mut Matrix<f32>, mask: &Matrix<f32>) {
    for (v, m) in x.as_mut_slice().iter_mut().zip(mask.as_slice()) {
        *v *= m;
    }
}
