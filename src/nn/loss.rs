//! Cross-entropy against soft (probabilistic) targets.

use crate::classification::softmax_in_place;
use crate::primitives::Matrix;

/// Probabilities below this are clipped before taking logs.
const EPS: f32 = 1e-12;

/// Row-wise softmax of a logit matrix.
#[must_use]
pub fn softmax_rows(logits: &Matrix<f32>) -> Matrix<f32> {
    let mut out = logits.clone();
    for i in 0..out.n_rows() {
        softmax_in_place(out.row_mut(i));
    }
    out
}

/// Mean over rows of `-Σ_c t[c] · ln p[c]`.
///
/// # Panics
///
/// Panics if the shapes differ.
#[must_use]
pub fn soft_cross_entropy(probas: &Matrix<f32>, targets: &Matrix<f32>) -> f32 {
    assert_eq!(probas.shape(), targets.shape(), "probability and target shapes");
    if probas.n_rows() == 0 {
        return 0.0;
    }
    let total: f32 = probas
        .as_slice()
        .iter()
        .zip(targets.as_slice())
        .filter(|(_, &t)| t > 0.0)
        .map(|(&p, &t)| -t * p.max(EPS).ln())
        .sum();
    total / probas.n_rows() as f32
}

/// Gradient of [`soft_cross_entropy`] with respect to the logits that
/// produced `probas`: `(p - t) / batch`. Assumes each target row sums to one.
#[must_use]
pub fn soft_cross_entropy_grad(probas: &Matrix<f32>, targets: &Matrix<f32>) -> Matrix<f32> {
    let batch = probas.n_rows().max(1) as f32;
    let mut grad = probas.clone();
    for (g, &t) in grad.as_mut_slice().iter_mut().zip(targets.as_slice()) {
        *g = (*g - t) / batch;
    }
    grad
}
