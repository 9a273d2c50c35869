//! Classification algorithms.
//!
//! This module implements the multinomial logistic regression that backs the
//! closed-form surrogate model.
//!
//! # Example
//!
//! ```
//! use labelsmith::classification::LogisticRegression;
//! use labelsmith::primitives::Matrix;
//! use labelsmith::traits::Classifier;
//!
//! let x = Matrix::from_vec(6, 1, vec![-2.0, -1.5, -0.2, 0.2, 1.5, 2.0])
//!     .expect("6x1 matrix with 6 values");
//! let y = vec![0, 0, 0, 1, 1, 1];
//!
//! let mut model = LogisticRegression::new(2).with_max_iter(500);
//! model.fit(&x, &y).expect("valid training data");
//! assert_eq!(model.predict(&x).expect("fitted"), y);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LabelError, Result};
use crate::primitives::Matrix;
use crate::traits::Classifier;

/// Multinomial logistic regression with L2 regularization.
///
/// Minimises the mean cross-entropy plus `||W||² / (2·C·n)` by full-batch
/// gradient descent; intercepts are not regularized. Larger `C` means
/// weaker regularization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    n_classes: usize,
    /// Weights, `n_classes × n_features` (row-major).
    coefficients: Option<Matrix<f32>>,
    intercepts: Vec<f32>,
    /// Inverse regularization strength.
    c: f32,
    learning_rate: f32,
    max_iter: usize,
    tol: f32,
    n_iter: usize,
}

impl LogisticRegression {
    /// Default inverse regularization strength.
    pub const DEFAULT_C: f32 = 1000.0;

    /// Creates a classifier over `n_classes` classes with default parameters.
    #[must_use]
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            coefficients: None,
            intercepts: vec![0.0; n_classes],
            c: Self::DEFAULT_C,
            learning_rate: 0.5,
            max_iter: 1000,
            tol: 1e-4,
            n_iter: 0,
        }
    }

    /// Sets the inverse regularization strength.
    #[must_use]
    pub fn with_c(mut self, c: f32) -> Self {
        self.c = c;
        self
    }

    /// Sets the learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance on the largest gradient component.
    #[must_use]
    pub fn with_tolerance(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// Fitted weights, `n_classes × n_features`.
    #[must_use]
    pub fn coefficients(&self) -> Option<&Matrix<f32>> {
        self.coefficients.as_ref()
    }

    /// Per-class intercepts.
    #[must_use]
    pub fn intercepts(&self) -> &[f32] {
        &self.intercepts
    }

    /// Iterations run by the last fit.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn validate(&self) -> Result<()> {
        if self.n_classes < 2 {
            return Err(LabelError::InvalidHyperparameter {
                param: "n_classes".to_string(),
                value: self.n_classes.to_string(),
                constraint: ">= 2".to_string(),
            });
        }
        if self.c.is_nan() || self.c <= 0.0 {
            return Err(LabelError::InvalidHyperparameter {
                param: "C".to_string(),
                value: self.c.to_string(),
                constraint: "> 0".to_string(),
            });
        }
        Ok(())
    }

    fn probabilities(coef: &Matrix<f32>, intercepts: &[f32], x: &Matrix<f32>) -> Matrix<f32> {
        let k = intercepts.len();
        let mut out = Matrix::zeros(x.n_rows(), k);
        for (i, row) in x.iter_rows().enumerate() {
            let logits = out.row_mut(i);
            for (c, logit) in logits.iter_mut().enumerate() {
                *logit = intercepts[c]
                    + coef
                        .row(c)
                        .iter()
                        .zip(row)
                        .map(|(w, v)| w * v)
                        .sum::<f32>();
            }
            softmax_in_place(logits);
        }
        out
    }
}

/// Numerically stable softmax.
pub(crate) fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

impl Classifier for LogisticRegression {
    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        self.validate()?;
        let (n_samples, n_features) = x.shape();
        if n_samples != y.len() {
            return Err(LabelError::DimensionMismatch {
                expected: format!("{n_samples} targets"),
                actual: format!("{} targets", y.len()),
            });
        }
        if n_samples == 0 {
            return Err("Cannot fit with zero samples".into());
        }
        if let Some(&bad) = y.iter().find(|&&label| label >= self.n_classes) {
            return Err(LabelError::Training(format!(
                "target {bad} outside 0..{}",
                self.n_classes
            )));
        }

        let k = self.n_classes;
        let n = n_samples as f32;
        let mut coef = Matrix::zeros(k, n_features);
        let mut intercepts = vec![0.0; k];
        self.n_iter = 0;

        for _ in 0..self.max_iter {
            self.n_iter += 1;
            let probas = Self::probabilities(&coef, &intercepts, x);

            let mut coef_grad = Matrix::zeros(k, n_features);
            let mut intercept_grad = vec![0.0; k];
            for (i, row) in x.iter_rows().enumerate() {
                for c in 0..k {
                    let error = probas.get(i, c) - f32::from(u8::from(y[i] == c));
                    intercept_grad[c] += error;
                    for (g, v) in coef_grad.row_mut(c).iter_mut().zip(row) {
                        *g += error * v;
                    }
                }
            }

            let reg = 1.0 / (self.c * n);
            let mut max_grad = 0.0_f32;
            for c in 0..k {
                let g_b = intercept_grad[c] / n;
                intercepts[c] -= self.learning_rate * g_b;
                max_grad = max_grad.max(g_b.abs());

                let grads = coef_grad.row(c).to_vec();
                for (w, g) in coef.row_mut(c).iter_mut().zip(grads) {
                    let g_w = g / n + reg * *w;
                    *w -= self.learning_rate * g_w;
                    max_grad = max_grad.max(g_w.abs());
                }
            }

            if max_grad < self.tol {
                break;
            }
        }

        debug!(iterations = self.n_iter, classes = k, features = n_features, "logistic regression fitted");
        self.coefficients = Some(coef);
        self.intercepts = intercepts;
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let coef = self
            .coefficients
            .as_ref()
            .ok_or_else(|| LabelError::from("Model not fitted yet"))?;
        if x.n_cols() != coef.n_cols() {
            return Err(LabelError::DimensionMismatch {
                expected: format!("{} features", coef.n_cols()),
                actual: format!("{} features", x.n_cols()),
            });
        }
        Ok(Self::probabilities(coef, &self.intercepts, x))
    }
}
