//! Generative label model.
//!
//! Each labeling function `j` is modelled by a confusion table
//! `P(vote = v | y = c, j votes)`; items are independent draws from the class
//! prior. Parameters are fit by expectation-maximisation on the label matrix
//! alone. Abstains carry no class information, so an item on which every
//! function abstains receives the class prior.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_votes, LabelVoter, ABSTAIN};
use crate::error::{LabelError, Result};
use crate::primitives::Matrix;

/// Class-conditional noise model over labeling functions.
///
/// # Examples
///
/// ```
/// use labelsmith::primitives::Matrix;
/// use labelsmith::weak_supervision::{LabelModel, LabelVoter, TieBreakPolicy};
///
/// let votes = Matrix::from_vec(4, 3, vec![
///     0, 0, -1,
///     1, 1, 1,
///     0, -1, 0,
///     -1, 1, 1,
/// ]).expect("4x3 votes");
///
/// let mut model = LabelModel::new(2, 3);
/// model.fit(&votes, 100, 123).expect("fit succeeds");
/// let preds = model.predict(&votes, TieBreakPolicy::Abstain, None).expect("predict");
/// assert_eq!(preds, vec![0, 1, 0, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelModel {
    n_classes: usize,
    n_lfs: usize,
    class_priors: Vec<f32>,
    /// `conditionals[j][c][v]`: probability that function `j` votes `v`
    /// given true class `c`, conditioned on not abstaining.
    conditionals: Vec<Vec<Vec<f32>>>,
    init_accuracy: f32,
    smoothing: f32,
    tolerance: f32,
    fitted_epochs: usize,
}

impl LabelModel {
    /// Creates an unfitted model with uniform priors and every function at
    /// the initial accuracy.
    #[must_use]
    pub fn new(n_classes: usize, n_lfs: usize) -> Self {
        let init_accuracy = 0.7;
        Self {
            n_classes,
            n_lfs,
            class_priors: vec![1.0 / n_classes.max(1) as f32; n_classes],
            conditionals: vec![confusion(n_classes, init_accuracy); n_lfs],
            init_accuracy,
            smoothing: 0.01,
            tolerance: 1e-6,
            fitted_epochs: 0,
        }
    }

    /// Sets the starting accuracy of every labeling function.
    #[must_use]
    pub fn with_init_accuracy(mut self, accuracy: f32) -> Self {
        self.init_accuracy = accuracy.clamp(0.0, 1.0);
        self.conditionals = vec![confusion(self.n_classes, self.init_accuracy); self.n_lfs];
        self
    }

    /// Sets the additive smoothing used in the M-step.
    #[must_use]
    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing.max(0.0);
        self
    }

    /// Sets the parameter-change threshold for early stopping.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of labeling functions.
    #[must_use]
    pub fn n_lfs(&self) -> usize {
        self.n_lfs
    }

    /// Learned class priors.
    #[must_use]
    pub fn class_priors(&self) -> &[f32] {
        &self.class_priors
    }

    /// Epochs run by the last [`LabelModel::fit`].
    #[must_use]
    pub fn fitted_epochs(&self) -> usize {
        self.fitted_epochs
    }

    /// Estimated accuracy of each labeling function when it votes:
    /// `sum_c prior[c] * P(vote = c | y = c)`.
    #[must_use]
    pub fn accuracies(&self) -> Vec<f32> {
        self.conditionals
            .iter()
            .map(|table| {
                (0..self.n_classes)
                    .map(|c| self.class_priors[c] * table[c][c])
                    .sum::<f32>()
            })
            .collect()
    }

    /// Fraction of rows each labeling function voted on.
    #[must_use]
    pub fn lf_coverage(&self, votes: &Matrix<i32>) -> Vec<f32> {
        super::lf_coverage(votes)
    }

    /// Fits priors and confusion tables by EM.
    ///
    /// Initial accuracies are jittered by a generator seeded with `seed`, so
    /// fitting is deterministic for a fixed seed. Stops after `epochs`
    /// iterations or when no parameter moves more than the tolerance.
    ///
    /// # Errors
    ///
    /// Returns an error if the column count differs from `n_lfs` or a vote is
    /// out of range.
    pub fn fit(&mut self, votes: &Matrix<i32>, epochs: usize, seed: u64) -> Result<()> {
        self.check_shape(votes)?;
        check_votes(votes, self.n_classes)?;

        let mut rng = StdRng::seed_from_u64(seed);
        self.class_priors = vec![1.0 / self.n_classes as f32; self.n_classes];
        self.conditionals = (0..self.n_lfs)
            .map(|_| {
                let jitter: f32 = rng.gen_range(-0.05..0.05);
                confusion(self.n_classes, (self.init_accuracy + jitter).clamp(0.0, 1.0))
            })
            .collect();

        self.fitted_epochs = 0;
        for epoch in 0..epochs {
            let posteriors = self.posteriors(votes);
            let delta = self.m_step(votes, &posteriors);
            self.fitted_epochs = epoch + 1;
            if delta < self.tolerance {
                debug!(epoch, delta, "label model converged");
                break;
            }
        }
        debug!(
            epochs = self.fitted_epochs,
            priors = ?self.class_priors,
            "label model fitted"
        );
        Ok(())
    }

    fn check_shape(&self, votes: &Matrix<i32>) -> Result<()> {
        if votes.n_cols() != self.n_lfs {
            return Err(LabelError::DimensionMismatch {
                expected: format!("{} labeling functions", self.n_lfs),
                actual: votes.n_cols().to_string(),
            });
        }
        Ok(())
    }

    /// E-step: normalised posterior over classes for every row.
    fn posteriors(&self, votes: &Matrix<i32>) -> Vec<Vec<f32>> {
        (0..votes.n_rows())
            .into_par_iter()
            .map(|i| {
                let mut log_p: Vec<f32> = self
                    .class_priors
                    .iter()
                    .map(|&p| p.max(f32::MIN_POSITIVE).ln())
                    .collect();
                for (j, &v) in votes.row(i).iter().enumerate() {
                    if v == ABSTAIN {
                        continue;
                    }
                    for (c, lp) in log_p.iter_mut().enumerate() {
                        *lp += self.conditionals[j][c][v as usize]
                            .max(f32::MIN_POSITIVE)
                            .ln();
                    }
                }
                softmax(&log_p)
            })
            .collect()
    }

    /// M-step; returns the largest absolute parameter change.
    fn m_step(&mut self, votes: &Matrix<i32>, posteriors: &[Vec<f32>]) -> f32 {
        let k = self.n_classes;
        let alpha = self.smoothing;
        let n = posteriors.len() as f32;
        let mut delta = 0.0_f32;

        for c in 0..k {
            let mass: f32 = posteriors.iter().map(|q| q[c]).sum();
            let prior = (mass + alpha) / (n + k as f32 * alpha);
            delta = delta.max((prior - self.class_priors[c]).abs());
            self.class_priors[c] = prior;
        }

        for j in 0..self.n_lfs {
            let mut counts = vec![vec![0.0_f32; k]; k];
            for (i, q) in posteriors.iter().enumerate() {
                let v = votes.get(i, j);
                if v == ABSTAIN {
                    continue;
                }
                for c in 0..k {
                    counts[c][v as usize] += q[c];
                }
            }
            for (c, row) in counts.iter().enumerate() {
                let total: f32 = row.iter().sum::<f32>() + k as f32 * alpha;
                for (v, &count) in row.iter().enumerate() {
                    let p = (count + alpha) / total;
                    delta = delta.max((p - self.conditionals[j][c][v]).abs());
                    self.conditionals[j][c][v] = p;
                }
            }
        }
        delta
    }
}

impl LabelVoter for LabelModel {
    fn cardinality(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, votes: &Matrix<i32>) -> Result<Matrix<f32>> {
        self.check_shape(votes)?;
        check_votes(votes, self.n_classes)?;
        let rows = self.posteriors(votes);
        Matrix::from_rows(&rows)
            .map(|m| {
                if rows.is_empty() {
                    Matrix::zeros(0, self.n_classes)
                } else {
                    m
                }
            })
            .map_err(LabelError::from)
    }
}

/// Confusion table with `accuracy` on the diagonal and the remainder spread
/// evenly over the other classes.
fn confusion(k: usize, accuracy: f32) -> Vec<Vec<f32>> {
    let off = if k > 1 {
        (1.0 - accuracy) / (k - 1) as f32
    } else {
        0.0
    };
    (0..k)
        .map(|c| (0..k).map(|v| if v == c { accuracy } else { off }).collect())
        .collect()
}

fn softmax(log_p: &[f32]) -> Vec<f32> {
    let max = log_p.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = log_p.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}
