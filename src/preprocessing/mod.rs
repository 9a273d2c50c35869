//! Feature standardization for surrogate training.
//!
//! # Example
//!
//! ```
//! use labelsmith::preprocessing::StandardScaler;
//! use labelsmith::primitives::Matrix;
//! use labelsmith::traits::Transformer;
//!
//! // Features on very different scales
//! let data = Matrix::from_vec(4, 2, vec![
//!     1.0, 100.0,
//!     2.0, 200.0,
//!     3.0, 300.0,
//!     4.0, 400.0,
//! ]).expect("valid matrix dimensions");
//!
//! let mut scaler = StandardScaler::new();
//! let scaled = scaler.fit_transform(&data).expect("fit_transform should succeed");
//! assert!((scaled.get(0, 0) - scaled.get(0, 1)).abs() < 1e-5);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};
use crate::primitives::Matrix;
use crate::traits::Transformer;

/// Standardizes features by removing the mean and scaling to unit variance.
///
/// The standard score of a sample x is: z = (x - mean) / std. Columns with
/// zero variance are centered but not scaled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-column `(mean, population std)`, set by fit.
    stats: Option<Vec<(f32, f32)>>,
}

impl StandardScaler {
    /// Creates an unfitted scaler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitted per-feature means.
    #[must_use]
    pub fn mean(&self) -> Option<Vec<f32>> {
        self.stats.as_ref().map(|s| s.iter().map(|&(m, _)| m).collect())
    }

    /// Fitted per-feature population standard deviations.
    #[must_use]
    pub fn std(&self) -> Option<Vec<f32>> {
        self.stats.as_ref().map(|s| s.iter().map(|&(_, sd)| sd).collect())
    }

    /// Returns true if the scaler has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.stats.is_some()
    }
}

impl Transformer for StandardScaler {
    /// Computes the mean and standard deviation of each feature.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err("Cannot fit with zero samples".into());
        }
        let n = n_samples as f32;
        let stats = (0..n_features)
            .map(|j| {
                let column = x.column(j);
                let mean = column.iter().sum::<f32>() / n;
                // population std (divide by n)
                let var = column.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
                (mean, var.sqrt())
            })
            .collect();
        self.stats = Some(stats);
        Ok(())
    }

    /// Standardizes the data using fitted mean and std.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let stats = self
            .stats
            .as_deref()
            .ok_or_else(|| LabelError::from("Scaler not fitted"))?;
        if x.n_cols() != stats.len() {
            return Err(LabelError::DimensionMismatch {
                expected: format!("{} features", stats.len()),
                actual: format!("{} features", x.n_cols()),
            });
        }

        let mut out = x.clone();
        for i in 0..out.n_rows() {
            for (val, &(mean, std)) in out.row_mut(i).iter_mut().zip(stats) {
                *val -= mean;
                if std > 1e-10 {
                    *val /= std;
                }
            }
        }
        Ok(out)
    }
}
