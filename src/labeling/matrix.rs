//! Label matrix: items × labeling functions.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::FeatureMatrix;
use crate::error::{LabelError, Result};
use crate::primitives::Matrix;
use crate::weak_supervision::LFOutput;

use super::LabelingFunction;

/// Votes of every labeling function on every item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMatrix {
    keys: Vec<String>,
    functions: Vec<String>,
    votes: Matrix<i32>,
}

impl LabelMatrix {
    /// Evaluates every function on every row of `matrix`.
    ///
    /// Rows are evaluated in parallel; the result is in row order and
    /// function order regardless of scheduling.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a function, in row-major order.
    pub fn apply<F>(functions: &[F], matrix: &FeatureMatrix) -> Result<Self>
    where
        F: AsRef<dyn LabelingFunction> + Sync,
    {
        let rows = (0..matrix.n_rows())
            .into_par_iter()
            .map(|i| {
                let row = matrix.row(i);
                functions
                    .iter()
                    .map(|f| f.as_ref().apply(&row).map(LFOutput::to_i32))
                    .collect::<Result<Vec<i32>>>()
            })
            .collect::<Result<Vec<Vec<i32>>>>()?;

        let data = rows.into_iter().flatten().collect();
        let votes = Matrix::from_vec(matrix.n_rows(), functions.len(), data)?;
        Ok(Self {
            keys: matrix.keys().to_vec(),
            functions: functions.iter().map(|f| f.as_ref().name().to_string()).collect(),
            votes,
        })
    }

    /// Wraps precomputed votes.
    ///
    /// # Errors
    ///
    /// Returns an error if the key or function count disagrees with the vote
    /// matrix shape.
    pub fn from_votes(keys: Vec<String>, functions: Vec<String>, votes: Matrix<i32>) -> Result<Self> {
        if votes.shape() != (keys.len(), functions.len()) {
            return Err(LabelError::DimensionMismatch {
                expected: format!("{} x {}", keys.len(), functions.len()),
                actual: format!("{} x {}", votes.n_rows(), votes.n_cols()),
            });
        }
        Ok(Self {
            keys,
            functions,
            votes,
        })
    }

    /// Item keys in row order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Function names in column order.
    #[must_use]
    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    /// Raw votes.
    #[must_use]
    pub fn votes(&self) -> &Matrix<i32> {
        &self.votes
    }

    /// Number of items.
    #[must_use]
    pub fn n_items(&self) -> usize {
        self.keys.len()
    }

    /// Number of labeling functions.
    #[must_use]
    pub fn n_functions(&self) -> usize {
        self.functions.len()
    }

    /// Votes for one item.
    #[must_use]
    pub fn row_of(&self, key: &str) -> Option<&[i32]> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|i| self.votes.row(i))
    }

    /// Copy where every vote of each listed item is replaced by its gold label.
    #[must_use]
    pub fn with_gold_rows(&self, gold: &HashMap<String, i32>) -> Self {
        let mut votes = self.votes.clone();
        for (i, key) in self.keys.iter().enumerate() {
            if let Some(&label) = gold.get(key) {
                for j in 0..votes.n_cols() {
                    votes.set(i, j, label);
                }
            }
        }
        Self {
            keys: self.keys.clone(),
            functions: self.functions.clone(),
            votes,
        }
    }

    /// Gathers rows by position.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            keys: indices.iter().map(|&i| self.keys[i].clone()).collect(),
            functions: self.functions.clone(),
            votes: self.votes.select_rows(indices),
        }
    }
}
