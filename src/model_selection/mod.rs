//! Model selection utilities for cross-validation.
//!
//! This module provides:
//! - [`StratifiedKFold`]: determinism-seeded class-balanced folds
//! - [`check_folds`]: validation of a requested fold count
//! - [`run_folds`]: independent per-fold work, collected in fold order

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::error::{LabelError, Result};

/// Seed used when no random state is set.
pub const DEFAULT_RANDOM_STATE: u64 = 42;

/// One cross-validation split: `(train_indices, test_indices)`.
pub type Split = (Vec<usize>, Vec<usize>);

/// Stratified K-Fold cross-validator.
///
/// Provides train/test indices that split the data into K folds while
/// keeping the class proportions of each fold close to those of the whole
/// set. Classes are visited in ascending order and their rows are dealt
/// round-robin, continuing from where the previous class stopped, so fold
/// sizes differ by at most one and no fold is empty when
/// `n_samples >= n_splits`.
///
/// # Example
///
/// ```rust
/// use labelsmith::model_selection::StratifiedKFold;
///
/// // Labels with imbalanced classes
/// let y = [0, 0, 0, 0, 1, 1, 1, 1, 2, 2];
///
/// let splits = StratifiedKFold::new(3).split(&y).expect("3 <= 10 samples");
/// assert_eq!(splits.len(), 3);
/// let held_out: usize = splits.iter().map(|(_, test)| test.len()).sum();
/// assert_eq!(held_out, y.len());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    random_state: u64,
}

impl StratifiedKFold {
    /// Creates a shuffling splitter seeded with [`DEFAULT_RANDOM_STATE`].
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            random_state: DEFAULT_RANDOM_STATE,
        }
    }

    /// Enables or disables shuffling within each class.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Sets the seed for reproducible shuffling.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self.shuffle = true;
        self
    }

    /// Number of folds.
    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generates stratified train/test indices for each fold.
    ///
    /// Test indices within a fold are sorted ascending; train indices are
    /// the sorted complement.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::InvalidHyperparameter`] unless
    /// `2 <= n_splits <= y.len()`.
    pub fn split(&self, y: &[usize]) -> Result<Vec<Split>> {
        let n_samples = y.len();
        if self.n_splits < 2 || self.n_splits > n_samples {
            return Err(LabelError::InvalidHyperparameter {
                param: "n_splits".to_string(),
                value: self.n_splits.to_string(),
                constraint: format!("2 <= n_splits <= {n_samples} samples"),
            });
        }

        let mut class_indices: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &label) in y.iter().enumerate() {
            class_indices.entry(label).or_default().push(i);
        }

        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.random_state);
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        let mut fold_of = vec![0usize; n_samples];
        let mut next = 0usize;
        for indices in class_indices.values() {
            for &idx in indices {
                fold_of[idx] = next;
                next = (next + 1) % self.n_splits;
            }
        }

        let splits = (0..self.n_splits)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..n_samples).partition(|&i| fold_of[i] == fold);
                (train, test)
            })
            .collect();
        Ok(splits)
    }
}

/// Interprets a requested fold count for `n_samples` rows.
///
/// `0` disables cross-validation (`Ok(None)`); otherwise the count must be
/// between 2 and `n_samples`.
///
/// # Errors
///
/// Returns [`LabelError::InvalidHyperparameter`] for `1` or a count larger
/// than the number of rows.
pub fn check_folds(folds: usize, n_samples: usize) -> Result<Option<usize>> {
    match folds {
        0 => Ok(None),
        f if f >= 2 && f <= n_samples => Ok(Some(f)),
        f => Err(LabelError::InvalidHyperparameter {
            param: "folds".to_string(),
            value: f.to_string(),
            constraint: format!("0 (no cross-validation) or 2..={n_samples}"),
        }),
    }
}

/// Runs `task(fold, train, test)` for every split in parallel and returns
/// the results in fold order.
pub fn run_folds<T, F>(splits: &[Split], task: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize, &[usize], &[usize]) -> T + Sync,
{
    splits
        .par_iter()
        .enumerate()
        .map(|(fold, (train, test))| task(fold, train, test))
        .collect()
}

#[cfg(test)]
#[path = "tests_kfold_contract.rs"]
mod tests_kfold_contract;
