//! Surrogate models: classifiers that learn to predict labels from raw
//! features instead of rules.
//!
//! Every variant implements [`SurrogateModel`]:
//!
//! 1. `train` runs stratified k-fold cross-validation (one fresh model per
//!    fold, scored on the held-out rows) and then fits one final model on all
//!    rows.
//! 2. `predict` labels new rows with the final model.
//! 3. `reference_labels` returns the definitive targets the model was
//!    trained against.
//!
//! Variants are selected by [`SurrogateConfig`]:
//!
//! | Variant | Targets | Model |
//! |---------|---------|-------|
//! | [`ClosedFormSurrogate`] | hard labels | standardised multinomial logistic regression |
//! | [`NeuralSurrogate`] | label distributions | MLP with Monte Carlo dropout |
//! | [`EndToEndSurrogate`] | full label matrix | MLP trained jointly with per-function reliabilities |
//!
//! [`RemoteSurrogate`] forwards training and prediction to a remote worker.
//!
//! Repeating `train` with identical input and fold count returns the cached
//! fold metrics without retraining.

mod closed_form;
mod end_to_end;
mod neural;
mod remote;

pub use closed_form::{ClosedFormConfig, ClosedFormSurrogate};
pub use end_to_end::{EndToEndConfig, EndToEndSurrogate};
pub use neural::{NeuralConfig, NeuralSurrogate};
pub use remote::RemoteSurrogate;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LabelError, Result};
use crate::model_selection::{check_folds, run_folds, StratifiedKFold};
use crate::primitives::Matrix;
use crate::scoring::{FoldMetrics, FoldOutcome, FoldScores};
use crate::weak_supervision::{check_votes, ABSTAIN};

/// Surrogate variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurrogateKind {
    /// Logistic regression on hard labels.
    ClosedForm,
    /// MLP on label distributions.
    Neural,
    /// MLP trained end-to-end from the label matrix.
    EndToEnd,
}

impl fmt::Display for SurrogateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ClosedForm => "closed_form",
            Self::Neural => "neural",
            Self::EndToEnd => "end_to_end",
        })
    }
}

/// Variant selection with its hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum SurrogateConfig {
    /// See [`ClosedFormSurrogate`].
    ClosedForm(ClosedFormConfig),
    /// See [`NeuralSurrogate`].
    Neural(NeuralConfig),
    /// See [`EndToEndSurrogate`].
    EndToEnd(EndToEndConfig),
}

impl Default for SurrogateConfig {
    fn default() -> Self {
        Self::ClosedForm(ClosedFormConfig::default())
    }
}

impl SurrogateConfig {
    /// The selected variant.
    #[must_use]
    pub fn kind(&self) -> SurrogateKind {
        match self {
            Self::ClosedForm(_) => SurrogateKind::ClosedForm,
            Self::Neural(_) => SurrogateKind::Neural,
            Self::EndToEnd(_) => SurrogateKind::EndToEnd,
        }
    }

    /// Fold count used when a run does not set one: 0 (no cross-validation)
    /// for the end-to-end variant, 5 otherwise.
    #[must_use]
    pub fn default_folds(&self) -> usize {
        match self {
            Self::EndToEnd(_) => 0,
            _ => 5,
        }
    }

    /// Creates an untrained local model.
    #[must_use]
    pub fn build(&self) -> Box<dyn SurrogateModel> {
        match self {
            Self::ClosedForm(c) => Box::new(ClosedFormSurrogate::new(c.clone())),
            Self::Neural(c) => Box::new(NeuralSurrogate::new(c.clone())),
            Self::EndToEnd(c) => Box::new(EndToEndSurrogate::new(c.clone())),
        }
    }
}

/// Training targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Targets {
    /// One label index (or [`ABSTAIN`]) per row.
    Hard {
        /// Labels.
        labels: Vec<i32>,
    },
    /// One probability distribution per row.
    Soft {
        /// `n_rows × n_classes` probabilities.
        probabilities: Matrix<f32>,
    },
    /// The full label matrix, with the definitive label of every row.
    Votes {
        /// `n_rows × n_functions` votes.
        votes: Matrix<i32>,
        /// Definitive labels used for evaluation.
        labels: Vec<i32>,
    },
}

/// Features and targets handed to [`SurrogateModel::train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateInput {
    features: Matrix<f32>,
    targets: Targets,
    n_classes: usize,
}

impl SurrogateInput {
    /// Validates and bundles training data.
    ///
    /// # Errors
    ///
    /// Returns an error if the row counts differ, fewer than two classes are
    /// given, or a label or vote lies outside `-1..n_classes`.
    pub fn new(features: Matrix<f32>, targets: Targets, n_classes: usize) -> Result<Self> {
        if n_classes < 2 {
            return Err(LabelError::InvalidHyperparameter {
                param: "n_classes".to_string(),
                value: n_classes.to_string(),
                constraint: ">= 2".to_string(),
            });
        }
        let n = features.n_rows();
        let rows = |actual: usize| -> Result<()> {
            if actual == n {
                Ok(())
            } else {
                Err(LabelError::DimensionMismatch {
                    expected: format!("{n} target rows"),
                    actual: format!("{actual} target rows"),
                })
            }
        };
        match &targets {
            Targets::Hard { labels } => {
                rows(labels.len())?;
                check_labels(labels, n_classes)?;
            }
            Targets::Soft { probabilities } => {
                rows(probabilities.n_rows())?;
                if probabilities.n_cols() != n_classes {
                    return Err(LabelError::DimensionMismatch {
                        expected: format!("{n_classes} probability columns"),
                        actual: format!("{} probability columns", probabilities.n_cols()),
                    });
                }
            }
            Targets::Votes { votes, labels } => {
                rows(votes.n_rows())?;
                rows(labels.len())?;
                check_votes(votes, n_classes)?;
                check_labels(labels, n_classes)?;
            }
        }
        Ok(Self {
            features,
            targets,
            n_classes,
        })
    }

    /// Feature matrix.
    #[must_use]
    pub fn features(&self) -> &Matrix<f32> {
        &self.features
    }

    /// Training targets.
    #[must_use]
    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.features.n_rows()
    }

    /// Definitive label of every row; distributions contribute their
    /// arg-max.
    #[must_use]
    pub fn reference_labels(&self) -> Vec<i32> {
        match &self.targets {
            Targets::Hard { labels } | Targets::Votes { labels, .. } => labels.clone(),
            Targets::Soft { probabilities } => probabilities
                .argmax_rows()
                .into_iter()
                .map(class_label)
                .collect(),
        }
    }

    /// Rows with a definitive (non-abstain) label.
    #[must_use]
    pub fn labeled_rows(&self) -> Vec<usize> {
        self.reference_labels()
            .iter()
            .enumerate()
            .filter(|(_, &l)| l != ABSTAIN)
            .map(|(i, _)| i)
            .collect()
    }

    /// Target distribution of every row. Hard labels become one-hot rows,
    /// [`ABSTAIN`] a uniform row.
    #[must_use]
    pub fn soft_targets(&self) -> Matrix<f32> {
        match &self.targets {
            Targets::Soft { probabilities } => probabilities.clone(),
            Targets::Hard { labels } | Targets::Votes { labels, .. } => {
                let k = self.n_classes;
                let mut out = Matrix::filled(labels.len(), k, 1.0 / k as f32);
                for (i, &label) in labels.iter().enumerate() {
                    if let Ok(class) = usize::try_from(label) {
                        out.row_mut(i).fill(0.0);
                        out.set(i, class, 1.0);
                    }
                }
                out
            }
        }
    }
}

fn check_labels(labels: &[i32], n_classes: usize) -> Result<()> {
    match labels
        .iter()
        .find(|&&l| l != ABSTAIN && usize::try_from(l).map_or(true, |c| c >= n_classes))
    {
        Some(bad) => Err(LabelError::InvalidHyperparameter {
            param: "label".to_string(),
            value: bad.to_string(),
            constraint: format!("-1 or a label index below {n_classes}"),
        }),
        None => Ok(()),
    }
}

pub(crate) fn class_label(class: usize) -> i32 {
    i32::try_from(class).unwrap_or(ABSTAIN)
}

/// Definitive labels of `rows` as class indices; callers pass labeled rows.
pub(crate) fn classes_of(labels: &[i32], rows: &[usize]) -> Vec<usize> {
    rows.iter()
        .map(|&i| usize::try_from(labels[i]).unwrap_or(0))
        .collect()
}

/// Fold stratum of every row: its class, or `n_classes` for [`ABSTAIN`].
pub(crate) fn strata_of(labels: &[i32], n_classes: usize) -> Vec<usize> {
    labels
        .iter()
        .map(|&l| usize::try_from(l).unwrap_or(n_classes))
        .collect()
}

/// The entries of `rows` whose label is not [`ABSTAIN`].
pub(crate) fn labeled_of(labels: &[i32], rows: &[usize]) -> Vec<usize> {
    rows.iter().copied().filter(|&i| labels[i] != ABSTAIN).collect()
}

/// A classifier from features to labels, trained with cross-validation.
pub trait SurrogateModel: Send + fmt::Debug {
    /// The variant.
    fn kind(&self) -> SurrogateKind;

    /// Cross-validates with `folds` folds (0 disables cross-validation),
    /// then fits the final model on all rows. Returns one record per fold.
    ///
    /// # Errors
    ///
    /// Returns an error if `folds` is 1 or exceeds the usable rows, or the
    /// final model cannot be trained. Failures inside a fold are recorded
    /// as [`FoldOutcome::Failed`] instead.
    fn train(&mut self, input: &SurrogateInput, folds: usize) -> Result<Vec<FoldMetrics>>;

    /// Labels each row with the final model.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::InvalidState`] before [`SurrogateModel::train`]
    /// and propagates shape errors.
    fn predict(&self, features: &Matrix<f32>) -> Result<Vec<i32>>;

    /// Definitive targets of the last training call.
    fn reference_labels(&self) -> Option<&[i32]>;
}

/// Trained state shared by the local variants.
#[derive(Debug, Clone)]
pub(crate) struct Trained<M> {
    memo: Option<(SurrogateInput, usize, Vec<FoldMetrics>)>,
    model: Option<M>,
    reference: Option<Vec<i32>>,
}

impl<M> Default for Trained<M> {
    fn default() -> Self {
        Self {
            memo: None,
            model: None,
            reference: None,
        }
    }
}

impl<M> Trained<M> {
    pub(crate) fn cached(&self, input: &SurrogateInput, folds: usize) -> Option<Vec<FoldMetrics>> {
        match &self.memo {
            Some((last, last_folds, metrics)) if *last_folds == folds && last == input => {
                debug!(rows = input.n_rows(), folds, "surrogate input unchanged, reusing model");
                Some(metrics.clone())
            }
            _ => None,
        }
    }

    pub(crate) fn finish(
        &mut self,
        input: &SurrogateInput,
        folds: usize,
        metrics: Vec<FoldMetrics>,
        model: M,
    ) -> Vec<FoldMetrics> {
        self.reference = Some(input.reference_labels());
        self.model = Some(model);
        self.memo = Some((input.clone(), folds, metrics.clone()));
        metrics
    }

    pub(crate) fn model(&self) -> Result<&M> {
        self.model.as_ref().ok_or_else(|| LabelError::InvalidState {
            expected: "trained".to_string(),
            found: "untrained".to_string(),
        })
    }

    pub(crate) fn reference(&self) -> Option<&[i32]> {
        self.reference.as_deref()
    }
}

/// Stratified cross-validation over `rows`, stratified by `strata`
/// (one stratum per entry of `rows`). `fit_eval(train, test)` receives
/// original row indices. Fold failures are recorded, not propagated.
///
/// # Errors
///
/// Returns [`LabelError::InvalidHyperparameter`] for an invalid fold count.
pub(crate) fn cross_validate<F>(
    rows: &[usize],
    strata: &[usize],
    folds: usize,
    random_state: u64,
    fit_eval: F,
) -> Result<Vec<FoldMetrics>>
where
    F: Fn(&[usize], &[usize]) -> Result<FoldScores> + Sync,
{
    let Some(k) = check_folds(folds, rows.len())? else {
        return Ok(Vec::new());
    };
    let splits = StratifiedKFold::new(k)
        .with_random_state(random_state)
        .split(strata)?;

    Ok(run_folds(&splits, |fold, train, test| {
        let train: Vec<usize> = train.iter().map(|&p| rows[p]).collect();
        let held_out: Vec<usize> = test.iter().map(|&p| rows[p]).collect();
        let outcome = match fit_eval(&train, &held_out) {
            Ok(scores) => {
                debug!(fold, accuracy = scores.accuracy, loss = scores.loss, "fold scored");
                FoldOutcome::Scored(scores)
            }
            Err(err) => {
                warn!(fold, error = %err, "fold failed");
                FoldOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };
        FoldMetrics {
            fold,
            held_out,
            outcome,
        }
    }))
}

/// Fails unless `y` holds at least two distinct classes.
pub(crate) fn require_two_classes(y: &[usize]) -> Result<()> {
    match y.first() {
        Some(&first) if y.iter().any(|&c| c != first) => Ok(()),
        _ => Err(LabelError::Training(
            "training split contains fewer than two classes".to_string(),
        )),
    }
}

#[cfg(test)]
#[path = "surrogate_tests.rs"]
mod tests;
