//! Scoring labels against ground truth.
//!
//! A [`Score`] is computed from paired true and predicted labels with
//! weighted precision and recall over every class that occurs in either
//! list. Scoring never fails on empty input: zero pairs give a score with
//! `count = 0` and no metrics.
//!
//! Cross-validation results are kept per fold as [`FoldMetrics`]; a fold that
//! failed to train is recorded as [`FoldOutcome::Failed`] so it is never
//! mistaken for a genuine score of zero. [`TrainingScore`] averages the
//! folds that succeeded and counts the ones that did not.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};
use crate::metrics::{accuracy, log_loss, precision, recall, Average};
use crate::primitives::Matrix;

/// Agreement between predicted and true labels.
///
/// # Examples
///
/// ```
/// use labelsmith::scoring::{score, Score};
///
/// let s = score(&[0, 1, 1, 0], &[0, 1, 0, 0]).expect("same length");
/// assert_eq!(s.count, 4);
/// assert_eq!(s.accuracy, Some(0.75));
///
/// let empty: Score = score::<i32>(&[], &[]).expect("same length");
/// assert_eq!(empty.count, 0);
/// assert!(empty.accuracy.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Number of scored items.
    pub count: usize,
    /// Fraction of exact matches.
    pub accuracy: Option<f32>,
    /// Support-weighted precision.
    pub precision: Option<f32>,
    /// Support-weighted recall.
    pub recall: Option<f32>,
}

impl Score {
    /// The score of zero items.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when nothing was scored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Change from `previous` to `self`.
    #[must_use]
    pub fn delta(&self, previous: &Score) -> ScoreDelta {
        ScoreDelta {
            count: self.count as i64 - previous.count as i64,
            accuracy: diff(self.accuracy, previous.accuracy),
            precision: diff(self.precision, previous.precision),
            recall: diff(self.recall, previous.recall),
        }
    }
}

fn diff(current: Option<f32>, previous: Option<f32>) -> Option<f32> {
    Some(current? - previous?)
}

/// Difference between two scores; a metric missing on either side has no
/// delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreDelta {
    /// Change in scored items.
    pub count: i64,
    /// Change in accuracy.
    pub accuracy: Option<f32>,
    /// Change in precision.
    pub precision: Option<f32>,
    /// Change in recall.
    pub recall: Option<f32>,
}

/// Scores `y_pred` against `y_true`.
///
/// # Errors
///
/// Returns [`LabelError::DimensionMismatch`] if the lengths differ.
pub fn score<T: Ord + Copy>(y_true: &[T], y_pred: &[T]) -> Result<Score> {
    if y_true.len() != y_pred.len() {
        return Err(LabelError::DimensionMismatch {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Ok(Score::empty());
    }
    Ok(Score {
        count: y_true.len(),
        accuracy: Some(accuracy(y_pred, y_true)),
        precision: Some(precision(y_pred, y_true, Average::Weighted)),
        recall: Some(recall(y_pred, y_true, Average::Weighted)),
    })
}

/// Scores the predictions for `reference_items` against their true labels.
///
/// Items missing from either map are skipped, so an empty gold set yields
/// [`Score::empty`].
///
/// ```
/// use std::collections::HashMap;
/// use labelsmith::scoring::score_items;
///
/// let truth = HashMap::from([("a".to_string(), 1), ("b".to_string(), 0)]);
/// let predicted = HashMap::from([("a".to_string(), 1), ("b".to_string(), 1)]);
/// let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
///
/// let s = score_items(&items, &truth, &predicted);
/// assert_eq!(s.count, 2);
/// assert_eq!(s.accuracy, Some(0.5));
/// ```
#[must_use]
pub fn score_items(
    reference_items: &[String],
    true_labels: &HashMap<String, i32>,
    predicted_labels: &HashMap<String, i32>,
) -> Score {
    let (y_true, y_pred): (Vec<i32>, Vec<i32>) = reference_items
        .iter()
        .filter_map(|item| Some((*true_labels.get(item)?, *predicted_labels.get(item)?)))
        .unzip();
    // lengths agree by construction
    score(&y_true, &y_pred).unwrap_or_default()
}

/// Metrics of one successfully trained fold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldScores {
    /// Held-out accuracy.
    pub accuracy: f32,
    /// Held-out weighted precision.
    pub precision: f32,
    /// Held-out weighted recall.
    pub recall: f32,
    /// Held-out log loss.
    pub loss: f32,
}

impl FoldScores {
    /// Scores held-out class probabilities against the true classes.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Training`] for an empty held-out split and
    /// [`LabelError::DimensionMismatch`] if the row counts differ.
    pub fn evaluate(y_true: &[usize], probas: &Matrix<f32>) -> Result<Self> {
        if y_true.is_empty() {
            return Err(LabelError::Training("held-out split has no labeled rows".to_string()));
        }
        if probas.n_rows() != y_true.len() {
            return Err(LabelError::DimensionMismatch {
                expected: format!("{} probability rows", y_true.len()),
                actual: format!("{} probability rows", probas.n_rows()),
            });
        }
        let y_pred = probas.argmax_rows();
        Ok(Self {
            accuracy: accuracy(&y_pred, y_true),
            precision: precision(&y_pred, y_true, Average::Weighted),
            recall: recall(&y_pred, y_true, Average::Weighted),
            loss: log_loss(y_true, probas),
        })
    }
}

/// Result of one cross-validation fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FoldOutcome {
    /// The fold trained and was evaluated.
    Scored(FoldScores),
    /// Training or evaluation failed.
    Failed {
        /// Error text.
        reason: String,
    },
}

/// One cross-validation fold: its held-out rows and outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldMetrics {
    /// Fold number, from zero.
    pub fold: usize,
    /// Row indices held out in this fold.
    pub held_out: Vec<usize>,
    /// Scores or failure.
    pub outcome: FoldOutcome,
}

impl FoldMetrics {
    /// Scores of a successful fold.
    #[must_use]
    pub fn scores(&self) -> Option<&FoldScores> {
        match &self.outcome {
            FoldOutcome::Scored(s) => Some(s),
            FoldOutcome::Failed { .. } => None,
        }
    }
}

/// Cross-validation metrics averaged over the folds that succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingScore {
    /// Folds run.
    pub folds: usize,
    /// Folds that failed and are left out of the averages.
    pub failed: usize,
    /// Mean held-out accuracy.
    pub accuracy: Option<f32>,
    /// Mean held-out weighted precision.
    pub precision: Option<f32>,
    /// Mean held-out weighted recall.
    pub recall: Option<f32>,
    /// Mean held-out log loss.
    pub loss: Option<f32>,
}

impl TrainingScore {
    /// Averages `folds`.
    #[must_use]
    pub fn from_folds(folds: &[FoldMetrics]) -> Self {
        let scored: Vec<&FoldScores> = folds.iter().filter_map(FoldMetrics::scores).collect();
        let mean = |f: fn(&FoldScores) -> f32| {
            (!scored.is_empty()).then(|| scored.iter().map(|s| f(s)).sum::<f32>() / scored.len() as f32)
        };
        Self {
            folds: folds.len(),
            failed: folds.len() - scored.len(),
            accuracy: mean(|s| s.accuracy),
            precision: mean(|s| s.precision),
            recall: mean(|s| s.recall),
            loss: mean(|s| s.loss),
        }
    }
}
