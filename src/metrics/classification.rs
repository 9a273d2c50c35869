//! Classification metrics for evaluating label quality.
//!
//! Label types are generic so that aggregated labels (`i32`, where
//! [`crate::weak_supervision::ABSTAIN`] is just another class) and model
//! outputs (`usize`) are scored the same way. The class set of a metric is
//! the union of the labels in `y_true` and `y_pred`; a class that is never
//! predicted has precision 0 (no division error).

use std::collections::BTreeMap;

use crate::primitives::Matrix;

/// Probabilities are clipped to `[LOG_LOSS_EPS, 1]` before taking logs.
pub const LOG_LOSS_EPS: f64 = 1e-15;

/// Averaging strategy for multi-class metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Average {
    /// Calculate metrics for each label, return unweighted mean.
    Macro,
    /// Calculate metrics globally by counting total TP, FP, FN.
    Micro,
    /// Weighted mean by support (number of true instances per label).
    Weighted,
}

/// Compute classification accuracy.
///
/// accuracy = `correct_predictions` / `total_predictions`
///
/// # Panics
///
/// Panics if the slices have different lengths or are empty.
///
/// # Examples
///
/// ```
/// use labelsmith::metrics::accuracy;
///
/// let y_true = vec![0, 1, 2, 0, 1, 2];
/// let y_pred = vec![0, 2, 1, 0, 0, 1];
/// let acc = accuracy(&y_pred, &y_true);
/// assert!((acc - 0.333333).abs() < 0.001);
/// ```
#[must_use]
pub fn accuracy<T: PartialEq>(y_pred: &[T], y_true: &[T]) -> f32 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let correct = y_pred
        .iter()
        .zip(y_true.iter())
        .filter(|(p, t)| p == t)
        .count();

    correct as f32 / y_true.len() as f32
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    tp: usize,
    fp: usize,
    fn_: usize,
    support: usize,
}

fn class_counts<T: Ord + Copy>(y_pred: &[T], y_true: &[T]) -> BTreeMap<T, Counts> {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let mut counts: BTreeMap<T, Counts> = BTreeMap::new();
    for (&t, &p) in y_true.iter().zip(y_pred) {
        counts.entry(t).or_default().support += 1;
        if t == p {
            counts.entry(t).or_default().tp += 1;
        } else {
            counts.entry(p).or_default().fp += 1;
            counts.entry(t).or_default().fn_ += 1;
        }
    }
    counts
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

fn averaged<T>(counts: &BTreeMap<T, Counts>, average: Average, per_class: fn(Counts) -> (usize, usize)) -> f32 {
    match average {
        Average::Micro => {
            let (num, den) = counts
                .values()
                .map(|&c| per_class(c))
                .fold((0, 0), |(n, d), (cn, cd)| (n + cn, d + cd));
            ratio(num, den)
        }
        Average::Macro => {
            let sum: f32 = counts
                .values()
                .map(|&c| {
                    let (num, den) = per_class(c);
                    ratio(num, den)
                })
                .sum();
            sum / counts.len().max(1) as f32
        }
        Average::Weighted => {
            let total: usize = counts.values().map(|c| c.support).sum();
            if total == 0 {
                return 0.0;
            }
            counts
                .values()
                .map(|&c| {
                    let (num, den) = per_class(c);
                    ratio(num, den) * c.support as f32 / total as f32
                })
                .sum()
        }
    }
}

/// Compute precision score: TP / (TP + FP).
///
/// # Panics
///
/// Panics if the slices have different lengths or are empty.
///
/// # Examples
///
/// ```
/// use labelsmith::metrics::{precision, Average};
///
/// let y_true = vec![0, 0, 1, 1];
/// let y_pred = vec![0, 1, 1, 1];
/// // class 0: 1/1, class 1: 2/3, each with support 2
/// let prec = precision(&y_pred, &y_true, Average::Weighted);
/// assert!((prec - 5.0 / 6.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn precision<T: Ord + Copy>(y_pred: &[T], y_true: &[T], average: Average) -> f32 {
    averaged(&class_counts(y_pred, y_true), average, |c| (c.tp, c.tp + c.fp))
}

/// Compute recall score: TP / (TP + FN).
///
/// # Panics
///
/// Panics if the slices have different lengths or are empty.
///
/// # Examples
///
/// ```
/// use labelsmith::metrics::{recall, Average};
///
/// let y_true = vec![0, 0, 1, 1];
/// let y_pred = vec![0, 1, 1, 1];
/// let rec = recall(&y_pred, &y_true, Average::Weighted);
/// assert!((rec - 0.75).abs() < 1e-6);
/// ```
#[must_use]
pub fn recall<T: Ord + Copy>(y_pred: &[T], y_true: &[T], average: Average) -> f32 {
    averaged(&class_counts(y_pred, y_true), average, |c| (c.tp, c.tp + c.fn_))
}

/// Compute confusion matrix over `n_classes` classes.
///
/// Element `[i, j]` counts samples with true label `i` predicted as `j`.
/// Labels at or above `n_classes` are ignored.
///
/// # Panics
///
/// Panics if the slices have different lengths.
///
/// # Examples
///
/// ```
/// use labelsmith::metrics::confusion_matrix;
///
/// let y_true = vec![0, 0, 1, 1, 2, 2];
/// let y_pred = vec![0, 1, 1, 1, 2, 0];
/// let cm = confusion_matrix(&y_pred, &y_true, 3);
/// assert_eq!(cm.row(0), &[1, 1, 0]);
/// assert_eq!(cm.row(2), &[1, 0, 1]);
/// ```
#[must_use]
pub fn confusion_matrix(y_pred: &[usize], y_true: &[usize], n_classes: usize) -> Matrix<usize> {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");

    let mut cm = Matrix::filled(n_classes, n_classes, 0usize);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < n_classes && p < n_classes {
            cm.set(t, p, cm.get(t, p) + 1);
        }
    }
    cm
}

/// Mean negative log-likelihood of the true classes.
///
/// Each row of `probas` is renormalized to sum to one and probabilities
/// are clipped to [`LOG_LOSS_EPS`] before the logarithm.
///
/// # Panics
///
/// Panics if `probas` does not have one row per target, or a target is
/// outside the probability columns.
///
/// # Examples
///
/// ```
/// use labelsmith::metrics::log_loss;
/// use labelsmith::primitives::Matrix;
///
/// let probas = Matrix::from_vec(2, 2, vec![0.5, 0.5, 0.5, 0.5]).expect("2x2");
/// assert!((log_loss(&[0, 1], &probas) - std::f32::consts::LN_2).abs() < 1e-6);
/// ```
#[must_use]
pub fn log_loss(y_true: &[usize], probas: &Matrix<f32>) -> f32 {
    assert_eq!(probas.n_rows(), y_true.len(), "one probability row per target");
    if y_true.is_empty() {
        return 0.0;
    }
    let total: f64 = y_true
        .iter()
        .zip(probas.iter_rows())
        .map(|(&t, row)| {
            let sum: f64 = row.iter().map(|&p| f64::from(p)).sum();
            let p = if sum > 0.0 { f64::from(row[t]) / sum } else { 0.0 };
            -p.clamp(LOG_LOSS_EPS, 1.0).ln()
        })
        .sum();
    (total / y_true.len() as f64) as f32
}
