//! Evaluation metrics for surrogate models and aggregated labels.
//!
//! Classification metrics (accuracy, weighted precision and recall,
//! confusion matrix) and probabilistic log loss.

pub mod classification;

pub use classification::{accuracy, confusion_matrix, log_loss, precision, recall, Average};

#[cfg(test)]
#[path = "tests_classification_contract.rs"]
mod tests_classification_contract;
