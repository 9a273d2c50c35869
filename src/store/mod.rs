//! Persistence of rules, gold labels and labeling results.
//!
//! The core only reads rules and gold labels and appends results, so the
//! [`LabelingStore`] trait is deliberately small. Two implementations:
//!
//! - [`MemoryStore`]: in-process maps, for tests and one-off runs.
//! - [`JsonDirStore`]: one JSON file per rule set, task and result under a
//!   directory.

mod json_dir;
mod memory;

pub use json_dir::{JsonDirStore, StoredResult};
pub use memory::MemoryStore;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::pipeline::LabelingResult;
use crate::rules::Rule;

/// Manually verified label of one item. Unique per `(task_id, item_key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoldLabel {
    /// Generated identifier.
    pub id: String,
    /// Item (time series) key.
    pub item_key: String,
    /// Label index.
    pub label_index: i32,
    /// Who entered the label.
    pub contributed_by: String,
    /// Task the label belongs to.
    pub task_id: String,
}

impl GoldLabel {
    /// Creates a gold label with a fresh identifier.
    pub fn new(
        task_id: impl Into<String>,
        item_key: impl Into<String>,
        label_index: i32,
        contributed_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            item_key: item_key.into(),
            label_index,
            contributed_by: contributed_by.into(),
            task_id: task_id.into(),
        }
    }
}

/// Item key to gold label index.
#[must_use]
pub fn gold_map(labels: &[GoldLabel]) -> HashMap<String, i32> {
    labels
        .iter()
        .map(|g| (g.item_key.clone(), g.label_index))
        .collect()
}

/// Replaces the label for the same `(task, item)` or appends a new one.
pub(crate) fn upsert(labels: &mut Vec<GoldLabel>, label: GoldLabel) {
    match labels
        .iter_mut()
        .find(|g| g.task_id == label.task_id && g.item_key == label.item_key)
    {
        Some(existing) => {
            existing.label_index = label.label_index;
            existing.contributed_by = label.contributed_by;
        }
        None => labels.push(label),
    }
}

/// Storage the labeling pipeline reads from and writes to.
pub trait LabelingStore {
    /// Rules of a rule set, in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LabelError::Store`] for an unknown rule set.
    fn rules(&self, ruleset_id: &str) -> Result<Vec<Rule>>;

    /// Stores (replaces) the rules of a rule set.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be written.
    fn save_rules(&mut self, ruleset_id: &str, rules: &[Rule]) -> Result<()>;

    /// Gold labels of a task; empty if none were entered.
    ///
    /// # Errors
    ///
    /// Returns an error if the labels cannot be read.
    fn gold_labels(&self, task_id: &str) -> Result<Vec<GoldLabel>>;

    /// Inserts a gold label, replacing any label for the same item and task.
    ///
    /// # Errors
    ///
    /// Returns an error if the label cannot be written.
    fn upsert_gold_label(&mut self, label: GoldLabel) -> Result<()>;

    /// Persists a finished run.
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be written.
    fn save_result(&mut self, result: &LabelingResult) -> Result<()>;

    /// Results saved for a rule set, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if results cannot be read.
    fn results(&self, ruleset_id: &str) -> Result<Vec<LabelingResult>>;
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
