//! Previewing what a single rule matches before it joins a rule set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::FeatureMatrix;
use crate::error::Result;
use crate::rules::Rule;
use crate::weak_supervision::ABSTAIN;

use super::{LabelSet, LabelingFunction, RuleFunction};

/// Item keys grouped by the outcome a rule assigns them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePreview {
    /// Outcome (label index or [`ABSTAIN`]) to item keys, in row order.
    pub outcomes: BTreeMap<i32, Vec<String>>,
}

impl RulePreview {
    /// Keys assigned `label`.
    #[must_use]
    pub fn keys_for(&self, label: i32) -> &[String] {
        self.outcomes.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys the rule abstained on.
    #[must_use]
    pub fn abstained(&self) -> &[String] {
        self.keys_for(ABSTAIN)
    }

    /// Number of items that received a label.
    #[must_use]
    pub fn labeled_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(label, _)| **label != ABSTAIN)
            .map(|(_, keys)| keys.len())
            .sum()
    }
}

/// Runs one rule over every row of `matrix`.
///
/// # Errors
///
/// Returns the parse or compile error for an invalid rule, or
/// [`crate::LabelError::MissingFeature`] during evaluation.
pub fn preview_rule(rule: &Rule, matrix: &FeatureMatrix, labels: &LabelSet) -> Result<RulePreview> {
    let function = RuleFunction::compile(rule, labels, matrix)?;
    let mut preview = RulePreview::default();
    for (i, key) in matrix.keys().iter().enumerate() {
        let vote = function.apply(&matrix.row(i))?.to_i32();
        preview.outcomes.entry(vote).or_default().push(key.clone());
    }
    Ok(preview)
}
