//! Ordered label names of a labeling task.

use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};
use crate::weak_supervision::ABSTAIN;

/// Code name reserved for [`ABSTAIN`] in free-form rules.
pub const ABSTAIN_CODE: &str = "ABSTAIN";

/// Code form of a label name: upper case, spaces replaced by underscores.
///
/// ```
/// use labelsmith::labeling::make_code_label;
///
/// assert_eq!(make_code_label("high noise"), "HIGH_NOISE");
/// ```
#[must_use]
pub fn make_code_label(label: &str) -> String {
    label.to_uppercase().replace(' ', "_")
}

/// Display form of a label name: underscores become spaces, words are
/// capitalised.
///
/// ```
/// use labelsmith::labeling::display_label;
///
/// assert_eq!(display_label("HIGH_NOISE"), "High Noise");
/// ```
#[must_use]
pub fn display_label(label: &str) -> String {
    label
        .replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The ordered labels of a task. Position `i` is label index `i`.
///
/// # Examples
///
/// ```
/// use labelsmith::labeling::LabelSet;
///
/// let labels = LabelSet::new(["normal", "high noise"]).expect("two distinct labels");
/// assert_eq!(labels.cardinality(), 2);
/// assert_eq!(labels.index_of_code("HIGH_NOISE"), Some(1));
/// assert_eq!(labels.index_of_code("ABSTAIN"), Some(-1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Creates a label set.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two labels are given, a label is empty,
    /// two labels share a code name, or a label's code name is `ABSTAIN`.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.len() < 2 {
            return Err(LabelError::InvalidHyperparameter {
                param: "labels".to_string(),
                value: labels.len().to_string(),
                constraint: "at least 2 labels".to_string(),
            });
        }
        let mut codes: Vec<String> = Vec::with_capacity(labels.len());
        for label in &labels {
            let code = make_code_label(label.trim());
            if code.is_empty() {
                return Err("Label names cannot be empty".into());
            }
            if code == ABSTAIN_CODE {
                return Err(format!("Label '{label}' collides with the reserved ABSTAIN label").into());
            }
            if codes.contains(&code) {
                return Err(format!("Duplicate label '{label}'").into());
            }
            codes.push(code);
        }
        Ok(Self { labels })
    }

    /// Number of labels.
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.labels.len()
    }

    /// Label names in index order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Name of label `index`; `None` for [`ABSTAIN`] and out-of-range values.
    #[must_use]
    pub fn name(&self, index: i32) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
    }

    /// Display form of `index`, `"Abstain"` for [`ABSTAIN`].
    #[must_use]
    pub fn display(&self, index: i32) -> String {
        if index == ABSTAIN {
            return display_label(ABSTAIN_CODE);
        }
        self.name(index).map_or_else(|| index.to_string(), display_label)
    }

    /// Resolves a code name (or `ABSTAIN`) to its index.
    #[must_use]
    pub fn index_of_code(&self, code: &str) -> Option<i32> {
        if code == ABSTAIN_CODE {
            return Some(ABSTAIN);
        }
        self.labels
            .iter()
            .position(|l| make_code_label(l.trim()) == code)
            .and_then(|i| i32::try_from(i).ok())
    }

    /// Code names in index order.
    #[must_use]
    pub fn code_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| make_code_label(l.trim())).collect()
    }

    /// True for [`ABSTAIN`] and every valid label index.
    #[must_use]
    pub fn is_valid_outcome(&self, index: i32) -> bool {
        index == ABSTAIN || self.name(index).is_some()
    }
}

impl TryFrom<Vec<String>> for LabelSet {
    type Error = LabelError;

    fn try_from(labels: Vec<String>) -> Result<Self> {
        Self::new(labels)
    }
}

impl From<LabelSet> for Vec<String> {
    fn from(set: LabelSet) -> Self {
        set.labels
    }
}
