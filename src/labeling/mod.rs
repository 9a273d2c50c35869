//! Turning rules into labeling functions and applying them.
//!
//! - [`LabelSet`]: ordered task labels and their code names
//! - [`RuleFunction`]: a rule compiled into a [`LabelingFunction`]
//! - [`LabelMatrix`]: votes of every function on every item
//! - [`LFAnalysis`]: coverage / overlap / conflict diagnostics
//! - [`Labeler`]: the aggregation state machine
//! - [`preview_rule`]: per-outcome item keys for a single rule

mod analysis;
mod function;
mod label_set;
mod labeler;
mod matrix;
mod preview;

pub use analysis::{LFAnalysis, LFSummary};
pub use function::{LabelingFunction, RuleFunction};
pub use label_set::{display_label, make_code_label, LabelSet, ABSTAIN_CODE};
pub use labeler::{ExcludedRule, Labeler, LabelerState, MIN_LABELING_FUNCTIONS};
pub use matrix::LabelMatrix;
pub use preview::{preview_rule, RulePreview};

#[cfg(test)]
#[path = "labeling_tests.rs"]
mod tests;
