//! One labeling run, end to end.
//!
//! A [`RunContext`] holds what survives between runs of an interactive
//! session: the task, the active feature matrix, the selected rule set, the
//! history of finished runs and the last locally trained surrogate. Each call
//! to [`RunContext::run`] then
//!
//! 1. reads the rule set and gold labels from a [`crate::store::LabelingStore`],
//! 2. compiles, applies and reduces the rules with a [`crate::labeling::Labeler`],
//! 3. trains a surrogate on the aggregated labels (gold labels override them
//!    when configured),
//! 4. scores both stages and persists a [`LabelingResult`].
//!
//! Switching task or rule set clears the history and drops the cached
//! surrogate; swapping the feature matrix drops the surrogate only.

mod context;
mod properties;
mod result;

pub use context::RunContext;
pub use properties::{LabelModelProperties, ReductionMethod, SurrogateProperties};
pub use result::{
    ItemPrediction, LabelingResult, ModelProperties, RunDelta, RunOutput, RunScores,
};

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
