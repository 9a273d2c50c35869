//! The persisted snapshot of a finished run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LabelModelProperties, SurrogateProperties};
use crate::labeling::{ExcludedRule, LFAnalysis};
use crate::scoring::{FoldMetrics, Score, ScoreDelta, TrainingScore};

/// Settings a run used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProperties {
    /// Label model stage.
    pub label_model: LabelModelProperties,
    /// Surrogate stage.
    pub surrogate: SurrogateProperties,
    /// Feature columns the surrogate was trained on.
    pub features: Vec<String>,
}

/// Labels of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPrediction {
    /// Item key.
    pub key: String,
    /// Aggregated label.
    pub label_model: i32,
    /// Surrogate training target (aggregated label, or gold when injected).
    pub target: i32,
    /// Surrogate prediction.
    pub surrogate: i32,
    /// Gold label, if entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold: Option<i32>,
}

/// Per-item and per-fold output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// One entry per item, in feature matrix order.
    pub predictions: Vec<ItemPrediction>,
    /// Cross-validation folds.
    pub folds: Vec<FoldMetrics>,
    /// Rules left out and why.
    pub excluded: Vec<ExcludedRule>,
    /// Labeling function diagnostics, with gold statistics when available.
    pub analysis: LFAnalysis,
}

/// Scores of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunScores {
    /// Aggregated labels against gold labels.
    pub label_model: Score,
    /// Surrogate predictions against gold labels.
    pub surrogate_gold: Score,
    /// Surrogate predictions against its own training targets.
    pub surrogate_reference: Score,
    /// Averaged cross-validation metrics.
    pub training: TrainingScore,
}

/// Change of every score between two runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDelta {
    /// Label model vs gold.
    pub label_model: ScoreDelta,
    /// Surrogate vs gold.
    pub surrogate_gold: ScoreDelta,
    /// Surrogate vs reference.
    pub surrogate_reference: ScoreDelta,
}

impl RunScores {
    /// Change from `previous` to `self`.
    #[must_use]
    pub fn delta(&self, previous: &RunScores) -> RunDelta {
        RunDelta {
            label_model: self.label_model.delta(&previous.label_model),
            surrogate_gold: self.surrogate_gold.delta(&previous.surrogate_gold),
            surrogate_reference: self.surrogate_reference.delta(&previous.surrogate_reference),
        }
    }
}

/// Immutable record of one labeling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelingResult {
    /// Result identifier.
    pub id: Uuid,
    /// Rule set applied.
    pub ruleset_id: String,
    /// Task labeled.
    pub task_id: String,
    /// Completion time.
    pub timestamp: DateTime<Utc>,
    /// Rules that became labeling functions, in column order.
    pub rule_set_used: Vec<String>,
    /// Settings.
    pub properties: ModelProperties,
    /// Labels and folds.
    pub output: RunOutput,
    /// Scores.
    pub scores: RunScores,
}

impl LabelingResult {
    /// Score changes since `previous`.
    #[must_use]
    pub fn delta(&self, previous: &LabelingResult) -> RunDelta {
        self.scores.delta(&previous.scores)
    }
}
