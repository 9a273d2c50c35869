//! Hyperparameters of the label model and surrogate stages of a run.

use serde::{Deserialize, Serialize};

use crate::surrogate::SurrogateConfig;
use crate::weak_supervision::TieBreakPolicy;

/// How the label matrix is reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionMethod {
    /// Plurality of non-abstaining votes.
    Majority,
    /// Generative label model fit on the label matrix.
    #[default]
    LabelModel,
}

/// Label model stage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelModelProperties {
    /// Reducer.
    pub method: ReductionMethod,
    /// Label model fit epochs.
    pub epochs: usize,
    /// Seed for fitting and tie-breaking.
    pub seed: u64,
    /// Tie-break policy for hard labels.
    pub tie_break: TieBreakPolicy,
    /// Restrict the run to these rule identifiers.
    pub selection: Option<Vec<String>>,
}

impl Default for LabelModelProperties {
    fn default() -> Self {
        Self {
            method: ReductionMethod::default(),
            epochs: 500,
            seed: 123,
            tie_break: TieBreakPolicy::Abstain,
            selection: None,
        }
    }
}

impl LabelModelProperties {
    /// Sets the reducer.
    #[must_use]
    pub fn with_method(mut self, method: ReductionMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the fit epochs.
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the tie-break policy.
    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreakPolicy) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Restricts the run to the listed rules.
    #[must_use]
    pub fn with_selection(mut self, selection: Vec<String>) -> Self {
        self.selection = Some(selection);
        self
    }
}

/// Surrogate stage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurrogateProperties {
    /// Variant and hyperparameters.
    pub model: SurrogateConfig,
    /// Fold count; `None` uses the variant default.
    pub folds: Option<usize>,
    /// Train on the features the rules reference instead of every column.
    pub only_label_model_features: bool,
    /// Override aggregated labels with gold labels in the training targets.
    pub include_gold: bool,
    /// Train on the remote worker.
    pub remote: bool,
}

impl Default for SurrogateProperties {
    fn default() -> Self {
        Self {
            model: SurrogateConfig::default(),
            folds: None,
            only_label_model_features: true,
            include_gold: false,
            remote: false,
        }
    }
}

impl SurrogateProperties {
    /// Sets the variant.
    #[must_use]
    pub fn with_model(mut self, model: SurrogateConfig) -> Self {
        self.model = model;
        self
    }

    /// Sets the fold count.
    #[must_use]
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = Some(folds);
        self
    }

    /// Sets gold label injection.
    #[must_use]
    pub fn with_include_gold(mut self, include_gold: bool) -> Self {
        self.include_gold = include_gold;
        self
    }

    /// Sets the feature scope.
    #[must_use]
    pub fn with_only_label_model_features(mut self, only: bool) -> Self {
        self.only_label_model_features = only;
        self
    }

    /// Sets remote training.
    #[must_use]
    pub fn with_remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    /// Effective fold count.
    #[must_use]
    pub fn folds(&self) -> usize {
        self.folds.unwrap_or_else(|| self.model.default_folds())
    }
}
