//! Wire messages.

use serde::{Deserialize, Serialize};

use crate::primitives::Matrix;
use crate::scoring::FoldMetrics;
use crate::surrogate::{SurrogateConfig, SurrogateInput, SurrogateKind};

/// A call to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Request {
    /// Creates the model for a variant configuration.
    Init {
        /// Variant and hyperparameters.
        config: SurrogateConfig,
    },
    /// Cross-validates and trains the model.
    Apply {
        /// Features and targets.
        input: SurrogateInput,
        /// Fold count.
        folds: usize,
    },
    /// Labels rows with the trained model.
    Predict {
        /// Rows to label.
        features: Matrix<f32>,
    },
    /// Drops the model.
    Restart,
}

impl Request {
    /// Method name as sent on the wire.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Apply { .. } => "apply",
            Self::Predict { .. } => "predict",
            Self::Restart => "restart",
        }
    }
}

/// The worker's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Response {
    /// A new model was created.
    Initialized {
        /// Its variant.
        kind: SurrogateKind,
    },
    /// A model with the same configuration was already present.
    AlreadyInitialized {
        /// Its variant.
        kind: SurrogateKind,
    },
    /// Training finished.
    Trained {
        /// Per-fold metrics.
        folds: Vec<FoldMetrics>,
    },
    /// Prediction finished.
    Predicted {
        /// One label per row.
        labels: Vec<i32>,
    },
    /// The model was dropped.
    Cleared,
    /// The call failed.
    Error {
        /// Error text.
        message: String,
    },
}
