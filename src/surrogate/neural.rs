//! MLP surrogate trained on label distributions.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    class_label, classes_of, cross_validate, labeled_of, strata_of, SurrogateInput,
    SurrogateKind, SurrogateModel, Trained,
};
use crate::error::{LabelError, Result};
use crate::model_selection::DEFAULT_RANDOM_STATE;
use crate::nn::{Mlp, MlpConfig};
use crate::preprocessing::StandardScaler;
use crate::primitives::Matrix;
use crate::scoring::{FoldMetrics, FoldScores};
use crate::traits::Transformer;

/// Hyperparameters of [`NeuralSurrogate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    /// Network and optimiser settings.
    pub network: MlpConfig,
    /// Dropout-active forward passes averaged per prediction.
    pub mc_samples: usize,
    /// Fold shuffling seed.
    pub random_state: u64,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            network: MlpConfig::default(),
            mc_samples: 10,
            random_state: DEFAULT_RANDOM_STATE,
        }
    }
}

impl NeuralConfig {
    /// Sets the network configuration.
    #[must_use]
    pub fn with_network(mut self, network: MlpConfig) -> Self {
        self.network = network;
        self
    }

    /// Sets the Monte Carlo sample count.
    #[must_use]
    pub fn with_mc_samples(mut self, mc_samples: usize) -> Self {
        self.mc_samples = mc_samples;
        self
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    scaler: StandardScaler,
    mlp: Mlp,
}

impl Fitted {
    fn fit(config: &NeuralConfig, x: &Matrix<f32>, targets: &Matrix<f32>) -> Result<Self> {
        let mut scaler = StandardScaler::new();
        let z = scaler.fit_transform(x)?;
        let mut mlp = Mlp::new(z.n_cols(), targets.n_cols(), config.network.clone())?;
        mlp.fit(&z, targets)?;
        Ok(Self { scaler, mlp })
    }

    fn predict_proba(&self, config: &NeuralConfig, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let z = self.scaler.transform(x)?;
        self.mlp
            .predict_proba_mc(&z, config.mc_samples, config.network.seed)
    }
}

/// Multilayer perceptron trained with cross-entropy against the
/// aggregator's per-row label distribution.
///
/// Hard targets are one-hot encoded and rows labeled
/// [`crate::weak_supervision::ABSTAIN`] are held out but never fit or
/// scored; distributions are used for every row. Predictions average [`NeuralConfig::mc_samples`]
/// dropout-active passes before taking the arg-max.
#[derive(Debug, Clone, Default)]
pub struct NeuralSurrogate {
    config: NeuralConfig,
    state: Trained<Fitted>,
}

impl NeuralSurrogate {
    /// Creates an untrained model.
    #[must_use]
    pub fn new(config: NeuralConfig) -> Self {
        Self {
            config,
            state: Trained::default(),
        }
    }

    /// Hyperparameters.
    #[must_use]
    pub fn config(&self) -> &NeuralConfig {
        &self.config
    }

    /// Monte Carlo averaged class probabilities.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LabelError::InvalidState`] before training.
    pub fn predict_proba(&self, features: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.state.model()?.predict_proba(&self.config, features)
    }
}

impl SurrogateModel for NeuralSurrogate {
    fn kind(&self) -> SurrogateKind {
        SurrogateKind::Neural
    }

    fn train(&mut self, input: &SurrogateInput, folds: usize) -> Result<Vec<FoldMetrics>> {
        if let Some(metrics) = self.state.cached(input, folds) {
            return Ok(metrics);
        }
        self.config.network.validate()?;
        let labels = input.reference_labels();
        let labeled = input.labeled_rows();
        if labeled.is_empty() {
            return Err(LabelError::Training("every row is labeled ABSTAIN".to_string()));
        }
        let x = input.features();
        let targets = input.soft_targets();
        let config = &self.config;

        // every row is held out once; unlabeled rows are neither fit nor scored
        let rows: Vec<usize> = (0..input.n_rows()).collect();
        let metrics = cross_validate(
            &rows,
            &strata_of(&labels, input.n_classes()),
            folds,
            config.random_state,
            |train, test| {
                let train = labeled_of(&labels, train);
                let test = labeled_of(&labels, test);
                let model = Fitted::fit(config, &x.select_rows(&train), &targets.select_rows(&train))?;
                let probas = model.predict_proba(config, &x.select_rows(&test))?;
                FoldScores::evaluate(&classes_of(&labels, &test), &probas)
            },
        )?;

        let model = Fitted::fit(config, &x.select_rows(&labeled), &targets.select_rows(&labeled))?;
        info!(rows = labeled.len(), folds = metrics.len(), "neural surrogate trained");
        Ok(self.state.finish(input, folds, metrics, model))
    }

    fn predict(&self, features: &Matrix<f32>) -> Result<Vec<i32>> {
        Ok(self
            .predict_proba(features)?
            .argmax_rows()
            .into_iter()
            .map(class_label)
            .collect())
    }

    fn reference_labels(&self) -> Option<&[i32]> {
        self.state.reference()
    }
}
