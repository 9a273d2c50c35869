//! End-to-end weak supervision: an end model and per-function reliabilities
//! learned jointly from the label matrix.
//!
//! Each epoch alternates two steps:
//!
//! 1. Reliabilities: for every labeling function `j` and class `c`, the
//!    smoothed fraction of rows where `j` voted `c` and the end model also
//!    predicts `c`.
//! 2. End model: one epoch of training against soft targets built from the
//!    votes. A row's target is `softmax(s / temperature)` where `s[c]` sums
//!    the (square-rooted) reliabilities of the functions voting `c`. Rows
//!    without votes follow the end model's own prediction.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    class_label, classes_of, cross_validate, labeled_of, strata_of, SurrogateInput,
    SurrogateKind, SurrogateModel, Targets, Trained,
};
use crate::classification::softmax_in_place;
use crate::error::{LabelError, Result};
use crate::model_selection::DEFAULT_RANDOM_STATE;
use crate::nn::{Mlp, MlpConfig};
use crate::preprocessing::StandardScaler;
use crate::primitives::Matrix;
use crate::scoring::{FoldMetrics, FoldScores};
use crate::traits::Transformer;

/// Reliability every function starts from.
const INIT_RELIABILITY: f32 = 0.7;

/// Hyperparameters of [`EndToEndSurrogate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndToEndConfig {
    /// End model settings.
    pub network: MlpConfig,
    /// Softmax temperature applied to aggregated vote scores.
    pub temperature: f32,
    /// Weight votes by the square root of reliability instead of the
    /// reliability itself.
    pub sqrt_scaling: bool,
    /// Fold shuffling seed.
    pub random_state: u64,
}

impl Default for EndToEndConfig {
    fn default() -> Self {
        Self {
            network: MlpConfig {
                hidden: vec![10, 10, 5],
                dropout: 0.3,
                epochs: 100,
                ..MlpConfig::default()
            },
            temperature: 2.0,
            sqrt_scaling: true,
            random_state: DEFAULT_RANDOM_STATE,
        }
    }
}

impl EndToEndConfig {
    /// Sets the end model configuration.
    #[must_use]
    pub fn with_network(mut self, network: MlpConfig) -> Self {
        self.network = network;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn validate(&self) -> Result<()> {
        self.network.validate()?;
        if self.temperature.is_nan() || self.temperature <= 0.0 {
            return Err(LabelError::InvalidHyperparameter {
                param: "temperature".to_string(),
                value: self.temperature.to_string(),
                constraint: "> 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Soft targets from votes and `n_functions × n_classes` reliabilities.
/// Rows without votes copy `fallback`.
fn vote_targets(
    votes: &Matrix<i32>,
    reliability: &Matrix<f32>,
    config: &EndToEndConfig,
    fallback: &Matrix<f32>,
) -> Matrix<f32> {
    let k = reliability.n_cols();
    let mut out = Matrix::zeros(votes.n_rows(), k);
    for (i, row) in votes.iter_rows().enumerate() {
        let scores = out.row_mut(i);
        let mut voted = false;
        for (j, &vote) in row.iter().enumerate() {
            if let Ok(c) = usize::try_from(vote) {
                let r = reliability.get(j, c);
                scores[c] += if config.sqrt_scaling { r.sqrt() } else { r };
                voted = true;
            }
        }
        if voted {
            scores.iter_mut().for_each(|s| *s /= config.temperature);
            softmax_in_place(scores);
        } else {
            scores.copy_from_slice(fallback.row(i));
        }
    }
    out
}

/// Laplace-smoothed agreement of each function's votes with `predicted`.
fn reliabilities(votes: &Matrix<i32>, predicted: &[usize], n_classes: usize) -> Matrix<f32> {
    let mut agree = Matrix::zeros(votes.n_cols(), n_classes);
    let mut total = Matrix::zeros(votes.n_cols(), n_classes);
    for (row, &pred) in votes.iter_rows().zip(predicted) {
        for (j, &vote) in row.iter().enumerate() {
            if let Ok(c) = usize::try_from(vote) {
                total.set(j, c, total.get(j, c) + 1.0);
                if c == pred {
                    agree.set(j, c, agree.get(j, c) + 1.0);
                }
            }
        }
    }
    for (a, t) in agree.as_mut_slice().iter_mut().zip(total.as_slice()) {
        *a = (*a + 1.0) / (t + 2.0);
    }
    agree
}

#[derive(Debug, Clone)]
struct Fitted {
    scaler: StandardScaler,
    mlp: Mlp,
    reliability: Matrix<f32>,
}

impl Fitted {
    fn fit(config: &EndToEndConfig, n_classes: usize, x: &Matrix<f32>, votes: &Matrix<i32>) -> Result<Self> {
        let mut scaler = StandardScaler::new();
        let z = scaler.fit_transform(x)?;
        let mut mlp = Mlp::new(z.n_cols(), n_classes, config.network.clone())?;
        let mut rng = StdRng::seed_from_u64(config.network.seed.wrapping_add(1));
        let mut reliability = Matrix::filled(votes.n_cols(), n_classes, INIT_RELIABILITY);

        for epoch in 0..config.network.epochs {
            let probas = mlp.predict_proba(&z)?;
            if epoch > 0 {
                reliability = reliabilities(votes, &probas.argmax_rows(), n_classes);
            }
            let targets = vote_targets(votes, &reliability, config, &probas);
            let loss = mlp.train_epoch(&z, &targets, &mut rng)?;
            debug!(epoch, loss, "end-to-end epoch");
        }
        Ok(Self {
            scaler,
            mlp,
            reliability,
        })
    }

    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.mlp.predict_proba(&self.scaler.transform(x)?)
    }
}

/// End model trained from the full label matrix rather than a reduced
/// estimate. Gold labels enter through the label matrix itself: a gold row
/// has every vote set to its gold label before training.
///
/// Cross-validation (off by default, see
/// [`super::SurrogateConfig::default_folds`]) scores each fold against the
/// definitive labels of its held-out rows.
#[derive(Debug, Clone, Default)]
pub struct EndToEndSurrogate {
    config: EndToEndConfig,
    state: Trained<Fitted>,
}

impl EndToEndSurrogate {
    /// Creates an untrained model.
    #[must_use]
    pub fn new(config: EndToEndConfig) -> Self {
        Self {
            config,
            state: Trained::default(),
        }
    }

    /// Hyperparameters.
    #[must_use]
    pub fn config(&self) -> &EndToEndConfig {
        &self.config
    }

    /// Learned `n_functions × n_classes` reliabilities of the final model.
    #[must_use]
    pub fn reliabilities(&self) -> Option<&Matrix<f32>> {
        self.state.model().ok().map(|m| &m.reliability)
    }

    /// End model class probabilities.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::InvalidState`] before training.
    pub fn predict_proba(&self, features: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.state.model()?.predict_proba(features)
    }
}

impl SurrogateModel for EndToEndSurrogate {
    fn kind(&self) -> SurrogateKind {
        SurrogateKind::EndToEnd
    }

    fn train(&mut self, input: &SurrogateInput, folds: usize) -> Result<Vec<FoldMetrics>> {
        if let Some(metrics) = self.state.cached(input, folds) {
            return Ok(metrics);
        }
        self.config.validate()?;
        let Targets::Votes { votes, labels } = input.targets() else {
            return Err(LabelError::Training(
                "end-to-end training needs the full label matrix".to_string(),
            ));
        };
        let x = input.features();
        let k = input.n_classes();
        let config = &self.config;

        // unlabeled rows form their own stratum
        let rows: Vec<usize> = (0..input.n_rows()).collect();
        let strata = strata_of(labels, k);

        let metrics = cross_validate(&rows, &strata, folds, config.random_state, |train, test| {
            let model = Fitted::fit(config, k, &x.select_rows(train), &votes.select_rows(train))?;
            let scored = labeled_of(labels, test);
            let probas = model.predict_proba(&x.select_rows(&scored))?;
            FoldScores::evaluate(&classes_of(labels, &scored), &probas)
        })?;

        let model = Fitted::fit(config, k, x, votes)?;
        info!(rows = rows.len(), folds = metrics.len(), "end-to-end surrogate trained");
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
