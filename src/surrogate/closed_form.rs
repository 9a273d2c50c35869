//! Logistic regression surrogate on standardised features.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    class_label, classes_of, cross_validate, labeled_of, require_two_classes, strata_of,
    SurrogateInput, SurrogateKind, SurrogateModel, Trained,
};
use crate::classification::LogisticRegression;
use crate::error::{LabelError, Result};
use crate::model_selection::DEFAULT_RANDOM_STATE;
use crate::preprocessing::StandardScaler;
use crate::primitives::Matrix;
use crate::scoring::{FoldMetrics, FoldScores};
use crate::traits::{Classifier, Transformer};

/// Hyperparameters of [`ClosedFormSurrogate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosedFormConfig {
    /// Inverse regularisation strength.
    pub c: f32,
    /// Gradient descent step size.
    pub learning_rate: f32,
    /// Gradient descent iterations.
    pub max_iter: usize,
    /// Fold shuffling seed.
    pub random_state: u64,
}

impl Default for ClosedFormConfig {
    fn default() -> Self {
        Self {
            c: LogisticRegression::DEFAULT_C,
            learning_rate: 0.5,
            max_iter: 1000,
            random_state: DEFAULT_RANDOM_STATE,
        }
    }
}

impl ClosedFormConfig {
    /// Sets `C`.
    #[must_use]
    pub fn with_c(mut self, c: f32) -> Self {
        self.c = c;
        self
    }

    /// Sets the iteration budget.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the fold seed.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    scaler: StandardScaler,
    classifier: LogisticRegression,
}

impl Fitted {
    fn fit(config: &ClosedFormConfig, n_classes: usize, x: &Matrix<f32>, y: &[usize]) -> Result<Self> {
        require_two_classes(y)?;
        let mut scaler = StandardScaler::new();
        let z = scaler.fit_transform(x)?;
        let mut classifier = LogisticRegression::new(n_classes)
            .with_c(config.c)
            .with_learning_rate(config.learning_rate)
            .with_max_iter(config.max_iter);
        classifier.fit(&z, y)?;
        Ok(Self { scaler, classifier })
    }

    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.classifier.predict_proba(&self.scaler.transform(x)?)
    }
}

/// Multinomial logistic regression on standardised features, trained on
/// hard labels. Rows labeled [`crate::weak_supervision::ABSTAIN`] are held
/// out like any other row but never fit or scored.
///
/// # Examples
///
/// ```
/// use labelsmith::primitives::Matrix;
/// use labelsmith::surrogate::{ClosedFormConfig, ClosedFormSurrogate, SurrogateInput, SurrogateModel, Targets};
///
/// let x = Matrix::from_vec(4, 1, vec![-2.0, -1.0, 1.0, 2.0]).expect("4x1");
/// let input = SurrogateInput::new(x.clone(), Targets::Hard { labels: vec![0, 0, 1, 1] }, 2)
///     .expect("consistent input");
///
/// let mut model = ClosedFormSurrogate::new(ClosedFormConfig::default());
/// let folds = model.train(&input, 2).expect("trains");
/// assert_eq!(folds.len(), 2);
/// assert_eq!(model.predict(&x).expect("trained"), vec![0, 0, 1, 1]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClosedFormSurrogate {
    config: ClosedFormConfig,
    state: Trained<Fitted>,
}

impl ClosedFormSurrogate {
    /// Creates an untrained model.
    #[must_use]
    pub fn new(config: ClosedFormConfig) -> Self {
        Self {
            config,
            state: Trained::default(),
        }
    }

    /// Hyperparameters.
    #[must_use]
    pub fn config(&self) -> &ClosedFormConfig {
        &self.config
    }

    /// Class probabilities from the final model.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::InvalidState`] before training.
    pub fn predict_proba(&self, features: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.state.model()?.predict_proba(features)
    }
}

impl SurrogateModel for ClosedFormSurrogate {
    fn kind(&self) -> SurrogateKind {
        SurrogateKind::ClosedForm
    }

    fn train(&mut self, input: &SurrogateInput, folds: usize) -> Result<Vec<FoldMetrics>> {
        if let Some(metrics) = self.state.cached(input, folds) {
            return Ok(metrics);
        }
        let labels = input.reference_labels();
        let labeled = input.labeled_rows();
        if labeled.is_empty() {
            return Err(LabelError::Training("every row is labeled ABSTAIN".to_string()));
        }
        let x = input.features();
        let k = input.n_classes();
        let config = &self.config;

        // every row is held out once; unlabeled rows are neither fit nor scored
        let rows: Vec<usize> = (0..input.n_rows()).collect();
        let metrics = cross_validate(
            &rows,
            &strata_of(&labels, k),
            folds,
            config.random_state,
            |train, test| {
                let train = labeled_of(&labels, train);
                let test = labeled_of(&labels, test);
                let model = Fitted::fit(config, k, &x.select_rows(&train), &classes_of(&labels, &train))?;
                let probas = model.predict_proba(&x.select_rows(&test))?;
                FoldScores::evaluate(&classes_of(&labels, &test), &probas)
            },
        )?;

        let model = Fitted::fit(config, k, &x.select_rows(&labeled), &classes_of(&labels, &labeled))?;
        info!(rows = labeled.len(), folds = metrics.len(), "closed-form surrogate trained");
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
