//! Multilayer perceptron classifier trained on soft targets.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dropout::{apply_mask, Dropout};
use super::linear::{Linear, LinearGrads};
use super::loss::{soft_cross_entropy, soft_cross_entropy_grad, softmax_rows};
use super::optim::Adam;
use crate::error::{LabelError, Result};
use crate::primitives::Matrix;
use crate::traits::Classifier;

/// Architecture and training hyperparameters of an [`Mlp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    /// Hidden layer widths, input side first.
    pub hidden: Vec<usize>,
    /// Dropout probability after each hidden layer.
    pub dropout: f32,
    /// Adam learning rate.
    pub learning_rate: f32,
    /// Minibatch size.
    pub batch_size: usize,
    /// Passes over the training set.
    pub epochs: usize,
    /// Seed for initialization, shuffling and dropout.
    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden: vec![128, 64],
            dropout: 0.1,
            learning_rate: 1e-3,
            batch_size: 64,
            epochs: 15,
            seed: 0,
        }
    }
}

impl MlpConfig {
    /// Sets the hidden layer widths.
    #[must_use]
    pub fn with_hidden(mut self, hidden: Vec<usize>) -> Self {
        self.hidden = hidden;
        self
    }

    /// Sets the dropout probability.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    /// Sets the learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets the minibatch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the number of epochs.
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

    /// Checks the hyperparameters.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::InvalidHyperparameter`] for a zero-width hidden
    /// layer, a zero batch size, a dropout outside `[0, 1)` or a
    /// non-positive learning rate.
    pub fn validate(&self) -> Result<()> {
        let invalid = |param: &str, value: String, constraint: &str| LabelError::InvalidHyperparameter {
            param: param.to_string(),
            value,
            constraint: constraint.to_string(),
        };
        if self.hidden.contains(&0) {
            return Err(invalid("hidden", format!("{:?}", self.hidden), "all widths > 0"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "0".to_string(), "> 0"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(invalid("dropout", self.dropout.to_string(), "in [0, 1)"));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(invalid("learning_rate", self.learning_rate.to_string(), "> 0"));
        }
        Ok(())
    }
}

struct Trace {
    /// Input of each layer (post-dropout activations for hidden layers).
    inputs: Vec<Matrix<f32>>,
    /// Pre-activation of each hidden layer.
    pre_activations: Vec<Matrix<f32>>,
    masks: Vec<Option<Matrix<f32>>>,
    probas: Matrix<f32>,
}

/// Feed-forward network: `Linear → ReLU → Dropout` per hidden layer, then a
/// linear output layer with softmax.
///
/// # Examples
///
/// ```
/// use labelsmith::nn::{Mlp, MlpConfig};
/// use labelsmith::primitives::Matrix;
///
/// let x = Matrix::from_vec(4, 1, vec![-2.0, -1.0, 1.0, 2.0]).expect("4x1");
/// let targets = Matrix::from_vec(4, 2, vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0]).expect("4x2");
///
/// let config = MlpConfig::default()
///     .with_hidden(vec![8])
///     .with_dropout(0.0)
///     .with_learning_rate(0.05)
///     .with_epochs(200);
/// let mut mlp = Mlp::new(1, 2, config).expect("valid config");
/// mlp.fit(&x, &targets).expect("shapes agree");
/// assert_eq!(mlp.predict_proba(&x).expect("fitted").argmax_rows(), vec![0, 0, 1, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    layers: Vec<Linear>,
    dropout: Dropout,
    optimizer: Adam,
    config: MlpConfig,
    n_classes: usize,
    epochs_run: usize,
}

impl Mlp {
    /// Creates a network for `n_features` inputs and `n_classes` outputs.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration, fewer than two
    /// classes or zero input features.
    pub fn new(n_features: usize, n_classes: usize, config: MlpConfig) -> Result<Self> {
        config.validate()?;
        if n_classes < 2 || n_features == 0 {
            return Err(LabelError::InvalidHyperparameter {
                param: "shape".to_string(),
                value: format!("{n_features} features, {n_classes} classes"),
                constraint: ">= 1 feature and >= 2 classes".to_string(),
            });
        }
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut widths = vec![n_features];
        widths.extend_from_slice(&config.hidden);
        widths.push(n_classes);
        let layers = widths
            .windows(2)
            .map(|w| Linear::new(w[0], w[1], &mut rng))
            .collect();
        Ok(Self {
            layers,
            dropout: Dropout::new(config.dropout),
            optimizer: Adam::new(config.learning_rate),
            config,
            n_classes,
            epochs_run: 0,
        })
    }

    /// Number of input features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.layers.first().map_or(0, Linear::in_features)
    }

    /// Hyperparameters.
    #[must_use]
    pub fn config(&self) -> &MlpConfig {
        &self.config
    }

    /// Epochs trained so far.
    #[must_use]
    pub fn epochs_run(&self) -> usize {
        self.epochs_run
    }

    fn check_input(&self, x: &Matrix<f32>) -> Result<()> {
        if x.n_cols() != self.n_features() {
            return Err(LabelError::DimensionMismatch {
                expected: format!("{} features", self.n_features()),
                actual: format!("{} features", x.n_cols()),
            });
        }
        Ok(())
    }

    fn check_targets(&self, x: &Matrix<f32>, targets: &Matrix<f32>) -> Result<()> {
        self.check_input(x)?;
        if targets.shape() != (x.n_rows(), self.n_classes) {
            return Err(LabelError::DimensionMismatch {
                expected: format!("{} x {} targets", x.n_rows(), self.n_classes),
                actual: format!("{} x {} targets", targets.n_rows(), targets.n_cols()),
            });
        }
        if x.n_rows() == 0 {
            return Err(LabelError::Training("cannot train on zero rows".to_string()));
        }
        Ok(())
    }

    fn forward(&self, x: &Matrix<f32>, mut rng: Option<&mut StdRng>) -> Trace {
        let (output, hidden) = self
            .layers
            .split_last()
            .map_or((None, &self.layers[..]), |(o, h)| (Some(o), h));
        let mut trace = Trace {
            inputs: Vec::with_capacity(self.layers.len()),
            pre_activations: Vec::with_capacity(hidden.len()),
            masks: Vec::with_capacity(hidden.len()),
            probas: Matrix::zeros(x.n_rows(), self.n_classes),
        };

        let mut h = x.clone();
        for layer in hidden {
            let z = layer.forward(&h);
            let mut a = z.clone();
            a.as_mut_slice().iter_mut().for_each(|v| *v = v.max(0.0));
            let mask = rng
                .as_deref_mut()
                .and_then(|r| self.dropout.sample_mask(a.n_rows(), a.n_cols(), r));
            if let Some(m) = &mask {
                apply_mask(&mut a, m);
            }
            trace.inputs.push(h);
            trace.pre_activations.push(z);
            trace.masks.push(mask);
            h = a;
        }
        if let Some(layer) = output {
            trace.probas = softmax_rows(&layer.forward(&h));
        }
        trace.inputs.push(h);
        trace
    }

    fn train_batch(&mut self, x: &Matrix<f32>, targets: &Matrix<f32>, rng: &mut StdRng) -> f32 {
        let trace = self.forward(x, Some(rng));
        let loss = soft_cross_entropy(&trace.probas, targets);

        let mut grad = soft_cross_entropy_grad(&trace.probas, targets);
        let mut grads: Vec<LinearGrads> = Vec::with_capacity(self.layers.len());
        for l in (0..self.layers.len()).rev() {
            let (grad_in, g) = self.layers[l].backward(&trace.inputs[l], &grad);
            grads.push(g);
            if l > 0 {
                grad = grad_in;
                if let Some(m) = &trace.masks[l - 1] {
                    apply_mask(&mut grad, m);
                }
                for (g, z) in grad
                    .as_mut_slice()
                    .iter_mut()
                    .zip(trace.pre_activations[l - 1].as_slice())
                {
                    if *z <= 0.0 {
                        *g = 0.0;
                    }
                }
            }
        }
        grads.reverse();

        self.optimizer.step();
        for (l, (layer, g)) in self.layers.iter_mut().zip(&grads).enumerate() {
            self.optimizer
                .update(2 * l, layer.weight.as_mut_slice(), g.weight.as_slice());
            self.optimizer.update(2 * l + 1, &mut layer.bias, &g.bias);
        }
        loss
    }

    /// Runs one epoch of shuffled minibatch training; returns the mean loss.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` and `targets` disagree with the network shape.
    pub fn train_epoch(&mut self, x: &Matrix<f32>, targets: &Matrix<f32>, rng: &mut StdRng) -> Result<f32> {
        self.check_targets(x, targets)?;
        let mut order: Vec<usize> = (0..x.n_rows()).collect();
        order.shuffle(rng);

        let mut total = 0.0;
        for batch in order.chunks(self.config.batch_size) {
            let xb = x.select_rows(batch);
            let tb = targets.select_rows(batch);
            total += self.train_batch(&xb, &tb, rng) * batch.len() as f32;
        }
        self.epochs_run += 1;
        Ok(total / x.n_rows() as f32)
    }

    /// Trains for the configured number of epochs against soft targets
    /// (one probability row per sample). Returns the loss of each epoch.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` and `targets` disagree with the network shape.
    pub fn fit(&mut self, x: &Matrix<f32>, targets: &Matrix<f32>) -> Result<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(1));
        let mut losses = Vec::with_capacity(self.config.epochs);
        for epoch in 0..self.config.epochs {
            let loss = self.train_epoch(x, targets, &mut rng)?;
            debug!(epoch, loss, "mlp epoch");
            losses.push(loss);
        }
        Ok(losses)
    }

    /// Deterministic class probabilities with dropout disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong number of features.
    pub fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.check_input(x)?;
        Ok(self.forward(x, None).probas)
    }

    /// Monte Carlo dropout: the mean of `passes` dropout-active forward
    /// passes. With `passes == 0` this is [`Mlp::predict_proba`].
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong number of features.
    pub fn predict_proba_mc(&self, x: &Matrix<f32>, passes: usize, seed: u64) -> Result<Matrix<f32>> {
        if passes == 0 {
            return self.predict_proba(x);
        }
        self.check_input(x)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut mean = Matrix::zeros(x.n_rows(), self.n_classes);
        for _ in 0..passes {
            let probas = self.forward(x, Some(&mut rng)).probas;
            for (m, p) in mean.as_mut_slice().iter_mut().zip(probas.as_slice()) {
                *m += p / passes as f32;
            }
        }
        Ok(mean)
    }
}

/// One-hot encoding of hard targets.
///
/// # Errors
///
/// Returns [`LabelError::Training`] for a target outside `0..n_classes`.
pub fn one_hot(y: &[usize], n_classes: usize) -> Result<Matrix<f32>> {
    let mut out = Matrix::zeros(y.len(), n_classes);
    for (i, &label) in y.iter().enumerate() {
        if label >= n_classes {
            return Err(LabelError::Training(format!(
                "target {label} outside 0..{n_classes}"
            )));
        }
        out.set(i, label, 1.0);
    }
    Ok(out)
}

impl Classifier for Mlp {
    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        let targets = one_hot(y, self.n_classes)?;
        Mlp::fit(self, x, &targets).map(|_| ())
    }

    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        Mlp::predict_proba(self, x)
    }
}

#[cfg(test)]
#[path = "mlp_tests.rs"]
mod tests;
