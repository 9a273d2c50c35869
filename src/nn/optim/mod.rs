//! Optimizers over flat parameter slices.
//!
//! # References
//!
//! - Kingma, D. P., & Ba, J. (2015). Adam: A method for stochastic optimization. ICLR.

use serde::{Deserialize, Serialize};

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPS: f32 = 1e-8;

/// Moment estimates of one parameter slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Moments {
    first: Vec<f32>,
    second: Vec<f32>,
}

/// Adam optimizer with β₁=0.9, β₂=0.999, ε=1e-8.
///
/// Parameter slices are addressed by slot: the slice passed to
/// [`Adam::update`] under slot `idx` keeps its own moments across steps.
///
/// ```text
/// m = β₁·m + (1-β₁)·g
/// v = β₂·v + (1-β₂)·g²
/// param -= lr · m̂ / (√v̂ + ε)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    lr: f32,
    slots: Vec<Moments>,
    pub(crate) t: usize,
}

impl Adam {
    /// Creates an optimizer with learning rate `lr`.
    #[must_use]
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            slots: Vec::new(),
            t: 0,
        }
    }

    /// Learning rate.
    #[must_use]
    pub fn lr(&self) -> f32 {
        self.lr
    }

    /// Starts a new optimization step; call once before the step's updates.
    pub fn step(&mut self) {
        self.t += 1;
    }

    /// Updates slot `idx` with its gradient.
    ///
    /// # Panics
    ///
    /// Panics if `param` and `grad` lengths differ.
    pub fn update(&mut self, idx: usize, param: &mut [f32], grad: &[f32]) {
        assert_eq!(param.len(), grad.len(), "parameter and gradient lengths");
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, Moments::default);
        }
        let slot = &mut self.slots[idx];
        if slot.first.len() != param.len() {
            slot.first = vec![0.0; param.len()];
            slot.second = vec![0.0; param.len()];
        }

        let t = i32::try_from(self.t.max(1)).unwrap_or(i32::MAX);
        let correct1 = 1.0 - BETA1.powi(t);
        let correct2 = 1.0 - BETA2.powi(t);
        let moments = slot.first.iter_mut().zip(slot.second.iter_mut());
        for ((p, &g), (m, v)) in param.iter_mut().zip(grad).zip(moments) {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            *p -= self.lr * (*m / correct1) / ((*v / correct2).sqrt() + EPS);
        }
    }
}
