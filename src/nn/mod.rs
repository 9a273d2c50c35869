//! Small neural networks for surrogate models.
//!
//! Forward and backward passes are written out explicitly for the one
//! architecture the surrogates need:
//!
//! - [`Linear`]: fully connected layer
//! - [`Dropout`]: inverted dropout, also used for Monte Carlo prediction
//! - [`Adam`]: optimizer over flat parameter slices
//! - [`Mlp`]: `Linear → ReLU → Dropout` stack with a softmax head, trained
//!   with cross-entropy against soft targets
//!
//! # References
//!
//! - Gal, Y., & Ghahramani, Z. (2016). Dropout as a Bayesian approximation.
//!   ICML.
//! - He, K., et al. (2015). Delving deep into rectifiers. ICCV.

mod dropout;
mod init;
mod linear;
pub mod loss;
mod mlp;
pub mod optim;

pub use dropout::Dropout;
pub use init::kaiming_uniform;
pub use linear::{Linear, LinearGrads};
pub use mlp::{one_hot, Mlp, MlpConfig};
pub use optim::Adam;
