//! Core compute primitives.
//!
//! Dense numeric storage shared by the classifiers and the feature matrix.

mod matrix;

pub use matrix::Matrix;
