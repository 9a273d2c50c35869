//! Core traits for the classifiers and transformers behind surrogate models.
//!
//! These traits define the API contracts the surrogate variants train
//! through; every implementation works on dense `f32` feature matrices.

use crate::error::Result;
use crate::primitives::Matrix;

/// Supervised multi-class classifier with a fixed number of classes.
///
/// The class count is fixed at construction so that a training split
/// missing some class still produces probabilities over every label.
pub trait Classifier {
    /// Number of classes the classifier distributes probability over.
    fn n_classes(&self) -> usize;

    /// Fits the classifier to hard targets in `0..n_classes`.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (dimension mismatch, empty input,
    /// target out of range).
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()>;

    /// Per-row class probabilities (`n_samples × n_classes`).
    ///
    /// # Errors
    ///
    /// Returns an error if the classifier is not fitted or the feature count
    /// differs from training.
    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>>;

    /// Arg-max class per row.
    ///
    /// # Errors
    ///
    /// Propagates [`Classifier::predict_proba`] errors.
    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        Ok(self.predict_proba(x)?.argmax_rows())
    }
}

/// Trait for data transformers (scalers).
///
/// ```
/// use labelsmith::preprocessing::StandardScaler;
/// use labelsmith::primitives::Matrix;
/// use labelsmith::traits::Transformer;
///
/// let x = Matrix::from_vec(2, 1, vec![1.0, 3.0]).expect("2x1");
/// let mut scaler = StandardScaler::new();
/// let z = scaler.fit_transform(&x).expect("non-empty input");
/// assert_eq!(z.as_slice(), &[-1.0, 1.0]);
/// ```
pub trait Transformer {
    /// Fits the transformer to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Transforms data using fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if transformer is not fitted.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>>;

    /// Fits and transforms in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit_transform(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LabelError;

    // Always predicts the class seen most in training.
    struct MockClassifier {
        n_classes: usize,
        majority: Option<usize>,
    }

    impl Classifier for MockClassifier {
        fn n_classes(&self) -> usize {
            self.n_classes
        }

        fn fit(&mut self, _x: &Matrix<f32>, y: &[usize]) -> Result<()> {
            let mut counts = vec![0usize; self.n_classes];
            for &label in y {
                counts[label] += 1;
            }
            self.majority = counts
                .iter()
                .enumerate()
                .max_by_key(|&(i, c)| (*c, std::cmp::Reverse(i)))
                .map(|(i, _)| i);
            Ok(())
        }

        fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
            let majority = self
                .majority
                .ok_or_else(|| LabelError::from("MockClassifier not fitted"))?;
            let mut out = Matrix::zeros(x.n_rows(), self.n_classes);
            for i in 0..x.n_rows() {
                out.set(i, majority, 1.0);
            }
            Ok(out)
        }
    }

    #[test]
    fn test_classifier_predict_default_uses_argmax() {
        let mut clf = MockClassifier {
            n_classes: 3,
            majority: None,
        };
        let x = Matrix::from_vec(3, 1, vec![0.0, 1.0, 2.0]).expect("3x1");
        assert!(clf.predict(&x).is_err());

        clf.fit(&x, &[2, 2, 0]).expect("fits");
        assert_eq!(clf.predict(&x).expect("fitted"), vec![2, 2, 2]);
    }

    struct Doubler;

    impl Transformer for Doubler {
        fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
            if x.n_rows() == 0 {
                return Err(LabelError::DimensionMismatch {
                    expected: "non-empty matrix".to_string(),
                    actual: "empty matrix (0 rows)".to_string(),
                });
            }
            Ok(())
        }

        fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
            let data = x.as_slice().iter().map(|v| v * 2.0).collect();
            Matrix::from_vec(x.n_rows(), x.n_cols(), data).map_err(Into::into)
        }
    }

    #[test]
    fn test_transformer_fit_transform_default() {
        let x = Matrix::from_vec(1, 2, vec![1.0, 2.0]).expect("1x2");
        let out = Doubler.fit_transform(&x).expect("fits");
        assert_eq!(out.as_slice(), &[2.0, 4.0]);

        let empty = Matrix::from_vec(0, 2, Vec::new()).expect("0x2");
        assert!(Doubler.fit_transform(&empty).is_err());
    }
}
