//! Plurality vote over non-abstaining labeling functions.

use serde::{Deserialize, Serialize};

use super::{check_votes, LabelVoter, ABSTAIN};
use crate::error::Result;
use crate::primitives::Matrix;

/// Majority voter.
///
/// Probabilities are vote fractions among the functions that did not
/// abstain; a row where every function abstains gets a uniform distribution
/// and therefore falls to the tie-break policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MajorityLabelVoter {
    cardinality: usize,
}

impl MajorityLabelVoter {
    /// Creates a voter over `cardinality` classes.
    #[must_use]
    pub fn new(cardinality: usize) -> Self {
        Self { cardinality }
    }
}

impl LabelVoter for MajorityLabelVoter {
    fn cardinality(&self) -> usize {
        self.cardinality
    }

    fn predict_proba(&self, votes: &Matrix<i32>) -> Result<Matrix<f32>> {
        check_votes(votes, self.cardinality)?;
        let k = self.cardinality;
        let mut probs = Matrix::zeros(votes.n_rows(), k);
        for (i, row) in votes.iter_rows().enumerate() {
            let out = probs.row_mut(i);
            let mut cast = 0usize;
            for &v in row.iter().filter(|&&v| v != ABSTAIN) {
                out[v as usize] += 1.0;
                cast += 1;
            }
            if cast == 0 {
                out.fill(1.0 / k as f32);
            } else {
                out.iter_mut().for_each(|p| *p /= cast as f32);
            }
        }
        Ok(probs)
    }
}
