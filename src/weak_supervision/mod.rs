//! Weak supervision: reducing a label matrix to one label per item.
//!
//! A label matrix holds one row per item and one column per labeling
//! function; each cell is a label index or [`ABSTAIN`]. Two reducers are
//! provided:
//!
//! - [`MajorityLabelVoter`]: plurality of non-abstaining votes.
//! - [`LabelModel`]: a class-conditional noise model fit by
//!   expectation-maximisation from the label matrix alone.
//!
//! Both produce per-row probability distributions; hard labels are derived
//! from them by [`probs_to_preds`] under a [`TieBreakPolicy`].
//!
//! # Examples
//!
//! ```
//! use labelsmith::primitives::Matrix;
//! use labelsmith::weak_supervision::{LabelVoter, MajorityLabelVoter, TieBreakPolicy, ABSTAIN};
//!
//! let votes = Matrix::from_vec(2, 3, vec![0, 0, 1, ABSTAIN, ABSTAIN, ABSTAIN])
//!     .expect("2x3 votes");
//! let voter = MajorityLabelVoter::new(2);
//! let preds = voter.predict(&votes, TieBreakPolicy::Abstain, None).expect("valid votes");
//! assert_eq!(preds, vec![0, ABSTAIN]);
//! ```

mod label_model;
mod majority;

pub use label_model::LabelModel;
pub use majority::MajorityLabelVoter;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};
use crate::primitives::Matrix;

/// Vote value meaning "no opinion".
pub const ABSTAIN: i32 = -1;

/// Probabilities closer than this to the row maximum count as tied.
pub const TIE_TOLERANCE: f32 = 1e-5;

/// Output of a labeling function for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LFOutput {
    /// No opinion.
    Abstain,
    /// Vote for a label index.
    Label(usize),
}

impl LFOutput {
    /// Encoded vote (`-1` for abstain).
    #[must_use]
    pub fn to_i32(self) -> i32 {
        match self {
            Self::Abstain => ABSTAIN,
            Self::Label(l) => i32::try_from(l).unwrap_or(i32::MAX),
        }
    }

    /// Decodes a vote; any negative value is an abstain.
    #[must_use]
    pub fn from_i32(value: i32) -> Self {
        usize::try_from(value).map_or(Self::Abstain, Self::Label)
    }

    /// Returns true for [`LFOutput::Abstain`].
    #[must_use]
    pub fn is_abstain(self) -> bool {
        matches!(self, Self::Abstain)
    }
}

/// How a row whose top probability is shared by several classes is labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    /// Tied rows are labeled [`ABSTAIN`].
    #[default]
    Abstain,
    /// Deterministic pseudo-random choice among the tied classes, derived
    /// from the row index and seed.
    Random,
    /// Uniform random label over the full cardinality.
    TrueRandom,
}

/// A reducer from a label matrix to per-row label distributions.
pub trait LabelVoter: Send + Sync {
    /// Number of classes.
    fn cardinality(&self) -> usize;

    /// Per-row probability distributions, shape `(n_items, cardinality)`.
    ///
    /// # Errors
    ///
    /// Returns an error if a vote is outside `-1..cardinality`.
    fn predict_proba(&self, votes: &Matrix<i32>) -> Result<Matrix<f32>>;

    /// Hard labels under a tie-break policy.
    ///
    /// # Errors
    ///
    /// Propagates [`LabelVoter::predict_proba`] errors.
    fn predict(
        &self,
        votes: &Matrix<i32>,
        policy: TieBreakPolicy,
        seed: Option<u64>,
    ) -> Result<Vec<i32>> {
        let probs = self.predict_proba(votes)?;
        Ok(probs_to_preds(&probs, policy, seed))
    }
}

/// Converts probability rows to hard labels.
///
/// A row's label is the class with the highest probability. When several
/// classes lie within [`TIE_TOLERANCE`] of the maximum, `policy` decides.
#[must_use]
pub fn probs_to_preds(probs: &Matrix<f32>, policy: TieBreakPolicy, seed: Option<u64>) -> Vec<i32> {
    let cardinality = probs.n_cols();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let seed = seed.unwrap_or(0);

    probs
        .iter_rows()
        .enumerate()
        .map(|(i, row)| {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let tied: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|(_, p)| (max - **p).abs() <= TIE_TOLERANCE)
                .map(|(c, _)| c)
                .collect();
            match (tied.as_slice(), policy) {
                ([only], _) => label_index(*only),
                ([], _) | (_, TieBreakPolicy::Abstain) => ABSTAIN,
                (_, TieBreakPolicy::Random) => {
                    let pick = (mix(i as u64, seed) % tied.len() as u64) as usize;
                    label_index(tied[pick])
                }
                (_, TieBreakPolicy::TrueRandom) => label_index(rng.gen_range(0..cardinality)),
            }
        })
        .collect()
}

fn label_index(class: usize) -> i32 {
    i32::try_from(class).unwrap_or(ABSTAIN)
}

/// SplitMix64 finaliser over the row index and seed.
fn mix(row: u64, seed: u64) -> u64 {
    let mut z = row
        .wrapping_add(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Checks that every vote is [`ABSTAIN`] or a class index below `cardinality`.
///
/// # Errors
///
/// Returns [`LabelError::InvalidHyperparameter`] naming the first bad vote.
pub fn check_votes(votes: &Matrix<i32>, cardinality: usize) -> Result<()> {
    let upper = i32::try_from(cardinality).unwrap_or(i32::MAX);
    match votes
        .as_slice()
        .iter()
        .find(|&&v| v != ABSTAIN && !(0..upper).contains(&v))
    {
        Some(bad) => Err(LabelError::InvalidHyperparameter {
            param: "vote".to_string(),
            value: bad.to_string(),
            constraint: format!("-1 or a label index below {cardinality}"),
        }),
        None => Ok(()),
    }
}

/// Fraction of rows on which each labeling function did not abstain.
#[must_use]
pub fn lf_coverage(votes: &Matrix<i32>) -> Vec<f32> {
    let n = votes.n_rows().max(1) as f32;
    (0..votes.n_cols())
        .map(|j| votes.column(j).iter().filter(|&&v| v != ABSTAIN).count() as f32 / n)
        .collect()
}

#[cfg(test)]
#[path = "weak_supervision_tests.rs"]
mod tests;
