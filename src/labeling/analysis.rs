//! Descriptive statistics over a label matrix.
//!
//! Nothing here feeds back into aggregation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};
use crate::weak_supervision::ABSTAIN;

use super::LabelMatrix;

/// Per-function summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LFSummary {
    /// Function name.
    pub function: String,
    /// Distinct labels the function emitted.
    pub polarity: BTreeSet<i32>,
    /// Fraction of items the function voted on.
    pub coverage: f32,
    /// Fraction of items where it voted along with at least one other function.
    pub overlaps: f32,
    /// Fraction of items where another voting function disagreed with it.
    pub conflicts: f32,
    /// Votes matching the gold label, when gold labels were supplied.
    pub correct: Option<usize>,
    /// Votes contradicting the gold label, when gold labels were supplied.
    pub incorrect: Option<usize>,
    /// `correct / (correct + incorrect)` over gold items it voted on.
    pub empirical_accuracy: Option<f32>,
}

/// Summary of a whole label matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LFAnalysis {
    /// One entry per labeling function, in column order.
    pub summaries: Vec<LFSummary>,
    /// Fraction of items with at least one vote.
    pub label_coverage: f32,
    /// Fraction of items with at least two votes.
    pub label_overlap: f32,
    /// Fraction of items with at least two distinct votes.
    pub label_conflict: f32,
}

impl LFAnalysis {
    /// Analyses a label matrix.
    ///
    /// `gold`, when given, holds one label per item in row order with
    /// [`ABSTAIN`] marking items without a gold label.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::DimensionMismatch`] if `gold` does not have one
    /// entry per item.
    pub fn new(matrix: &LabelMatrix, gold: Option<&[i32]>) -> Result<Self> {
        let votes = matrix.votes();
        let (n, m) = votes.shape();
        if let Some(g) = gold.filter(|g| g.len() != n) {
            return Err(LabelError::DimensionMismatch {
                expected: format!("{n} gold labels"),
                actual: g.len().to_string(),
            });
        }
        let denom = n.max(1) as f32;

        let mut covered = 0usize;
        let mut overlapped = 0usize;
        let mut conflicted = 0usize;
        let mut overlap_counts = vec![0usize; m];
        let mut conflict_counts = vec![0usize; m];

        for row in votes.iter_rows() {
            let cast: Vec<i32> = row.iter().copied().filter(|&v| v != ABSTAIN).collect();
            let distinct: BTreeSet<i32> = cast.iter().copied().collect();
            covered += usize::from(!cast.is_empty());
            overlapped += usize::from(cast.len() > 1);
            conflicted += usize::from(distinct.len() > 1);
            for (j, &v) in row.iter().enumerate() {
                if v == ABSTAIN {
                    continue;
                }
                overlap_counts[j] += usize::from(cast.len() > 1);
                conflict_counts[j] += usize::from(distinct.iter().any(|&d| d != v));
            }
        }

        let summaries = (0..m)
            .map(|j| {
                let column = votes.column(j);
                let voted = column.iter().filter(|&&v| v != ABSTAIN).count();
                let (correct, incorrect) = match gold {
                    Some(gold) => {
                        let (mut ok, mut bad) = (0usize, 0usize);
                        for (&v, &g) in column.iter().zip(gold) {
                            if v == ABSTAIN || g == ABSTAIN {
                                continue;
                            }
                            if v == g {
                                ok += 1;
                            } else {
                                bad += 1;
                            }
                        }
                        (Some(ok), Some(bad))
                    }
                    None => (None, None),
                };
                let empirical_accuracy = match (correct, incorrect) {
                    (Some(ok), Some(bad)) if ok + bad > 0 => Some(ok as f32 / (ok + bad) as f32),
                    _ => None,
                };
                LFSummary {
                    function: matrix.functions()[j].clone(),
                    polarity: column.iter().copied().filter(|&v| v != ABSTAIN).collect(),
                    coverage: voted as f32 / denom,
                    overlaps: overlap_counts[j] as f32 / denom,
                    conflicts: conflict_counts[j] as f32 / denom,
                    correct,
                    incorrect,
                    empirical_accuracy,
                }
            })
            .collect();

        Ok(Self {
            summaries,
            label_coverage: covered as f32 / denom,
            label_overlap: overlapped as f32 / denom,
            label_conflict: conflicted as f32 / denom,
        })
    }
}
