//! The label aggregator.
//!
//! ```text
//! Created --create_labeling_functions--> FunctionsBuilt --apply--> Applied
//!   Applied --fit--> Fitted --predict--> Predicted
//!   Applied --predict--> Predicted            (majority vote)
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::FeatureMatrix;
use crate::error::{LabelError, Result};
use crate::primitives::Matrix;
use crate::rules::Rule;
use crate::weak_supervision::{
    probs_to_preds, LabelModel, LabelVoter, MajorityLabelVoter, TieBreakPolicy,
};

use super::{LFAnalysis, LabelMatrix, LabelSet, LabelingFunction, RuleFunction};

/// Fewest labeling functions an aggregation run accepts.
pub const MIN_LABELING_FUNCTIONS: usize = 3;

/// Lifecycle of a [`Labeler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelerState {
    /// Rules bound, nothing compiled.
    Created,
    /// Labeling functions compiled.
    FunctionsBuilt,
    /// Label matrix computed.
    Applied,
    /// Label model fit on the label matrix.
    Fitted,
    /// Hard labels and probabilities available.
    Predicted,
}

impl fmt::Display for LabelerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::FunctionsBuilt => "functions_built",
            Self::Applied => "applied",
            Self::Fitted => "fitted",
            Self::Predicted => "predicted",
        };
        f.write_str(name)
    }
}

/// A rule left out of the function set, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedRule {
    /// Rule identifier.
    pub rule_id: String,
    /// Parse or compile error text.
    pub reason: String,
}

#[derive(Debug, Clone)]
enum Reducer {
    Majority(MajorityLabelVoter),
    Learned(LabelModel),
}

impl Reducer {
    fn voter(&self) -> &dyn LabelVoter {
        match self {
            Self::Majority(v) => v,
            Self::Learned(m) => m,
        }
    }
}

/// Applies a rule set to a feature matrix and reduces the votes.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use labelsmith::data::FeatureMatrix;
/// use labelsmith::labeling::{LabelSet, Labeler};
/// use labelsmith::rules::Rule;
/// use labelsmith::weak_supervision::TieBreakPolicy;
///
/// let fm = FeatureMatrix::new(
///     vec!["a".into(), "b".into()],
///     vec![("noise".into(), vec![0.1, 0.9]), ("gaps".into(), vec![0.0, 3.0])],
/// )
/// .expect("valid matrix");
/// let rules = vec![
///     Rule::binary("1", "noise > 0.5", 1, 0),
///     Rule::binary("2", "gaps >= 1", 1, 0),
///     Rule::binary("3", "noise > 0.5 and gaps > 1", 1, -1),
/// ];
/// let labels = LabelSet::new(["clean", "noisy"]).expect("labels");
///
/// let mut labeler = Labeler::new(rules, labels, Arc::new(fm));
/// labeler.create_labeling_functions().expect("three rules compile");
/// labeler.apply().expect("all features present");
/// let preds = labeler.predict(TieBreakPolicy::Abstain, None).expect("applied");
/// assert_eq!(preds, &[0, 1]);
/// ```
#[derive(Debug)]
pub struct Labeler {
    rules: Vec<Rule>,
    labels: LabelSet,
    matrix: Arc<FeatureMatrix>,
    selection: Option<BTreeSet<String>>,
    functions: Vec<Box<dyn LabelingFunction>>,
    used_rules: Vec<String>,
    excluded: Vec<ExcludedRule>,
    label_matrix: Option<LabelMatrix>,
    reducer: Reducer,
    predictions: Option<Vec<i32>>,
    probabilities: Option<Matrix<f32>>,
    state: LabelerState,
}

impl Labeler {
    /// Binds rules, labels and the active feature matrix.
    #[must_use]
    pub fn new(rules: Vec<Rule>, labels: LabelSet, matrix: Arc<FeatureMatrix>) -> Self {
        let reducer = Reducer::Majority(MajorityLabelVoter::new(labels.cardinality()));
        Self {
            rules,
            labels,
            matrix,
            selection: None,
            functions: Vec::new(),
            used_rules: Vec::new(),
            excluded: Vec::new(),
            label_matrix: None,
            reducer,
            predictions: None,
            probabilities: None,
            state: LabelerState::Created,
        }
    }

    /// Restricts the function set to the listed rule identifiers.
    #[must_use]
    pub fn with_selection<I, S>(mut self, rule_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection = Some(rule_ids.into_iter().map(Into::into).collect());
        self
    }

    /// Swaps in a new feature matrix; compiled functions and results are
    /// dropped and the labeler returns to [`LabelerState::Created`].
    pub fn rebind(&mut self, matrix: Arc<FeatureMatrix>) {
        self.matrix = matrix;
        self.reset();
    }

    fn reset(&mut self) {
        self.functions.clear();
        self.used_rules.clear();
        self.excluded.clear();
        self.label_matrix = None;
        self.reducer = Reducer::Majority(MajorityLabelVoter::new(self.labels.cardinality()));
        self.predictions = None;
        self.probabilities = None;
        self.state = LabelerState::Created;
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LabelerState {
        self.state
    }

    /// Task labels.
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Bound feature matrix.
    #[must_use]
    pub fn matrix(&self) -> &Arc<FeatureMatrix> {
        &self.matrix
    }

    fn require(&self, expected: LabelerState) -> Result<()> {
        if self.state < expected {
            return Err(LabelError::InvalidState {
                expected: expected.to_string(),
                found: self.state.to_string(),
            });
        }
        Ok(())
    }

    /// Compiles one labeling function per eligible rule.
    ///
    /// Rules that fail to parse or compile are logged, recorded in
    /// [`Labeler::excluded`] and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::InsufficientRules`] if fewer than
    /// [`MIN_LABELING_FUNCTIONS`] functions remain.
    pub fn create_labeling_functions(&mut self) -> Result<&[Box<dyn LabelingFunction>]> {
        self.reset();

        if let Some(selection) = &self.selection {
            for id in selection {
                if !self.rules.iter().any(|r| &r.id == id) {
                    warn!(rule = %id, "selected rule is not part of the rule set");
                }
            }
        }

        for rule in &self.rules {
            if let Some(selection) = &self.selection {
                if !selection.contains(&rule.id) {
                    continue;
                }
            }
            match RuleFunction::compile(rule, &self.labels, &self.matrix) {
                Ok(function) => {
                    debug!(rule = %rule.id, normalized = function.normalized(), "compiled labeling function");
                    self.used_rules.push(rule.id.clone());
                    self.functions.push(Box::new(function));
                }
                Err(err) if err.is_recoverable() => {
                    warn!(rule = %rule.id, error = %err, "rule excluded");
                    self.excluded.push(ExcludedRule {
                        rule_id: rule.id.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        if self.functions.len() < MIN_LABELING_FUNCTIONS {
            return Err(LabelError::InsufficientRules {
                found: self.functions.len(),
                required: MIN_LABELING_FUNCTIONS,
            });
        }

        info!(
            functions = self.functions.len(),
            excluded = self.excluded.len(),
            "labeling functions built"
        );
        self.state = LabelerState::FunctionsBuilt;
        Ok(&self.functions)
    }

    /// Evaluates every function on every row of the bound matrix.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::InvalidState`] before functions are built and
    /// [`LabelError::MissingFeature`] if the matrix lost a required column.
    pub fn apply(&mut self) -> Result<&LabelMatrix> {
        self.require(LabelerState::FunctionsBuilt)?;
        let label_matrix = LabelMatrix::apply(&self.functions, &self.matrix)?;
        debug!(
            items = label_matrix.n_items(),
            functions = label_matrix.n_functions(),
            "label matrix built"
        );
        self.reducer = Reducer::Majority(MajorityLabelVoter::new(self.labels.cardinality()));
        self.predictions = None;
        self.probabilities = None;
        self.state = LabelerState::Applied;
        Ok(&*self.label_matrix.insert(label_matrix))
    }

    fn votes(&self) -> Result<&LabelMatrix> {
        self.label_matrix.as_ref().ok_or_else(|| LabelError::InvalidState {
            expected: LabelerState::Applied.to_string(),
            found: self.state.to_string(),
        })
    }

    /// Fits the generative label model on the label matrix.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::InvalidState`] before [`Labeler::apply`].
    pub fn fit(&mut self, epochs: usize, seed: u64) -> Result<()> {
        self.require(LabelerState::Applied)?;
        let votes = self.votes()?;
        let mut model = LabelModel::new(self.labels.cardinality(), votes.n_functions());
        model.fit(votes.votes(), epochs, seed)?;
        info!(epochs = model.fitted_epochs(), seed, "label model fitted");
        self.reducer = Reducer::Learned(model);
        self.state = LabelerState::Fitted;
        Ok(())
    }

    /// Reduces the label matrix to hard labels (and probabilities).
    ///
    /// Uses the fitted label model if [`Labeler::fit`] ran since the last
    /// [`Labeler::apply`], majority vote otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::InvalidState`] before [`Labeler::apply`].
    pub fn predict(&mut self, policy: TieBreakPolicy, seed: Option<u64>) -> Result<&[i32]> {
        self.require(LabelerState::Applied)?;
        let votes = self.votes()?.votes();
        let voter = self.reducer.voter();
        let probabilities = voter.predict_proba(votes)?;
        let predictions = probs_to_preds(&probabilities, policy, seed);
        self.probabilities = Some(probabilities);
        self.state = LabelerState::Predicted;
        Ok(self.predictions.insert(predictions).as_slice())
    }

    /// Per-row probability distributions from the active reducer.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::InvalidState`] before [`Labeler::apply`].
    pub fn predict_proba(&self) -> Result<Matrix<f32>> {
        self.require(LabelerState::Applied)?;
        self.reducer.voter().predict_proba(self.votes()?.votes())
    }

    /// Per-function coverage, overlap and conflict statistics.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::InvalidState`] before [`Labeler::apply`] and
    /// [`LabelError::DimensionMismatch`] if `gold` does not match the items.
    pub fn analysis(&self, gold: Option<&[i32]>) -> Result<LFAnalysis> {
        LFAnalysis::new(self.votes()?, gold)
    }

    /// Compiled functions.
    #[must_use]
    pub fn functions(&self) -> &[Box<dyn LabelingFunction>] {
        &self.functions
    }

    /// Identifiers of the rules that became functions, in column order.
    #[must_use]
    pub fn used_rules(&self) -> &[String] {
        &self.used_rules
    }

    /// Rules left out by the last build.
    #[must_use]
    pub fn excluded(&self) -> &[ExcludedRule] {
        &self.excluded
    }

    /// Union of the features read by the compiled functions.
    #[must_use]
    pub fn features(&self) -> BTreeSet<String> {
        self.functions
            .iter()
            .flat_map(|f| f.features().iter().cloned())
            .collect()
    }

    /// The label matrix of the last [`Labeler::apply`].
    #[must_use]
    pub fn label_matrix(&self) -> Option<&LabelMatrix> {
        self.label_matrix.as_ref()
    }

    /// Hard labels of the last [`Labeler::predict`].
    #[must_use]
    pub fn predictions(&self) -> Option<&[i32]> {
        self.predictions.as_deref()
    }

    /// Probabilities of the last [`Labeler::predict`].
    #[must_use]
    pub fn probabilities(&self) -> Option<&Matrix<f32>> {
        self.probabilities.as_ref()
    }

    /// The fitted label model, if the active reducer is learned.
    #[must_use]
    pub fn label_model(&self) -> Option<&LabelModel> {
        match &self.reducer {
            Reducer::Learned(model) => Some(model),
            Reducer::Majority(_) => None,
        }
    }
}
