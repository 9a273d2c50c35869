//! Compiling rules into labeling functions.
//!
//! A compiled function holds the typed syntax tree of its rule, with every
//! return target already resolved to a label index. It reads feature values
//! through the [`FeatureLookup`] it is handed on each call and never stores a
//! reference to a feature matrix.

use std::collections::BTreeSet;
use std::fmt;

use crate::data::{FeatureLookup, FeatureMatrix};
use crate::error::{LabelError, Result};
use crate::rules::{run_program, Expr, ParsedRule, ReturnTarget, Rule, RuleBody, RuleParser, Stmt};
use crate::weak_supervision::{LFOutput, ABSTAIN};

use super::LabelSet;

/// A labeling function: one row in, one vote out.
pub trait LabelingFunction: Send + Sync + fmt::Debug {
    /// Function name.
    fn name(&self) -> &str;

    /// Features the function reads.
    fn features(&self) -> &BTreeSet<String>;

    /// Votes on one row.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::MissingFeature`] if the row lacks a feature the
    /// function depends on.
    fn apply(&self, row: &dyn FeatureLookup) -> Result<LFOutput>;
}

#[derive(Debug, Clone, PartialEq)]
enum Compiled {
    Binary {
        condition: Expr,
        when_true: LFOutput,
        when_false: LFOutput,
    },
    Program(Vec<Stmt<LFOutput>>),
}

/// Labeling function compiled from a stored [`Rule`].
///
/// # Examples
///
/// ```
/// use labelsmith::data::FeatureMatrix;
/// use labelsmith::labeling::{LabelSet, LabelingFunction, RuleFunction};
/// use labelsmith::rules::Rule;
/// use labelsmith::weak_supervision::LFOutput;
///
/// let fm = FeatureMatrix::new(vec!["a".into(), "b".into()], vec![("noise".into(), vec![0.1, 0.9])])
///     .expect("valid matrix");
/// let labels = LabelSet::new(["normal", "noisy"]).expect("labels");
/// let rule = Rule::binary("r1", "noise > 0.5", 1, 0);
///
/// let lf = RuleFunction::compile(&rule, &labels, &fm).expect("compiles");
/// assert_eq!(lf.apply(&fm.row(0)).expect("row 0"), LFOutput::Label(0));
/// assert_eq!(lf.apply(&fm.row(1)).expect("row 1"), LFOutput::Label(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFunction {
    rule_id: String,
    name: String,
    normalized: String,
    features: BTreeSet<String>,
    compiled: Compiled,
}

impl RuleFunction {
    /// Parses and compiles a rule against the active feature matrix.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Parse`] for malformed rule text and
    /// [`LabelError::Compile`] when [`RuleFunction::build`] rejects it.
    pub fn compile(rule: &Rule, labels: &LabelSet, matrix: &FeatureMatrix) -> Result<Self> {
        let parsed = RuleParser::new().parse(&rule.expression)?;
        Self::build(rule, &parsed, labels, matrix)
    }

    /// Builds a labeling function from an already parsed rule.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Compile`] if the rule reads a feature that
    /// `matrix` does not have, a label index is outside the label set, a
    /// free-form program names an unknown label or has no `return`, or the
    /// rule's shape does not match its label fields.
    pub fn build(
        rule: &Rule,
        parsed: &ParsedRule,
        labels: &LabelSet,
        matrix: &FeatureMatrix,
    ) -> Result<Self> {
        let fail = |reason: String| LabelError::compile(rule.display_name(), reason);

        if let Some(missing) = parsed.features.iter().find(|f| !matrix.has_column(f)) {
            return Err(fail(format!("unknown feature '{missing}'")));
        }

        let outcome = |index: i32| -> Result<LFOutput> {
            if labels.is_valid_outcome(index) {
                Ok(LFOutput::from_i32(index))
            } else {
                Err(fail(format!(
                    "label index {index} outside 0..{}",
                    labels.cardinality()
                )))
            }
        };

        let compiled = match (&parsed.body, rule.is_free_form()) {
            (RuleBody::Expression(condition), false) => Compiled::Binary {
                condition: condition.clone(),
                when_true: outcome(rule.label_a)?,
                when_false: outcome(rule.label_b)?,
            },
            (RuleBody::Program(stmts), true) => {
                if !stmts.iter().any(Stmt::has_return) {
                    return Err(fail("free-form rule never returns a label".to_string()));
                }
                let mut resolve = |target: &ReturnTarget| match target {
                    ReturnTarget::Index(i) => outcome(*i),
                    ReturnTarget::Label(code) => labels
                        .index_of_code(code)
                        .map(LFOutput::from_i32)
                        .ok_or_else(|| fail(format!("unknown label '{code}'"))),
                };
                let program = stmts
                    .iter()
                    .map(|s| s.try_map_targets(&mut resolve))
                    .collect::<Result<Vec<_>>>()?;
                Compiled::Program(program)
            }
            (RuleBody::Program(_), false) => {
                return Err(fail(
                    "if/return program given for a binary rule; mark it free-form".to_string(),
                ))
            }
            (RuleBody::Expression(_), true) => {
                return Err(fail(
                    "free-form rule must be an if/elif/else program".to_string(),
                ))
            }
        };

        Ok(Self {
            rule_id: rule.id.clone(),
            name: rule.function_name(),
            normalized: parsed.normalized.clone(),
            features: parsed.features.clone(),
            compiled,
        })
    }

    /// Identifier of the source rule.
    #[must_use]
    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    /// Normalized rule text.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Every outcome this function can produce, [`ABSTAIN`] included when
    /// reachable.
    #[must_use]
    pub fn outcomes(&self) -> BTreeSet<i32> {
        fn collect(stmts: &[Stmt<LFOutput>], out: &mut BTreeSet<i32>) {
            for stmt in stmts {
                match stmt {
                    Stmt::Return(v) => {
                        out.insert(v.to_i32());
                    }
                    Stmt::Conditional {
                        branches,
                        otherwise,
                    } => {
                        for (_, body) in branches {
                            collect(body, out);
                        }
                        if let Some(body) = otherwise {
                            collect(body, out);
                        }
                    }
                }
            }
        }

        let mut out = BTreeSet::new();
        match &self.compiled {
            Compiled::Binary {
                when_true,
                when_false,
                ..
            } => {
                out.insert(when_true.to_i32());
                out.insert(when_false.to_i32());
            }
            Compiled::Program(stmts) => {
                collect(stmts, &mut out);
                out.insert(ABSTAIN);
            }
        }
        out
    }
}

impl LabelingFunction for RuleFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    fn apply(&self, row: &dyn FeatureLookup) -> Result<LFOutput> {
        match &self.compiled {
            Compiled::Binary {
                condition,
                when_true,
                when_false,
            } => Ok(if condition.holds(row)? {
                *when_true
            } else {
                *when_false
            }),
            Compiled::Program(stmts) => Ok(run_program(stmts, row)?.unwrap_or(LFOutput::Abstain)),
        }
    }
}
