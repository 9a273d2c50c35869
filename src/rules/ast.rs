//! Typed rule syntax tree and its tree-walking evaluator.
//!
//! Every expression evaluates to an `f32`. Comparisons and `not` yield
//! `1.0`/`0.0`; `and`/`or` return the deciding operand. A value is true when
//! it is non-zero (NaN counts as true).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::FeatureLookup;
use crate::error::{LabelError, Result};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>=`
    Ge,
    /// `>`
    Gt,
}

impl Comparator {
    /// All comparators, in the order a rule author is offered them.
    pub const ALL: [Comparator; 6] = [
        Comparator::Lt,
        Comparator::Le,
        Comparator::Eq,
        Comparator::Ne,
        Comparator::Ge,
        Comparator::Gt,
    ];

    /// Source symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ge => ">=",
            Self::Gt => ">",
        }
    }

    /// Parses a source symbol.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.symbol() == symbol)
    }

    /// The comparator that holds exactly when `self` does not.
    ///
    /// ```
    /// use labelsmith::rules::Comparator;
    ///
    /// assert_eq!(Comparator::Lt.negated(), Comparator::Ge);
    /// assert_eq!(Comparator::Eq.negated().negated(), Comparator::Eq);
    /// ```
    #[must_use]
    pub fn negated(self) -> Self {
        match self {
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Ge => Self::Lt,
            Self::Gt => Self::Le,
        }
    }

    /// Applies the comparison.
    #[must_use]
    pub fn apply(self, left: f32, right: f32) -> bool {
        match self {
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Eq => left == right,
            Self::Ne => left != right,
            Self::Ge => left >= right,
            Self::Gt => left > right,
        }
    }
}

/// Boolean connective. `&` and `|` are read as `and` and `or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoolOperator {
    /// `and` / `&`
    And,
    /// `or` / `|`
    Or,
}

impl BoolOperator {
    /// Keyword used in normalized output.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Boolean `not`.
    Not,
    /// Arithmetic negation.
    Neg,
}

/// Literal value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Numeric literal.
    Number(f32),
    /// `True` / `False`.
    Bool(bool),
}

impl Literal {
    fn value(self) -> f32 {
        match self {
            Self::Number(n) => n,
            Self::Bool(true) => 1.0,
            Self::Bool(false) => 0.0,
        }
    }
}

/// Expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Constant.
    Literal(Literal),
    /// Named feature of the current row.
    FeatureRef(String),
    /// Chained comparison: `left op0 r0 op1 r1 ...`, true when every link holds.
    Comparison {
        /// Leftmost operand.
        left: Box<Expr>,
        /// Remaining links.
        links: Vec<(Comparator, Expr)>,
    },
    /// Flattened boolean operation over two or more operands.
    BoolOp {
        /// Connective.
        op: BoolOperator,
        /// Operands, in source order.
        operands: Vec<Expr>,
    },
    /// Unary operation.
    UnaryOp {
        /// Operator.
        op: UnaryOperator,
        /// Operand.
        operand: Box<Expr>,
    },
}

impl Expr {
    /// Collects referenced feature names into `out`.
    pub fn collect_features(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Literal(_) => {}
            Self::FeatureRef(name) => {
                out.insert(name.clone());
            }
            Self::Comparison { left, links } => {
                left.collect_features(out);
                for (_, right) in links {
                    right.collect_features(out);
                }
            }
            Self::BoolOp { operands, .. } => {
                for operand in operands {
                    operand.collect_features(out);
                }
            }
            Self::UnaryOp { operand, .. } => operand.collect_features(out),
        }
    }

    /// Evaluates the expression against one row.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::MissingFeature`] when the row has no value for a
    /// referenced feature.
    pub fn eval(&self, row: &dyn FeatureLookup) -> Result<f32> {
        match self {
            Self::Literal(lit) => Ok(lit.value()),
            Self::FeatureRef(name) => row.feature(name).ok_or_else(|| LabelError::MissingFeature {
                feature: name.clone(),
            }),
            Self::Comparison { left, links } => {
                let mut lhs = left.eval(row)?;
                for (op, right) in links {
                    let rhs = right.eval(row)?;
                    if !op.apply(lhs, rhs) {
                        return Ok(0.0);
                    }
                    lhs = rhs;
                }
                Ok(1.0)
            }
            Self::BoolOp { op, operands } => {
                let mut last = 0.0;
                for operand in operands {
                    last = operand.eval(row)?;
                    match op {
                        BoolOperator::And if !is_truthy(last) => return Ok(last),
                        BoolOperator::Or if is_truthy(last) => return Ok(last),
                        _ => {}
                    }
                }
                Ok(last)
            }
            Self::UnaryOp { op, operand } => {
                let v = operand.eval(row)?;
                Ok(match op {
                    UnaryOperator::Neg => -v,
                    UnaryOperator::Not => bool_value(!is_truthy(v)),
                })
            }
        }
    }

    /// Evaluates the expression in boolean position.
    ///
    /// # Errors
    ///
    /// Propagates [`Expr::eval`] errors.
    pub fn holds(&self, row: &dyn FeatureLookup) -> Result<bool> {
        self.eval(row).map(is_truthy)
    }
}

/// Numeric truthiness: non-zero (including NaN) is true.
#[must_use]
pub fn is_truthy(value: f32) -> bool {
    value != 0.0
}

fn bool_value(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Symbolic target of a `return` before label names are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnTarget {
    /// Label code name such as `HIGH_NOISE`, or `ABSTAIN`.
    Label(String),
    /// Literal label index.
    Index(i32),
}

/// Statement of a free-form program, generic over the return target so a
/// program can be resolved to label indices once and evaluated many times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt<T = ReturnTarget> {
    /// `if` / `elif` chain with optional `else`.
    Conditional {
        /// `(condition, body)` for the `if` and each `elif`.
        branches: Vec<(Expr, Vec<Stmt<T>>)>,
        /// `else` body.
        otherwise: Option<Vec<Stmt<T>>>,
    },
    /// `return <target>`.
    Return(T),
}

impl<T> Stmt<T> {
    /// Rewrites every return target, failing on the first rejected one.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `f`.
    pub fn try_map_targets<U, F>(&self, f: &mut F) -> Result<Stmt<U>>
    where
        F: FnMut(&T) -> Result<U>,
    {
        Ok(match self {
            Self::Return(target) => Stmt::Return(f(target)?),
            Self::Conditional {
                branches,
                otherwise,
            } => {
                let mut mapped = Vec::with_capacity(branches.len());
                for (cond, body) in branches {
                    mapped.push((cond.clone(), map_block(body, f)?));
                }
                let otherwise = match otherwise {
                    Some(body) => Some(map_block(body, f)?),
                    None => None,
                };
                Stmt::Conditional {
                    branches: mapped,
                    otherwise,
                }
            }
        })
    }

    /// True if this statement contains a `return` anywhere.
    #[must_use]
    pub fn has_return(&self) -> bool {
        match self {
            Self::Return(_) => true,
            Self::Conditional {
                branches,
                otherwise,
            } => {
                branches
                    .iter()
                    .any(|(_, body)| body.iter().any(Stmt::has_return))
                    || otherwise
                        .as_ref()
                        .is_some_and(|body| body.iter().any(Stmt::has_return))
            }
        }
    }

    fn collect_features(&self, out: &mut BTreeSet<String>) {
        if let Self::Conditional {
            branches,
            otherwise,
        } = self
        {
            for (cond, body) in branches {
                cond.collect_features(out);
                body.iter().for_each(|s| s.collect_features(out));
            }
            if let Some(body) = otherwise {
                body.iter().for_each(|s| s.collect_features(out));
            }
        }
    }
}

fn map_block<T, U, F>(block: &[Stmt<T>], f: &mut F) -> Result<Vec<Stmt<U>>>
where
    F: FnMut(&T) -> Result<U>,
{
    block.iter().map(|s| s.try_map_targets(f)).collect()
}

/// Runs a program against one row; `None` means no `return` was reached.
///
/// # Errors
///
/// Propagates condition evaluation errors.
pub fn run_program<T: Copy>(program: &[Stmt<T>], row: &dyn FeatureLookup) -> Result<Option<T>> {
    for stmt in program {
        match stmt {
            Stmt::Return(target) => return Ok(Some(*target)),
            Stmt::Conditional {
                branches,
                otherwise,
            } => {
                let mut taken = None;
                for (cond, body) in branches {
                    if cond.holds(row)? {
                        taken = Some(body);
                        break;
                    }
                }
                if let Some(body) = taken.or(otherwise.as_ref()) {
                    if let Some(result) = run_program(body, row)? {
                        return Ok(Some(result));
                    }
                }
            }
        }
    }
    Ok(None)
}

/// Parsed body of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleBody {
    /// A single boolean/comparison expression.
    Expression(Expr),
    /// A free-form `if`/`elif`/`else` program.
    Program(Vec<Stmt>),
}

impl RuleBody {
    /// True for free-form programs.
    #[must_use]
    pub fn is_program(&self) -> bool {
        matches!(self, Self::Program(_))
    }

    /// Feature names referenced anywhere in the body.
    #[must_use]
    pub fn features(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        match self {
            Self::Expression(expr) => expr.collect_features(&mut out),
            Self::Program(stmts) => stmts.iter().for_each(|s| s.collect_features(&mut out)),
        }
        out
    }
}

#[cfg(test)]
#[path = "ast_tests.rs"]
mod tests;
