//! Rule language: data model, parser and normalized rendering.
//!
//! A [`Rule`] stores the text an analyst wrote plus the outcomes it maps to.
//! Binary rules carry two label indices (`label_a` when the expression holds,
//! `label_b` otherwise); free-form rules carry [`FREE_FORM_MARKER`] in both
//! fields and return labels from inside their program.
//!
//! # Examples
//!
//! ```
//! use labelsmith::rules::{parse, Rule};
//!
//! let rule = Rule::binary("r1", "perc_avail_ > 0.9 | median <= 7", 1, 0);
//! assert!(!rule.is_free_form());
//!
//! let parsed = parse(&rule.expression).expect("valid rule");
//! assert_eq!(parsed.normalized, "((perc_avail_ > 0.9) or (median <= 7))");
//! assert_eq!(parsed.features.len(), 2);
//! ```

mod ast;
mod parser;
mod render;

pub use ast::{
    is_truthy, run_program, BoolOperator, Comparator, Expr, Literal, ReturnTarget, RuleBody,
    Stmt, UnaryOperator,
};
pub use parser::{is_identifier, parse_body, parse_expression, ParsedRule, RuleParser};
pub use render::{render_body, render_expr, DEFAULT_TABLE};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Label field value marking a free-form rule.
pub const FREE_FORM_MARKER: i32 = -2;

/// A stored labeling rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// Identifier assigned by the store.
    pub id: String,
    /// Optional human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Expression or free-form program text.
    pub expression: String,
    /// Outcome when the expression holds, or [`FREE_FORM_MARKER`].
    pub label_a: i32,
    /// Outcome otherwise, or [`FREE_FORM_MARKER`].
    pub label_b: i32,
}

impl Rule {
    /// Creates a binary rule.
    pub fn binary(
        id: impl Into<String>,
        expression: impl Into<String>,
        label_a: i32,
        label_b: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            expression: expression.into(),
            label_a,
            label_b,
        }
    }

    /// Creates a free-form rule.
    pub fn free_form(id: impl Into<String>, program: impl Into<String>) -> Self {
        Self::binary(id, program, FREE_FORM_MARKER, FREE_FORM_MARKER)
    }

    /// Creates the single-comparison rule `feature op threshold`.
    ///
    /// ```
    /// use labelsmith::rules::{Comparator, Rule};
    ///
    /// let rule = Rule::comparison("r", "noise", Comparator::Ge, 0.25, 1, 0);
    /// assert_eq!(rule.expression, "noise >= 0.25");
    /// assert_eq!(rule.negated_comparison(), Some(Comparator::Lt));
    /// ```
    pub fn comparison(
        id: impl Into<String>,
        feature: &str,
        op: Comparator,
        threshold: f32,
        label_a: i32,
        label_b: i32,
    ) -> Self {
        Self::binary(
            id,
            format!("{feature} {} {threshold}", op.symbol()),
            label_a,
            label_b,
        )
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// True when either label field carries [`FREE_FORM_MARKER`].
    #[must_use]
    pub fn is_free_form(&self) -> bool {
        self.label_a == FREE_FORM_MARKER || self.label_b == FREE_FORM_MARKER
    }

    /// Name if set, else the identifier.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Identifier-safe function name, e.g. `rule_3f2a_01`.
    #[must_use]
    pub fn function_name(&self) -> String {
        let mut out = String::from("rule_");
        out.extend(
            self.display_name()
                .chars()
                .map(|c| if c == '-' || c == ' ' { '_' } else { c }),
        );
        out
    }

    /// For a rule consisting of one comparison, the comparator that selects
    /// exactly the rows this rule sends to `label_b`.
    #[must_use]
    pub fn negated_comparison(&self) -> Option<Comparator> {
        match parse_body(&self.expression).ok()? {
            RuleBody::Expression(Expr::Comparison { links, .. }) if links.len() == 1 => {
                Some(links[0].0.negated())
            }
            _ => None,
        }
    }
}

/// Parses rule text with a fresh parser.
///
/// # Errors
///
/// Returns [`crate::LabelError::Parse`] on malformed input.
pub fn parse(text: &str) -> Result<ParsedRule> {
    RuleParser::new().parse(text)
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
