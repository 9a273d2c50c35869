//! Rule check command
//!
//! Parses one rule the way a labeling run would and shows what it became.

use colored::Colorize;
use serde::Serialize;

use labelsmith::rules::RuleParser;

use crate::error::{CliError, Result};
use crate::output;

#[derive(Debug, Serialize)]
struct CheckReport {
    kind: &'static str,
    normalized: String,
    features: Vec<String>,
}

fn report(expr: &str, table: Option<&str>) -> Result<CheckReport> {
    let mut parser = match table {
        Some(table) => RuleParser::new().with_feature_table(table),
        None => RuleParser::new(),
    };
    let parsed = parser
        .parse(expr)
        .map_err(|e| CliError::Rule(e.to_string()))?;
    Ok(CheckReport {
        kind: if parsed.body.is_program() {
            "free_form"
        } else {
            "expression"
        },
        normalized: parsed.normalized,
        features: parsed.features.into_iter().collect(),
    })
}

/// Parse `expr` and print its normalised form and referenced features.
pub(crate) fn run(expr: &str, table: Option<&str>, json: bool) -> Result<()> {
    let report = report(expr, table)?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).map_err(labelsmith::LabelError::from)?
        );
        return Ok(());
    }

    output::section("Rule");
    output::kv("Kind", report.kind);
    output::kv("Features", report.features.join(", "));
    println!();
    println!("{}", report.normalized.green());
    if report.features.is_empty() {
        output::warn("rule reads no features");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_expression() {
        let r = report("perc_avail_ > 0.9 | median <= 7", None).expect("valid");
        assert_eq!(r.kind, "expression");
        assert_eq!(r.normalized, "((perc_avail_ > 0.9) or (median <= 7))");
        assert_eq!(r.features, vec!["median", "perc_avail_"]);
    }

    #[test]
    fn test_report_program_with_table() {
        let r = report("if noise > 1:\n\treturn HIGH_NOISE", Some("fm")).expect("valid");
        assert_eq!(r.kind, "free_form");
        assert!(r.normalized.contains("fm[\"noise\"]"));
    }

    #[test]
    fn test_report_rejects_malformed_rule() {
        assert!(matches!(report("noise >", None), Err(CliError::Rule(_))));
    }
}
