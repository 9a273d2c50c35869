//! Normalized rendering of parsed rules.
//!
//! Comparisons and boolean operations are fully parenthesised, connectives are
//! written as `and`/`or`, and programs are indented with one tab per level.
//! Rendering is a fixed point: parsing the output and rendering again yields
//! the same text.

use std::fmt::Write as _;

use super::ast::{Expr, Literal, ReturnTarget, RuleBody, Stmt, UnaryOperator};
use super::parser::is_identifier;

/// Table name used for features that are not plain identifiers.
pub const DEFAULT_TABLE: &str = "fm";

/// Renders a rule body. With `table`, every feature becomes `table["name"]`.
#[must_use]
pub fn render_body(body: &RuleBody, table: Option<&str>) -> String {
    match body {
        RuleBody::Expression(expr) => render_expr(expr, table),
        RuleBody::Program(stmts) => {
            let mut lines = Vec::new();
            render_block(stmts, 0, table, &mut lines);
            lines.join("\n")
        }
    }
}

/// Renders one expression.
#[must_use]
pub fn render_expr(expr: &Expr, table: Option<&str>) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr, table);
    out
}

fn write_expr(out: &mut String, expr: &Expr, table: Option<&str>) {
    match expr {
        Expr::Literal(Literal::Number(n)) => {
            let _ = write!(out, "{n}");
        }
        Expr::Literal(Literal::Bool(b)) => out.push_str(if *b { "True" } else { "False" }),
        Expr::FeatureRef(name) => write_feature(out, name, table),
        Expr::Comparison { left, links } => {
            out.push('(');
            write_expr(out, left, table);
            for (op, right) in links {
                let _ = write!(out, " {} ", op.symbol());
                write_expr(out, right, table);
            }
            out.push(')');
        }
        Expr::BoolOp { op, operands } => {
            out.push('(');
            for (i, operand) in operands.iter().enumerate() {
                if i > 0 {
                    let _ = write!(out, " {} ", op.keyword());
                }
                write_expr(out, operand, table);
            }
            out.push(')');
        }
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => {
            out.push('-');
            write_expr(out, operand, table);
        }
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            operand,
        } => {
            out.push_str("(not ");
            write_expr(out, operand, table);
            out.push(')');
        }
    }
}

fn write_feature(out: &mut String, name: &str, table: Option<&str>) {
    match table {
        None if is_identifier(name) => out.push_str(name),
        _ => {
            let table = table.unwrap_or(DEFAULT_TABLE);
            let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
            let _ = write!(out, "{table}[\"{escaped}\"]");
        }
    }
}

fn render_block(stmts: &[Stmt], level: usize, table: Option<&str>, lines: &mut Vec<String>) {
    let indent = "\t".repeat(level);
    for stmt in stmts {
        match stmt {
            Stmt::Return(target) => {
                let target = match target {
                    ReturnTarget::Label(name) => name.clone(),
                    ReturnTarget::Index(i) => i.to_string(),
                };
                lines.push(format!("{indent}return {target}"));
            }
            Stmt::Conditional {
                branches,
                otherwise,
            } => {
                for (i, (cond, body)) in branches.iter().enumerate() {
                    let keyword = if i == 0 { "if" } else { "elif" };
                    lines.push(format!("{indent}{keyword} {}:", render_expr(cond, table)));
                    render_block(body, level + 1, table, lines);
                }
                if let Some(body) = otherwise {
                    lines.push(format!("{indent}else:"));
                    render_block(body, level + 1, table, lines);
                }
            }
        }
    }
}
