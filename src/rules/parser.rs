//! Rule language parser.
//!
//! Two shapes are accepted:
//!
//! - an expression over features, literals, comparators
//!   (`<`, `<=`, `==`, `!=`, `>=`, `>`, chainable) and connectives
//!   (`and`/`&`, `or`/`|`, `not`);
//! - a free-form program of `if`/`elif`/`else` blocks whose leaves are
//!   `return <LABEL>` or `return <index>`.
//!
//! Text whose first non-empty line starts with `if` or `return` is a program.
//! Blocks are delimited by indentation; tabs advance to the next multiple of 8
//! columns. `#` starts a line comment.

use std::collections::BTreeSet;

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while, take_while1},
    character::complete::{char as pchar, digit0, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value, verify},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};

use super::ast::{
    BoolOperator, Comparator, Expr, Literal, ReturnTarget, RuleBody, Stmt, UnaryOperator,
};
use super::render::render_body;
use crate::error::{LabelError, Result};

const KEYWORDS: [&str; 9] = [
    "and", "or", "not", "if", "elif", "else", "return", "True", "False",
];

const TAB_WIDTH: usize = 8;

// ============================================================================
// Public API
// ============================================================================

/// Outcome of parsing one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRule {
    /// Typed syntax tree.
    pub body: RuleBody,
    /// Normalized text (table-qualified if the parser was configured so).
    pub normalized: String,
    /// Distinct feature names the rule reads.
    pub features: BTreeSet<String>,
}

impl ParsedRule {
    /// True for free-form programs.
    #[must_use]
    pub fn is_program(&self) -> bool {
        self.body.is_program()
    }
}

/// Parser for rule text.
///
/// Feature names seen across every successful [`RuleParser::parse`] call
/// accumulate in [`RuleParser::features`].
///
/// # Examples
///
/// ```
/// use labelsmith::rules::RuleParser;
///
/// let mut parser = RuleParser::new();
/// let parsed = parser.parse("mean > 0.5 & std <= 2").expect("valid rule");
/// assert_eq!(parsed.normalized, "((mean > 0.5) and (std <= 2))");
/// assert!(parsed.features.contains("std"));
///
/// let mut qualified = RuleParser::new().with_feature_table("fm");
/// let parsed = qualified.parse("mean > 0.5").expect("valid rule");
/// assert_eq!(parsed.normalized, r#"(fm["mean"] > 0.5)"#);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleParser {
    feature_table: Option<String>,
    features: BTreeSet<String>,
}

impl RuleParser {
    /// Creates a parser that renders bare feature names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders every feature reference as a lookup into `table`.
    #[must_use]
    pub fn with_feature_table(mut self, table: impl Into<String>) -> Self {
        self.feature_table = Some(table.into());
        self
    }

    /// Parses rule text.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Parse`] for any text outside the grammar; no
    /// partial result is produced.
    pub fn parse(&mut self, text: &str) -> Result<ParsedRule> {
        let body = parse_body(text)?;
        let features = body.features();
        self.features.extend(features.iter().cloned());
        let normalized = render_body(&body, self.feature_table.as_deref());
        Ok(ParsedRule {
            body,
            normalized,
            features,
        })
    }

    /// Every feature name seen so far.
    #[must_use]
    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    /// Forgets accumulated feature names.
    pub fn clear_features(&mut self) {
        self.features.clear();
    }
}

/// Parses rule text into a body, choosing expression or program form.
///
/// # Errors
///
/// Returns [`LabelError::Parse`] on malformed input.
pub fn parse_body(text: &str) -> Result<RuleBody> {
    let lines = layout(text);
    let first = lines
        .first()
        .ok_or_else(|| LabelError::parse("rule is empty"))?;
    if starts_with_keyword(first.content, "if") || starts_with_keyword(first.content, "return") {
        parse_program(&lines).map(RuleBody::Program)
    } else {
        parse_expression(&strip_comments(text)).map(RuleBody::Expression)
    }
}

/// Parses a single expression.
///
/// # Errors
///
/// Returns [`LabelError::Parse`] on malformed input.
pub fn parse_expression(text: &str) -> Result<Expr> {
    all_consuming(terminated(or_expr, multispace0))(text.trim_start())
        .map(|(_, expr)| expr)
        .map_err(|e| syntax_error(text, e))
}

/// True if `name` can be written as a bare feature reference.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start)
        && chars.all(is_ident_continue)
        && !KEYWORDS.contains(&name)
}

fn syntax_error(text: &str, err: nom::Err<nom::error::Error<&str>>) -> LabelError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) if !e.input.trim().is_empty() => {
            LabelError::parse(format!(
                "unexpected input `{}` in `{}`",
                e.input.trim(),
                text.trim()
            ))
        }
        _ => LabelError::parse(format!("incomplete expression `{}`", text.trim())),
    }
}

// ============================================================================
// Expressions
// ============================================================================

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(kw), not(satisfy(is_ident_continue)))
}

fn starts_with_keyword(input: &str, kw: &'static str) -> bool {
    keyword(kw)(input).is_ok()
}

fn raw_ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(take_while1(is_ident_start), take_while(is_ident_continue)))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    verify(raw_ident, |name: &str| !KEYWORDS.contains(&name))(input)
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let connective = alt((keyword("or"), tag("|")));
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(pair(multispace0, connective), and_expr))(input)?;
    Ok((input, bool_op(BoolOperator::Or, first, rest)))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let connective = alt((keyword("and"), tag("&")));
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(pair(multispace0, connective), not_expr))(input)?;
    Ok((input, bool_op(BoolOperator::And, first, rest)))
}

fn bool_op(op: BoolOperator, first: Expr, rest: Vec<Expr>) -> Expr {
    if rest.is_empty() {
        return first;
    }
    let mut operands = Vec::with_capacity(rest.len() + 1);
    operands.push(first);
    operands.extend(rest);
    Expr::BoolOp { op, operands }
}

fn not_expr(input: &str) -> IResult<&str, Expr> {
    preceded(
        multispace0,
        alt((
            map(preceded(keyword("not"), not_expr), |operand| Expr::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            }),
            comparison,
        )),
    )(input)
}

fn comparator(input: &str) -> IResult<&str, Comparator> {
    map_res(
        alt((tag("<="), tag(">="), tag("=="), tag("!="), tag("<"), tag(">"))),
        |symbol: &str| Comparator::from_symbol(symbol).ok_or("unknown comparator"),
    )(input)
}

fn comparison(input: &str) -> IResult<&str, Expr> {
    let (input, left) = unary(input)?;
    let (input, links) = many0(pair(preceded(multispace0, comparator), unary))(input)?;
    if links.is_empty() {
        return Ok((input, left));
    }
    Ok((
        input,
        Expr::Comparison {
            left: Box::new(left),
            links,
        },
    ))
}

fn unary(input: &str) -> IResult<&str, Expr> {
    preceded(
        multispace0,
        alt((map(preceded(pchar('-'), unary), negate), primary)),
    )(input)
}

fn negate(operand: Expr) -> Expr {
    match operand {
        Expr::Literal(Literal::Number(n)) => Expr::Literal(Literal::Number(-n)),
        other => Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand: Box::new(other),
        },
    }
}

fn primary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(number, |n| Expr::Literal(Literal::Number(n))),
        value(Expr::Literal(Literal::Bool(true)), keyword("True")),
        value(Expr::Literal(Literal::Bool(false)), keyword("False")),
        map(subscript, Expr::FeatureRef),
        map(identifier, |name| Expr::FeatureRef(name.to_string())),
        delimited(pchar('('), or_expr, preceded(multispace0, pchar(')'))),
    ))(input)
}

fn number(input: &str) -> IResult<&str, f32> {
    let mantissa = alt((
        recognize(pair(digit1, opt(pair(pchar('.'), digit0)))),
        recognize(pair(pchar('.'), digit1)),
    ));
    let exponent = tuple((one_of("eE"), opt(one_of("+-")), digit1));
    // literals beyond f32 range would render as `inf`
    verify(
        map_res(
            terminated(
                recognize(pair(mantissa, opt(exponent))),
                not(satisfy(is_ident_continue)),
            ),
            str::parse::<f32>,
        ),
        |n: &f32| n.is_finite(),
    )(input)
}

fn subscript(input: &str) -> IResult<&str, String> {
    let (input, _table) = raw_ident(input)?;
    delimited(
        pair(multispace0, pchar('[')),
        preceded(multispace0, string_literal),
        pair(multispace0, pchar(']')),
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    fn quoted<'a>(
        quote: char,
        normal: &'static str,
    ) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
        move |input: &'a str| {
            let (input, _) = pchar(quote)(input)?;
            let (input, body) = opt(nom::bytes::complete::escaped_transform(
                is_not(normal),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("'", tag("'")),
                )),
            ))(input)?;
            let (input, _) = pchar(quote)(input)?;
            Ok((input, body.unwrap_or_default()))
        }
    }
    verify(
        alt((quoted('"', "\\\""), quoted('\'', "\\'"))),
        |name: &String| !name.is_empty(),
    )(input)
}

// ============================================================================
// Programs
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    indent: usize,
    content: &'a str,
}

fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '#') => return &line[..i],
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
    }
    line
}

fn strip_comments(text: &str) -> String {
    text.lines().map(strip_comment).collect::<Vec<_>>().join("\n")
}

fn layout(text: &str) -> Vec<Line<'_>> {
    text.lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let line = strip_comment(raw);
            let content = line.trim();
            if content.is_empty() {
                return None;
            }
            let mut indent = 0;
            for c in line.chars() {
                match c {
                    ' ' => indent += 1,
                    '\t' => indent = (indent / TAB_WIDTH + 1) * TAB_WIDTH,
                    _ => break,
                }
            }
            Some(Line {
                number: i + 1,
                indent,
                content,
            })
        })
        .collect()
}

fn line_error(line: &Line<'_>, message: &str) -> LabelError {
    LabelError::parse(format!("line {}: {message}: `{}`", line.number, line.content))
}

fn parse_program(lines: &[Line<'_>]) -> Result<Vec<Stmt>> {
    let mut pos = 0;
    let base = lines.first().map_or(0, |l| l.indent);
    let program = parse_block(lines, &mut pos, base)?;
    if let Some(line) = lines.get(pos) {
        return Err(line_error(line, "unindent does not match any outer level"));
    }
    Ok(program)
}

fn parse_block(lines: &[Line<'_>], pos: &mut usize, indent: usize) -> Result<Vec<Stmt>> {
    let mut stmts = Vec::new();
    while let Some(line) = lines.get(*pos) {
        if line.indent < indent {
            break;
        }
        if line.indent > indent {
            return Err(line_error(line, "unexpected indent"));
        }
        if starts_with_keyword(line.content, "if") {
            stmts.push(parse_conditional(lines, pos, indent)?);
        } else if starts_with_keyword(line.content, "elif")
            || starts_with_keyword(line.content, "else")
        {
            return Err(line_error(line, "branch without a matching `if`"));
        } else {
            stmts.push(parse_return(line)?);
            *pos += 1;
        }
    }
    Ok(stmts)
}

fn parse_conditional(lines: &[Line<'_>], pos: &mut usize, indent: usize) -> Result<Stmt> {
    let mut branches = Vec::new();
    let mut otherwise = None;
    let mut kw = "if";

    while let Some(line) = lines.get(*pos).copied() {
        if line.indent != indent {
            break;
        }
        if starts_with_keyword(line.content, kw) {
            let (inline, cond) = header(kw)(line.content)
                .map_err(|_| line_error(&line, "malformed condition"))?;
            let body = parse_body_of(lines, pos, indent, inline)?;
            branches.push((cond, body));
            kw = "elif";
        } else if starts_with_keyword(line.content, "else") {
            let (inline, _) = tuple((keyword("else"), multispace0, pchar(':')))(line.content)
                .map_err(|_: nom::Err<nom::error::Error<&str>>| {
                    line_error(&line, "malformed else")
                })?;
            otherwise = Some(parse_body_of(lines, pos, indent, inline)?);
            break;
        } else {
            break;
        }
    }

    Ok(Stmt::Conditional {
        branches,
        otherwise,
    })
}

fn header<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, Expr> {
    preceded(
        keyword(kw),
        terminated(or_expr, pair(multispace0, pchar(':'))),
    )
}

/// Parses the body following a header line at `*pos`, inline or indented.
fn parse_body_of(
    lines: &[Line<'_>],
    pos: &mut usize,
    indent: usize,
    inline: &str,
) -> Result<Vec<Stmt>> {
    let header_line = lines[*pos];
    *pos += 1;
    let inline = inline.trim();
    if !inline.is_empty() {
        let line = Line {
            content: inline,
            ..header_line
        };
        return Ok(vec![parse_return(&line)?]);
    }
    match lines.get(*pos) {
        Some(next) if next.indent > indent => parse_block(lines, pos, next.indent),
        _ => Err(line_error(&header_line, "expected an indented block")),
    }
}

fn parse_return(line: &Line<'_>) -> Result<Stmt> {
    let index = map_res(recognize(pair(opt(pchar('-')), digit1)), str::parse::<i32>);
    let target = alt((
        map(index, ReturnTarget::Index),
        map(raw_ident, |name: &str| ReturnTarget::Label(name.to_string())),
    ));
    all_consuming(delimited(
        pair(keyword("return"), multispace0),
        target,
        multispace0,
    ))(line.content)
    .map(|(_, target)| Stmt::Return(target))
    .map_err(|_| line_error(line, "expected `return <LABEL>` or `return <index>`"))
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
