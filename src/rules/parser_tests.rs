use super::*;

fn normalized(text: &str) -> String {
    RuleParser::new().parse(text).expect("valid rule").normalized
}

#[test]
fn test_simple_comparison() {
    assert_eq!(normalized("mean > 0.5"), "(mean > 0.5)");
}

#[test]
fn test_connectives_unified() {
    assert_eq!(
        normalized("(robust_dispersion_ > 0.5 or robust_dispersion_ < 0.2) | var == 0.2 | (perc_avail_ > 1 & median <= 7)"),
        "(((robust_dispersion_ > 0.5) or (robust_dispersion_ < 0.2)) or (var == 0.2) or ((perc_avail_ > 1) and (median <= 7)))"
    );
}

#[test]
fn test_and_binds_tighter_than_or() {
    assert_eq!(normalized("a > 1 or b > 2 and c > 3"), "((a > 1) or ((b > 2) and (c > 3)))");
}

#[test]
fn test_chained_comparison_kept() {
    assert_eq!(normalized("0.2 < x <= 0.5"), "(0.2 < x <= 0.5)");
}

#[test]
fn test_negative_literal_folded() {
    let parsed = RuleParser::new().parse("x > -3.5").expect("valid");
    assert_eq!(parsed.normalized, "(x > -3.5)");
    match parsed.body {
        RuleBody::Expression(Expr::Comparison { links, .. }) => {
            assert_eq!(links[0].1, Expr::Literal(Literal::Number(-3.5)));
        }
        other => panic!("unexpected body {other:?}"),
    }
}

#[test]
fn test_unary_minus_on_feature_and_not() {
    assert_eq!(normalized("-x < 2"), "(-x < 2)");
    assert_eq!(normalized("not x > 1"), "(not (x > 1))");
    assert_eq!(normalized("not flag"), "(not flag)");
}

#[test]
fn test_bool_literals_and_bare_feature() {
    assert_eq!(normalized("flag and True"), "(flag and True)");
}

#[test]
fn test_keyword_prefix_is_identifier() {
    let parsed = RuleParser::new().parse("android > 1 or notch < 2").expect("valid");
    assert!(parsed.features.contains("android"));
    assert!(parsed.features.contains("notch"));
}

#[test]
fn test_feature_table_rendering() {
    let mut parser = RuleParser::new().with_feature_table("fm");
    let parsed = parser.parse("a > 1 & b < 2").expect("valid");
    assert_eq!(parsed.normalized, r#"((fm["a"] > 1) and (fm["b"] < 2))"#);
}

#[test]
fn test_subscript_reference_reparses_to_same_rule() {
    let qualified = RuleParser::new()
        .with_feature_table("fm")
        .parse("a > 1 & b < 2")
        .expect("valid")
        .normalized;
    assert_eq!(normalized(&qualified), "((a > 1) and (b < 2))");
}

#[test]
fn test_non_identifier_feature_uses_default_table() {
    let parsed = RuleParser::new().parse(r#"fm["value mean"] > 1"#).expect("valid");
    assert!(parsed.features.contains("value mean"));
    assert_eq!(parsed.normalized, r#"(fm["value mean"] > 1)"#);
}

#[test]
fn test_features_accumulate_across_calls() {
    let mut parser = RuleParser::new();
    parser.parse("a > 1").expect("valid");
    parser.parse("b > 1 and a < 3").expect("valid");
    assert_eq!(
        parser.features().iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["a", "b"]
    );
    parser.clear_features();
    assert!(parser.features().is_empty());
}

#[test]
fn test_failed_parse_adds_no_features() {
    let mut parser = RuleParser::new();
    assert!(parser.parse("a > ").is_err());
    assert!(parser.features().is_empty());
}

#[test]
fn test_syntax_errors() {
    for bad in ["", "a >", "a > > 1", "(a > 1", "a = 1", "a > 1 b", "x > 1.5e", "and"] {
        let err = RuleParser::new().parse(bad).expect_err(bad);
        assert!(matches!(err, LabelError::Parse { .. }), "{bad}: {err}");
    }
}

#[test]
fn test_comment_ignored_in_expression() {
    assert_eq!(normalized("a > 1 # high values"), "(a > 1)");
}

const NESTED: &str = "
if perc_avail_ < 0.3:
    if robust_dispersion_ > 0.2:
        return 1
    else:
        if mean > 0 and median > 0:
            return 0
        elif perc_avail_ > 0.99:
            return 1
else:
    return 0";

#[test]
fn test_nested_program_rendering() {
    let parsed = RuleParser::new().parse(NESTED).expect("valid program");
    assert!(parsed.is_program());
    assert_eq!(
        parsed.normalized,
        "if (perc_avail_ < 0.3):\n\tif (robust_dispersion_ > 0.2):\n\t\treturn 1\n\telse:\n\t\tif ((mean > 0) and (median > 0)):\n\t\t\treturn 0\n\t\telif (perc_avail_ > 0.99):\n\t\t\treturn 1\nelse:\n\treturn 0"
    );
    assert_eq!(parsed.features.len(), 4);
}

#[test]
fn test_program_renormalizes_identically() {
    let once = normalized(NESTED);
    assert_eq!(normalized(&once), once);
}

#[test]
fn test_inline_return_and_labels() {
    let parsed = RuleParser::new()
        .parse("if noise > 2: return HIGH_NOISE\nelif noise < 0: return ABSTAIN\nreturn 0")
        .expect("valid program");
    assert_eq!(
        parsed.normalized,
        "if (noise > 2):\n\treturn HIGH_NOISE\nelif (noise < 0):\n\treturn ABSTAIN\nreturn 0"
    );
    assert_eq!(parsed.features.len(), 1);
}

#[test]
fn test_tabs_and_spaces_mix_to_same_levels() {
    let parsed = RuleParser::new()
        .parse("if a > 1:\n\treturn 1\nelse:\n        return -1")
        .expect("tab equals eight spaces");
    assert_eq!(parsed.normalized, "if (a > 1):\n\treturn 1\nelse:\n\treturn -1");
}

#[test]
fn test_indented_program_is_dedented() {
    let parsed = RuleParser::new()
        .parse("    if a > 1:\n        return 1  # high\n")
        .expect("valid program");
    assert_eq!(parsed.normalized, "if (a > 1):\n\treturn 1");
}

#[test]
fn test_program_errors() {
    for bad in [
        "if a > 1:\nreturn 1",
        "if a > 1\n\treturn 1",
        "if a > 1:\n\treturn 1\n\t\treturn 2",
        "elif a > 1:\n\treturn 1",
        "if a > 1:\n\treturn 1 + 2",
        "if a > 1:\n\t\treturn 1\n\treturn 2",
        "return",
    ] {
        let err = RuleParser::new().parse(bad).expect_err(bad);
        assert!(matches!(err, LabelError::Parse { .. }), "{bad}: {err}");
    }
}

#[test]
fn test_is_identifier() {
    assert!(is_identifier("perc_avail_"));
    assert!(!is_identifier("value mean"));
    assert!(!is_identifier("or"));
    assert!(!is_identifier("1abc"));
}

#[test]
fn test_out_of_range_number_rejected() {
    let mut parser = RuleParser::new();
    assert!(matches!(parser.parse("x > 1e39"), Err(LabelError::Parse { .. })));
    assert!(matches!(parser.parse("x > -1e39"), Err(LabelError::Parse { .. })));
    assert_eq!(normalized("x > 3e38"), "(x > 300000000000000000000000000000000000000)");
}
