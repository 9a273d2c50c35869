use super::*;

fn sample() -> FeatureMatrix {
    FeatureMatrix::new(
        vec!["a".into(), "b".into(), "c".into()],
        vec![
            ("x".into(), vec![1.0, 2.0, 3.0]),
            ("y".into(), vec![10.0, 20.0, 30.0]),
        ],
    )
    .expect("valid matrix")
}

#[test]
fn test_new_and_shape() {
    let fm = sample();
    assert_eq!(fm.shape(), (3, 2));
    assert_eq!(fm.column_names(), vec!["x", "y"]);
    assert_eq!(fm.keys(), &["a", "b", "c"]);
}

#[test]
fn test_duplicate_key_rejected() {
    let result = FeatureMatrix::new(
        vec!["a".into(), "a".into()],
        vec![("x".into(), vec![1.0, 2.0])],
    );
    assert!(result.is_err());
}

#[test]
fn test_column_length_mismatch() {
    let result = FeatureMatrix::new(
        vec!["a".into(), "b".into()],
        vec![("x".into(), vec![1.0])],
    );
    assert!(matches!(result, Err(LabelError::DimensionMismatch { .. })));
}

#[test]
fn test_duplicate_column_rejected() {
    let result = FeatureMatrix::new(
        vec!["a".into()],
        vec![("x".into(), vec![1.0]), ("x".into(), vec![2.0])],
    );
    assert!(result.is_err());
}

#[test]
fn test_missing_column_is_missing_feature() {
    let fm = sample();
    assert!(matches!(
        fm.column("z"),
        Err(LabelError::MissingFeature { ref feature }) if feature == "z"
    ));
}

#[test]
fn test_row_lookup() {
    let fm = sample();
    let row = fm.row_by_key("b").expect("key b");
    assert_eq!(row.key(), "b");
    assert_eq!(row.index(), 1);
    assert_eq!(row.feature("y"), Some(20.0));
    assert!(fm.row_by_key("zz").is_none());
}

#[test]
fn test_label_column_excluded_from_features() {
    let fm = sample()
        .with_label_column("label", vec![0, -1, 1])
        .expect("label column");
    assert_eq!(fm.column_names(), vec!["x", "y"]);
    assert!(!fm.has_column("label"));
    assert_eq!(fm.label_column().map(|l| l.values.clone()), Some(vec![0, -1, 1]));
}

#[test]
fn test_label_column_collision() {
    assert!(sample().with_label_column("x", vec![0, 0, 0]).is_err());
}

#[test]
fn test_select_and_select_rows() {
    let fm = sample().with_label_column("label", vec![0, 1, 1]).expect("labels");
    let sel = fm.select(&["y"]).expect("y exists");
    assert_eq!(sel.column_names(), vec!["y"]);
    assert!(sel.label_column().is_none());

    let sub = fm.select_rows(&[2, 0]);
    assert_eq!(sub.keys(), &["c", "a"]);
    assert_eq!(sub.column("x").expect("x"), &[3.0, 1.0]);
    assert_eq!(sub.row_index("a"), Some(1));
    assert_eq!(sub.label_column().map(|l| l.values.clone()), Some(vec![1, 0]));
}

#[test]
fn test_to_matrix_row_major() {
    let m = sample().to_matrix();
    assert_eq!(m.shape(), (3, 2));
    assert_eq!(m.row(2), &[3.0, 30.0]);
}

#[test]
fn test_json_roundtrip_validates() {
    let fm = sample().with_label_column("label", vec![0, 1, -1]).expect("labels");
    let json = serde_json::to_string(&fm).expect("serialize");
    let back: FeatureMatrix = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, fm);

    let bad = r#"{"keys":["a"],"columns":[{"name":"x","values":[1.0,2.0]}]}"#;
    assert!(serde_json::from_str::<FeatureMatrix>(bad).is_err());
}

#[test]
fn test_map_lookup() {
    let mut row = HashMap::new();
    row.insert("x".to_string(), 4.0_f32);
    assert_eq!(row.feature("x"), Some(4.0));
    assert_eq!(row.feature("y"), None);
}
