// =========================================================================
// FALSIFY-MC: classification metrics contract
//
// References:
//   - Sokolova & Lapalme (2009) "A systematic analysis of performance measures"
// =========================================================================

use super::*;
use crate::primitives::Matrix;

/// FALSIFY-MC-001: Accuracy ∈ [0, 1]
#[test]
fn falsify_mc_001_accuracy_bounded() {
    let y_true = vec![0, 1, 2, 0, 1, 2];
    let y_pred = vec![0, 2, 1, 0, 0, 1];

    let acc = accuracy(&y_pred, &y_true);
    assert!(
        (0.0..=1.0).contains(&acc),
        "FALSIFIED MC-001: accuracy={acc} not in [0, 1]"
    );
}

/// FALSIFY-MC-002: Perfect predictions → accuracy = precision = recall = 1.0
#[test]
fn falsify_mc_002_perfect_scores() {
    let y = vec![0, 1, 2, 0, 1, 2];
    for (name, score) in [
        ("accuracy", accuracy(&y, &y)),
        ("precision", precision(&y, &y, Average::Weighted)),
        ("recall", recall(&y, &y, Average::Weighted)),
    ] {
        assert!(
            (score - 1.0).abs() < 1e-6,
            "FALSIFIED MC-002: {name}={score} for perfect predictions, expected 1.0"
        );
    }
}

/// FALSIFY-MC-003: a never-predicted class contributes precision 0
#[test]
fn falsify_mc_003_zero_division_is_zero() {
    let y_true = vec![0, 0, 1, 1];
    let y_pred = vec![0, 0, 0, 0];
    // class 0: precision 2/4, class 1: no predictions → 0
    let prec = precision(&y_pred, &y_true, Average::Weighted);
    assert!((prec - 0.25).abs() < 1e-6, "FALSIFIED MC-003: precision={prec}");
    let rec = recall(&y_pred, &y_true, Average::Weighted);
    assert!((rec - 0.5).abs() < 1e-6, "FALSIFIED MC-003: recall={rec}");
}

/// FALSIFY-MC-004: weighted recall equals accuracy
#[test]
fn falsify_mc_004_weighted_recall_is_accuracy() {
    let y_true = vec![0, 1, 2, 2, 1, 0, 2];
    let y_pred = vec![0, 2, 2, 1, 1, 0, 0];
    let rec = recall(&y_pred, &y_true, Average::Weighted);
    let acc = accuracy(&y_pred, &y_true);
    assert!((rec - acc).abs() < 1e-6, "FALSIFIED MC-004: recall={rec} accuracy={acc}");
}

/// FALSIFY-MC-005: abstain is scored as an ordinary class
#[test]
fn falsify_mc_005_signed_labels() {
    let y_true = vec![0, 1, 1, 0];
    let y_pred = vec![0, 1, -1, -1];
    assert!((accuracy(&y_pred, &y_true) - 0.5).abs() < 1e-6);
    // -1 has no support, so it only lowers recall of the classes it stole from
    let prec = precision(&y_pred, &y_true, Average::Weighted);
    assert!((prec - 1.0).abs() < 1e-6, "FALSIFIED MC-005: precision={prec}");
    let rec = recall(&y_pred, &y_true, Average::Weighted);
    assert!((rec - 0.5).abs() < 1e-6, "FALSIFIED MC-005: recall={rec}");
}

#[test]
fn test_macro_and_micro() {
    let y_true = vec![0, 0, 1, 1];
    let y_pred = vec![0, 1, 1, 1];
    assert!((precision(&y_pred, &y_true, Average::Macro) - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-6);
    assert!((recall(&y_pred, &y_true, Average::Macro) - 0.75).abs() < 1e-6);
    assert!((precision(&y_pred, &y_true, Average::Micro) - 0.75).abs() < 1e-6);
}

#[test]
fn test_confusion_matrix_ignores_out_of_range() {
    let cm = confusion_matrix(&[0, 1, 5], &[0, 0, 1], 2);
    assert_eq!(cm.shape(), (2, 2));
    assert_eq!(cm.row(0), &[1, 1]);
    assert_eq!(cm.row(1), &[0, 0]);
}

#[test]
fn test_log_loss_clips_and_normalizes() {
    let certain_wrong = Matrix::from_vec(1, 2, vec![1.0, 0.0]).expect("1x2");
    let loss = log_loss(&[1], &certain_wrong);
    assert!((loss - 34.538_776).abs() < 1e-3, "clipped at 1e-15, got {loss}");

    let unnormalized = Matrix::from_vec(1, 2, vec![2.0, 2.0]).expect("1x2");
    assert!((log_loss(&[0], &unnormalized) - std::f32::consts::LN_2).abs() < 1e-6);

    let empty = Matrix::from_vec(0, 2, Vec::new()).expect("0x2");
    assert_eq!(log_loss(&[], &empty), 0.0);
}

#[test]
#[should_panic(expected = "Vectors cannot be empty")]
fn test_accuracy_empty_panics() {
    let _ = accuracy::<usize>(&[], &[]);
}

mod mc_proptest_falsify {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// FALSIFY-MC-001-prop: metrics in [0, 1] for random labels
        #[test]
        fn falsify_mc_001_prop_bounded(
            y_true in proptest::collection::vec(0usize..4, 1..40),
            shift in 0usize..4,
        ) {
            let y_pred: Vec<usize> = y_true.iter().enumerate().map(|(i, &y)| (y + shift * (i % 2)) % 4).collect();
            for score in [
                accuracy(&y_pred, &y_true),
                precision(&y_pred, &y_true, Average::Weighted),
                recall(&y_pred, &y_true, Average::Weighted),
            ] {
                prop_assert!((0.0..=1.0 + 1e-6).contains(&score), "FALSIFIED MC-001-prop: {}", score);
            }
        }
    }
}
