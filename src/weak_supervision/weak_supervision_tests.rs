use super::*;

fn votes(rows: &[&[i32]]) -> Matrix<i32> {
    let rows: Vec<Vec<i32>> = rows.iter().map(|r| r.to_vec()).collect();
    Matrix::from_rows(&rows).expect("rectangular votes")
}

const A: i32 = ABSTAIN;

#[test]
fn test_lf_output() {
    let abstain = LFOutput::Abstain;
    let label = LFOutput::Label(1);

    assert_eq!(abstain.to_i32(), -1);
    assert_eq!(label.to_i32(), 1);

    assert_eq!(LFOutput::from_i32(-1), LFOutput::Abstain);
    assert_eq!(LFOutput::from_i32(2), LFOutput::Label(2));
    assert!(LFOutput::from_i32(-7).is_abstain());
}

#[test]
fn test_tie_break_policy_serde() {
    let json = serde_json::to_string(&TieBreakPolicy::TrueRandom).expect("serialize");
    assert_eq!(json, "\"true_random\"");
    assert_eq!(TieBreakPolicy::default(), TieBreakPolicy::Abstain);
}

// ============================================================================
// Majority voter
// ============================================================================

#[test]
fn test_majority_five_item_example() {
    let l = votes(&[&[0, 0, 1], &[1, 1, 0], &[0, A, 0], &[1, 1, 1], &[A, 0, 0]]);
    let preds = MajorityLabelVoter::new(2)
        .predict(&l, TieBreakPolicy::Abstain, None)
        .expect("valid votes");
    assert_eq!(preds, vec![0, 1, 0, 1, 0]);
}

#[test]
fn test_majority_two_against_one() {
    let l = votes(&[&[2, 2, 1]]);
    let preds = MajorityLabelVoter::new(3)
        .predict(&l, TieBreakPolicy::Abstain, None)
        .expect("valid votes");
    assert_eq!(preds, vec![2]);
}

#[test]
fn test_majority_all_abstain() {
    let l = votes(&[&[A, A, A]]);
    let voter = MajorityLabelVoter::new(2);
    let probs = voter.predict_proba(&l).expect("valid votes");
    assert_eq!(probs.row(0), &[0.5, 0.5]);
    assert_eq!(
        voter.predict(&l, TieBreakPolicy::Abstain, None).expect("valid"),
        vec![ABSTAIN]
    );
}

#[test]
fn test_majority_proba_is_vote_fraction() {
    let l = votes(&[&[0, 1, 1, A]]);
    let probs = MajorityLabelVoter::new(3).predict_proba(&l).expect("valid");
    assert!((probs.get(0, 0) - 1.0 / 3.0).abs() < 1e-6);
    assert!((probs.get(0, 1) - 2.0 / 3.0).abs() < 1e-6);
    assert_eq!(probs.get(0, 2), 0.0);
}

#[test]
fn test_majority_rejects_out_of_range_vote() {
    let l = votes(&[&[0, 5, 1]]);
    assert!(MajorityLabelVoter::new(2).predict_proba(&l).is_err());
}

#[test]
fn test_random_tie_break_picks_tied_class_deterministically() {
    let l = votes(&[&[0, 1, A, 2], &[1, 2, A, A], &[0, 0, 1, 2]]);
    let voter = MajorityLabelVoter::new(3);
    let first = voter.predict(&l, TieBreakPolicy::Random, Some(7)).expect("valid");
    let second = voter.predict(&l, TieBreakPolicy::Random, Some(7)).expect("valid");
    assert_eq!(first, second);
    assert!([0, 1, 2].contains(&first[0]));
    assert!([1, 2].contains(&first[1]));
    assert_eq!(first[2], 0);
}

#[test]
fn test_true_random_covers_cardinality() {
    let rows: Vec<Vec<i32>> = (0..200).map(|_| vec![A, A, A]).collect();
    let l = Matrix::from_rows(&rows).expect("rectangular");
    let preds = MajorityLabelVoter::new(4)
        .predict(&l, TieBreakPolicy::TrueRandom, Some(1))
        .expect("valid");
    for class in 0..4 {
        assert!(preds.contains(&class), "class {class} never drawn");
    }
    assert!(!preds.contains(&ABSTAIN));
}

#[test]
fn test_probs_to_preds_tolerance() {
    let probs = Matrix::from_vec(2, 2, vec![0.5, 0.500_001, 0.4, 0.6]).expect("2x2");
    assert_eq!(
        probs_to_preds(&probs, TieBreakPolicy::Abstain, None),
        vec![ABSTAIN, 1]
    );
}

#[test]
fn test_coverage() {
    let l = votes(&[
        &[0, 0, A],
        &[1, A, A],
        &[A, 1, 1],
        &[0, 0, 0],
    ]);
    let coverage = lf_coverage(&l);
    assert_eq!(coverage.len(), 3);
    assert!((coverage[0] - 0.75).abs() < 1e-5);
    assert!((coverage[1] - 0.75).abs() < 1e-5);
    assert!((coverage[2] - 0.5).abs() < 1e-5);
}

// ============================================================================
// Label model
// ============================================================================

#[test]
fn test_label_model_creation() {
    let model = LabelModel::new(3, 5);
    assert_eq!(model.n_classes(), 3);
    assert_eq!(model.n_lfs(), 5);
    assert_eq!(model.class_priors().len(), 3);
    assert!(model.accuracies().iter().all(|&a| (a - 0.7).abs() < 1e-5));
}

#[test]
fn test_label_model_fit_learns_agreement() {
    let l = votes(&[
        &[0, 0, A],
        &[1, 1, 1],
        &[0, A, 0],
        &[A, 1, 1],
        &[0, 0, 0],
        &[1, 1, A],
    ]);
    let mut model = LabelModel::new(2, 3);
    model.fit(&l, 100, 123).expect("fit");
    assert!(model.fitted_epochs() >= 1);
    assert!(model.accuracies().iter().all(|&a| a > 0.7));
    assert_eq!(
        model.predict(&l, TieBreakPolicy::Abstain, None).expect("predict"),
        vec![0, 1, 0, 1, 0, 1]
    );
}

#[test]
fn test_label_model_fit_is_deterministic() {
    let l = votes(&[&[0, 1, A], &[1, 1, 0], &[0, 0, 1], &[A, 1, 1]]);
    let mut a = LabelModel::new(2, 3);
    let mut b = LabelModel::new(2, 3);
    a.fit(&l, 50, 9).expect("fit");
    b.fit(&l, 50, 9).expect("fit");
    assert_eq!(a, b);
}

#[test]
fn test_label_model_proba_rows_sum_to_one() {
    let l = votes(&[&[0, 0], &[1, A]]);
    let mut model = LabelModel::new(2, 2);
    model.fit(&l, 20, 1).expect("fit");
    let probs = model.predict_proba(&l).expect("proba");
    for row in probs.iter_rows() {
        let sum: f32 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }
    assert!(probs.get(0, 0) > probs.get(0, 1));
}

#[test]
fn test_label_model_all_abstain_row_gets_priors() {
    let l = votes(&[&[0, 0, 0], &[0, 0, A], &[1, 1, 1], &[A, A, A]]);
    let mut model = LabelModel::new(2, 3);
    model.fit(&l, 50, 123).expect("fit");
    let probs = model.predict_proba(&l).expect("proba");
    for (c, &prior) in model.class_priors().iter().enumerate() {
        assert!((probs.get(3, c) - prior).abs() < 1e-5);
    }
}

#[test]
fn test_label_model_shape_mismatch() {
    let l = votes(&[&[0, 0]]);
    let mut model = LabelModel::new(2, 3);
    assert!(matches!(
        model.fit(&l, 10, 0),
        Err(LabelError::DimensionMismatch { .. })
    ));
}
