// =========================================================================
// FALSIFY-SKF: StratifiedKFold cross-validation contract
//
// References:
//   - Stone (1974) "Cross-Validatory Choice and Assessment of Predictions"
//   - Kohavi (1995) "A Study of Cross-Validation and Bootstrap"
// =========================================================================

use super::*;

fn labels(n: usize, classes: usize) -> Vec<usize> {
    (0..n).map(|i| (i * 7 + i / 3) % classes).collect()
}

/// FALSIFY-SKF-001: produces exactly K splits
#[test]
fn falsify_skf_001_produces_k_splits() {
    let splits = StratifiedKFold::new(5).split(&labels(100, 3)).expect("valid");
    assert_eq!(splits.len(), 5, "FALSIFIED SKF-001: splits={}", splits.len());
}

/// FALSIFY-SKF-002: every sample appears in exactly one test fold
#[test]
fn falsify_skf_002_every_sample_in_one_test_fold() {
    let y = labels(23, 2);
    let splits = StratifiedKFold::new(5).split(&y).expect("valid");

    let mut test_counts = vec![0usize; y.len()];
    for (_train, test) in &splits {
        for &idx in test {
            test_counts[idx] += 1;
        }
    }
    for (i, &count) in test_counts.iter().enumerate() {
        assert_eq!(
            count, 1,
            "FALSIFIED SKF-002: sample {i} appeared in {count} test folds (expected 1)"
        );
    }
}

/// FALSIFY-SKF-003: train and test of each fold are disjoint and cover all
#[test]
fn falsify_skf_003_train_test_partition() {
    let y = labels(17, 3);
    for (fold, (train, test)) in StratifiedKFold::new(4).split(&y).expect("valid").iter().enumerate() {
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(
            all,
            (0..17).collect::<Vec<_>>(),
            "FALSIFIED SKF-003: fold {fold} is not a partition"
        );
    }
}

/// FALSIFY-SKF-004: fold sizes differ by at most one, none empty
#[test]
fn falsify_skf_004_balanced_sizes() {
    // Uneven classes that would leave trailing folds empty without rotation
    let y = [0, 0, 0, 1, 1];
    let splits = StratifiedKFold::new(5).split(&y).expect("valid");
    for (_, test) in &splits {
        assert_eq!(test.len(), 1, "FALSIFIED SKF-004: held-out size {}", test.len());
    }
}

/// FALSIFY-SKF-005: class proportions are preserved per fold
#[test]
fn falsify_skf_005_stratified() {
    let y: Vec<usize> = (0..30).map(|i| usize::from(i % 3 == 0)).collect();
    for (_, test) in StratifiedKFold::new(5).split(&y).expect("valid") {
        let ones = test.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(ones, 2, "FALSIFIED SKF-005: {ones} minority rows in a fold of {}", test.len());
    }
}

/// FALSIFY-SKF-006: same seed, same folds; shuffle off is seed independent
#[test]
fn falsify_skf_006_deterministic() {
    let y = labels(40, 4);
    let a = StratifiedKFold::new(5).split(&y).expect("valid");
    let b = StratifiedKFold::new(5).with_random_state(DEFAULT_RANDOM_STATE).split(&y).expect("valid");
    assert_eq!(a, b);

    let plain = StratifiedKFold::new(2).with_shuffle(false);
    let splits = plain.split(&[0, 0, 1, 1]).expect("valid");
    assert_eq!(splits[0], (vec![1, 3], vec![0, 2]));
    assert_eq!(splits[1], (vec![0, 2], vec![1, 3]));
}

/// FALSIFY-SKF-007: invalid split counts are rejected
#[test]
fn falsify_skf_007_invalid_counts() {
    assert!(StratifiedKFold::new(1).split(&[0, 1, 0]).is_err());
    assert!(StratifiedKFold::new(4).split(&[0, 1, 0]).is_err());
    assert_eq!(StratifiedKFold::new(3).n_splits(), 3);
}

#[test]
fn test_check_folds() {
    assert_eq!(check_folds(0, 10).expect("disabled"), None);
    assert_eq!(check_folds(5, 10).expect("valid"), Some(5));
    assert_eq!(check_folds(10, 10).expect("leave one out"), Some(10));
    assert!(matches!(
        check_folds(1, 10),
        Err(LabelError::InvalidHyperparameter { .. })
    ));
    assert!(check_folds(11, 10).is_err());
}

#[test]
fn test_run_folds_preserves_order() {
    let splits = StratifiedKFold::new(4).split(&labels(20, 2)).expect("valid");
    let sizes = run_folds(&splits, |fold, train, test| (fold, train.len() + test.len()));
    assert_eq!(sizes, vec![(0, 20), (1, 20), (2, 20), (3, 20)]);
}
