use std::collections::BTreeSet;

use super::*;
use crate::nn::MlpConfig;
use crate::scoring::FoldOutcome;

/// Two well separated blobs of ten rows each; rows 0..10 are class 0.
fn blobs() -> (Matrix<f32>, Vec<i32>) {
    let mut data = Vec::new();
    let mut labels = Vec::new();
    for (class, centre) in [(0, -2.0f32), (1, 2.0f32)] {
        for i in 0..10 {
            let jitter = (i as f32 - 4.5) * 0.1;
            data.push(centre + jitter);
            data.push(centre - jitter);
            labels.push(class);
        }
    }
    (Matrix::from_vec(20, 2, data).expect("20x2"), labels)
}

fn hard_input() -> SurrogateInput {
    let (x, labels) = blobs();
    SurrogateInput::new(x, Targets::Hard { labels }, 2).expect("consistent")
}

fn small_network() -> MlpConfig {
    MlpConfig::default()
        .with_hidden(vec![8])
        .with_dropout(0.1)
        .with_learning_rate(0.05)
        .with_batch_size(8)
        .with_epochs(100)
        .with_seed(3)
}

fn assert_partition(metrics: &[FoldMetrics], rows: &[usize]) {
    let mut seen = BTreeSet::new();
    for m in metrics {
        for &i in &m.held_out {
            assert!(seen.insert(i), "row {i} held out twice");
        }
    }
    assert_eq!(seen.into_iter().collect::<Vec<_>>(), rows);
}

#[test]
fn test_input_validation() {
    let (x, labels) = blobs();
    assert!(SurrogateInput::new(x.clone(), Targets::Hard { labels: labels.clone() }, 1).is_err());
    assert!(matches!(
        SurrogateInput::new(x.clone(), Targets::Hard { labels: vec![0; 3] }, 2),
        Err(LabelError::DimensionMismatch { .. })
    ));
    let mut bad = labels.clone();
    bad[4] = 2;
    assert!(SurrogateInput::new(x.clone(), Targets::Hard { labels: bad }, 2).is_err());
    let probabilities = Matrix::filled(20, 3, 1.0 / 3.0);
    assert!(SurrogateInput::new(x.clone(), Targets::Soft { probabilities }, 2).is_err());
    let votes = Matrix::filled(20, 3, 5);
    assert!(SurrogateInput::new(x, Targets::Votes { votes, labels }, 2).is_err());
}

#[test]
fn test_reference_labels_and_targets() {
    let x = Matrix::from_vec(3, 1, vec![0.0, 1.0, 2.0]).expect("3x1");
    let probabilities = Matrix::from_vec(3, 2, vec![0.8, 0.2, 0.3, 0.7, 0.5, 0.5]).expect("3x2");
    let soft = SurrogateInput::new(x.clone(), Targets::Soft { probabilities }, 2).expect("ok");
    assert_eq!(soft.reference_labels(), vec![0, 1, 0]);
    assert_eq!(soft.labeled_rows(), vec![0, 1, 2]);

    let hard = SurrogateInput::new(x, Targets::Hard { labels: vec![1, ABSTAIN, 0] }, 2).expect("ok");
    assert_eq!(hard.labeled_rows(), vec![0, 2]);
    let t = hard.soft_targets();
    assert_eq!(t.row(0), &[0.0, 1.0]);
    assert_eq!(t.row(1), &[0.5, 0.5]);
    assert_eq!(t.row(2), &[1.0, 0.0]);
}

#[test]
fn test_config_defaults_and_serde() {
    assert_eq!(SurrogateConfig::default().kind(), SurrogateKind::ClosedForm);
    assert_eq!(SurrogateConfig::default().default_folds(), 5);
    let e2e = SurrogateConfig::EndToEnd(EndToEndConfig::default());
    assert_eq!(e2e.default_folds(), 0);
    if let SurrogateConfig::EndToEnd(c) = &e2e {
        assert_eq!(c.network.hidden, vec![10, 10, 5]);
        assert_eq!(c.network.dropout, 0.3);
        assert_eq!(c.temperature, 2.0);
        assert!(c.sqrt_scaling);
    }

    let neural = SurrogateConfig::Neural(NeuralConfig::default());
    let json = serde_json::to_string(&neural).expect("serializable");
    assert!(json.contains("\"variant\":\"neural\""));
    let back: SurrogateConfig = serde_json::from_str(&json).expect("round trip");
    assert_eq!(back, neural);

    let partial: SurrogateConfig =
        serde_json::from_str(r#"{"variant":"closed_form","c":10.0}"#).expect("defaults fill in");
    assert_eq!(
        partial,
        SurrogateConfig::ClosedForm(ClosedFormConfig::default().with_c(10.0))
    );
}

#[test]
fn test_closed_form_five_folds_partition_rows() {
    let input = hard_input();
    let mut model = ClosedFormSurrogate::new(ClosedFormConfig::default());
    let metrics = model.train(&input, 5).expect("trains");
    assert_eq!(metrics.len(), 5);
    assert_partition(&metrics, &(0..20).collect::<Vec<_>>());
    for m in &metrics {
        let scores = m.scores().expect("every fold has both classes");
        assert_eq!(scores.accuracy, 1.0);
    }
    assert_eq!(model.predict(input.features()).expect("trained"), input.reference_labels());
    assert_eq!(model.reference_labels(), Some(input.reference_labels().as_slice()));
    assert_eq!(model.kind(), SurrogateKind::ClosedForm);
}

#[test]
fn test_closed_form_folds_cover_abstain_rows() {
    let (x, mut labels) = blobs();
    for i in (0..20).step_by(5) {
        labels[i] = ABSTAIN;
    }
    let input = SurrogateInput::new(x, Targets::Hard { labels }, 2).expect("ok");
    let mut model = ClosedFormSurrogate::new(ClosedFormConfig::default());
    let metrics = model.train(&input, 5).expect("trains");
    assert_eq!(metrics.len(), 5);
    assert_partition(&metrics, &(0..20).collect::<Vec<_>>());
    // abstaining rows are held out but not scored
    for m in &metrics {
        assert_eq!(m.scores().expect("labeled rows in every fold").accuracy, 1.0);
    }
}

#[test]
fn test_neural_hard_targets_folds_cover_abstain_rows() {
    let (x, mut labels) = blobs();
    labels[2] = ABSTAIN;
    labels[17] = ABSTAIN;
    let input = SurrogateInput::new(x, Targets::Hard { labels }, 2).expect("ok");
    let config = NeuralConfig::default().with_network(small_network());
    let mut model = NeuralSurrogate::new(config);
    let metrics = model.train(&input, 4).expect("trains");
    assert_partition(&metrics, &(0..20).collect::<Vec<_>>());
    assert!(metrics.iter().all(|m| m.scores().is_some()));
}

#[test]
fn test_all_abstain_targets_fail() {
    let (x, _) = blobs();
    let input = SurrogateInput::new(x, Targets::Hard { labels: vec![ABSTAIN; 20] }, 2).expect("ok");
    let mut model = ClosedFormSurrogate::new(ClosedFormConfig::default());
    assert!(matches!(model.train(&input, 5), Err(LabelError::Training(_))));
}

#[test]
fn test_fold_count_validation() {
    let input = hard_input();
    let mut model = ClosedFormSurrogate::new(ClosedFormConfig::default());
    assert!(matches!(
        model.train(&input, 1),
        Err(LabelError::InvalidHyperparameter { .. })
    ));
    assert!(model.train(&input, 21).is_err());
    let metrics = model.train(&input, 0).expect("no cross-validation");
    assert!(metrics.is_empty());
    assert!(model.predict(input.features()).is_ok());
}

#[test]
fn test_single_class_fold_is_marked_failed() {
    let x = Matrix::from_vec(4, 1, vec![-1.0, -2.0, -3.0, 3.0]).expect("4x1");
    let input = SurrogateInput::new(x, Targets::Hard { labels: vec![0, 0, 0, 1] }, 2).expect("ok");
    let mut model = ClosedFormSurrogate::new(ClosedFormConfig::default());
    let metrics = model.train(&input, 2).expect("final model has two classes");
    let failed = metrics
        .iter()
        .filter(|m| matches!(m.outcome, FoldOutcome::Failed { .. }))
        .count();
    assert_eq!(failed, 1);
    assert_eq!(metrics.iter().filter(|m| m.scores().is_some()).count(), 1);
}

#[test]
fn test_single_class_dataset_fails() {
    let x = Matrix::from_vec(2, 1, vec![0.0, 1.0]).expect("2x1");
    let input = SurrogateInput::new(x, Targets::Hard { labels: vec![1, 1] }, 2).expect("ok");
    let mut model = ClosedFormSurrogate::new(ClosedFormConfig::default());
    assert!(matches!(model.train(&input, 0), Err(LabelError::Training(_))));
}

#[test]
fn test_predict_before_train() {
    let (x, _) = blobs();
    let model = ClosedFormSurrogate::new(ClosedFormConfig::default());
    assert!(matches!(model.predict(&x), Err(LabelError::InvalidState { .. })));
    assert!(model.reference_labels().is_none());
}

#[test]
fn test_memoised_training() {
    let input = hard_input();
    let mut model = ClosedFormSurrogate::new(ClosedFormConfig::default());
    let first = model.train(&input, 4).expect("trains");
    let second = model.train(&input, 4).expect("cached");
    assert_eq!(first, second);

    let (x, mut labels) = blobs();
    labels[0] = 1;
    let changed = SurrogateInput::new(x, Targets::Hard { labels: labels.clone() }, 2).expect("ok");
    model.train(&changed, 4).expect("retrains");
    assert_eq!(model.reference_labels(), Some(labels.as_slice()));
}

#[test]
fn test_neural_soft_targets() {
    let (x, labels) = blobs();
    let mut probabilities = Matrix::zeros(20, 2);
    for (i, &l) in labels.iter().enumerate() {
        probabilities.set(i, l as usize, 0.9);
        probabilities.set(i, 1 - l as usize, 0.1);
    }
    let input = SurrogateInput::new(x, Targets::Soft { probabilities }, 2).expect("ok");
    let mut model = NeuralSurrogate::new(NeuralConfig::default().with_network(small_network()).with_mc_samples(5));
    let metrics = model.train(&input, 2).expect("trains");
    assert_eq!(metrics.len(), 2);
    assert_partition(&metrics, &(0..20).collect::<Vec<_>>());
    assert_eq!(model.predict(input.features()).expect("trained"), labels);
    assert_eq!(model.kind(), SurrogateKind::Neural);
}

#[test]
fn test_neural_defaults() {
    let c = NeuralConfig::default();
    assert_eq!(c.network.hidden, vec![128, 64]);
    assert_eq!(c.network.batch_size, 64);
    assert_eq!(c.network.epochs, 15);
    assert_eq!(c.mc_samples, 10);
}

#[test]
fn test_end_to_end_from_votes() {
    let (x, labels) = blobs();
    let mut votes = Matrix::filled(20, 3, ABSTAIN);
    for (i, &l) in labels.iter().enumerate() {
        votes.set(i, 0, l);
        if i % 3 != 0 {
            votes.set(i, 1, l);
        }
        let noisy = if i == 0 || i == 10 { 1 - l } else { l };
        votes.set(i, 2, noisy);
    }
    let input = SurrogateInput::new(x, Targets::Votes { votes, labels: labels.clone() }, 2).expect("ok");
    let config = EndToEndConfig::default().with_network(small_network().with_dropout(0.0));
    let mut model = EndToEndSurrogate::new(config);

    let metrics = model.train(&input, 0).expect("trains");
    assert!(metrics.is_empty());
    assert_eq!(model.predict(input.features()).expect("trained"), labels);
    let reliability = model.reliabilities().expect("trained");
    assert_eq!(reliability.shape(), (3, 2));
    assert!(reliability.get(0, 0) > reliability.get(2, 0));
}

#[test]
fn test_end_to_end_requires_votes() {
    let mut model = EndToEndSurrogate::new(EndToEndConfig::default());
    assert!(matches!(model.train(&hard_input(), 0), Err(LabelError::Training(_))));
}

#[test]
fn test_build_dispatches_on_variant() {
    for config in [
        SurrogateConfig::ClosedForm(ClosedFormConfig::default()),
        SurrogateConfig::Neural(NeuralConfig::default()),
        SurrogateConfig::EndToEnd(EndToEndConfig::default()),
    ] {
        assert_eq!(config.build().kind(), config.kind());
    }
}
