use std::net::TcpListener;
use std::sync::Arc;

use super::*;
use crate::config::{RunConfig, TaskConfig};
use crate::data::FeatureMatrix;
use crate::error::LabelError;
use crate::rules::Rule;
use crate::store::{GoldLabel, LabelingStore, MemoryStore};
use crate::surrogate::{EndToEndConfig, NeuralConfig, SurrogateConfig};
use crate::worker::WorkerConfig;

const RULESET: &str = "rs-quality";

/// Twelve items; items 6..12 are noisy and have gaps.
fn matrix() -> Arc<FeatureMatrix> {
    let keys = (0..12).map(|i| format!("ts-{i}")).collect();
    let noise = (0..12).map(|i| i as f32 / 12.0).collect();
    let gaps = (0..12).map(|i| if i >= 6 { 2.0 } else { 0.0 }).collect();
    Arc::new(
        FeatureMatrix::new(keys, vec![("noise".into(), noise), ("gaps".into(), gaps)])
            .expect("valid matrix"),
    )
}

fn rules() -> Vec<Rule> {
    vec![
        Rule::binary("a", "noise >= 0.5", 1, 0),
        Rule::binary("b", "gaps > 1", 1, 0),
        Rule::binary("c", "noise > 0.7", 1, -1),
        Rule::binary("d", "flatline > 3", 1, 0),
    ]
}

fn task() -> TaskConfig {
    TaskConfig {
        id: "quality".into(),
        labels: vec!["clean".into(), "noisy".into()],
    }
}

fn majority_config() -> RunConfig {
    let mut config = RunConfig::new(task(), RULESET);
    config.label_model = LabelModelProperties::default().with_method(ReductionMethod::Majority);
    config
}

fn setup() -> (RunContext, MemoryStore) {
    let ctx = RunContext::new(task(), matrix()).expect("two labels");
    let store = MemoryStore::new().with_rules(RULESET, rules());
    (ctx, store)
}

fn expected_aggregate() -> Vec<i32> {
    [vec![0; 6], vec![1; 6]].concat()
}

#[test]
fn test_run_produces_and_persists_result() {
    let (mut ctx, mut store) = setup();
    let result = ctx.run(&mut store, &majority_config()).expect("run completes");

    let aggregated: Vec<i32> = result.output.predictions.iter().map(|p| p.label_model).collect();
    assert_eq!(aggregated, expected_aggregate());
    assert_eq!(result.rule_set_used, vec!["a", "b", "c"]);
    assert_eq!(result.output.excluded.len(), 1);
    assert_eq!(result.output.excluded[0].rule_id, "d");
    assert_eq!(result.properties.features, vec!["gaps", "noise"]);
    assert_eq!(result.output.analysis.summaries.len(), 3);

    assert_eq!(result.scores.label_model.count, 0);
    assert_eq!(result.scores.label_model.accuracy, None);
    assert_eq!(result.scores.surrogate_reference.count, 12);
    assert!(result.scores.surrogate_reference.accuracy.expect("scored") >= 0.9);
    assert_eq!(result.output.folds.len(), 5);
    assert_eq!(result.scores.training.folds, 5);

    let saved = store.results(RULESET).expect("readable");
    assert_eq!(saved, vec![result.clone()]);
    assert_eq!(ctx.history(), &[result]);
    assert_eq!(ctx.ruleset_id(), Some(RULESET));
}

#[test]
fn test_gold_label_overrides_training_target() {
    let (mut ctx, mut store) = setup();
    store
        .upsert_gold_label(GoldLabel::new("quality", "ts-0", 1, "analyst"))
        .expect("stored");
    // unknown item and out-of-range label are ignored
    store
        .upsert_gold_label(GoldLabel::new("quality", "ts-99", 0, "analyst"))
        .expect("stored");
    store
        .upsert_gold_label(GoldLabel::new("quality", "ts-1", 7, "analyst"))
        .expect("stored");

    let plain = ctx.run(&mut store, &majority_config()).expect("run completes");
    let first = &plain.output.predictions[0];
    assert_eq!((first.label_model, first.target, first.gold), (0, 0, Some(1)));
    assert_eq!(plain.scores.label_model.count, 1);
    assert_eq!(plain.scores.label_model.accuracy, Some(0.0));

    let mut config = majority_config();
    config.surrogate = config.surrogate.with_include_gold(true);
    let injected = ctx.run(&mut store, &config).expect("run completes");
    let first = &injected.output.predictions[0];
    assert_eq!((first.label_model, first.target), (0, 1));
    assert_eq!(injected.output.predictions[1].target, 0);
    assert_eq!(injected.output.predictions[1].gold, None);
}

#[test]
fn test_insufficient_rules_aborts_run() {
    let (mut ctx, _) = setup();
    let mut store = MemoryStore::new().with_rules(RULESET, rules()[..2].to_vec());
    let err = ctx.run(&mut store, &majority_config()).expect_err("two rules");
    assert!(matches!(err, LabelError::InsufficientRules { found: 2, .. }));
    assert!(err.aborts_run());
    assert!(store.results(RULESET).expect("readable").is_empty());
    assert!(ctx.history().is_empty());
}

#[test]
fn test_rule_selection() {
    let (mut ctx, mut store) = setup();
    let mut all = rules();
    all.push(Rule::binary("e", "noise < 0.2", 0, -1));
    store.save_rules(RULESET, &all).expect("stored");

    let mut config = majority_config();
    config.label_model = config
        .label_model
        .with_selection(vec!["a".into(), "b".into(), "e".into()]);
    let result = ctx.run(&mut store, &config).expect("run completes");
    assert_eq!(result.rule_set_used, vec!["a", "b", "e"]);
}

#[test]
fn test_task_mismatch_is_config_error() {
    let (mut ctx, mut store) = setup();
    let mut config = majority_config();
    config.task.id = "other".into();
    assert!(matches!(
        ctx.run(&mut store, &config),
        Err(LabelError::Config(_))
    ));
}

#[test]
fn test_history_delta_and_invalidation() {
    let (mut ctx, mut store) = setup();
    assert!(ctx.last_delta().is_none());
    let config = majority_config();
    let first = ctx.run(&mut store, &config).expect("first run");
    store
        .upsert_gold_label(GoldLabel::new("quality", "ts-9", 1, "analyst"))
        .expect("stored");
    let second = ctx.run(&mut store, &config).expect("second run");

    // identical input, so the cached surrogate reports the same folds
    assert_eq!(first.output.folds, second.output.folds);
    assert_eq!(ctx.history().len(), 2);
    let delta = ctx.last_delta().expect("two runs");
    assert_eq!(delta.label_model.count, 1);
    assert_eq!(delta.label_model.accuracy, None);

    ctx.select_ruleset(RULESET);
    assert_eq!(ctx.history().len(), 2);
    ctx.select_ruleset("rs-other");
    assert!(ctx.history().is_empty());

    ctx.run(&mut store, &config).expect("third run");
    ctx.swap_matrix(matrix());
    assert_eq!(ctx.history().len(), 1);

    let renamed = TaskConfig {
        id: "noise".into(),
        labels: vec!["low".into(), "high".into()],
    };
    ctx.switch_task(renamed).expect("valid labels");
    assert!(ctx.history().is_empty());
    assert_eq!(ctx.ruleset_id(), None);
    assert_eq!(ctx.task().id, "noise");

    let invalid = TaskConfig {
        id: "x".into(),
        labels: vec!["only".into()],
    };
    assert!(ctx.switch_task(invalid).is_err());
    assert_eq!(ctx.task().id, "noise");
}

#[test]
fn test_learned_label_model_run() {
    let (mut ctx, mut store) = setup();
    let config = RunConfig::new(task(), RULESET);
    let result = ctx.run(&mut store, &config).expect("run completes");
    let aggregated: Vec<i32> = result.output.predictions.iter().map(|p| p.label_model).collect();
    assert_eq!(aggregated, expected_aggregate());
    assert_eq!(result.properties.label_model.method, ReductionMethod::LabelModel);
}

#[test]
fn test_neural_and_end_to_end_variants() {
    let (mut ctx, mut store) = setup();
    store
        .upsert_gold_label(GoldLabel::new("quality", "ts-2", 1, "analyst"))
        .expect("stored");

    for model in [
        SurrogateConfig::Neural(NeuralConfig::default()),
        SurrogateConfig::EndToEnd(EndToEndConfig::default()),
    ] {
        let mut config = majority_config();
        config.surrogate = SurrogateProperties::default()
            .with_model(model)
            .with_folds(0)
            .with_include_gold(true);
        let result = ctx.run(&mut store, &config).expect("run completes");
        assert!(result.output.folds.is_empty());
        assert_eq!(result.scores.training.folds, 0);
        assert_eq!(result.output.predictions.len(), 12);
        assert_eq!(result.output.predictions[2].target, 1);
        assert_eq!(result.scores.surrogate_gold.count, 1);
    }
}

#[test]
fn test_unreachable_remote_worker_aborts_run() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral");
        listener.local_addr().expect("local addr").port()
    };
    let (mut ctx, mut store) = setup();
    let mut config = majority_config();
    config.surrogate = config.surrogate.with_remote(true);
    config.worker = Some(WorkerConfig {
        host: "127.0.0.1".into(),
        port,
        timeout_secs: Some(5),
    });

    let err = ctx.run(&mut store, &config).expect_err("nothing listens");
    assert!(matches!(err, LabelError::RemoteWorker(_)));
    assert!(store.results(RULESET).expect("readable").is_empty());
    assert!(ctx.history().is_empty());
}
