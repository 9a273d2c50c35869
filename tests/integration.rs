//! End-to-end tests across the public API.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use labelsmith::config::{RunConfig, TaskConfig};
use labelsmith::data::FeatureMatrix;
use labelsmith::labeling::{LabelMatrix, LabelSet, Labeler};
use labelsmith::pipeline::{LabelModelProperties, ReductionMethod, RunContext};
use labelsmith::primitives::Matrix;
use labelsmith::rules::Rule;
use labelsmith::scoring::score_items;
use labelsmith::store::{GoldLabel, JsonDirStore, LabelingStore, MemoryStore};
use labelsmith::surrogate::{ClosedFormConfig, SurrogateConfig};
use labelsmith::weak_supervision::{LabelVoter, MajorityLabelVoter, TieBreakPolicy, ABSTAIN};
use labelsmith::worker::{serve, Worker, WorkerConfig};
use labelsmith::LabelError;

const A: i32 = ABSTAIN;

fn example_votes() -> Matrix<i32> {
    Matrix::from_rows(&[
        vec![0, 0, 1],
        vec![1, 1, 0],
        vec![0, A, 0],
        vec![1, 1, 1],
        vec![A, 0, 0],
    ])
    .expect("5x3")
}

#[test]
fn test_majority_example_from_votes() {
    let preds = MajorityLabelVoter::new(2)
        .predict(&example_votes(), TieBreakPolicy::Abstain, None)
        .expect("valid votes");
    assert_eq!(preds, vec![0, 1, 0, 1, 0]);
}

#[test]
fn test_majority_example_through_rules() {
    // each feature carries one function's vote; -1 matches no branch
    let votes = example_votes();
    let keys = (0..5).map(|i| format!("item-{i}")).collect();
    let columns = (0..3)
        .map(|j| {
            let values = votes.column(j).into_iter().map(|v| v as f32).collect();
            (format!("v{j}"), values)
        })
        .collect();
    let fm = FeatureMatrix::new(keys, columns).expect("valid matrix");
    let rules = (0..3)
        .map(|j| {
            Rule::free_form(
                format!("r{j}"),
                format!("if v{j} == 0:\n\treturn CLEAN\nelif v{j} == 1:\n\treturn NOISY"),
            )
        })
        .collect();
    let labels = LabelSet::new(["clean", "noisy"]).expect("labels");

    let mut labeler = Labeler::new(rules, labels, Arc::new(fm));
    labeler.create_labeling_functions().expect("three rules");
    let matrix = labeler.apply().expect("features present");
    assert_eq!(matrix.votes(), &votes);
    let preds = labeler
        .predict(TieBreakPolicy::Abstain, None)
        .expect("applied");
    assert_eq!(preds, &[0, 1, 0, 1, 0]);
}

#[test]
fn test_two_against_one_and_all_abstain() {
    let votes = Matrix::from_rows(&[vec![1, 1, 0], vec![A, A, A]]).expect("2x3");
    let preds = MajorityLabelVoter::new(2)
        .predict(&votes, TieBreakPolicy::Abstain, None)
        .expect("valid votes");
    assert_eq!(preds, vec![1, A]);
}

#[test]
fn test_gold_rows_overwrite_label_matrix() {
    let keys: Vec<String> = (0..5).map(|i| format!("item-{i}")).collect();
    let functions = vec!["f0".into(), "f1".into(), "f2".into()];
    let matrix = LabelMatrix::from_votes(keys, functions, example_votes()).expect("consistent");
    let gold = HashMap::from([("item-4".to_string(), 1)]);
    let injected = matrix.with_gold_rows(&gold);
    assert_eq!(injected.row_of("item-4"), Some(&[1, 1, 1][..]));
    assert_eq!(injected.row_of("item-0"), matrix.row_of("item-0"));
}

#[test]
fn test_scoring_empty_gold_is_null() {
    let items = vec!["a".to_string(), "b".to_string()];
    let predicted = HashMap::from([("a".to_string(), 1), ("b".to_string(), 0)]);
    let s = score_items(&items, &HashMap::new(), &predicted);
    assert_eq!(s.count, 0);
    assert!(s.accuracy.is_none() && s.precision.is_none() && s.recall.is_none());
}

fn quality_matrix() -> FeatureMatrix {
    let keys = (0..16).map(|i| format!("ts-{i}")).collect();
    let noise = (0..16).map(|i| i as f32 / 16.0).collect();
    let gaps = (0..16).map(|i| if i >= 8 { 3.0 } else { 0.0 }).collect();
    let median = (0..16).map(|i| (i % 4) as f32).collect();
    FeatureMatrix::new(
        keys,
        vec![
            ("noise".into(), noise),
            ("gaps".into(), gaps),
            ("median".into(), median),
        ],
    )
    .expect("valid matrix")
}

fn quality_rules() -> Vec<Rule> {
    vec![
        Rule::binary("1", "noise >= 0.5", 1, 0),
        Rule::binary("2", "gaps > 1 & median >= 0", 1, 0),
        Rule::free_form("3", "if noise > 0.8:\n\treturn NOISY\nelif noise < 0.2:\n\treturn CLEAN"),
        Rule::binary("4", "noise >", 1, 0),
    ]
}

fn quality_task() -> TaskConfig {
    TaskConfig {
        id: "quality".into(),
        labels: vec!["clean".into(), "noisy".into()],
    }
}

#[test]
fn test_gold_injection_changes_training_target_only() {
    let mut store = MemoryStore::new().with_rules("rs", quality_rules());
    store
        .upsert_gold_label(GoldLabel::new("quality", "ts-3", 1, "analyst"))
        .expect("stored");

    let mut config = RunConfig::new(quality_task(), "rs");
    config.label_model = LabelModelProperties::default().with_method(ReductionMethod::Majority);
    config.surrogate = config.surrogate.with_include_gold(true).with_folds(4);

    let mut ctx = RunContext::new(quality_task(), Arc::new(quality_matrix())).expect("labels");
    let result = ctx.run(&mut store, &config).expect("run completes");

    let item = &result.output.predictions[3];
    assert_eq!(item.label_model, 0);
    assert_eq!(item.target, 1);
    // evaluation still compares the aggregated label with gold
    assert_eq!(result.scores.label_model.accuracy, Some(0.0));
    assert_eq!(result.output.excluded.len(), 1);
    assert_eq!(result.output.excluded[0].rule_id, "4");
    assert_eq!(result.properties.features, vec!["gaps", "median", "noise"]);
}

#[test]
fn test_remote_run_persisted_to_json_store() {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind ephemeral");
            tx.send(listener.local_addr().expect("local addr").port())
                .expect("port received");
            let _ = serve(listener, Worker::new(), std::future::pending()).await;
        });
    });
    let port = rx.recv().expect("worker started");

    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = JsonDirStore::open(dir.path()).expect("store");
    store.save_rules("rs", &quality_rules()).expect("stored");

    let mut config = RunConfig::new(quality_task(), "rs");
    config.surrogate = config
        .surrogate
        .with_model(SurrogateConfig::ClosedForm(ClosedFormConfig::default().with_c(1.0)))
        .with_folds(4)
        .with_remote(true);
    config.worker = Some(WorkerConfig {
        host: "127.0.0.1".into(),
        port,
        timeout_secs: Some(60),
    });

    let mut ctx = RunContext::new(quality_task(), Arc::new(quality_matrix())).expect("labels");
    let first = ctx.run(&mut store, &config).expect("remote run");
    assert_eq!(first.output.folds.len(), 4);
    assert_eq!(first.scores.training.folds, 4);
    let second = ctx.run(&mut store, &config).expect("model already initialized");
    let held_out = |r: &labelsmith::pipeline::LabelingResult| {
        r.output.folds.iter().map(|f| f.held_out.clone()).collect::<Vec<_>>()
    };
    assert_eq!(held_out(&first), held_out(&second));

    let reopened = JsonDirStore::open(dir.path()).expect("store");
    let saved = reopened.results("rs").expect("readable");
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].id, first.id);
    assert!(ctx.last_delta().is_some());
}

#[test]
fn test_insufficient_rules_is_distinct_error() {
    let mut store = MemoryStore::new().with_rules("rs", quality_rules()[2..].to_vec());
    let config = RunConfig::new(quality_task(), "rs");
    let mut ctx = RunContext::new(quality_task(), Arc::new(quality_matrix())).expect("labels");
    match ctx.run(&mut store, &config) {
        Err(LabelError::InsufficientRules { found, required }) => {
            assert_eq!((found, required), (1, 3));
        }
        other => panic!("expected insufficient rules, got {other:?}"),
    }
}
