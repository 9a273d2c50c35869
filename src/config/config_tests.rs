use std::collections::HashMap;

use super::*;
use crate::pipeline::ReductionMethod;
use crate::surrogate::{SurrogateConfig, SurrogateKind};
use crate::weak_supervision::TieBreakPolicy;

const MINIMAL: &str = r#"
[task]
id = "quality"
labels = ["normal", "high noise"]
"#;

#[test]
fn test_minimal_config_uses_defaults() {
    let config = RunConfig::from_toml_str(MINIMAL).expect("valid");
    assert_eq!(config.task.id, "quality");
    assert_eq!(config.label_model.epochs, 500);
    assert_eq!(config.label_model.seed, 123);
    assert_eq!(config.label_model.method, ReductionMethod::LabelModel);
    assert_eq!(config.label_model.tie_break, TieBreakPolicy::Abstain);
    assert_eq!(config.surrogate.model.kind(), SurrogateKind::ClosedForm);
    assert_eq!(config.surrogate.folds(), 5);
    assert!(config.surrogate.only_label_model_features);
    assert!(!config.surrogate.include_gold);
    assert_eq!(config.worker().port, 8000);
}

#[test]
fn test_full_config() {
    let text = r#"
ruleset = "rs-1"

[task]
id = "quality"
labels = ["normal", "high noise", "gaps"]

[label_model]
method = "majority"
tie_break = "random"
selection = ["r1", "r2", "r3"]

[surrogate]
include_gold = true
remote = true

[surrogate.model]
variant = "end_to_end"
temperature = 1.5

[worker]
host = "trainer"
port = 9100
timeout_secs = 600
"#;
    let config = RunConfig::from_toml_str(text).expect("valid");
    assert_eq!(config.ruleset, "rs-1");
    assert_eq!(config.label_model.method, ReductionMethod::Majority);
    assert_eq!(config.label_model.tie_break, TieBreakPolicy::Random);
    assert_eq!(config.label_model.selection.as_ref().map(Vec::len), Some(3));
    assert!(config.surrogate.remote);
    assert_eq!(config.surrogate.folds(), 0);
    match &config.surrogate.model {
        SurrogateConfig::EndToEnd(c) => assert_eq!(c.temperature, 1.5),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(config.worker().addr(), "trainer:9100");
    assert_eq!(config.worker().timeout_secs, Some(600));
}

#[test]
fn test_invalid_configs() {
    assert!(matches!(
        RunConfig::from_toml_str("ruleset = 3"),
        Err(LabelError::Config(_))
    ));
    let one_label = "[task]\nid = \"t\"\nlabels = [\"only\"]\n";
    assert!(matches!(
        RunConfig::from_toml_str(one_label),
        Err(LabelError::Config(_))
    ));
    let one_fold = format!("{MINIMAL}\n[surrogate]\nfolds = 1\n");
    assert!(RunConfig::from_toml_str(&one_fold).is_err());
}

#[test]
fn test_env_overrides_worker() {
    let mut config = RunConfig::from_toml_str(MINIMAL).expect("valid");
    let env = HashMap::from([
        (ENV_WORKER_HOST, "10.0.0.7".to_string()),
        (ENV_WORKER_PORT, "8100".to_string()),
    ]);
    config
        .apply_env_overrides(|k| env.get(k).cloned())
        .expect("valid port");
    assert_eq!(config.worker().addr(), "10.0.0.7:8100");
}

#[test]
fn test_env_without_overrides_keeps_file_values() {
    let mut config = RunConfig::from_toml_str(MINIMAL).expect("valid");
    config.apply_env_overrides(|_| None).expect("nothing to apply");
    assert!(config.worker.is_none());
}

#[test]
fn test_env_bad_port() {
    let mut config = RunConfig::from_toml_str(MINIMAL).expect("valid");
    let result = config.apply_env_overrides(|k| (k == ENV_WORKER_PORT).then(|| "eighty".to_string()));
    assert!(matches!(result, Err(LabelError::Config(_))));
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("run.toml");
    std::fs::write(&path, MINIMAL).expect("write config");
    let config = RunConfig::load(&path).expect("loads");
    assert_eq!(config.task.labels.len(), 2);
    assert!(RunConfig::load(dir.path().join("missing.toml")).is_err());
}
