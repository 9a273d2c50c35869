//! Batch labeling run
//!
//! Loads a run configuration, a feature matrix, a rule set and optional gold
//! labels, executes one run and prints its scores as JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;

use labelsmith::config::RunConfig;
use labelsmith::data::FeatureMatrix;
use labelsmith::pipeline::{LabelingResult, RunContext};
use labelsmith::rules::Rule;
use labelsmith::store::{GoldLabel, JsonDirStore, LabelingStore, MemoryStore};

use crate::error::{CliError, Result};

/// Rule set name used when the configuration leaves it empty
const DEFAULT_RULESET: &str = "default";

/// Contributor recorded for gold labels read from a file
const GOLD_CONTRIBUTOR: &str = "labelsmith-cli";

/// Inputs of `labelsmith run`
#[derive(Debug, Clone)]
pub(crate) struct RunArgs {
    pub(crate) config: PathBuf,
    pub(crate) features: PathBuf,
    pub(crate) rules: PathBuf,
    pub(crate) gold: Option<PathBuf>,
    pub(crate) out: Option<PathBuf>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| CliError::InvalidInput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn load_config(path: &Path) -> Result<RunConfig> {
    if !path.is_file() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    let mut config = RunConfig::load(path)?;
    if config.ruleset.trim().is_empty() {
        config.ruleset = DEFAULT_RULESET.to_string();
    }
    Ok(config)
}

/// Fill `store` with the rule set and gold labels, then run.
fn execute(
    store: &mut dyn LabelingStore,
    config: &RunConfig,
    matrix: FeatureMatrix,
    rules: &[Rule],
    gold: &BTreeMap<String, i32>,
) -> Result<LabelingResult> {
    store.save_rules(&config.ruleset, rules)?;
    for (key, &label) in gold {
        store.upsert_gold_label(GoldLabel::new(
            config.task.id.clone(),
            key.clone(),
            label,
            GOLD_CONTRIBUTOR,
        ))?;
    }
    let mut ctx = RunContext::new(config.task.clone(), Arc::new(matrix))?;
    Ok(ctx.run(store, config)?)
}

/// Execute one labeling run.
pub(crate) fn run(args: &RunArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let matrix: FeatureMatrix = read_json(&args.features)?;
    let rules: Vec<Rule> = read_json(&args.rules)?;
    let gold: BTreeMap<String, i32> = match &args.gold {
        Some(path) => read_json(path)?,
        None => BTreeMap::new(),
    };
    info!(
        rows = matrix.n_rows(),
        rules = rules.len(),
        gold = gold.len(),
        "inputs loaded"
    );

    let result = match &args.out {
        Some(dir) => {
            let mut store = JsonDirStore::open(dir)?;
            execute(&mut store, &config, matrix, &rules, &gold)?
        }
        None => {
            let mut store = MemoryStore::new();
            execute(&mut store, &config, matrix, &rules, &gold)?
        }
    };

    info!(id = %result.id, rules_used = result.rule_set_used.len(), "run complete");
    let text =
        serde_json::to_string_pretty(&result.scores).map_err(labelsmith::LabelError::from)?;
    println!("{text}");
    Ok(())
}
