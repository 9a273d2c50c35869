//! Run-scoped state and the run itself.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    ItemPrediction, LabelingResult, ModelProperties, ReductionMethod, RunDelta, RunOutput,
    RunScores,
};
use crate::config::{RunConfig, TaskConfig};
use crate::data::FeatureMatrix;
use crate::error::{LabelError, Result};
use crate::labeling::{LabelSet, Labeler};
use crate::primitives::Matrix;
use crate::scoring::{score, score_items, FoldMetrics, TrainingScore};
use crate::store::{gold_map, LabelingStore};
use crate::surrogate::{
    RemoteSurrogate, SurrogateConfig, SurrogateInput, SurrogateKind, SurrogateModel, Targets,
};
use crate::weak_supervision::ABSTAIN;
use crate::worker::WorkerClient;

/// State carried between the runs of one labeling session.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use labelsmith::config::{RunConfig, TaskConfig};
/// use labelsmith::data::FeatureMatrix;
/// use labelsmith::pipeline::RunContext;
/// use labelsmith::rules::Rule;
/// use labelsmith::store::MemoryStore;
///
/// let keys: Vec<String> = (0..8).map(|i| format!("ts-{i}")).collect();
/// let noise: Vec<f32> = (0..8).map(|i| i as f32 / 8.0).collect();
/// let gaps: Vec<f32> = (0..8).map(|i| if i >= 4 { 2.0 } else { 0.0 }).collect();
/// let fm = FeatureMatrix::new(keys, vec![("noise".into(), noise), ("gaps".into(), gaps)])
///     .expect("valid matrix");
///
/// let rules = vec![
///     Rule::binary("a", "noise >= 0.5", 1, 0),
///     Rule::binary("b", "gaps > 1", 1, 0),
///     Rule::binary("c", "noise > 0.6", 1, -1),
/// ];
/// let mut store = MemoryStore::new().with_rules("rs", rules);
///
/// let task = TaskConfig { id: "quality".into(), labels: vec!["clean".into(), "noisy".into()] };
/// let config = RunConfig::new(task.clone(), "rs");
/// let mut ctx = RunContext::new(task, Arc::new(fm)).expect("two labels");
///
/// let result = ctx.run(&mut store, &config).expect("run completes");
/// assert_eq!(result.output.predictions.len(), 8);
/// assert_eq!(result.scores.label_model.count, 0);
/// ```
#[derive(Debug)]
pub struct RunContext {
    task: TaskConfig,
    labels: LabelSet,
    matrix: Arc<FeatureMatrix>,
    ruleset_id: Option<String>,
    history: Vec<LabelingResult>,
    surrogate: Option<(SurrogateConfig, Box<dyn SurrogateModel>)>,
}

impl RunContext {
    /// Context for `task` over `matrix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the task's labels do not form a valid label set.
    pub fn new(task: TaskConfig, matrix: Arc<FeatureMatrix>) -> Result<Self> {
        let labels = task.label_set()?;
        Ok(Self {
            task,
            labels,
            matrix,
            ruleset_id: None,
            history: Vec::new(),
            surrogate: None,
        })
    }

    /// Active task.
    #[must_use]
    pub fn task(&self) -> &TaskConfig {
        &self.task
    }

    /// Labels of the active task.
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Active feature matrix.
    #[must_use]
    pub fn matrix(&self) -> &Arc<FeatureMatrix> {
        &self.matrix
    }

    /// Rule set of the latest run, if any.
    #[must_use]
    pub fn ruleset_id(&self) -> Option<&str> {
        self.ruleset_id.as_deref()
    }

    /// Finished runs for the active task and rule set, oldest first.
    #[must_use]
    pub fn history(&self) -> &[LabelingResult] {
        &self.history
    }

    /// Score changes between the two latest runs.
    #[must_use]
    pub fn last_delta(&self) -> Option<RunDelta> {
        match self.history.as_slice() {
            [.., previous, latest] => Some(latest.delta(previous)),
            _ => None,
        }
    }

    /// Switches to another task. History, rule set and surrogate are cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the new task's labels are invalid; the context is
    /// left unchanged.
    pub fn switch_task(&mut self, task: TaskConfig) -> Result<()> {
        let labels = task.label_set()?;
        info!(from = %self.task.id, to = %task.id, "switching task");
        self.task = task;
        self.labels = labels;
        self.ruleset_id = None;
        self.history.clear();
        self.surrogate = None;
        Ok(())
    }

    /// Replaces the feature matrix between runs. The cached surrogate is
    /// dropped; history is kept so scores stay comparable.
    pub fn swap_matrix(&mut self, matrix: Arc<FeatureMatrix>) {
        debug!(rows = matrix.n_rows(), "feature matrix swapped");
        self.matrix = matrix;
        self.surrogate = None;
    }

    /// Selects the rule set for following runs. Changing it clears history
    /// and the cached surrogate.
    pub fn select_ruleset(&mut self, ruleset_id: &str) {
        if self.ruleset_id.as_deref() == Some(ruleset_id) {
            return;
        }
        if let Some(previous) = &self.ruleset_id {
            info!(from = %previous, to = ruleset_id, "switching rule set");
        }
        self.ruleset_id = Some(ruleset_id.to_string());
        self.history.clear();
        self.surrogate = None;
    }

    /// Runs the configured rule set once and persists the result.
    ///
    /// Gold labels entered since the previous run take effect here: with
    /// `include_gold` they replace the aggregated label of their item in the
    /// surrogate's training targets.
    ///
    /// # Errors
    ///
    /// - [`LabelError::Config`] if `config` names a different task.
    /// - [`LabelError::InsufficientRules`] if fewer than three rules compile.
    /// - [`LabelError::RemoteWorker`] if remote training fails.
    /// - Store, training and dimension errors from the stages.
    pub fn run(
        &mut self,
        store: &mut dyn LabelingStore,
        config: &RunConfig,
    ) -> Result<LabelingResult> {
        if config.task != self.task {
            return Err(LabelError::Config(format!(
                "run configured for task '{}' but the context holds task '{}'",
                config.task.id, self.task.id
            )));
        }
        self.select_ruleset(&config.ruleset);

        let rules = store.rules(&config.ruleset)?;
        let gold = self.valid_gold(store)?;
        info!(
            task = %self.task.id,
            ruleset = %config.ruleset,
            rules = rules.len(),
            gold = gold.len(),
            "labeling run started"
        );

        let lm = &config.label_model;
        let mut labeler = Labeler::new(rules, self.labels.clone(), Arc::clone(&self.matrix));
        if let Some(selection) = &lm.selection {
            labeler = labeler.with_selection(selection.iter().cloned());
        }
        labeler.create_labeling_functions()?;
        labeler.apply()?;
        if lm.method == ReductionMethod::LabelModel {
            labeler.fit(lm.epochs, lm.seed)?;
        }
        let aggregated = labeler.predict(lm.tie_break, Some(lm.seed))?.to_vec();

        let props = &config.surrogate;
        let features = self.surrogate_features(&labeler, props.only_label_model_features);
        let names: Vec<&str> = features.iter().map(String::as_str).collect();
        let matrix = Arc::clone(&self.matrix);
        let x = matrix.select(&names)?.to_matrix();

        let keys = matrix.keys();
        let mut targets = aggregated.clone();
        if props.include_gold {
            for (target, key) in targets.iter_mut().zip(keys) {
                if let Some(&label) = gold.get(key) {
                    *target = label;
                }
            }
        }
        let training_targets = match props.model.kind() {
            SurrogateKind::ClosedForm => Targets::Hard {
                labels: targets.clone(),
            },
            SurrogateKind::Neural => {
                let mut probabilities = labeler
                    .probabilities()
                    .cloned()
                    .ok_or_else(|| LabelError::InvalidState {
                        expected: "predicted".to_string(),
                        found: labeler.state().to_string(),
                    })?;
                if props.include_gold {
                    overwrite_gold_rows(&mut probabilities, keys, &gold);
                }
                Targets::Soft { probabilities }
            }
            SurrogateKind::EndToEnd => {
                let lm_votes = labeler.label_matrix().ok_or_else(|| LabelError::InvalidState {
                    expected: "applied".to_string(),
                    found: labeler.state().to_string(),
                })?;
                let votes = if props.include_gold {
                    lm_votes.with_gold_rows(&gold).votes().clone()
                } else {
                    lm_votes.votes().clone()
                };
                Targets::Votes {
                    votes,
                    labels: targets.clone(),
                }
            }
        };
        let input = SurrogateInput::new(x, training_targets, self.labels.cardinality())?;

        let folds_requested = props.folds();
        let mut surrogate = self.surrogate_for(config);
        let folds = surrogate.train(&input, folds_requested)?;
        let predicted = surrogate.predict(input.features())?;
        let reference = surrogate
            .reference_labels()
            .map_or_else(|| input.reference_labels(), <[i32]>::to_vec);
        if !props.remote {
            self.surrogate = Some((props.model.clone(), surrogate));
        }

        let scores = score_run(keys, &gold, &aggregated, &predicted, &reference, &folds)?;
        let gold_rows: Vec<i32> = keys
            .iter()
            .map(|k| gold.get(k).copied().unwrap_or(ABSTAIN))
            .collect();
        let analysis = labeler.analysis(Some(&gold_rows))?;

        let predictions = keys
            .iter()
            .enumerate()
            .map(|(i, key)| ItemPrediction {
                key: key.clone(),
                label_model: aggregated[i],
                target: targets[i],
                surrogate: predicted[i],
                gold: gold.get(key).copied(),
            })
            .collect();

        let result = LabelingResult {
            id: Uuid::new_v4(),
            ruleset_id: config.ruleset.clone(),
            task_id: self.task.id.clone(),
            timestamp: Utc::now(),
            rule_set_used: labeler.used_rules().to_vec(),
            properties: ModelProperties {
                label_model: config.label_model.clone(),
                surrogate: config.surrogate.clone(),
                features,
            },
            output: RunOutput {
                predictions,
                folds,
                excluded: labeler.excluded().to_vec(),
                analysis,
            },
            scores,
        };
        store.save_result(&result)?;
        info!(
            id = %result.id,
            label_model_accuracy = ?result.scores.label_model.accuracy,
            surrogate_accuracy = ?result.scores.surrogate_gold.accuracy,
            failed_folds = result.scores.training.failed,
            "labeling run finished"
        );
        self.history.push(result.clone());
        Ok(result)
    }

    /// Gold labels of the task for items in the matrix with a valid index.
    fn valid_gold(&self, store: &dyn LabelingStore) -> Result<HashMap<String, i32>> {
        let cardinality = self.labels.cardinality();
        let mut gold = gold_map(&store.gold_labels(&self.task.id)?);
        gold.retain(|key, &mut label| {
            let keep = usize::try_from(label).is_ok_and(|c| c < cardinality)
                && self.matrix.row_index(key).is_some();
            if !keep {
                warn!(item = %key, label, "ignoring gold label");
            }
            keep
        });
        Ok(gold)
    }

    fn surrogate_features(&self, labeler: &Labeler, only_rule_features: bool) -> Vec<String> {
        let used = labeler.features();
        if only_rule_features && !used.is_empty() {
            return used.into_iter().collect();
        }
        if only_rule_features {
            warn!("rules reference no features, training on every column");
        }
        self.matrix
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// The cached local surrogate when its configuration is unchanged, a
    /// fresh one otherwise, or a proxy to the worker.
    fn surrogate_for(&mut self, config: &RunConfig) -> Box<dyn SurrogateModel> {
        let props = &config.surrogate;
        if props.remote {
            let client = WorkerClient::from_config(&config.worker());
            return Box::new(RemoteSurrogate::new(client, props.model.clone()));
        }
        match self.surrogate.take() {
            Some((cached, model)) if cached == props.model => model,
            _ => props.model.build(),
        }
    }
}

fn overwrite_gold_rows(probabilities: &mut Matrix<f32>, keys: &[String], gold: &HashMap<String, i32>) {
    for (i, key) in keys.iter().enumerate() {
        let Some(class) = gold.get(key).and_then(|&l| usize::try_from(l).ok()) else {
            continue;
        };
        let row = probabilities.row_mut(i);
        row.fill(0.0);
        row[class] = 1.0;
    }
}

fn score_run(
    keys: &[String],
    gold: &HashMap<String, i32>,
    aggregated: &[i32],
    predicted: &[i32],
    reference: &[i32],
    folds: &[FoldMetrics],
) -> Result<RunScores> {
    let by_key = |labels: &[i32]| -> HashMap<String, i32> {
        keys.iter().cloned().zip(labels.iter().copied()).collect()
    };
    let label_model = score_items(keys, gold, &by_key(aggregated));
    let surrogate_gold = score_items(keys, gold, &by_key(predicted));

    let (y_ref, y_pred): (Vec<i32>, Vec<i32>) = reference
        .iter()
        .zip(predicted)
        .filter(|(&r, _)| r != ABSTAIN)
        .map(|(&r, &p)| (r, p))
        .unzip();
    let surrogate_reference = score(&y_ref, &y_pred)?;

    Ok(RunScores {
        label_model,
        surrogate_gold,
        surrogate_reference,
        training: TrainingScore::from_folds(folds),
    })
}
