//! In-memory store.

use std::collections::HashMap;

use super::{upsert, GoldLabel, LabelingStore};
use crate::error::{LabelError, Result};
use crate::pipeline::LabelingResult;
use crate::rules::Rule;

/// Keeps everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rulesets: HashMap<String, Vec<Rule>>,
    gold: Vec<GoldLabel>,
    results: Vec<LabelingResult>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding one rule set.
    #[must_use]
    pub fn with_rules(mut self, ruleset_id: impl Into<String>, rules: Vec<Rule>) -> Self {
        self.rulesets.insert(ruleset_id.into(), rules);
        self
    }
}

impl LabelingStore for MemoryStore {
    fn rules(&self, ruleset_id: &str) -> Result<Vec<Rule>> {
        self.rulesets
            .get(ruleset_id)
            .cloned()
            .ok_or_else(|| LabelError::Store(format!("unknown rule set '{ruleset_id}'")))
    }

    fn save_rules(&mut self, ruleset_id: &str, rules: &[Rule]) -> Result<()> {
        self.rulesets.insert(ruleset_id.to_string(), rules.to_vec());
        Ok(())
    }

    fn gold_labels(&self, task_id: &str) -> Result<Vec<GoldLabel>> {
        Ok(self
            .gold
            .iter()
            .filter(|g| g.task_id == task_id)
            .cloned()
            .collect())
    }

    fn upsert_gold_label(&mut self, label: GoldLabel) -> Result<()> {
        upsert(&mut self.gold, label);
        Ok(())
    }

    fn save_result(&mut self, result: &LabelingResult) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    fn results(&self, ruleset_id: &str) -> Result<Vec<LabelingResult>> {
        let mut out: Vec<LabelingResult> = self
            .results
            .iter()
            .filter(|r| r.ruleset_id == ruleset_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.timestamp);
        Ok(out)
    }
}
