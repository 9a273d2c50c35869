//! Directory of JSON files.
//!
//! ```text
//! <root>/rulesets/<ruleset_id>.json   Vec<Rule>
//! <root>/gold/<task_id>.json          Vec<GoldLabel>
//! <root>/results/<result_id>.json     StoredResult
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{upsert, GoldLabel, LabelingStore};
use crate::error::{LabelError, Result};
use crate::pipeline::LabelingResult;
use crate::rules::Rule;

/// A persisted run. Properties, outputs and scores are opaque JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResult {
    /// Result identifier.
    pub id: Uuid,
    /// Rule set the run applied.
    pub ruleset_id: String,
    /// Task the run labeled.
    pub task_id: String,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Rules that became labeling functions.
    pub rule_set_used: Vec<String>,
    /// Serialized model properties.
    pub model_properties: String,
    /// Serialized per-item predictions and fold metrics.
    pub results: String,
    /// Serialized scores.
    pub scores: String,
}

impl StoredResult {
    /// Serializes the blob fields of `result`.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Serialization`] on encoding failure.
    pub fn from_result(result: &LabelingResult) -> Result<Self> {
        Ok(Self {
            id: result.id,
            ruleset_id: result.ruleset_id.clone(),
            task_id: result.task_id.clone(),
            timestamp: result.timestamp,
            rule_set_used: result.rule_set_used.clone(),
            model_properties: serde_json::to_string(&result.properties)?,
            results: serde_json::to_string(&result.output)?,
            scores: serde_json::to_string(&result.scores)?,
        })
    }

    /// Decodes the blob fields.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Serialization`] if a blob is not valid JSON for
    /// its type.
    pub fn into_result(self) -> Result<LabelingResult> {
        Ok(LabelingResult {
            id: self.id,
            ruleset_id: self.ruleset_id,
            task_id: self.task_id,
            timestamp: self.timestamp,
            rule_set_used: self.rule_set_used,
            properties: serde_json::from_str(&self.model_properties)?,
            output: serde_json::from_str(&self.results)?,
            scores: serde_json::from_str(&self.scores)?,
        })
    }
}

/// Stores everything as JSON files under one directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    /// Opens (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Io`] if the directories cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in ["rulesets", "gold", "results"] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root })
    }

    /// Store directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file(&self, dir: &str, id: &str) -> Result<PathBuf> {
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.');
        if !safe {
            return Err(LabelError::Store(format!("invalid identifier '{id}'")));
        }
        Ok(self.root.join(dir).join(format!("{id}.json")))
    }

    fn read<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn write<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        let text = serde_json::to_string_pretty(value)?;
        fs::write(path, text)?;
        debug!(path = %path.display(), "stored");
        Ok(())
    }
}

impl LabelingStore for JsonDirStore {
    fn rules(&self, ruleset_id: &str) -> Result<Vec<Rule>> {
        Self::read(&self.file("rulesets", ruleset_id)?)?
            .ok_or_else(|| LabelError::Store(format!("unknown rule set '{ruleset_id}'")))
    }

    fn save_rules(&mut self, ruleset_id: &str, rules: &[Rule]) -> Result<()> {
        Self::write(&self.file("rulesets", ruleset_id)?, rules)
    }

    fn gold_labels(&self, task_id: &str) -> Result<Vec<GoldLabel>> {
        Ok(Self::read(&self.file("gold", task_id)?)?.unwrap_or_default())
    }

    fn upsert_gold_label(&mut self, label: GoldLabel) -> Result<()> {
        let path = self.file("gold", &label.task_id)?;
        let mut labels: Vec<GoldLabel> = Self::read(&path)?.unwrap_or_default();
        upsert(&mut labels, label);
        Self::write(&path, &labels)
    }

    fn save_result(&mut self, result: &LabelingResult) -> Result<()> {
        let path = self.file("results", &result.id.to_string())?;
        Self::write(&path, &StoredResult::from_result(result)?)
    }

    fn results(&self, ruleset_id: &str) -> Result<Vec<LabelingResult>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(self.root.join("results"))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stored) = Self::read::<StoredResult>(&path)? {
                if stored.ruleset_id == ruleset_id {
                    out.push(stored.into_result()?);
                }
            }
        }
        out.sort_by_key(|r| r.timestamp);
        Ok(out)
    }
}
