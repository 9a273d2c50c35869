//! Run configuration.
//!
//! A run is described by a TOML file:
//!
//! ```toml
//! ruleset = "rs-1"
//!
//! [task]
//! id = "quality"
//! labels = ["normal", "high noise", "gaps"]
//!
//! [label_model]
//! method = "label_model"
//! epochs = 500
//! seed = 123
//! tie_break = "abstain"
//!
//! [surrogate]
//! folds = 5
//! include_gold = true
//!
//! [surrogate.model]
//! variant = "closed_form"
//! c = 1000.0
//!
//! [worker]
//! host = "127.0.0.1"
//! port = 8000
//! ```
//!
//! Every section except `task` is optional. `LABELSMITH_WORKER_HOST` and
//! `LABELSMITH_WORKER_PORT` override the worker address.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LabelError, Result};
use crate::labeling::LabelSet;
use crate::pipeline::{LabelModelProperties, SurrogateProperties};
use crate::worker::WorkerConfig;

/// Environment variable overriding the worker host.
pub const ENV_WORKER_HOST: &str = "LABELSMITH_WORKER_HOST";

/// Environment variable overriding the worker port.
pub const ENV_WORKER_PORT: &str = "LABELSMITH_WORKER_PORT";

/// The task being labeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Task identifier.
    pub id: String,
    /// Ordered label names; index `i` is label `i`.
    pub labels: Vec<String>,
}

impl TaskConfig {
    /// The task's label set.
    ///
    /// # Errors
    ///
    /// Returns an error for fewer than two or duplicate labels.
    pub fn label_set(&self) -> Result<LabelSet> {
        LabelSet::new(self.labels.iter().map(String::as_str))
    }
}

/// Everything one labeling run needs besides its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Task and its labels.
    pub task: TaskConfig,
    /// Rule set to apply.
    #[serde(default)]
    pub ruleset: String,
    /// Label model stage.
    #[serde(default)]
    pub label_model: LabelModelProperties,
    /// Surrogate stage.
    #[serde(default)]
    pub surrogate: SurrogateProperties,
    /// Remote worker, when training remotely.
    #[serde(default)]
    pub worker: Option<WorkerConfig>,
}

impl RunConfig {
    /// Configuration with defaults for every stage.
    pub fn new(task: TaskConfig, ruleset: impl Into<String>) -> Self {
        Self {
            task,
            ruleset: ruleset.into(),
            label_model: LabelModelProperties::default(),
            surrogate: SurrogateProperties::default(),
            worker: None,
        }
    }

    /// Parses and validates TOML text. Environment overrides are not
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Config`] on malformed or inconsistent input.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Io`] if the file cannot be read and
    /// [`LabelError::Config`] if it is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)
            .map_err(|e| LabelError::Config(format!("{}: {e}", path.display())))?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        debug!(path = %path.display(), "run configuration loaded");
        Ok(config)
    }

    /// Applies worker overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Config`] for a port that is not a number.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(ENV_WORKER_HOST).filter(|v| !v.trim().is_empty());
        let port = lookup(ENV_WORKER_PORT).filter(|v| !v.trim().is_empty());
        if host.is_none() && port.is_none() {
            return Ok(());
        }
        let worker = self.worker.get_or_insert_with(WorkerConfig::default);
        if let Some(host) = host {
            worker.host = host.trim().to_string();
        }
        if let Some(port) = port {
            worker.port = port.trim().parse().map_err(|_| {
                LabelError::Config(format!("{ENV_WORKER_PORT} is not a port: {port}"))
            })?;
        }
        Ok(())
    }

    /// Worker settings, defaulted when absent.
    #[must_use]
    pub fn worker(&self) -> WorkerConfig {
        self.worker.clone().unwrap_or_default()
    }

    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Config`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        self.task
            .label_set()
            .map_err(|e| LabelError::Config(format!("task labels: {e}")))?;
        if self.surrogate.folds() == 1 {
            return Err(LabelError::Config(
                "surrogate.folds must be 0 (no cross-validation) or at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
