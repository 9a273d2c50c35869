//! Surrogate proxy for a remote worker.

use tracing::info;

use super::{SurrogateConfig, SurrogateInput, SurrogateKind, SurrogateModel};
use crate::error::{LabelError, Result};
use crate::primitives::Matrix;
use crate::scoring::FoldMetrics;
use crate::worker::WorkerClient;

/// Trains and predicts on a remote worker; reference labels stay local.
///
/// Any network or worker failure is returned as
/// [`LabelError::RemoteWorker`] and leaves the proxy untrained.
#[derive(Debug, Clone)]
pub struct RemoteSurrogate {
    client: WorkerClient,
    config: SurrogateConfig,
    reference: Option<Vec<i32>>,
}

impl RemoteSurrogate {
    /// Proxy for `config` on the worker behind `client`.
    #[must_use]
    pub fn new(client: WorkerClient, config: SurrogateConfig) -> Self {
        Self {
            client,
            config,
            reference: None,
        }
    }

    /// Variant configuration sent on `init`.
    #[must_use]
    pub fn config(&self) -> &SurrogateConfig {
        &self.config
    }
}

impl SurrogateModel for RemoteSurrogate {
    fn kind(&self) -> SurrogateKind {
        self.config.kind()
    }

    fn train(&mut self, input: &SurrogateInput, folds: usize) -> Result<Vec<FoldMetrics>> {
        self.reference = None;
        let created = self.client.init(&self.config)?;
        info!(addr = self.client.addr(), created, kind = %self.kind(), "remote surrogate initialized");
        let metrics = self.client.apply(input, folds)?;
        self.reference = Some(input.reference_labels());
        Ok(metrics)
    }

    fn predict(&self, features: &Matrix<f32>) -> Result<Vec<i32>> {
        if self.reference.is_none() {
            return Err(LabelError::InvalidState {
                expected: "trained".to_string(),
                found: "untrained".to_string(),
            });
        }
        self.client.predict(features)
    }

    fn reference_labels(&self) -> Option<&[i32]> {
        self.reference.as_deref()
    }
}
