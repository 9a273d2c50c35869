//! Blocking HTTP client.

use std::time::Duration;

use tracing::debug;

use super::{Request, Response, WorkerConfig};
use crate::error::{LabelError, Result};
use crate::primitives::Matrix;
use crate::scoring::FoldMetrics;
use crate::surrogate::{SurrogateConfig, SurrogateInput};

fn remote(context: &str, err: impl std::fmt::Display) -> LabelError {
    LabelError::RemoteWorker(format!("{context}: {err}"))
}

/// Calls a worker; every call posts one request and waits for its
/// response. Calls are never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerClient {
    addr: String,
    timeout: Option<Duration>,
}

impl WorkerClient {
    /// Client for `host:port`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: None,
        }
    }

    /// Client for a configured worker.
    #[must_use]
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            addr: config.addr(),
            timeout: config.timeout(),
        }
    }

    /// Bounds each whole call, connecting included.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Worker address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn agent(&self) -> ureq::Agent {
        let builder = ureq::AgentBuilder::new();
        match self.timeout {
            Some(timeout) => builder.timeout(timeout).build(),
            None => builder.build(),
        }
    }

    /// Sends one request and blocks for the response.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::RemoteWorker`] on network failure, timeout, a
    /// non-success HTTP status or an unreadable response.
    pub fn call(&self, request: &Request) -> Result<Response> {
        let method = request.method();
        let url = format!("http://{}/{method}", self.addr);
        debug!(%url, "worker call");
        let response = match self.agent().post(&url).send_json(request) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(remote(method, format!("HTTP {code}: {body}")));
            }
            Err(err) => return Err(remote(method, err)),
        };
        response.into_json().map_err(|e| remote("decode", e))
    }

    fn call_for<T>(&self, request: &Request, pick: impl FnOnce(Response) -> Option<T>) -> Result<T> {
        match self.call(request)? {
            Response::Error { message } => Err(LabelError::RemoteWorker(message)),
            response => {
                let text = format!("{response:?}");
                pick(response).ok_or_else(|| {
                    remote(request.method(), format!("unexpected reply {text}"))
                })
            }
        }
    }

    /// Initializes the remote model; `true` if it was created, `false` if an
    /// identical one was already loaded.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::RemoteWorker`] on any failure.
    pub fn init(&self, config: &SurrogateConfig) -> Result<bool> {
        let request = Request::Init {
            config: config.clone(),
        };
        self.call_for(&request, |r| match r {
            Response::Initialized { .. } => Some(true),
            Response::AlreadyInitialized { .. } => Some(false),
            _ => None,
        })
    }

    /// Trains the remote model.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::RemoteWorker`] on any failure.
    pub fn apply(&self, input: &SurrogateInput, folds: usize) -> Result<Vec<FoldMetrics>> {
        let request = Request::Apply {
            input: input.clone(),
            folds,
        };
        self.call_for(&request, |r| match r {
            Response::Trained { folds } => Some(folds),
            _ => None,
        })
    }

    /// Labels rows with the remote model.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::RemoteWorker`] on any failure.
    pub fn predict(&self, features: &Matrix<f32>) -> Result<Vec<i32>> {
        let request = Request::Predict {
            features: features.clone(),
        };
        self.call_for(&request, |r| match r {
            Response::Predicted { labels } => Some(labels),
            _ => None,
        })
    }

    /// Drops the remote model.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::RemoteWorker`] on any failure.
    pub fn restart(&self) -> Result<()> {
        self.call_for(&Request::Restart, |r| match r {
            Response::Cleared => Some(()),
            _ => None,
        })
    }
}
