//! In-process worker state.

use tracing::{info, warn};

use super::{Request, Response};
use crate::error::{LabelError, Result};
use crate::surrogate::{SurrogateConfig, SurrogateModel};

/// Holds the current model and answers requests.
///
/// ```
/// use labelsmith::surrogate::SurrogateConfig;
/// use labelsmith::worker::{Request, Response, Worker};
///
/// let mut worker = Worker::new();
/// let init = Request::Init { config: SurrogateConfig::default() };
/// assert!(matches!(worker.handle(init.clone()), Response::Initialized { .. }));
/// assert!(matches!(worker.handle(init), Response::AlreadyInitialized { .. }));
/// assert_eq!(worker.handle(Request::Restart), Response::Cleared);
/// ```
#[derive(Debug, Default)]
pub struct Worker {
    active: Option<(SurrogateConfig, Box<dyn SurrogateModel>)>,
}

impl Worker {
    /// Creates a worker without a model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration of the current model.
    #[must_use]
    pub fn config(&self) -> Option<&SurrogateConfig> {
        self.active.as_ref().map(|(config, _)| config)
    }

    fn model(&mut self) -> Result<&mut Box<dyn SurrogateModel>> {
        self.active
            .as_mut()
            .map(|(_, model)| model)
            .ok_or_else(|| LabelError::InvalidState {
                expected: "initialized".to_string(),
                found: "uninitialized".to_string(),
            })
    }

    /// Answers one request. Errors become [`Response::Error`].
    pub fn handle(&mut self, request: Request) -> Response {
        self.dispatch(request).unwrap_or_else(|err| Response::Error {
            message: err.to_string(),
        })
    }

    fn dispatch(&mut self, request: Request) -> Result<Response> {
        match request {
            Request::Init { config } => {
                let kind = config.kind();
                if self.config() == Some(&config) {
                    return Ok(Response::AlreadyInitialized { kind });
                }
                info!(%kind, "initializing surrogate");
                let model = config.build();
                self.active = Some((config, model));
                Ok(Response::Initialized { kind })
            }
            Request::Apply { input, folds } => match self.model()?.train(&input, folds) {
                Ok(folds) => Ok(Response::Trained { folds }),
                Err(err) => {
                    // a half-trained model must not answer predict
                    warn!(error = %err, "training failed, dropping surrogate");
                    self.active = None;
                    Err(err)
                }
            },
            Request::Predict { features } => {
                let labels = self.model()?.predict(&features)?;
                Ok(Response::Predicted { labels })
            }
            Request::Restart => {
                info!("clearing surrogate");
                self.active = None;
                Ok(Response::Cleared)
            }
        }
    }
}
