//! Error types for labelsmith operations.
//!
//! Parse and compile failures are local to a single rule: the rule is
//! excluded and the run continues. Insufficient rules and remote worker
//! failures abort the whole run and must reach the caller as such.

use thiserror::Error;

/// Result type alias for labelsmith operations.
pub type Result<T> = std::result::Result<T, LabelError>;

/// Main error type for labelsmith operations.
///
/// # Examples
///
/// ```
/// use labelsmith::error::LabelError;
///
/// let err = LabelError::InsufficientRules { found: 2, required: 3 };
/// assert!(err.aborts_run());
/// assert!(err.to_string().contains("insufficient rules"));
/// ```
#[derive(Error, Debug)]
pub enum LabelError {
    /// Malformed rule text.
    #[error("syntax error in rule: {message}")]
    Parse {
        /// What went wrong
        message: String,
    },

    /// A parsed rule cannot become a labeling function.
    #[error("cannot compile rule '{rule}': {reason}")]
    Compile {
        /// Rule identifier or name
        rule: String,
        /// Why compilation failed
        reason: String,
    },

    /// Too few eligible labeling functions to start aggregation.
    #[error("insufficient rules: {found} eligible labeling functions, at least {required} required")]
    InsufficientRules {
        /// Eligible functions found
        found: usize,
        /// Minimum required
        required: usize,
    },

    /// The bound feature matrix no longer holds a feature a rule depends on.
    #[error("feature '{feature}' is not present in the active feature matrix")]
    MissingFeature {
        /// Feature name
        feature: String,
    },

    /// Surrogate model training failed.
    #[error("training failed: {0}")]
    Training(String),

    /// Remote training worker call failed; the run is aborted.
    #[error("remote worker error: {0}")]
    RemoteWorker(String),

    /// An operation was called in the wrong lifecycle state.
    #[error("invalid state: expected {expected}, found {found}")]
    InvalidState {
        /// State required by the operation
        expected: String,
        /// Current state
        found: String,
    },

    /// Invalid hyperparameter value provided.
    #[error("invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Dimensions of two inputs do not agree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Persistence collaborator failure.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with string message.
    #[error("{0}")]
    Other(String),
}

impl LabelError {
    /// Convenience constructor for parse errors.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Convenience constructor for compile errors.
    pub fn compile(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Compile {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// Errors that only exclude the offending rule.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Compile { .. })
    }

    /// Errors that abort the whole labeling run.
    #[must_use]
    pub fn aborts_run(&self) -> bool {
        matches!(
            self,
            Self::InsufficientRules { .. } | Self::RemoteWorker(_) | Self::MissingFeature { .. }
        )
    }
}

impl From<&str> for LabelError {
    fn from(msg: &str) -> Self {
        Self::Other(msg.to_string())
    }
}

impl From<String> for LabelError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}

impl From<toml::de::Error> for LabelError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
