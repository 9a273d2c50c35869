//! Error types for labelsmith-cli

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

use labelsmith::LabelError;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Input file is not valid for its purpose
    #[error("Invalid input {path}: {reason}")]
    InvalidInput {
        /// Offending file
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Rule text does not parse
    #[error("{0}")]
    Rule(String),

    /// The run was refused or aborted
    #[error("{0}")]
    Labelsmith(#[from] LabelError),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::FileNotFound(_) => ExitCode::from(3),
            Self::InvalidInput { .. } => ExitCode::from(4),
            Self::Rule(_) => ExitCode::from(5),
            Self::Io(_) => ExitCode::from(7),
            Self::Labelsmith(e) => match e {
                LabelError::InsufficientRules { .. } => ExitCode::from(6),
                LabelError::RemoteWorker(_) => ExitCode::from(10),
                LabelError::Config(_) => ExitCode::from(4),
                _ => ExitCode::from(1),
            },
        }
    }
}
