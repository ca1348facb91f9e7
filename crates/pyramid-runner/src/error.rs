use pyramid_dem::DemError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Failure inside the pyramid library.
    #[error("{0}")]
    Dem(#[from] DemError),

    /// Configuration file could not be read.
    #[error("Cannot read config {path}: {source}")]
    ConfigIo {
        /// Configuration file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for [`crate::PipelineConfig`].
    #[error("Invalid config {path}: {source}")]
    ConfigParse {
        /// Configuration file.
        path: PathBuf,
        /// Parser error with location.
        source: serde_yaml::Error,
    },

    /// Configuration parsed but holds inconsistent values.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
