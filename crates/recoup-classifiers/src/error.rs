use std::path::PathBuf;

use crate::math::ShapeError;

/// Errors raised by the encoding, training and reporting stages.
#[derive(thiserror::Error, Debug)]
pub enum RecoupError {
    /// A required input column is absent or one of its values is malformed.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Not enough rows to fit or to stratify.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The logistic regression optimizer exhausted its iteration budget.
    #[error("Optimizer did not converge after {iterations} iterations (last step {last_step:.3e})")]
    Convergence { iterations: usize, last_step: f64 },

    /// Persisting an artifact failed. The in-memory report is unaffected.
    #[error("Failed to write artifact {}: {message}", path.display())]
    ArtifactWrite { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model '{0}' has not been fitted")]
    NotFitted(&'static str),

    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecoupError {
    pub(crate) fn artifact<E: std::fmt::Display>(path: impl Into<PathBuf>, err: E) -> Self {
        RecoupError::ArtifactWrite {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecoupError>;
