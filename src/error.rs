//! Error taxonomy for the generation pipeline

use std::path::PathBuf;

use thiserror::Error;

use crate::job::Stage;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can abort or degrade a generation job
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The submitted use case configuration is invalid. Every violation is
    /// collected before this is raised, so `fields` names all of them at once.
    #[error("invalid configuration: {}", fields.join("; "))]
    Configuration {
        /// One entry per missing or malformed field
        fields: Vec<String>,
    },

    /// A provider call failed after the model's output could not be brought
    /// into the expected structure, or a retry budget was exhausted
    #[error("stage '{stage}' failed: {message}")]
    Generation {
        /// Stage that owned the failed call
        stage: Stage,
        /// What went wrong
        message: String,
    },

    /// Refined content violates a structural invariant of the original config
    #[error("content integrity violation: {0}")]
    ContentIntegrity(String),

    /// Writing an artifact to the job directory failed
    #[error("failed to write artifact {path}: {source}")]
    Storage {
        /// Target path of the failed write
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The overall job deadline elapsed while a stage was in flight
    #[error("job timed out during stage '{0}'")]
    Timeout(Stage),
}

impl PipelineError {
    /// Build a `Generation` error for the given stage
    pub fn generation(stage: Stage, message: impl Into<String>) -> Self {
        Self::Generation {
            stage,
            message: message.into(),
        }
    }

    /// Build a `Storage` error for the given path
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}
