use std::io;
use std::path::PathBuf;

/// Run-level failures. Per-attempt failures never surface here; they are
/// classified into an [`crate::OutcomeKind`] and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Credential source unavailable: {path}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed reading credential source {path}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Worker failure: {0}")]
    Worker(String),
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Config(msg.into())
    }

    /// Source errors abort the run before (or while) work is produced.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            EngineError::SourceUnavailable { .. } | EngineError::SourceRead { .. }
        )
    }
}
