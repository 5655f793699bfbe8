use std::path::PathBuf;

use thiserror::Error;

use crate::ports::BoxError;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("failed to discover evidence files")]
    Discovery(#[source] BoxError),
    #[error("failed to open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("read failed after {offset} bytes")]
    Read {
        offset: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("ingest sink failed")]
    Sink(#[source] BoxError),
}

impl TriageError {
    /// Failures that only affect the current file; the run moves on to the next one.
    pub fn is_per_file(&self) -> bool {
        matches!(self, TriageError::Open { .. } | TriageError::Read { .. })
    }
}
