//! Error types for the mock masters source.

use clusterview_masters::{MastersSourceError, SourceErrorKind};
use thiserror::Error;

/// Error type for the mock masters source.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// Injected failure simulating an unreachable cluster.
    #[error("Mock source unavailable: {0}")]
    Unavailable(String),

    /// No snapshot has been configured for the requested kind.
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// Error when loading or parsing a snapshot file.
    #[error("Snapshot file error: {0}")]
    SnapshotFile(String),
}

impl MastersSourceError for Error {
    fn kind(&self) -> SourceErrorKind {
        match self {
            Self::Unavailable(_) => SourceErrorKind::Unavailable,
            Self::SnapshotFile(_) => SourceErrorKind::Decode,
            Self::NotInitialized(_) => SourceErrorKind::Other,
        }
    }
}
