//! Error types for master aggregation and the fetch seam

use std::error::Error;
use std::fmt::{self, Debug};
use thiserror::Error as ThisError;

/// Errors recorded while fetching or decoding master snapshots.
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum MastersError {
    /// Monitor configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A snapshot could not be decoded
    #[error("Snapshot decode error: {0}")]
    Decode(String),

    /// The snapshot source failed
    #[error("Source error ({kind}): {message}")]
    Source {
        /// Kind reported by the source
        kind: SourceErrorKind,
        /// Source error message
        message: String,
    },
}

impl MastersError {
    /// Converts any source error into the recorded form, keeping its kind.
    pub fn from_source<E: MastersSourceError>(error: &E) -> Self {
        Self::Source {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for MastersError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

/// Marker trait for `MastersSource` errors
pub trait MastersSourceError: Debug + Error + Send + Sync {
    /// Returns the kind of this error
    fn kind(&self) -> SourceErrorKind;
}

/// The kind of source error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SourceErrorKind {
    /// The cluster could not be reached
    Unavailable,

    /// The response arrived but could not be decoded
    Decode,

    /// Other/unknown error
    Other,
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
