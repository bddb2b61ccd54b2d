//! Error taxonomy for the retrieval pipeline.
//!
//! Build-time errors abort a build and leave the published index untouched.
//! Query-time errors are reported distinctly so callers can tell
//! "no grounding available" apart from "retrieval is broken".

use std::path::PathBuf;
use std::time::Duration;

/// Convenience alias used across the retrieval crates.
pub type Result<T, E = RetrievalError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The source document is missing, unreadable, or cannot be parsed.
    #[error("failed to read document {}: {reason}", path.display())]
    DocumentRead { path: PathBuf, reason: String },

    /// The embedding model is unavailable or failed transiently.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The input or the provider's response is unusable; retrying the same
    /// request fails the same way.
    #[error("embedding rejected: {0}")]
    EmbeddingRejected(String),

    /// The embedding step did not finish within the configured bound.
    #[error("embedding timed out after {0:?}")]
    EmbeddingTimeout(Duration),

    /// A search was attempted against an index holding zero vectors.
    #[error("index is not ready: no vectors have been indexed")]
    IndexNotReady,

    /// A vector does not match the dimensionality of the index.
    #[error("vector has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Reading or writing the snapshot file failed.
    #[error("index snapshot I/O failed at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file exists but its contents cannot be decoded.
    #[error("index snapshot at {} is corrupt: {reason}", path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },

    /// The snapshot was written by another format version or embedding model.
    #[error("index snapshot at {} is incompatible: {reason}", path.display())]
    IncompatibleSnapshot { path: PathBuf, reason: String },

    /// The chunk list and vector list of an index disagree in length.
    #[error("index holds {chunks} chunks but {vectors} vectors")]
    ChunkCountMismatch { chunks: usize, vectors: usize },

    #[error("chunk size must be at least 1 word")]
    InvalidChunkSize,
}

impl RetrievalError {
    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalError::Embedding(_) | RetrievalError::EmbeddingTimeout(_)
        )
    }

    /// Whether the snapshot should be rebuilt rather than read.
    pub fn requires_rebuild(&self) -> bool {
        matches!(self, RetrievalError::IncompatibleSnapshot { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(RetrievalError::Embedding("model offline".into()).is_retryable());
        assert!(RetrievalError::EmbeddingTimeout(Duration::from_secs(5)).is_retryable());
        assert!(!RetrievalError::IndexNotReady.is_retryable());
        assert!(!RetrievalError::InvalidChunkSize.is_retryable());
        assert!(!RetrievalError::EmbeddingRejected("query text is empty".into()).is_retryable());
    }

    #[test]
    fn test_display_includes_path() {
        let err = RetrievalError::DocumentRead {
            path: PathBuf::from("/tmp/guide.pdf"),
            reason: "no such file".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/guide.pdf"));
        assert!(msg.contains("no such file"));
    }
}
