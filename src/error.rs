//! Error types for thread search.

use thiserror::Error;

/// Errors raised while rebuilding threads from linked posts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThreadError {
    #[error("cycle detected in thread {root}: post {id} visited twice")]
    Cycle { root: String, id: String },

    #[error("post {from} links to unknown post {id}")]
    MissingPost { from: String, id: String },

    #[error("duplicate post id: {0}")]
    DuplicatePost(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding provider: {0}")]
    ConnectionError(String),

    #[error("embedding provider error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,

    #[error("provider returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("insert error: {0}")]
    InsertError(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("index IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("index serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("operation not supported by {backend} backend: {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },
}

/// Errors raised by a bulk ingestion run.
///
/// Embedding and store failures carry the offset of the chunk that failed so
/// the run can be resumed from there.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("embedding failed for chunk at offset {offset}: {source}")]
    Embedding {
        offset: usize,
        #[source]
        source: EmbeddingError,
    },

    #[error("store failed for chunk at offset {offset}: {source}")]
    Store {
        offset: usize,
        #[source]
        source: VectorStoreError,
    },

    #[error("dedup lookup failed: {0}")]
    Lookup(#[source] VectorStoreError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

impl IngestError {
    /// Offset of the chunk that failed, if the failure belongs to a chunk.
    pub fn offset(&self) -> Option<usize> {
        match self {
            IngestError::Embedding { offset, .. } | IngestError::Store { offset, .. } => {
                Some(*offset)
            }
            IngestError::Lookup(_) | IngestError::Checkpoint(_) => None,
        }
    }
}

/// Errors related to ingestion checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors surfaced by the HTTP proxy routes.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    Store(#[from] VectorStoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_offset() {
        let err = IngestError::Embedding {
            offset: 40,
            source: EmbeddingError::Timeout,
        };
        assert_eq!(err.offset(), Some(40));

        let err = IngestError::Lookup(VectorStoreError::QueryError("down".to_string()));
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn test_error_messages() {
        let err = ThreadError::Cycle {
            root: "1".to_string(),
            id: "3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cycle detected in thread 1: post 3 visited twice"
        );

        let err = VectorStoreError::DimensionMismatch {
            expected: 3,
            actual: 2,
        };
        assert!(err.to_string().contains("expected 3"));
    }
}
