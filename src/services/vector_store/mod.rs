//! Vector store abstraction layer.
//!
//! This module provides a trait-based abstraction over the vector store
//! backends (an on-disk local index and a remote Qdrant collection) so the
//! ingestion pipeline and the HTTP proxy never depend on a concrete store.

mod local;
mod qdrant;

pub use local::LocalIndexBackend;
pub use qdrant::QdrantBackend;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{
    EmbeddingConfig, MetadataMode, MutationId, QueryMatch, StoredItem, VectorDriver,
    VectorStoreConfig,
};

/// Abstract trait for vector store operations.
///
/// Ids are unique within a store and `insert` never overwrites: an id that is
/// already present keeps its original vector and metadata.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the vector store is reachable.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Number of stored items, or None if the index has not been created.
    async fn count(&self) -> Result<Option<u64>, VectorStoreError>;

    /// Add items under their ids, creating the index on first use.
    /// Ids that already exist are left untouched.
    async fn insert(&self, items: Vec<StoredItem>) -> Result<MutationId, VectorStoreError>;

    /// The `k` nearest items to `vector`, most similar first.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        metadata: MetadataMode,
    ) -> Result<Vec<QueryMatch>, VectorStoreError>;

    /// Stored items among `ids`. Missing ids are skipped.
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<StoredItem>, VectorStoreError>;

    /// Remove `ids`, returning how many were actually present.
    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, VectorStoreError>;

    /// Items whose `metadata.text` equals `text` exactly.
    async fn find_by_text(&self, _text: &str) -> Result<Vec<StoredItem>, VectorStoreError> {
        Err(VectorStoreError::Unsupported {
            backend: self.backend_name(),
            operation: "find_by_text",
        })
    }

    /// Get the collection name.
    fn collection(&self) -> &str;

    fn backend_name(&self) -> &'static str;
}

/// Create a vector store backend with the given embedding dimension.
pub async fn create_backend(
    config: &VectorStoreConfig,
    embedding_dim: u64,
) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Local => {
            let backend = LocalIndexBackend::from_config(config, embedding_dim as usize)?;
            Ok(Box::new(backend))
        }
        VectorDriver::Qdrant => {
            let backend = QdrantBackend::new(config, embedding_dim)?;
            Ok(Box::new(backend))
        }
    }
}

/// Create a vector store backend sized for the configured embedding model.
pub async fn create_backend_with_embedding_config(
    vector_config: &VectorStoreConfig,
    embedding_config: &EmbeddingConfig,
) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    create_backend(vector_config, u64::from(embedding_config.dimension)).await
}

/// Cosine similarity in [-1, 1]; zero when either vector has no length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), VectorStoreError> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(VectorStoreError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}
