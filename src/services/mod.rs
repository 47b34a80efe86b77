pub mod checkpoint;
mod embedding;
mod ingest;
mod threads;
mod vector_store;

pub use checkpoint::{Checkpoint, CheckpointSink, FileCheckpoint};
pub use embedding::{EmbeddingProvider, OpenAiEmbeddingClient};
pub use ingest::{IngestOptions, IngestReport, ingest};
pub use threads::{ThreadStats, reconstruct};
pub use vector_store::{
    LocalIndexBackend, QdrantBackend, VectorStore, cosine_similarity, create_backend,
    create_backend_with_embedding_config,
};
