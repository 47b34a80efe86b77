mod config;
mod item;
mod post;
mod search;

pub use config::{
    Config, DEFAULT_BATCH_SIZE, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIMENSION,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT,
    DEFAULT_QDRANT_URL, DEFAULT_TOP_K, EmbeddingConfig, IngestConfig, OutputConfig, ServerConfig,
    VectorDriver, VectorStoreConfig,
};
pub use item::{
    EmbeddingItem, Metadata, MetadataMode, MetadataValue, MutationId, QueryMatch, StoredItem,
    TEXT_KEY, truncate_metadata_text,
};
pub use post::{Post, Thread};
pub use search::{OutputFormat, SearchResults};
