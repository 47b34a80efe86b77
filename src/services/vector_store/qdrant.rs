//! Qdrant vector store backend implementation.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, GetPointsBuilder,
    PayloadIncludeSelector, PointId, PointStruct, PointsIdsList, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use std::collections::{HashMap, HashSet};

use super::{VectorStore, check_dimension};
use crate::error::VectorStoreError;
use crate::models::{
    Metadata, MetadataMode, MetadataValue, MutationId, QueryMatch, StoredItem, VectorStoreConfig,
};

/// Payload field carrying the caller's id. Qdrant point ids must be UUIDs or
/// integers, so points are keyed by a UUIDv5 derived from this value.
const ID_FIELD: &str = "item_id";

/// Qdrant vector store backend.
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    embedding_dim: u64,
}

impl QdrantBackend {
    /// Create a new Qdrant backend from configuration with custom embedding dimension.
    pub fn new(config: &VectorStoreConfig, embedding_dim: u64) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            embedding_dim,
        })
    }

    async fn collection_exists(&self) -> Result<bool, VectorStoreError> {
        self.client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))
    }

    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        if self.collection_exists().await? {
            return Ok(());
        }

        let create_collection = CreateCollectionBuilder::new(&self.collection).vectors_config(
            VectorParamsBuilder::new(self.embedding_dim, Distance::Cosine),
        );

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        tracing::info!(collection = %self.collection, dim = self.embedding_dim, "created qdrant collection");
        Ok(())
    }

    /// Points already stored for `ids`, keyed by the caller's id.
    async fn fetch(
        &self,
        ids: &[String],
        with_payload: bool,
    ) -> Result<Vec<StoredItem>, VectorStoreError> {
        if ids.is_empty() || !self.collection_exists().await? {
            return Ok(Vec::new());
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| point_id(id)).collect();
        let mut builder = GetPointsBuilder::new(&self.collection, point_ids).with_vectors(false);
        builder = if with_payload {
            builder.with_payload(true)
        } else {
            builder.with_payload(PayloadIncludeSelector {
                fields: vec![ID_FIELD.to_string()],
            })
        };

        let response = self
            .client
            .get_points(builder)
            .await
            .map_err(|e| VectorStoreError::QueryError(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let (id, metadata) = split_payload(point.payload)?;
                Some(StoredItem {
                    id,
                    vector: Vec::new(),
                    metadata,
                })
            })
            .collect())
    }
}

/// Deterministic point id for a caller id.
fn point_id(id: &str) -> PointId {
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, id.as_bytes())
        .to_string()
        .into()
}

fn to_payload(id: String, metadata: Metadata) -> HashMap<String, qdrant_client::qdrant::Value> {
    let mut payload: HashMap<String, qdrant_client::qdrant::Value> = metadata
        .into_iter()
        .map(|(key, value)| {
            let value: qdrant_client::qdrant::Value = match value {
                MetadataValue::Bool(b) => b.into(),
                MetadataValue::Integer(n) => n.into(),
                MetadataValue::Float(f) => f.into(),
                MetadataValue::Text(s) => s.into(),
            };
            (key, value)
        })
        .collect();
    payload.insert(ID_FIELD.to_string(), id.into());
    payload
}

/// Split a point payload into the caller's id and scalar metadata.
fn split_payload(
    payload: HashMap<String, qdrant_client::qdrant::Value>,
) -> Option<(String, Metadata)> {
    use qdrant_client::qdrant::value::Kind;

    let mut id = None;
    let mut metadata = Metadata::new();
    for (key, value) in payload {
        let Some(kind) = value.kind else {
            continue;
        };
        if key == ID_FIELD {
            if let Kind::StringValue(s) = kind {
                id = Some(s);
            }
            continue;
        }
        let value = match kind {
            Kind::BoolValue(b) => MetadataValue::Bool(b),
            Kind::IntegerValue(n) => MetadataValue::Integer(n),
            Kind::DoubleValue(f) => MetadataValue::Float(f),
            Kind::StringValue(s) => MetadataValue::Text(s),
            _ => continue,
        };
        metadata.insert(key, value);
    }
    id.map(|id| (id, metadata))
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn count(&self) -> Result<Option<u64>, VectorStoreError> {
        if !self.collection_exists().await? {
            return Ok(None);
        }

        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| VectorStoreError::QueryError(e.to_string()))?;

        Ok(Some(response.result.map_or(0, |r| r.count)))
    }

    async fn insert(&self, items: Vec<StoredItem>) -> Result<MutationId, VectorStoreError> {
        for item in &items {
            check_dimension(self.embedding_dim as usize, &item.vector)?;
        }

        self.ensure_collection().await?;

        let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        let existing: HashSet<String> = self
            .fetch(&ids, false)
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect();

        // Upsert would overwrite, so only unseen ids are sent. Qdrant has no
        // insert-if-absent, so a writer that lands between the fetch above and
        // the upsert below can still be overwritten.
        let mut seen: HashSet<String> = HashSet::new();
        let points: Vec<PointStruct> = items
            .into_iter()
            .filter(|item| !existing.contains(&item.id) && seen.insert(item.id.clone()))
            .map(|item| {
                let id = point_id(&item.id);
                PointStruct::new(id, item.vector, to_payload(item.id, item.metadata))
            })
            .collect();

        if points.is_empty() {
            return Ok(MutationId::generate());
        }

        let added = points.len();
        let upsert = UpsertPointsBuilder::new(&self.collection, points).wait(true);

        let response = self
            .client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::InsertError(e.to_string()))?;

        tracing::debug!(added, collection = %self.collection, "qdrant insert");

        Ok(response
            .result
            .and_then(|r| r.operation_id)
            .map_or_else(MutationId::generate, |op| MutationId(op.to_string())))
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        metadata: MetadataMode,
    ) -> Result<Vec<QueryMatch>, VectorStoreError> {
        check_dimension(self.embedding_dim as usize, vector)?;
        if k == 0 || !self.collection_exists().await? {
            return Ok(Vec::new());
        }

        let mut search_builder = SearchPointsBuilder::new(&self.collection, vector.to_vec(), k as u64);
        search_builder = match metadata {
            MetadataMode::All => search_builder.with_payload(true),
            MetadataMode::None => search_builder.with_payload(PayloadIncludeSelector {
                fields: vec![ID_FIELD.to_string()],
            }),
        };

        let results = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorStoreError::QueryError(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| {
                let (id, payload) = split_payload(point.payload)?;
                Some(QueryMatch {
                    id,
                    score: point.score,
                    metadata: match metadata {
                        MetadataMode::All => Some(payload),
                        MetadataMode::None => None,
                    },
                })
            })
            .collect())
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<StoredItem>, VectorStoreError> {
        self.fetch(ids, true).await
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, VectorStoreError> {
        let existing = self.fetch(ids, false).await?;
        if existing.is_empty() {
            return Ok(0);
        }

        let point_ids: Vec<PointId> = existing.iter().map(|item| point_id(&item.id)).collect();
        let delete = DeletePointsBuilder::new(&self.collection)
            .points(PointsIdsList { ids: point_ids })
            .wait(true);

        self.client
            .delete_points(delete)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(existing.len())
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn backend_name(&self) -> &'static str {
        "qdrant"
    }
}
