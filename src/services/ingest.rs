//! Deduplicated, batched embedding and insertion.

use std::collections::HashSet;

use crate::error::IngestError;
use crate::models::{Config, EmbeddingItem, MutationId, StoredItem};
use crate::services::checkpoint::CheckpointSink;
use crate::services::embedding::EmbeddingProvider;
use crate::services::vector_store::VectorStore;
use crate::utils::MAX_METADATA_TEXT;

/// Ids per dedup lookup.
const LOOKUP_PAGE: usize = 500;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Texts per provider call.
    pub batch_size: usize,
    pub max_metadata_text: usize,
    /// Items before this index were handled by an earlier run.
    pub start_offset: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_metadata_text: MAX_METADATA_TEXT,
            start_offset: 0,
        }
    }
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.embedding.batch_size as usize,
            max_metadata_text: config.ingest.max_metadata_text,
            start_offset: 0,
        }
    }

    #[must_use]
    pub fn with_start_offset(mut self, offset: usize) -> Self {
        self.start_offset = offset;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Items considered after applying the start offset.
    pub considered: usize,
    /// Items skipped because their id was already stored or repeated.
    pub skipped: usize,
    /// Items submitted to the store after dedup. A backend that gained one of
    /// the ids after the lookup keeps its own copy, so this can exceed the
    /// number of newly stored items.
    pub inserted: usize,
    /// Provider calls made.
    pub batches: usize,
    pub mutation_ids: Vec<MutationId>,
    /// Offset a follow-up run should start from.
    pub next_offset: usize,
}

impl IngestReport {
    pub fn last_mutation_id(&self) -> Option<&MutationId> {
        self.mutation_ids.last()
    }
}

/// Embed and store every item whose id is not in `store` yet.
///
/// Chunks run one at a time: one provider call, then one insert. Vector `j`
/// of a response is paired with item `j` of the same chunk. After each
/// stored chunk `checkpoint` receives the offset just past it; a failed chunk
/// is reported with its own offset and the checkpoint is left where it was.
pub async fn ingest(
    items: Vec<EmbeddingItem>,
    provider: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    options: &IngestOptions,
    mut checkpoint: Option<&mut dyn CheckpointSink>,
) -> Result<IngestReport, IngestError> {
    let total = items.len();
    let start = options.start_offset.min(total);
    let batch_size = options.batch_size.max(1);

    let pending: Vec<(usize, EmbeddingItem)> =
        items.into_iter().enumerate().skip(start).collect();
    let mut report = IngestReport {
        considered: pending.len(),
        next_offset: start,
        ..Default::default()
    };

    let fresh = filter_stored(pending, store).await?;
    report.skipped = report.considered - fresh.len();
    if report.skipped > 0 {
        tracing::info!(skipped = report.skipped, "skipping items already stored");
    }

    for chunk in fresh.chunks(batch_size) {
        let offset = chunk[0].0;
        let texts: Vec<String> = chunk.iter().map(|(_, item)| item.text.clone()).collect();

        let vectors = provider
            .embed(&texts)
            .await
            .map_err(|source| IngestError::Embedding { offset, source })?;
        report.batches += 1;

        if vectors.len() != chunk.len() {
            return Err(IngestError::Embedding {
                offset,
                source: crate::error::EmbeddingError::CountMismatch {
                    expected: chunk.len(),
                    actual: vectors.len(),
                },
            });
        }

        let stored: Vec<StoredItem> = chunk
            .iter()
            .zip(vectors)
            .map(|((_, item), vector)| {
                StoredItem::from_embedded(item.clone(), vector, options.max_metadata_text)
            })
            .collect();

        let mutation_id = store
            .insert(stored)
            .await
            .map_err(|source| IngestError::Store { offset, source })?;

        let next = chunk[chunk.len() - 1].0 + 1;
        report.inserted += chunk.len();
        report.next_offset = next;
        tracing::debug!(offset, next, %mutation_id, "stored chunk");
        report.mutation_ids.push(mutation_id);

        if let Some(sink) = checkpoint.as_deref_mut() {
            sink.record(next)?;
        }
    }

    if report.next_offset < total {
        report.next_offset = total;
        if let Some(sink) = checkpoint.as_deref_mut() {
            sink.record(total)?;
        }
    }

    Ok(report)
}

/// Drop items whose id is stored already, and repeats of an earlier id.
async fn filter_stored(
    pending: Vec<(usize, EmbeddingItem)>,
    store: &dyn VectorStore,
) -> Result<Vec<(usize, EmbeddingItem)>, IngestError> {
    let mut existing: HashSet<String> = HashSet::new();
    let ids: Vec<String> = pending.iter().map(|(_, item)| item.id.clone()).collect();
    for page in ids.chunks(LOOKUP_PAGE) {
        let found = store.get_by_ids(page).await.map_err(IngestError::Lookup)?;
        existing.extend(found.into_iter().map(|item| item.id));
    }

    let mut seen: HashSet<String> = HashSet::new();
    Ok(pending
        .into_iter()
        .filter(|(_, item)| !existing.contains(&item.id) && seen.insert(item.id.clone()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CheckpointError, EmbeddingError, VectorStoreError};
    use crate::models::{MetadataMode, QueryMatch};
    use crate::services::vector_store::LocalIndexBackend;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds "item-N" as [N, 1] and records every call.
    #[derive(Default)]
    struct TaggingProvider {
        calls: Mutex<Vec<Vec<String>>>,
        fail_on_call: Option<usize>,
    }

    #[async_trait]
    impl EmbeddingProvider for TaggingProvider {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let mut calls = self.calls.lock();
            calls.push(texts.to_vec());
            if self.fail_on_call == Some(calls.len()) {
                return Err(EmbeddingError::ServerError("status 429".to_string()));
            }
            Ok(texts
                .iter()
                .map(|t| {
                    let n: f32 = t.trim_start_matches("item-").parse().unwrap_or(-1.0);
                    vec![n, 1.0]
                })
                .collect())
        }

        fn model(&self) -> &str {
            "tagging"
        }
    }

    /// Local store that counts inserts and can fail on a given one.
    struct CountingStore {
        inner: LocalIndexBackend,
        inserts: AtomicUsize,
        inserted_items: AtomicUsize,
        fail_on_insert: Option<usize>,
        /// Lookups see nothing, as if another writer raced this one.
        stale_lookup: bool,
    }

    impl CountingStore {
        fn new(dir: &std::path::Path) -> Self {
            Self {
                inner: LocalIndexBackend::open(dir, "test", 2).unwrap(),
                inserts: AtomicUsize::new(0),
                inserted_items: AtomicUsize::new(0),
                fail_on_insert: None,
                stale_lookup: false,
            }
        }
    }

    #[async_trait]
    impl VectorStore for CountingStore {
        async fn health_check(&self) -> Result<bool, VectorStoreError> {
            self.inner.health_check().await
        }

        async fn count(&self) -> Result<Option<u64>, VectorStoreError> {
            self.inner.count().await
        }

        async fn insert(&self, items: Vec<StoredItem>) -> Result<MutationId, VectorStoreError> {
            let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_insert == Some(n) {
                return Err(VectorStoreError::InsertError("quota exceeded".to_string()));
            }
            self.inserted_items.fetch_add(items.len(), Ordering::SeqCst);
            self.inner.insert(items).await
        }

        async fn query(
            &self,
            vector: &[f32],
            k: usize,
            metadata: MetadataMode,
        ) -> Result<Vec<QueryMatch>, VectorStoreError> {
            self.inner.query(vector, k, metadata).await
        }

        async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<StoredItem>, VectorStoreError> {
            if self.stale_lookup {
                return Ok(Vec::new());
            }
            self.inner.get_by_ids(ids).await
        }

        async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, VectorStoreError> {
            self.inner.delete_by_ids(ids).await
        }

        fn collection(&self) -> &str {
            self.inner.collection()
        }

        fn backend_name(&self) -> &'static str {
            "counting"
        }
    }

    #[derive(Default)]
    struct MemoryCheckpoint {
        offsets: Vec<usize>,
    }

    impl CheckpointSink for MemoryCheckpoint {
        fn record(&mut self, offset: usize) -> Result<(), CheckpointError> {
            self.offsets.push(offset);
            Ok(())
        }
    }

    fn items(n: usize) -> Vec<EmbeddingItem> {
        (0..n)
            .map(|i| EmbeddingItem::new(i.to_string(), format!("item-{i}")))
            .collect()
    }

    fn all_ids(n: usize) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    #[tokio::test]
    async fn test_inserted_counts_submitted_items() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CountingStore::new(dir.path());
        store
            .inner
            .insert(vec![StoredItem::from_embedded(
                EmbeddingItem::new("0".to_string(), "earlier".to_string()),
                vec![0.0, 1.0],
                MAX_METADATA_TEXT,
            )])
            .await
            .unwrap();
        store.stale_lookup = true;
        let provider = TaggingProvider::default();

        let report = ingest(items(1), &provider, &store, &IngestOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(store.inner.count().await.unwrap(), Some(1));
        let kept = store.inner.get_by_ids(&all_ids(1)).await.unwrap();
        assert_eq!(kept[0].text(), Some("earlier"));
    }

    #[tokio::test]
    async fn test_each_vector_pairs_with_its_own_item() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountingStore::new(dir.path());
        let provider = TaggingProvider::default();

        let report = ingest(items(45), &provider, &store, &IngestOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(report.inserted, 45);
        assert_eq!(report.batches, 3);
        let sizes: Vec<usize> = provider.calls.lock().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![20, 20, 5]);

        let stored = store.get_by_ids(&all_ids(45)).await.unwrap();
        assert_eq!(stored.len(), 45);
        for item in stored {
            let n: usize = item.id.parse().unwrap();
            assert_eq!(item.vector, vec![n as f32, 1.0], "item {}", item.id);
            assert_eq!(item.text(), Some(format!("item-{n}").as_str()));
        }
    }

    #[tokio::test]
    async fn test_second_run_inserts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountingStore::new(dir.path());
        let provider = TaggingProvider::default();
        let options = IngestOptions::default();

        let first = ingest(items(30), &provider, &store, &options, None).await.unwrap();
        assert_eq!(first.inserted, 30);

        let second = ingest(items(30), &provider, &store, &options, None).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 30);
        assert_eq!(second.batches, 0);
        assert!(second.mutation_ids.is_empty());
        assert_eq!(store.count().await.unwrap(), Some(30));
        assert_eq!(provider.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_only_missing_ids_are_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountingStore::new(dir.path());
        let provider = TaggingProvider::default();
        ingest(items(3)[..2].to_vec(), &provider, &store, &IngestOptions::default(), None)
            .await
            .unwrap();
        provider.calls.lock().clear();
        store.inserts.store(0, Ordering::SeqCst);
        store.inserted_items.store(0, Ordering::SeqCst);

        let report = ingest(items(3), &provider, &store, &IngestOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(*provider.calls.lock(), vec![vec!["item-2".to_string()]]);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(store.inserted_items.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeated_ids_keep_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountingStore::new(dir.path());
        let provider = TaggingProvider::default();
        let input = vec![
            EmbeddingItem::new("a", "item-1"),
            EmbeddingItem::new("a", "item-2"),
        ];

        let report = ingest(input, &provider, &store, &IngestOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 1);
        let stored = store.get_by_ids(&["a".to_string()]).await.unwrap();
        assert_eq!(stored[0].vector, vec![1.0, 1.0]);
    }

    #[tokio::test]
    async fn test_long_text_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountingStore::new(dir.path());
        let provider = TaggingProvider::default();
        let input = vec![EmbeddingItem::new("long", "x".repeat(9000))];

        ingest(input, &provider, &store, &IngestOptions::default(), None)
            .await
            .unwrap();

        let stored = store.get_by_ids(&["long".to_string()]).await.unwrap();
        assert_eq!(stored[0].text().unwrap().chars().count(), 8000);
        assert_eq!(provider.calls.lock()[0][0].len(), 9000);
    }

    #[tokio::test]
    async fn test_checkpoint_advances_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountingStore::new(dir.path());
        let provider = TaggingProvider::default();
        let mut checkpoint = MemoryCheckpoint::default();

        let report = ingest(
            items(45),
            &provider,
            &store,
            &IngestOptions::default(),
            Some(&mut checkpoint),
        )
        .await
        .unwrap();

        assert_eq!(checkpoint.offsets, vec![20, 40, 45]);
        assert_eq!(report.next_offset, 45);
    }

    #[tokio::test]
    async fn test_resume_from_offset() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountingStore::new(dir.path());
        let provider = TaggingProvider::default();
        let options = IngestOptions::default().with_start_offset(40);

        let report = ingest(items(45), &provider, &store, &options, None).await.unwrap();
        assert_eq!(report.considered, 5);
        assert_eq!(report.inserted, 5);
        assert_eq!(store.count().await.unwrap(), Some(5));
        assert!(store.get_by_ids(&["39".to_string()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_stops_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountingStore::new(dir.path());
        let provider = TaggingProvider {
            fail_on_call: Some(2),
            ..Default::default()
        };
        let mut checkpoint = MemoryCheckpoint::default();

        let err = ingest(
            items(45),
            &provider,
            &store,
            &IngestOptions::default(),
            Some(&mut checkpoint),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IngestError::Embedding { offset: 20, .. }));
        assert_eq!(checkpoint.offsets, vec![20]);
        assert_eq!(store.count().await.unwrap(), Some(20));
        assert_eq!(provider.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_insert_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CountingStore::new(dir.path());
        store.fail_on_insert = Some(1);
        let provider = TaggingProvider::default();
        let mut checkpoint = MemoryCheckpoint::default();

        let err = ingest(
            items(25),
            &provider,
            &store,
            &IngestOptions::default(),
            Some(&mut checkpoint),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IngestError::Store { offset: 0, .. }));
        assert_eq!(err.offset(), Some(0));
        assert!(checkpoint.offsets.is_empty());
        assert_eq!(provider.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountingStore::new(dir.path());
        let provider = TaggingProvider::default();

        let report = ingest(Vec::new(), &provider, &store, &IngestOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.batches, 0);
        assert!(provider.calls.lock().is_empty());
    }
}
