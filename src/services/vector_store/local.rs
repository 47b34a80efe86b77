//! On-disk vector index backend.
//!
//! The whole index lives in one JSON file, `<root>/<collection>/index.json`,
//! and is held in memory as an immutable snapshot. Queries are exact
//! brute-force cosine top-k over the current snapshot. Mutations are
//! serialized by a writer lock; each one writes a complete new file on the
//! blocking pool, renames it into place, and only then publishes the new
//! snapshot, so a failed write leaves both untouched.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{VectorStore, check_dimension, cosine_similarity};
use crate::error::VectorStoreError;
use crate::models::{MetadataMode, MutationId, QueryMatch, StoredItem, VectorStoreConfig};

const INDEX_FILE: &str = "index.json";
const INDEX_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile<T> {
    version: u32,
    dimension: usize,
    items: T,
}

#[derive(Debug, Default)]
struct IndexState {
    items: Vec<StoredItem>,
    positions: HashMap<String, usize>,
}

impl IndexState {
    fn new(items: Vec<StoredItem>) -> Self {
        let positions = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id.clone(), i))
            .collect();
        Self { items, positions }
    }

    fn get(&self, id: &str) -> Option<&StoredItem> {
        self.positions.get(id).map(|&i| &self.items[i])
    }

    fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }
}

/// Entry in the min-heap for top-k selection.
#[derive(Debug)]
struct ScoredEntry<'a> {
    score: f32,
    item: &'a StoredItem,
}

impl PartialEq for ScoredEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredEntry<'_> {}

impl PartialOrd for ScoredEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the heap top is the weakest hit.
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.item.id.cmp(&other.item.id))
    }
}

/// Write the full index to a temp file and rename it over `path`.
fn write_index(
    path: &Path,
    dimension: usize,
    items: &[StoredItem],
) -> Result<(), VectorStoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = IndexFile {
        version: INDEX_VERSION,
        dimension,
        items,
    };
    let bytes = serde_json::to_vec(&file)?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Local on-disk vector index.
pub struct LocalIndexBackend {
    path: PathBuf,
    collection: String,
    dimension: usize,
    /// Published snapshot; `None` until the file exists. Locked only to clone or swap.
    state: RwLock<Option<Arc<IndexState>>>,
    writer: Mutex<()>,
}

impl LocalIndexBackend {
    /// Open `collection` under `root`. The index file is created lazily by
    /// the first insert.
    pub fn open(
        root: &Path,
        collection: &str,
        dimension: usize,
    ) -> Result<Self, VectorStoreError> {
        let path = root.join(collection).join(INDEX_FILE);

        let state = if path.exists() {
            let bytes = std::fs::read(&path)?;
            let file: IndexFile<Vec<StoredItem>> = serde_json::from_slice(&bytes)?;
            if file.version != INDEX_VERSION {
                return Err(VectorStoreError::CollectionError(format!(
                    "unsupported index version {} in {}",
                    file.version,
                    path.display()
                )));
            }
            if file.dimension != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: dimension,
                    actual: file.dimension,
                });
            }
            tracing::debug!(path = %path.display(), items = file.items.len(), "loaded local index");
            Some(Arc::new(IndexState::new(file.items)))
        } else {
            None
        };

        Ok(Self {
            path,
            collection: collection.to_string(),
            dimension,
            state: RwLock::new(state),
            writer: Mutex::new(()),
        })
    }

    pub fn from_config(
        config: &VectorStoreConfig,
        dimension: usize,
    ) -> Result<Self, VectorStoreError> {
        let root = config.local_root().ok_or_else(|| {
            VectorStoreError::CollectionError("could not determine data directory".to_string())
        })?;
        Self::open(&root, &config.collection, dimension)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot(&self) -> Option<Arc<IndexState>> {
        self.state.read().clone()
    }

    /// Build the next item list, persist it and publish it. Callers hold the writer lock.
    async fn commit<F>(&self, build: F) -> Result<(), VectorStoreError>
    where
        F: FnOnce() -> Vec<StoredItem> + Send + 'static,
    {
        let path = self.path.clone();
        let dimension = self.dimension;
        let next = tokio::task::spawn_blocking(move || {
            let items = build();
            write_index(&path, dimension, &items)?;
            Ok::<_, VectorStoreError>(IndexState::new(items))
        })
        .await
        .map_err(std::io::Error::other)??;

        *self.state.write() = Some(Arc::new(next));
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LocalIndexBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        // Opening already read and validated the file.
        Ok(true)
    }

    async fn count(&self) -> Result<Option<u64>, VectorStoreError> {
        Ok(self.state.read().as_ref().map(|s| s.items.len() as u64))
    }

    async fn insert(&self, items: Vec<StoredItem>) -> Result<MutationId, VectorStoreError> {
        for item in &items {
            check_dimension(self.dimension, &item.vector)?;
        }

        let _writer = self.writer.lock().await;
        let current = self.snapshot();

        let received = items.len();
        let mut seen: HashSet<String> = HashSet::new();
        let fresh: Vec<StoredItem> = items
            .into_iter()
            .filter(|item| {
                !current.as_ref().is_some_and(|s| s.contains(&item.id))
                    && seen.insert(item.id.clone())
            })
            .collect();

        if fresh.is_empty() && current.is_some() {
            return Ok(MutationId::generate());
        }

        let added = fresh.len();
        self.commit(move || {
            let mut next = current.map(|s| s.items.clone()).unwrap_or_default();
            next.extend(fresh);
            next
        })
        .await?;

        tracing::debug!(
            added,
            skipped = received - added,
            collection = %self.collection,
            "local insert"
        );
        Ok(MutationId::generate())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        metadata: MetadataMode,
    ) -> Result<Vec<QueryMatch>, VectorStoreError> {
        check_dimension(self.dimension, vector)?;

        let Some(state) = self.snapshot() else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut heap: BinaryHeap<ScoredEntry<'_>> = BinaryHeap::with_capacity(k + 1);
        for item in &state.items {
            heap.push(ScoredEntry {
                score: cosine_similarity(vector, &item.vector),
                item,
            });
            if heap.len() > k {
                heap.pop();
            }
        }

        // Ascending by the reversed ordering is best-first.
        let matches = heap
            .into_sorted_vec()
            .into_iter()
            .map(|entry| QueryMatch {
                id: entry.item.id.clone(),
                score: entry.score,
                metadata: match metadata {
                    MetadataMode::All => Some(entry.item.metadata.clone()),
                    MetadataMode::None => None,
                },
            })
            .collect();

        Ok(matches)
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<StoredItem>, VectorStoreError> {
        let Some(state) = self.snapshot() else {
            return Ok(Vec::new());
        };

        let mut seen: HashSet<&str> = HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| state.get(id).cloned())
            .collect())
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, VectorStoreError> {
        let _writer = self.writer.lock().await;
        let Some(current) = self.snapshot() else {
            return Ok(0);
        };

        let doomed: HashSet<String> = ids
            .iter()
            .filter(|id| current.contains(id))
            .cloned()
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let removed = doomed.len();
        self.commit(move || {
            current
                .items
                .iter()
                .filter(|item| !doomed.contains(&item.id))
                .cloned()
                .collect()
        })
        .await?;

        tracing::debug!(removed, collection = %self.collection, "local delete");
        Ok(removed)
    }

    async fn find_by_text(&self, text: &str) -> Result<Vec<StoredItem>, VectorStoreError> {
        Ok(self
            .snapshot()
            .map(|state| {
                state
                    .items
                    .iter()
                    .filter(|item| item.text() == Some(text))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
