//! Items flowing into and out of the vector store.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::truncate_chars;

/// Metadata key holding the embedded text.
pub const TEXT_KEY: &str = "text";

/// Scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// Shorten `metadata.text` in place. Returns true if it was cut.
pub fn truncate_metadata_text(metadata: &mut Metadata, max_chars: usize) -> bool {
    if let Some(MetadataValue::Text(text)) = metadata.get_mut(TEXT_KEY) {
        let truncated = truncate_chars(text, max_chars);
        if truncated.len() < text.len() {
            let end = truncated.len();
            text.truncate(end);
            return true;
        }
    }
    false
}

/// A unit of text awaiting embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingItem {
    pub id: String,
    pub text: String,
}

impl EmbeddingItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

impl From<crate::models::Thread> for EmbeddingItem {
    fn from(thread: crate::models::Thread) -> Self {
        Self {
            id: thread.id,
            text: thread.text,
        }
    }
}

/// A vector with its id and metadata, as held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl StoredItem {
    /// Pair an embedded item with its vector, keeping a bounded copy of the
    /// text in metadata.
    pub fn from_embedded(item: EmbeddingItem, vector: Vec<f32>, max_text: usize) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(
            TEXT_KEY.to_string(),
            MetadataValue::Text(truncate_chars(&item.text, max_text).to_string()),
        );
        Self {
            id: item.id,
            vector,
            metadata,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.metadata.get(TEXT_KEY).and_then(MetadataValue::as_str)
    }
}

/// Whether query results carry metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataMode {
    None,
    #[default]
    All,
}

/// A single nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl QueryMatch {
    pub fn text(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(TEXT_KEY))
            .and_then(MetadataValue::as_str)
    }
}

/// Opaque token identifying one bulk write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationId(pub String);

impl MutationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
