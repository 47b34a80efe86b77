//! Archive posts and the threads rebuilt from them.

use serde::{Deserialize, Deserializer, Serialize};

/// A single archived post.
///
/// `parent` and `nextTweet` are id references filled in by the archive
/// preprocessor. Ids may arrive as JSON strings or numbers, and a link may be
/// the linked post object itself; all forms are normalized to the id string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(deserialize_with = "de_id")]
    pub id: String,

    pub full_text: String,

    #[serde(
        default,
        deserialize_with = "de_link",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent: Option<String>,

    #[serde(
        rename = "nextTweet",
        default,
        deserialize_with = "de_link",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_tweet: Option<String>,
}

impl Post {
    pub fn new(id: impl Into<String>, full_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_text: full_text.into(),
            parent: None,
            next_tweet: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next_tweet = Some(next.into());
        self
    }

    /// Root posts start a thread; replies are reached through their root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// An ordered reply chain, flattened for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thread {
    /// Id of the root post.
    pub id: String,
    /// Member post ids in chain order, root first.
    pub post_ids: Vec<String>,
    /// Concatenated `full_text` of every member, no separator.
    pub text: String,
    pub word_count: usize,
}

impl Thread {
    pub fn len(&self) -> usize {
        self.post_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.post_ids.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLink {
    Id(RawId),
    Post { id: RawId },
}

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

fn de_link<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let link = Option::<RawLink>::deserialize(deserializer)?;
    Ok(link.map(|l| match l {
        RawLink::Id(id) | RawLink::Post { id } => String::from(id),
    }))
}
