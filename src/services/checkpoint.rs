//! Persisted ingestion progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CheckpointError;

/// How far an ingestion run over `source` has got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Identifies the ingested input, usually its path.
    pub source: String,
    /// Index of the first item not yet stored.
    pub offset: usize,
    pub updated_at: DateTime<Utc>,
}

/// Receives progress after each stored chunk.
pub trait CheckpointSink: Send {
    fn record(&mut self, offset: usize) -> Result<(), CheckpointError>;
}

/// Checkpoint kept as a JSON file.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
    source: String,
}

impl FileCheckpoint {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved offset for this source. A checkpoint written for a different
    /// source is ignored.
    pub fn load_offset(&self) -> Result<usize, CheckpointError> {
        Ok(self
            .load()?
            .filter(|cp| cp.source == self.source)
            .map_or(0, |cp| cp.offset))
    }

    pub fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, offset: usize) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let checkpoint = Checkpoint {
            source: self.source.clone(),
            offset,
            updated_at: Utc::now(),
        };
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&checkpoint)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), CheckpointError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CheckpointSink for FileCheckpoint {
    fn record(&mut self, offset: usize) -> Result<(), CheckpointError> {
        self.save(offset)
    }
}
