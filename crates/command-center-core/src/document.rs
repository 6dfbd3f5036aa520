//! File-backed JSON documents — one pretty-printed file per logical store.
//!
//! Layout: `<dir>/<name>.json`. Documents are always rewritten whole, via a
//! temp file and rename, so a reader never observes a half-written file.

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::Result;

/// A directory of independently loaded and saved JSON documents.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Load a document. A missing or unparsable file yields `None`.
    pub async fn read<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.path(name);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), %e, "Failed to read document, using default");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(path = %path.display(), %e, "Corrupt document, using default");
                None
            }
        }
    }

    /// Load a document, falling back to `default` when absent or corrupt.
    pub async fn read_or<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        self.read(name).await.unwrap_or(default)
    }

    /// Replace a document on disk.
    pub async fn write<T: Serialize + ?Sized>(&self, name: &str, doc: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let data = serde_json::to_string_pretty(doc)?;
        let path = self.path(name);
        // Atomic write: write to temp then rename
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), bytes = data.len(), "Saved document");
        Ok(())
    }
}
