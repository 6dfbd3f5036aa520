//! Surface store — the id→surface map, mirrored to a single JSON document.

use std::collections::BTreeMap;

use command_center_core::document::DocumentStore;
use command_center_core::error::Result;
use tracing::{debug, info};

use crate::protocol::Surface;

/// Document name under the data directory.
pub const SURFACES_DOC: &str = "canvas-surfaces";

/// Persisted surfaces. Every mutation rewrites the whole document before it
/// becomes visible in memory; a failed write leaves the map untouched.
pub struct SurfaceStore {
    docs: DocumentStore,
    surfaces: BTreeMap<String, Surface>,
}

impl SurfaceStore {
    /// Load surfaces from disk. A missing or corrupt document loads as empty.
    pub async fn load(docs: DocumentStore) -> Self {
        let surfaces: BTreeMap<String, Surface> = docs.read_or(SURFACES_DOC, BTreeMap::new()).await;
        info!(count = surfaces.len(), "Loaded canvas surfaces");
        Self { docs, surfaces }
    }

    pub fn get(&self, id: &str) -> Option<&Surface> {
        self.surfaces.get(id)
    }

    /// All surfaces, ordered by id.
    pub fn list(&self) -> Vec<Surface> {
        self.surfaces.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Insert or replace a surface by id. Returns the replaced surface.
    pub async fn upsert(&mut self, surface: Surface) -> Result<Option<Surface>> {
        let id = surface.id.clone();
        let previous = self.surfaces.insert(id.clone(), surface);
        if let Err(e) = self.persist().await {
            match previous {
                Some(prev) => self.surfaces.insert(id, prev),
                None => self.surfaces.remove(&id),
            };
            return Err(e);
        }
        debug!(surface_id = %id, replaced = previous.is_some(), "Surface stored");
        Ok(previous)
    }

    /// Remove a surface. `Ok(None)` means it did not exist; nothing is written.
    pub async fn remove(&mut self, id: &str) -> Result<Option<Surface>> {
        let Some(removed) = self.surfaces.remove(id) else {
            return Ok(None);
        };
        if let Err(e) = self.persist().await {
            self.surfaces.insert(removed.id.clone(), removed);
            return Err(e);
        }
        debug!(surface_id = %id, "Surface removed");
        Ok(Some(removed))
    }

    async fn persist(&self) -> Result<()> {
        self.docs.write(SURFACES_DOC, &self.surfaces).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Map;

    fn surface(id: &str, component: &str) -> Surface {
        Surface {
            id: id.into(),
            component: component.into(),
            props: Map::new(),
            callback_url: None,
            updated_at: Utc::now(),
        }
    }

    fn ids(store: &SurfaceStore) -> Vec<String> {
        store.list().into_iter().map(|s| s.id).collect()
    }

    #[tokio::test]
    async fn test_last_write_wins_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let docs = DocumentStore::new(tmp.path());
        let mut store = SurfaceStore::load(docs.clone()).await;
        assert!(store.is_empty());

        store.upsert(surface("b", "Chart")).await.unwrap();
        store.upsert(surface("a", "Clock")).await.unwrap();
        let replaced = store.upsert(surface("b", "DataTable")).await.unwrap();
        assert_eq!(replaced.unwrap().component, "Chart");
        store.remove("a").await.unwrap();
        store.upsert(surface("c", "TextBlock")).await.unwrap();

        assert_eq!(ids(&store), vec!["b", "c"]);
        assert_eq!(store.get("b").unwrap().component, "DataTable");

        let reloaded = SurfaceStore::load(docs).await;
        assert_eq!(reloaded.list(), store.list());
    }

    #[tokio::test]
    async fn test_remove_missing_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = SurfaceStore::load(DocumentStore::new(tmp.path())).await;
        assert!(store.remove("ghost").await.unwrap().is_none());
        assert!(!tmp.path().join("canvas-surfaces.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("canvas-surfaces.json"), "[[[").unwrap();
        let store = SurfaceStore::load(DocumentStore::new(tmp.path())).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_persist_rolls_back() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the data directory should be makes every write fail.
        let blocker = tmp.path().join("blocked");
        std::fs::write(&blocker, "").unwrap();
        let mut store = SurfaceStore::load(DocumentStore::new(&blocker)).await;

        assert!(store.upsert(surface("s1", "Chart")).await.is_err());
        assert!(store.get("s1").is_none());
    }
}
