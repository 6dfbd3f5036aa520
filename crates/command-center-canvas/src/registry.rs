//! Live viewer connections.
//!
//! The registry owns membership only. Each viewer is an outbound channel
//! drained by the transport's writer task; the registry never touches sockets.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Process-unique viewer identity. Never reused after a viewer closes.
pub type ViewerId = Uuid;

/// Serialized events flow to viewers as shared strings, encoded once per broadcast.
pub type ViewerSender = mpsc::Sender<Arc<str>>;

/// The transport's end of a registered viewer.
pub struct ViewerHandle {
    pub id: ViewerId,
    /// Outbound events, starting with `init`. Yields `None` once the viewer
    /// has been pruned and the queue is drained.
    pub events: mpsc::Receiver<Arc<str>>,
}

#[derive(Default)]
pub struct ViewerRegistry {
    viewers: RwLock<HashMap<ViewerId, ViewerSender>>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, id: ViewerId, tx: ViewerSender) {
        self.viewers.write().await.insert(id, tx);
    }

    /// Remove a viewer. Safe to call repeatedly or for unknown ids.
    pub async fn unregister(&self, id: &ViewerId) -> bool {
        self.viewers.write().await.remove(id).is_some()
    }

    /// Remove several viewers under one lock.
    pub async fn unregister_all(&self, ids: &[ViewerId]) -> usize {
        let mut viewers = self.viewers.write().await;
        ids.iter().filter(|id| viewers.remove(*id).is_some()).count()
    }

    /// Copy of the current membership, for iteration without holding the lock.
    pub async fn snapshot(&self) -> Vec<(ViewerId, ViewerSender)> {
        self.viewers
            .read()
            .await
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }

    pub async fn contains(&self, id: &ViewerId) -> bool {
        self.viewers.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.viewers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.viewers.read().await.is_empty()
    }
}
