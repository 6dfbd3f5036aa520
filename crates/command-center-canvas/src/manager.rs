//! Canvas manager — surface mutations and fan-out to viewers.
//!
//! Every mutation and every viewer registration runs under the store lock, so
//! each viewer sees `init` first and then events in the order they were
//! broadcast.

use std::sync::Arc;

use chrono::Utc;
use command_center_core::config::CanvasConfig;
use command_center_core::error::Result;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::callbacks::CallbackLog;
use crate::protocol::{CallbackEntry, CallbackReport, CanvasEvent, RenderRequest, Surface};
use crate::registry::{ViewerHandle, ViewerId, ViewerRegistry};
use crate::store::SurfaceStore;

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Viewers that accepted the event into their outbound queue.
    pub delivered: usize,
    /// Viewers dropped because their queue was full or closed.
    pub pruned: usize,
}

/// Result of a delete request.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted {
        surface: Surface,
        report: DeliveryReport,
    },
    NotFound,
}

/// Owns the surface store, the viewer registry, and the callback log.
pub struct CanvasManager {
    store: Mutex<SurfaceStore>,
    viewers: ViewerRegistry,
    callbacks: CallbackLog,
    viewer_buffer: usize,
    recent_callbacks: usize,
}

impl CanvasManager {
    pub fn new(store: SurfaceStore, options: &CanvasConfig) -> Self {
        Self {
            store: Mutex::new(store),
            viewers: ViewerRegistry::new(),
            callbacks: CallbackLog::new(options.callback_capacity),
            // init must always fit
            viewer_buffer: options.viewer_buffer.max(1),
            recent_callbacks: options.callback_recent,
        }
    }

    /// Create or replace a surface and broadcast it.
    pub async fn render(&self, request: RenderRequest) -> Result<(Surface, DeliveryReport)> {
        let surface = request.into_surface(Utc::now());
        let mut store = self.store.lock().await;
        store.upsert(surface.clone()).await?;

        let report = self
            .broadcast(&CanvasEvent::Render {
                surface: surface.clone(),
            })
            .await;
        info!(
            surface_id = %surface.id,
            component = %surface.component,
            delivered = report.delivered,
            pruned = report.pruned,
            "Surface rendered"
        );
        Ok((surface, report))
    }

    /// Remove a surface. Nothing is broadcast when the id is unknown.
    pub async fn delete(&self, id: &str) -> Result<DeleteOutcome> {
        let mut store = self.store.lock().await;
        let Some(surface) = store.remove(id).await? else {
            debug!(surface_id = %id, "Delete of unknown surface");
            return Ok(DeleteOutcome::NotFound);
        };

        let report = self.broadcast(&CanvasEvent::Delete { id: id.to_string() }).await;
        info!(
            surface_id = %id,
            delivered = report.delivered,
            pruned = report.pruned,
            "Surface deleted"
        );
        Ok(DeleteOutcome::Deleted { surface, report })
    }

    pub async fn list(&self) -> Vec<Surface> {
        self.store.lock().await.list()
    }

    pub async fn surface_count(&self) -> usize {
        self.store.lock().await.len()
    }

    /// Register a new viewer. Its queue already holds an `init` event with
    /// the surfaces as of registration.
    pub async fn connect(&self) -> ViewerHandle {
        let id = Uuid::new_v4();
        let (tx, events) = mpsc::channel(self.viewer_buffer);

        let store = self.store.lock().await;
        let init = CanvasEvent::Init {
            surfaces: store.list(),
        };
        match serde_json::to_string(&init) {
            Ok(msg) => {
                // Fresh channel with capacity >= 1, cannot be full
                let _ = tx.try_send(Arc::from(msg));
            }
            Err(e) => error!(viewer_id = %id, %e, "Failed to serialize init event"),
        }
        self.viewers.register(id, tx).await;
        drop(store);

        info!(viewer_id = %id, "Canvas viewer connected");
        ViewerHandle { id, events }
    }

    /// Unregister a viewer. Idempotent.
    pub async fn disconnect(&self, id: &ViewerId) {
        if self.viewers.unregister(id).await {
            debug!(viewer_id = %id, "Canvas viewer disconnected");
        }
    }

    pub async fn viewer_count(&self) -> usize {
        self.viewers.len().await
    }

    /// Store a viewer callback.
    pub fn record_callback(&self, report: CallbackReport) -> CallbackEntry {
        let entry = CallbackEntry::from_report(report, Utc::now());
        debug!(surface_id = %entry.surface_id, action = %entry.action, "Canvas callback");
        self.callbacks.append(entry.clone());
        entry
    }

    /// The most recent callbacks, oldest first.
    pub fn recent_callbacks(&self) -> Vec<CallbackEntry> {
        self.callbacks.recent(self.recent_callbacks)
    }

    /// Serialize once and offer the event to every registered viewer.
    ///
    /// Delivery never waits: a viewer whose queue is full or closed is
    /// collected and unregistered after the pass.
    async fn broadcast(&self, event: &CanvasEvent) -> DeliveryReport {
        let msg: Arc<str> = match serde_json::to_string(event) {
            Ok(m) => Arc::from(m),
            Err(e) => {
                error!(%e, kind = event.kind(), "Failed to serialize canvas event");
                return DeliveryReport::default();
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in self.viewers.snapshot().await {
            match tx.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(viewer_id = %id, "Canvas viewer too slow, dropping");
                    dead.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(viewer_id = %id, "Canvas viewer gone, dropping");
                    dead.push(id);
                }
            }
        }

        let pruned = if dead.is_empty() {
            0
        } else {
            self.viewers.unregister_all(&dead).await
        };
        debug!(kind = event.kind(), delivered, pruned, "Broadcast canvas event");
        DeliveryReport { delivered, pruned }
    }
}
