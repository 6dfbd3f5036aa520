//! Gateway shared state.

use std::sync::Arc;

use command_center_canvas::{CanvasManager, SurfaceStore};
use command_center_core::config::{AuthMode, Config};
use command_center_core::document::DocumentStore;
use command_center_core::status::StatusCache;

/// Shared state accessible from all handlers and viewer connections.
pub struct GatewayState {
    pub config: Arc<Config>,
    pub auth: AuthMode,
    pub canvas: Arc<CanvasManager>,
    pub status: Arc<StatusCache>,
}

impl GatewayState {
    /// Load persisted surfaces from the configured data directory.
    pub async fn load(config: Config, auth: AuthMode) -> Self {
        let docs = DocumentStore::new(config.data_dir());
        let store = SurfaceStore::load(docs.clone()).await;
        let canvas = CanvasManager::new(store, &config.canvas());

        Self {
            config: Arc::new(config),
            auth,
            canvas: Arc::new(canvas),
            status: Arc::new(StatusCache::new(docs)),
        }
    }
}
