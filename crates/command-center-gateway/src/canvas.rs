//! Canvas endpoints — surface mutations, reads, callbacks, and the viewer socket.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::{
    Json,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use command_center_canvas::{
    CallbackEntry, CallbackReport, DeleteOutcome, RenderRequest, Surface, ViewerHandle,
};

use crate::auth::Authorized;
use crate::error::{ApiError, ApiResult};
use crate::state::GatewayState;

/// Upper bound on a single socket write before the viewer is abandoned.
const VIEWER_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn list_surfaces(State(state): State<Arc<GatewayState>>) -> Json<Vec<Surface>> {
    Json(state.canvas.list().await)
}

pub async fn render_surface(
    State(state): State<Arc<GatewayState>>,
    _auth: Authorized,
    Json(request): Json<RenderRequest>,
) -> ApiResult<Json<Value>> {
    let (surface, _report) = state.canvas.render(request).await?;
    #[cfg(feature = "metrics")]
    crate::metrics::record_broadcast("render", &_report);
    Ok(Json(json!({"ok": true, "id": surface.id})))
}

pub async fn delete_surface(
    State(state): State<Arc<GatewayState>>,
    _auth: Authorized,
    Path(surface_id): Path<String>,
) -> ApiResult<Json<Value>> {
    match state.canvas.delete(&surface_id).await? {
        DeleteOutcome::Deleted { surface, report: _report } => {
            #[cfg(feature = "metrics")]
            crate::metrics::record_broadcast("delete", &_report);
            Ok(Json(json!({"ok": true, "id": surface.id})))
        }
        DeleteOutcome::NotFound => Err(ApiError::NotFound),
    }
}

/// Browser-fired callbacks. Unauthenticated: the browser holds no token.
pub async fn record_callback(
    State(state): State<Arc<GatewayState>>,
    Json(report): Json<CallbackReport>,
) -> Json<Value> {
    state.canvas.record_callback(report);
    Json(json!({"ok": true}))
}

pub async fn list_callbacks(State(state): State<Arc<GatewayState>>) -> Json<Vec<CallbackEntry>> {
    Json(state.canvas.recent_callbacks())
}

/// WebSocket upgrade handler for canvas viewers.
pub async fn canvas_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_viewer_connection(state, socket))
}

async fn handle_viewer_connection(state: Arc<GatewayState>, ws: WebSocket) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let ViewerHandle { id, mut events } = state.canvas.connect().await;
    #[cfg(feature = "metrics")]
    crate::metrics::record_viewer_connect();

    // Forward events to the socket. Ends when the viewer is pruned or the socket fails.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = events.recv().await {
            let write = ws_tx.send(Message::Text(msg.to_string().into()));
            match tokio::time::timeout(VIEWER_WRITE_TIMEOUT, write).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => break,
                Err(_) => {
                    warn!(viewer_id = %id, "Canvas viewer write timed out");
                    break;
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    // Inbound frames carry nothing; read only to notice the close.
    loop {
        tokio::select! {
            _ = &mut send_task => {
                debug!(viewer_id = %id, "Canvas viewer writer finished");
                break;
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(viewer_id = %id, %e, "Canvas viewer socket error");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    send_task.abort();
    state.canvas.disconnect(&id).await;
    #[cfg(feature = "metrics")]
    crate::metrics::record_viewer_disconnect();
    info!(viewer_id = %id, "Canvas viewer closed");
}
