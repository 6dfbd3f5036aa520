//! Axum server: routes, middleware, static hosting.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::canvas;
use crate::state::GatewayState;
use crate::status;

/// Build the application router.
///
/// API and WebSocket routes are registered before the static fallback so
/// they take priority over the SPA.
pub fn router(state: Arc<GatewayState>) -> Router {
    let mut app = Router::new()
        .route("/ws/canvas", get(canvas::canvas_ws_handler))
        .route("/api/canvas", get(canvas::list_surfaces))
        .route("/api/canvas/render", post(canvas::render_surface))
        .route("/api/canvas/callback", post(canvas::record_callback))
        .route("/api/canvas/callbacks", get(canvas::list_callbacks))
        .route("/api/canvas/{surface_id}", delete(canvas::delete_surface))
        .route(
            "/api/leo/status",
            get(status::get_status).post(status::push_status),
        )
        .route(
            "/api/leo/ollama",
            get(status::get_ollama).post(status::push_ollama),
        )
        .route("/api/leo/logs", get(status::get_logs).post(status::push_logs))
        .route("/api/leo/cost", get(status::get_cost).post(status::push_cost))
        .route(
            "/api/cronjobs",
            get(status::get_cronjobs).post(status::push_cronjobs),
        )
        .route("/api/stats", get(status::get_stats))
        .route("/api/disk", get(status::get_disk))
        .route("/api/health", get(health_handler));

    #[cfg(feature = "metrics")]
    {
        app = app.route("/metrics", get(crate::metrics::metrics_handler));
    }

    if let Some(static_dir) = state.config.static_dir() {
        if static_dir.is_dir() {
            let index = static_dir.join("index.html");
            info!(dir = %static_dir.display(), "Serving viewer UI");
            let spa = ServeDir::new(static_dir).fallback(ServeFile::new(index));
            app = app.fallback_service(spa);
        } else {
            warn!(dir = %static_dir.display(), "Static directory missing, UI not served");
        }
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Start the gateway and serve until Ctrl-C.
pub async fn start_gateway(state: Arc<GatewayState>) -> anyhow::Result<()> {
    #[cfg(feature = "metrics")]
    crate::metrics::install_prometheus_recorder()?;

    let addr = format!("{}:{}", state.config.bind(), state.config.port());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve(listener, state).await
}

/// Serve on an already-bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: Arc<GatewayState>,
) -> anyhow::Result<()> {
    info!(
        addr = %listener.local_addr()?,
        auth = state.auth.as_str(),
        "Command Center listening"
    );
    let app = router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "surfaces": state.canvas.surface_count().await,
        "viewers": state.canvas.viewer_count().await,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(%e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
