//! Agent status topics — cached snapshots the agent pushes and viewers poll.

use std::path::Path;
use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::{Map, Value, json};
use sysinfo::{Disks, MINIMUM_CPU_UPDATE_INTERVAL, System};

use command_center_core::status::{CostReport, CostUpdate};

use crate::auth::Authorized;
use crate::error::ApiResult;
use crate::state::GatewayState;

fn ok() -> Json<Value> {
    Json(json!({"ok": true}))
}

pub async fn get_status(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(state.status.status().await)
}

pub async fn push_status(
    State(state): State<Arc<GatewayState>>,
    _auth: Authorized,
    Json(payload): Json<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    state.status.push_status(payload).await?;
    Ok(ok())
}

pub async fn get_ollama(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(state.status.ollama().await)
}

pub async fn push_ollama(
    State(state): State<Arc<GatewayState>>,
    _auth: Authorized,
    Json(payload): Json<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    state.status.push_ollama(payload).await?;
    Ok(ok())
}

pub async fn get_logs(State(state): State<Arc<GatewayState>>) -> Json<Vec<Value>> {
    Json(state.status.logs().await)
}

pub async fn push_logs(
    State(state): State<Arc<GatewayState>>,
    _auth: Authorized,
    Json(entries): Json<Vec<Value>>,
) -> ApiResult<Json<Value>> {
    state.status.push_logs(entries).await?;
    Ok(ok())
}

pub async fn get_cost(State(state): State<Arc<GatewayState>>) -> Json<CostReport> {
    Json(state.status.cost().await)
}

pub async fn push_cost(
    State(state): State<Arc<GatewayState>>,
    _auth: Authorized,
    Json(update): Json<CostUpdate>,
) -> ApiResult<Json<Value>> {
    state.status.push_cost(update).await?;
    Ok(ok())
}

pub async fn get_cronjobs(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(state.status.cronjobs().await)
}

pub async fn push_cronjobs(
    State(state): State<Arc<GatewayState>>,
    _auth: Authorized,
    Json(payload): Json<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    state.status.push_cronjobs(payload).await?;
    Ok(ok())
}

/// Host CPU and memory, sampled on request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    /// Global CPU usage in percent.
    pub cpu: u64,
    pub mem_used: u64,
    pub mem_total: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
}

pub async fn get_stats() -> Json<SystemStats> {
    let mut sys = System::new();
    // CPU usage is a delta between two refreshes
    sys.refresh_cpu_usage();
    tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
    sys.refresh_cpu_usage();
    sys.refresh_memory();

    Json(SystemStats {
        cpu: sys.global_cpu_usage().round() as u64,
        mem_used: sys.used_memory(),
        mem_total: sys.total_memory(),
    })
}

pub async fn get_disk() -> Json<DiskUsage> {
    let disks = Disks::new_with_refreshed_list();
    let usage = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"))
        .map(|disk| DiskUsage {
            total: disk.total_space(),
            used: disk.total_space().saturating_sub(disk.available_space()),
        })
        .unwrap_or_default();
    Json(usage)
}
