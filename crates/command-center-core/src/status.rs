//! Push-based status cache — the agent posts snapshots, viewers read them back.
//!
//! Each topic is its own JSON document. Reads never fail: an empty or corrupt
//! document reads as the topic's default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use tracing::debug;

use crate::document::DocumentStore;
use crate::error::Result;
use crate::time::now_stamp;

const STATUS_DOC: &str = "leo-status";
const OLLAMA_DOC: &str = "leo-ollama";
const LOGS_DOC: &str = "leo-logs";
const COST_DOC: &str = "cost";
const CRONJOBS_DOC: &str = "cronjobs";

/// Number of gateway log entries retained per push.
pub const MAX_LOG_ENTRIES: usize = 50;

/// Spend figures with their configured limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CostReport {
    pub daily: f64,
    pub monthly: f64,
    pub daily_limit: f64,
    pub monthly_limit: f64,
    pub updated_at: Option<String>,
}

impl Default for CostReport {
    fn default() -> Self {
        Self {
            daily: 0.0,
            monthly: 0.0,
            daily_limit: 5.0,
            monthly_limit: 200.0,
            updated_at: None,
        }
    }
}

/// A cost push from the agent. Limits are not pushable.
#[derive(Debug, Clone, Deserialize)]
pub struct CostUpdate {
    pub daily: f64,
    pub monthly: f64,
}

pub struct StatusCache {
    docs: DocumentStore,
    write_lock: Mutex<()>,
}

impl StatusCache {
    pub fn new(docs: DocumentStore) -> Self {
        Self {
            docs,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn status(&self) -> Value {
        self.docs
            .read_or(
                STATUS_DOC,
                json!({
                    "gatewayRunning": null,
                    "currentModel": null,
                    "activeSession": null,
                    "sessionUpdatedAt": null,
                    "pushedAt": null,
                }),
            )
            .await
    }

    pub async fn push_status(&self, payload: Map<String, Value>) -> Result<()> {
        self.write_stamped(STATUS_DOC, payload).await
    }

    pub async fn ollama(&self) -> Value {
        self.docs
            .read_or(OLLAMA_DOC, json!({"loaded": false, "pushedAt": null}))
            .await
    }

    pub async fn push_ollama(&self, payload: Map<String, Value>) -> Result<()> {
        self.write_stamped(OLLAMA_DOC, payload).await
    }

    pub async fn logs(&self) -> Vec<Value> {
        self.docs.read_or(LOGS_DOC, Vec::new()).await
    }

    /// Replace the log tail, keeping only the newest [`MAX_LOG_ENTRIES`].
    pub async fn push_logs(&self, entries: Vec<Value>) -> Result<()> {
        let start = entries.len().saturating_sub(MAX_LOG_ENTRIES);
        let _guard = self.write_lock.lock().await;
        self.docs.write(LOGS_DOC, &entries[start..]).await
    }

    pub async fn cost(&self) -> CostReport {
        self.docs.read_or(COST_DOC, CostReport::default()).await
    }

    /// Update spend figures, preserving the stored limits.
    pub async fn push_cost(&self, update: CostUpdate) -> Result<CostReport> {
        let _guard = self.write_lock.lock().await;
        let mut report = self.cost().await;
        report.daily = update.daily;
        report.monthly = update.monthly;
        report.updated_at = Some(now_stamp());
        self.docs.write(COST_DOC, &report).await?;
        Ok(report)
    }

    pub async fn cronjobs(&self) -> Value {
        self.docs.read_or(CRONJOBS_DOC, json!({"jobs": []})).await
    }

    pub async fn push_cronjobs(&self, payload: Map<String, Value>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.docs.write(CRONJOBS_DOC, &payload).await
    }

    async fn write_stamped(&self, name: &str, mut payload: Map<String, Value>) -> Result<()> {
        payload.insert("pushedAt".into(), Value::String(now_stamp()));
        let _guard = self.write_lock.lock().await;
        self.docs.write(name, &payload).await?;
        debug!(document = name, "Status pushed");
        Ok(())
    }
}
