//! Surface model, ingress requests, and the events sent to viewers.

use chrono::{DateTime, Utc};
use command_center_core::time::utc_seconds;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named UI directive held by the server and mirrored to every viewer.
///
/// `props` is opaque to the server; only the viewer's component registry
/// interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Surface {
    pub id: String,
    pub component: String,
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(with = "utc_seconds")]
    pub updated_at: DateTime<Utc>,
}

/// Render request pushed by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub id: String,
    pub component: String,
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl RenderRequest {
    /// Stamp the request into a surface.
    pub fn into_surface(self, updated_at: DateTime<Utc>) -> Surface {
        Surface {
            id: self.id,
            component: self.component,
            props: self.props,
            callback_url: self.callback_url,
            updated_at,
        }
    }
}

/// Events sent to connected viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasEvent {
    /// Full state, sent once when a viewer connects.
    Init { surfaces: Vec<Surface> },
    /// A surface was created or replaced.
    Render { surface: Surface },
    /// A surface was removed.
    Delete { id: String },
}

impl CanvasEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Render { .. } => "render",
            Self::Delete { .. } => "delete",
        }
    }
}

/// An action a viewer fired on a surface (button press, form submit, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackReport {
    pub surface_id: String,
    pub action: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// A callback report as stored, with its arrival time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackEntry {
    pub surface_id: String,
    pub action: String,
    pub data: Map<String, Value>,
    #[serde(with = "utc_seconds")]
    pub time: DateTime<Utc>,
}

impl CallbackEntry {
    pub fn from_report(report: CallbackReport, time: DateTime<Utc>) -> Self {
        Self {
            surface_id: report.surface_id,
            action: report.action,
            data: report.data,
            time,
        }
    }
}
