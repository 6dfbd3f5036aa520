//! HTTP push client — what the agent side uses to drive a running server.

use anyhow::{Context, bail};
use command_center_canvas::{CallbackEntry, RenderRequest, Surface};
use serde_json::Value;

pub struct CanvasClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl CanvasClient {
    pub fn new(base: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// URL of a single surface. The id is one path segment, whatever it contains.
    fn surface_url(&self, id: &str) -> String {
        self.url(&format!("/api/canvas/{}", urlencoding::encode(id)))
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn list(&self) -> anyhow::Result<Vec<Surface>> {
        let resp = self.http.get(self.url("/api/canvas")).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }

    pub async fn render(&self, request: &RenderRequest) -> anyhow::Result<Value> {
        let req = self.http.post(self.url("/api/canvas/render")).json(request);
        let resp = self.authorized(req).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }

    /// Delete a surface. Returns `false` when the server did not know the id.
    pub async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let req = self.http.delete(self.surface_url(id));
        let resp = self.authorized(req).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        resp.error_for_status()?;
        Ok(true)
    }

    pub async fn callbacks(&self) -> anyhow::Result<Vec<CallbackEntry>> {
        let resp = self.http.get(self.url("/api/canvas/callbacks")).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }
}

/// Parse `--props` as a JSON object.
pub fn parse_props(raw: &str) -> anyhow::Result<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("--props is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--props must be a JSON object, got {other}"),
    }
}
