//! Gateway integration tests — start a real gateway and interact via WS + HTTP.
//!
//! Run with: `cargo test -p command-center-gateway --test integration`

use std::sync::Arc;
use std::time::Duration;

use command_center_core::config::{AuthMode, Config, StorageConfig};
use command_center_gateway::GatewayState;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const TOKEN: &str = "test-token";

type Viewer = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Build a gateway on a random port. The temp dir must outlive the test.
async fn start_test_gateway() -> (Arc<GatewayState>, String, TempDir) {
    let data = tempfile::tempdir().unwrap();
    let config = Config {
        storage: Some(StorageConfig {
            data_dir: Some(data.path().to_string_lossy().into_owned()),
        }),
        ..Default::default()
    };
    let state = Arc::new(GatewayState::load(config, AuthMode::Token(TOKEN.into())).await);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state_clone = state.clone();
    tokio::spawn(async move {
        let _ = command_center_gateway::serve(listener, state_clone).await;
    });

    (state, format!("127.0.0.1:{}", addr.port()), data)
}

async fn connect_viewer(addr: &str) -> Viewer {
    let (ws, _) = connect_async(format!("ws://{addr}/ws/canvas"))
        .await
        .expect("WS connect failed");
    ws
}

async fn next_event(ws: &mut Viewer) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for event")
        .unwrap()
        .unwrap();
    serde_json::from_str(msg.to_text().unwrap()).unwrap()
}

async fn render(addr: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/api/canvas/render"))
        .bearer_auth(TOKEN)
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn delete(addr: &str, id: &str) -> reqwest::Response {
    reqwest::Client::new()
        .delete(format!("http://{addr}/api/canvas/{id}"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_state, addr, _data) = start_test_gateway().await;

    let resp = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .expect("Health request failed");

    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["surfaces"], 0);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_render_requires_token() {
    let (_state, addr, _data) = start_test_gateway().await;
    let client = reqwest::Client::new();
    let body = json!({"id": "s1", "component": "Chart", "props": {"x": 1}});

    let resp = client
        .post(format!("http://{addr}/api/canvas/render"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["detail"], "Unauthorized");

    let resp = client
        .post(format!("http://{addr}/api/canvas/render"))
        .bearer_auth("wrong")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = render(&addr, body).await;
    assert!(resp.status().is_success());
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"ok": true, "id": "s1"}));

    let surfaces: Value = reqwest::get(format!("http://{addr}/api/canvas"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(surfaces[0]["id"], "s1");
    assert_eq!(surfaces[0]["props"]["x"], 1);
    assert!(surfaces[0]["updatedAt"].is_string());
}

#[tokio::test]
async fn test_viewers_before_and_after_render() {
    let (_state, addr, _data) = start_test_gateway().await;

    let mut early = connect_viewer(&addr).await;
    let init = next_event(&mut early).await;
    assert_eq!(init, json!({"type": "init", "surfaces": []}));

    render(&addr, json!({"id": "s1", "component": "Chart", "props": {"x": 1}})).await;

    let event = next_event(&mut early).await;
    assert_eq!(event["type"], "render");
    assert_eq!(event["surface"]["id"], "s1");
    assert_eq!(event["surface"]["component"], "Chart");

    let mut late = connect_viewer(&addr).await;
    let init = next_event(&mut late).await;
    assert_eq!(init["type"], "init");
    assert_eq!(init["surfaces"][0]["id"], "s1");

    render(&addr, json!({"id": "s1", "component": "Chart", "props": {"x": 2}})).await;
    for viewer in [&mut early, &mut late] {
        let event = next_event(viewer).await;
        assert_eq!(event["type"], "render");
        assert_eq!(event["surface"]["props"]["x"], 2);
    }
}

#[tokio::test]
async fn test_delete_broadcasts_once() {
    let (state, addr, _data) = start_test_gateway().await;

    render(&addr, json!({"id": "s1", "component": "Chart"})).await;
    render(&addr, json!({"id": "s2", "component": "Clock"})).await;

    let mut viewer = connect_viewer(&addr).await;
    let init = next_event(&mut viewer).await;
    assert_eq!(init["surfaces"].as_array().unwrap().len(), 2);

    let resp = delete(&addr, "s1").await;
    assert!(resp.status().is_success());
    assert_eq!(next_event(&mut viewer).await, json!({"type": "delete", "id": "s1"}));

    let resp = delete(&addr, "s1").await;
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"error": "Not found"}));

    // A later render is the next thing the viewer sees, not a second delete
    render(&addr, json!({"id": "s3", "component": "TextBlock"})).await;
    let event = next_event(&mut viewer).await;
    assert_eq!(event["type"], "render");
    assert_eq!(event["surface"]["id"], "s3");

    let ids: Vec<String> = state.canvas.list().await.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["s2", "s3"]);
}

#[tokio::test]
async fn test_closed_viewer_is_unregistered() {
    let (state, addr, _data) = start_test_gateway().await;

    let mut viewer = connect_viewer(&addr).await;
    next_event(&mut viewer).await;
    assert_eq!(state.canvas.viewer_count().await, 1);

    viewer.close(None).await.unwrap();
    for _ in 0..50 {
        if state.canvas.viewer_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state.canvas.viewer_count().await, 0);

    let resp = render(&addr, json!({"id": "s1", "component": "Chart"})).await;
    assert!(resp.status().is_success());
}

#[tokio::test]
async fn test_inbound_viewer_frames_are_ignored() {
    let (state, addr, _data) = start_test_gateway().await;

    let mut viewer = connect_viewer(&addr).await;
    next_event(&mut viewer).await;
    assert_eq!(state.canvas.viewer_count().await, 1);

    viewer.send(Message::text("hello from the browser")).await.unwrap();
    viewer.send(Message::text(r#"{"type":"delete","id":"s1"}"#)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(state.canvas.viewer_count().await, 1);

    render(&addr, json!({"id": "s1", "component": "Chart"})).await;
    let event = next_event(&mut viewer).await;
    assert_eq!(event["type"], "render");
    assert_eq!(event["surface"]["id"], "s1");
    assert_eq!(state.canvas.viewer_count().await, 1);
    assert_eq!(state.canvas.surface_count().await, 1);
}

#[tokio::test]
async fn test_callbacks_are_unauthenticated() {
    let (_state, addr, _data) = start_test_gateway().await;
    let client = reqwest::Client::new();

    for n in 0..25 {
        let resp = client
            .post(format!("http://{addr}/api/canvas/callback"))
            .json(&json!({"surfaceId": "form", "action": "submit", "data": {"n": n}}))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }

    let history: Value = reqwest::get(format!("http://{addr}/api/canvas/callbacks"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 20);
    assert_eq!(history[0]["data"]["n"], 5);
    assert_eq!(history[19]["data"]["n"], 24);
    assert!(history[19]["time"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_status_topics() {
    let (_state, addr, _data) = start_test_gateway().await;
    let client = reqwest::Client::new();

    let cost: Value = reqwest::get(format!("http://{addr}/api/leo/cost"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cost["dailyLimit"], 5.0);
    assert!(cost["updatedAt"].is_null());

    let resp = client
        .post(format!("http://{addr}/api/leo/cost"))
        .json(&json!({"daily": 1.5, "monthly": 20.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(format!("http://{addr}/api/leo/cost"))
        .bearer_auth(TOKEN)
        .json(&json!({"daily": 1.5, "monthly": 20.0}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let cost: Value = reqwest::get(format!("http://{addr}/api/leo/cost"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cost["daily"], 1.5);
    assert_eq!(cost["monthlyLimit"], 200.0);

    let resp = client
        .post(format!("http://{addr}/api/leo/status"))
        .bearer_auth(TOKEN)
        .json(&json!({"gatewayRunning": true, "currentModel": "llama3"}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let status: Value = reqwest::get(format!("http://{addr}/api/leo/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["currentModel"], "llama3");
    assert!(status["pushedAt"].is_string());
}
