/// Delegation gateway: the axum routes through which other agents discover,
/// register with, and hand tasks to this agent.
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use logging::{DelegationEvent, EventLogger};
use parley_core::{rpc, AgentDescriptor, ReasoningLoop, TaskResult};

use crate::client::DESCRIPTOR_PATH;
use crate::registry::PeerRegistry;

/// Descriptor path used by earlier agents; served as an alias.
pub const LEGACY_DESCRIPTOR_PATH: &str = "/.well-known/agent.json";

#[derive(Clone)]
pub struct GatewayState {
    pub descriptor: Arc<AgentDescriptor>,
    pub registry: Arc<PeerRegistry>,
    pub reasoning: Arc<dyn ReasoningLoop>,
}

impl GatewayState {
    pub fn new(
        descriptor: AgentDescriptor,
        registry: Arc<PeerRegistry>,
        reasoning: Arc<dyn ReasoningLoop>,
    ) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            registry,
            reasoning,
        }
    }
}

pub fn build_gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route(DESCRIPTOR_PATH, get(descriptor_handler))
        .route(LEGACY_DESCRIPTOR_PATH, get(descriptor_handler))
        .route("/register", post(register_handler))
        .route("/", post(rpc_handler))
        .route("/peers", get(peers_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
}

/// Serve the gateway until the listener fails. Each request runs in its own
/// task, so a slow reasoning loop never holds up other requests.
pub async fn serve(listener: TcpListener, state: GatewayState) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(agent = %state.descriptor.name(), "Delegation gateway listening on {}", addr);
    axum::serve(listener, build_gateway_router(state)).await?;
    Ok(())
}

/// GET /.well-known/agent-descriptor: this agent's own descriptor.
async fn descriptor_handler(State(state): State<GatewayState>) -> Json<Value> {
    Json(state.descriptor.to_value())
}

/// POST /register: a peer announces itself. No caller authentication.
async fn register_handler(State(state): State<GatewayState>, body: Bytes) -> Response {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => return bad_request(format!("invalid JSON body: {e}")),
    };
    let descriptor = match AgentDescriptor::from_value(body) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "Rejected registration");
            return bad_request(e.to_string());
        }
    };

    let name = descriptor.name().to_string();
    match state.registry.accept_registration(descriptor).await {
        Ok(previous) => (
            StatusCode::OK,
            Json(json!({
                "status": "registered",
                "name": name,
                "replaced": previous.is_some(),
            })),
        )
            .into_response(),
        Err(e) => bad_request(e.to_string()),
    }
}

/// POST /: JSON-RPC entry point; only `tasks/send` is understood.
///
/// The body is read as JSON whatever its `Content-Type`.
async fn rpc_handler(State(state): State<GatewayState>, body: Bytes) -> Response {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Unreadable JSON-RPC body");
            return rpc_failure(Value::Null, rpc::PARSE_ERROR, &format!("Parse error: {e}"));
        }
    };

    let id = rpc::request_id(&body);
    let request = match rpc::parse_tasks_send(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected JSON-RPC request");
            return rpc_failure(id, e.rpc_code(), &e.to_string());
        }
    };

    EventLogger::log_event(
        &request.session_id,
        DelegationEvent::TaskReceived {
            task_id: request.task_id.clone(),
            text: request.message.clone(),
        },
    );

    let result = match state
        .reasoning
        .invoke(&request.message, &request.session_id)
        .await
    {
        Ok(reply) => TaskResult::completed(&request.task_id, reply),
        Err(e) => {
            error!(task_id = %request.task_id, error = %e, "Reasoning loop failed");
            EventLogger::log_event(
                &request.session_id,
                DelegationEvent::Error {
                    error_msg: e.to_string(),
                },
            );
            TaskResult::failed(&request.task_id, e.to_string())
        }
    };
    let result = match rpc::caller_task_id(&body) {
        Some(id) => result.with_wire_id(id),
        None => result,
    };

    (StatusCode::OK, Json(rpc::success_response(id, &result))).into_response()
}

/// GET /peers: snapshot of the registry.
async fn peers_handler(State(state): State<GatewayState>) -> Json<Value> {
    let peers: Vec<Value> = state
        .registry
        .list_peers()
        .await
        .iter()
        .map(AgentDescriptor::to_value)
        .collect();
    Json(Value::Array(peers))
}

async fn health_handler(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "agent": state.descriptor.name(),
        "peers": state.registry.len().await,
    }))
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn rpc_failure(id: Value, code: i64, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(rpc::error_response(id, code, message)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use reqwest::Client;

    use crate::client::{PeerLink, PeerLinkConfig};

    /// Replies with a fixed prefix and remembers every task it saw.
    struct Recorder {
        prefix: &'static str,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl Recorder {
        fn new(prefix: &'static str) -> Arc<Self> {
            Arc::new(Self {
                prefix,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ReasoningLoop for Recorder {
        async fn invoke(&self, task: &str, session_id: &str) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((task.to_string(), session_id.to_string()));
            match task {
                "explode" => anyhow::bail!("tool crashed"),
                "slow" => tokio::time::sleep(Duration::from_secs(3)).await,
                _ => {}
            }
            Ok(format!("{}{}", self.prefix, task))
        }
    }

    struct Agent {
        url: String,
        registry: Arc<PeerRegistry>,
        recorder: Arc<Recorder>,
    }

    async fn spawn_agent(name: &str, prefix: &'static str) -> Agent {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let registry = Arc::new(PeerRegistry::new());
        let recorder = Recorder::new(prefix);
        let state = GatewayState::new(
            AgentDescriptor::new(name, &url).unwrap(),
            Arc::clone(&registry),
            recorder.clone(),
        );
        tokio::spawn(serve(listener, state));
        Agent {
            url,
            registry,
            recorder,
        }
    }

    #[tokio::test]
    async fn test_serves_descriptor_on_both_paths() {
        let agent = spawn_agent("HostAgent", "").await;
        let link = PeerLink::new(&agent.url, PeerLinkConfig::default()).unwrap();
        let d = link.fetch_descriptor().await.unwrap();
        assert_eq!(d.name(), "HostAgent");
        assert_eq!(d.url(), agent.url);

        let legacy: Value = Client::new()
            .get(format!("{}{}", agent.url, LEGACY_DESCRIPTOR_PATH))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(legacy["name"], "HostAgent");
    }

    #[tokio::test]
    async fn test_end_to_end_register_then_dispatch() {
        let a = spawn_agent("A", "A says: ").await;
        let b = spawn_agent("B", "B counted: ").await;

        let b_descriptor = AgentDescriptor::new("B", &b.url).unwrap();
        let a_link = PeerLink::new(&a.url, PeerLinkConfig::default()).unwrap();
        a_link
            .register_descriptor(&b_descriptor, std::time::Duration::from_secs(5))
            .await
            .unwrap();

        let names: Vec<String> = a
            .registry
            .list_peers()
            .await
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["B".to_string()]);

        let reply = a.registry.dispatch("B", "count widgets").await;
        assert!(reply.contains("state=completed"), "{reply}");
        assert!(reply.contains("B counted: count widgets"), "{reply}");

        let seen = b.recorder.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![("count widgets".to_string(), "session-p2p".to_string())]);
        assert!(a.recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_method_is_400_and_server_keeps_serving() {
        let agent = spawn_agent("A", "ok: ").await;
        let http = Client::new();

        let res = http
            .post(format!("{}/", agent.url))
            .json(&json!({"jsonrpc": "2.0", "id": 1, "params": {}}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"]["code"], -32600);
        assert_eq!(body["id"], 1);

        let res = http
            .post(format!("{}/", agent.url))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

        let link = PeerLink::new(&agent.url, PeerLinkConfig::default()).unwrap();
        let result = link
            .submit_task(&parley_core::TaskRequest::new("t-1", "s-1", "still there?"))
            .await
            .unwrap();
        assert_eq!(result.state, parley_core::TaskState::Completed);
        assert_eq!(result.output, "ok: still there?");
        assert_eq!(result.task_id.as_deref(), Some("t-1"));
    }

    #[tokio::test]
    async fn test_unsupported_method_and_missing_text() {
        let agent = spawn_agent("A", "").await;
        let http = Client::new();

        let res = http
            .post(format!("{}/", agent.url))
            .json(&json!({"jsonrpc": "2.0", "id": "x", "method": "tasks/cancel", "params": {}}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"]["code"], -32601);

        let res = http
            .post(format!("{}/", agent.url))
            .json(&json!({"jsonrpc": "2.0", "id": "y", "method": "tasks/send",
                          "params": {"id": "t", "message": {"role": "user", "parts": []}}}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
        assert!(agent.recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_session_id_is_generated() {
        let agent = spawn_agent("A", "").await;
        let body: Value = Client::new()
            .post(format!("{}/", agent.url))
            .json(&json!({"jsonrpc": "2.0", "id": 3, "method": "tasks/send",
                          "params": {"message": {"parts": [{"type": "text", "text": "hi"}]}}}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["result"]["status"]["state"], "completed");
        assert!(!body["result"]["id"].as_str().unwrap().is_empty());

        let seen = agent.recorder.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].1.is_empty());
    }

    #[tokio::test]
    async fn test_failed_reasoning_reports_failed_state() {
        let agent = spawn_agent("A", "").await;
        let link = PeerLink::new(&agent.url, PeerLinkConfig::default()).unwrap();
        let result = link
            .submit_task(&parley_core::TaskRequest::fresh("s", "explode"))
            .await
            .unwrap();
        assert_eq!(result.state, parley_core::TaskState::Failed);
        assert!(result.output.contains("tool crashed"));
    }

    #[tokio::test]
    async fn test_invalid_registration_rejected() {
        let agent = spawn_agent("A", "").await;
        let res = Client::new()
            .post(format!("{}/register", agent.url))
            .json(&json!({"name": "", "url": "http://x"}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
        assert!(agent.registry.is_empty().await);

        let peers: Value = Client::new()
            .get(format!("{}/peers", agent.url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(peers, json!([]));
    }

    #[tokio::test]
    async fn test_slow_task_does_not_stall_other_requests() {
        let agent = spawn_agent("A", "ok: ").await;
        let slow_link = PeerLink::new(&agent.url, PeerLinkConfig::default()).unwrap();
        let started = Instant::now();
        let slow = tokio::spawn(async move {
            slow_link
                .submit_task(&parley_core::TaskRequest::fresh("s", "slow"))
                .await
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        let link = PeerLink::new(&agent.url, PeerLinkConfig::default()).unwrap();
        let fast_started = Instant::now();
        let fast = link
            .submit_task(&parley_core::TaskRequest::fresh("s", "fast"))
            .await
            .unwrap();
        let fast_elapsed = fast_started.elapsed();
        assert_eq!(fast.output, "ok: fast");
        assert!(fast_elapsed < Duration::from_secs(1), "{fast_elapsed:?}");
        assert!(!slow.is_finished());

        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow.output, "ok: slow");
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_json_body_accepted_without_content_type() {
        let agent = spawn_agent("A", "ok: ").await;
        let res = Client::new()
            .post(format!("{}/", agent.url))
            .body(
                json!({"jsonrpc": "2.0", "id": 1, "method": "tasks/send",
                       "params": {"id": "t", "message": {"parts": [{"text": "hi"}]}}})
                .to_string(),
            )
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["result"]["output"], "ok: hi");

        let res = Client::new()
            .post(format!("{}/register", agent.url))
            .body(json!({"name": "B", "url": "http://127.0.0.1:9"}).to_string())
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);
        assert!(agent.registry.get("B").await.is_some());
    }

    #[tokio::test]
    async fn test_numeric_task_id_echoed_as_number() {
        let agent = spawn_agent("A", "").await;
        let body: Value = Client::new()
            .post(format!("{}/", agent.url))
            .json(&json!({"jsonrpc": "2.0", "id": 9, "method": "tasks/send",
                          "params": {"id": 5, "message": {"parts": [{"text": "hi"}]}}}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["id"], json!(9));
        assert_eq!(body["result"]["id"], json!(5));
    }

    #[tokio::test]
    async fn test_registration_with_unknown_list_capability() {
        let agent = spawn_agent("A", "").await;
        let res = Client::new()
            .post(format!("{}/register", agent.url))
            .json(&json!({"name": "B", "url": "http://127.0.0.1:9",
                          "capabilities": {"streaming": false, "extensions": []}}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);
        assert!(agent.registry.get("B").await.is_some());
    }
}
