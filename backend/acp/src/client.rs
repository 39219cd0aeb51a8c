/// Peer link: the outbound HTTP connection to one remote agent.
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use parley_core::{
    rpc, AgentDescriptor, DelegationError, DelegationResult, TaskRequest, TaskResult,
};

/// Well-known path serving an agent's descriptor.
pub const DESCRIPTOR_PATH: &str = "/.well-known/agent-descriptor";

/// Hard ceiling for any outbound call, whatever the configuration says.
pub const MAX_RPC_TIMEOUT: Duration = Duration::from_secs(300);

/// Per-call time bounds for a peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerLinkConfig {
    pub descriptor_timeout: Duration,
    pub rpc_timeout: Duration,
}

impl Default for PeerLinkConfig {
    fn default() -> Self {
        Self {
            descriptor_timeout: Duration::from_secs(10),
            rpc_timeout: Duration::from_secs(60),
        }
    }
}

impl PeerLinkConfig {
    /// Clamp both bounds to [`MAX_RPC_TIMEOUT`].
    pub fn clamped(self) -> Self {
        Self {
            descriptor_timeout: self.descriptor_timeout.min(MAX_RPC_TIMEOUT),
            rpc_timeout: self.rpc_timeout.min(MAX_RPC_TIMEOUT),
        }
    }
}

pub struct PeerLink {
    base_url: String,
    http: Client,
    config: PeerLinkConfig,
    /// Last descriptor seen for this peer; overwrites are last-writer-wins.
    cached: RwLock<Option<AgentDescriptor>>,
}

impl PeerLink {
    pub fn new(base_url: &str, config: PeerLinkConfig) -> DelegationResult<Self> {
        Self::with_client(base_url, Client::new(), config)
    }

    /// Build a link sharing an existing connection pool.
    pub fn with_client(
        base_url: &str,
        http: Client,
        config: PeerLinkConfig,
    ) -> DelegationResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(DelegationError::Validation("peer url must not be empty".into()));
        }
        Ok(Self {
            base_url,
            http,
            config: config.clamped(),
            cached: RwLock::new(None),
        })
    }

    /// Seed the descriptor cache, e.g. from an inbound registration.
    pub fn with_descriptor(mut self, descriptor: AgentDescriptor) -> Self {
        self.cached = RwLock::new(Some(descriptor));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn cached_descriptor(&self) -> Option<AgentDescriptor> {
        self.cached.read().await.clone()
    }

    pub async fn set_descriptor(&self, descriptor: AgentDescriptor) {
        *self.cached.write().await = Some(descriptor);
    }

    /// Cached descriptor, fetched from the peer when nothing is cached yet.
    pub async fn descriptor(&self) -> DelegationResult<AgentDescriptor> {
        if let Some(descriptor) = self.cached_descriptor().await {
            return Ok(descriptor);
        }
        self.fetch_descriptor().await
    }

    /// GET the peer's descriptor, always hitting the network, and cache it.
    pub async fn fetch_descriptor(&self) -> DelegationResult<AgentDescriptor> {
        let url = format!("{}{}", self.base_url, DESCRIPTOR_PATH);
        debug!(url = %url, "Fetching agent descriptor");
        let res = self
            .http
            .get(&url)
            .timeout(self.config.descriptor_timeout)
            .send()
            .await
            .map_err(|e| DelegationError::unreachable(&self.base_url, e))?;
        let body = self.json_body(res).await?;
        let descriptor = AgentDescriptor::from_value(body)
            .map_err(|e| DelegationError::protocol(&self.base_url, e))?;

        info!(peer = %descriptor.name(), url = %self.base_url, "Fetched agent descriptor");
        self.set_descriptor(descriptor.clone()).await;
        Ok(descriptor)
    }

    /// Send one `tasks/send` RPC and wait for the peer's answer.
    pub async fn submit_task(&self, request: &TaskRequest) -> DelegationResult<TaskResult> {
        let url = format!("{}/", self.base_url);
        let payload = rpc::tasks_send_request(&Uuid::new_v4().to_string(), request);
        debug!(url = %url, task_id = %request.task_id, "Submitting task");
        let res = self
            .http
            .post(&url)
            .json(&payload)
            .timeout(self.config.rpc_timeout)
            .send()
            .await
            .map_err(|e| DelegationError::unreachable(&self.base_url, e))?;
        let body = self.json_body(res).await?;
        rpc::read_task_response(&self.base_url, &body)
    }

    /// POST a descriptor to this peer's `/register` endpoint.
    pub async fn register_descriptor(
        &self,
        descriptor: &AgentDescriptor,
        timeout: Duration,
    ) -> DelegationResult<()> {
        let url = format!("{}/register", self.base_url);
        let res = self
            .http
            .post(&url)
            .json(&descriptor.to_value())
            .timeout(timeout.min(MAX_RPC_TIMEOUT))
            .send()
            .await
            .map_err(|e| DelegationError::unreachable(&self.base_url, e))?;
        self.check_status(res).await.map(|_| ())
    }

    /// 5xx means the peer is not in a state to serve; 4xx means it rejected
    /// what we sent.
    async fn check_status(&self, res: Response) -> DelegationResult<Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let detail = res.text().await.unwrap_or_default();
        let reason = error_detail(status, &detail);
        if status.is_server_error() {
            Err(DelegationError::unreachable(&self.base_url, reason))
        } else {
            Err(DelegationError::protocol(&self.base_url, reason))
        }
    }

    async fn json_body(&self, res: Response) -> DelegationResult<Value> {
        let res = self.check_status(res).await?;
        res.json::<Value>().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() || e.is_request() {
                DelegationError::unreachable(&self.base_url, e)
            } else {
                DelegationError::protocol(&self.base_url, format!("invalid JSON body: {e}"))
            }
        })
    }
}

fn error_detail(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use axum::{routing::get, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_config_is_clamped() {
        let cfg = PeerLinkConfig {
            descriptor_timeout: Duration::from_secs(5),
            rpc_timeout: Duration::from_secs(10_000),
        }
        .clamped();
        assert_eq!(cfg.rpc_timeout, MAX_RPC_TIMEOUT);
        assert_eq!(cfg.descriptor_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_url_rejected() {
        assert!(matches!(
            PeerLink::new("  ", PeerLinkConfig::default()),
            Err(DelegationError::Validation(_))
        ));
        let link = PeerLink::new("http://b:8001/", PeerLinkConfig::default()).unwrap();
        assert_eq!(link.base_url(), "http://b:8001");
    }

    #[tokio::test]
    async fn test_fetch_descriptor_caches() {
        let router = Router::new().route(
            DESCRIPTOR_PATH,
            get(|| async {
                Json(json!({"name": "DatabaseAgent", "url": "http://db", "version": "0.2.0"}))
            }),
        );
        let base = spawn(router).await;
        let link = PeerLink::new(&base, PeerLinkConfig::default()).unwrap();
        assert!(link.cached_descriptor().await.is_none());

        let d = link.fetch_descriptor().await.unwrap();
        assert_eq!(d.name(), "DatabaseAgent");
        assert_eq!(d.version(), "0.2.0");
        assert_eq!(link.cached_descriptor().await, Some(d.clone()));
        assert_eq!(link.descriptor().await.unwrap(), d);
    }

    #[tokio::test]
    async fn test_descriptor_missing_name_is_protocol_error() {
        let router = Router::new().route(
            DESCRIPTOR_PATH,
            get(|| async { Json(json!({"url": "http://db"})) }),
        );
        let base = spawn(router).await;
        let link = PeerLink::new(&base, PeerLinkConfig::default()).unwrap();
        let err = link.fetch_descriptor().await.unwrap_err();
        assert!(matches!(err, DelegationError::Protocol { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let link = PeerLink::new(&format!("http://{addr}"), PeerLinkConfig::default()).unwrap();
        let err = link.fetch_descriptor().await.unwrap_err();
        assert!(matches!(err, DelegationError::PeerUnreachable { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = PeerLinkConfig {
            descriptor_timeout: Duration::from_millis(200),
            rpc_timeout: Duration::from_millis(300),
        };
        let link = PeerLink::new(&format!("http://{addr}"), config).unwrap();
        let started = Instant::now();
        let err = link
            .submit_task(&TaskRequest::fresh("session-p2p", "hello?"))
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::PeerUnreachable { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_result_without_state_defaults_to_unknown() {
        let router = Router::new().route(
            "/",
            axum::routing::post(|| async {
                Json(json!({"jsonrpc": "2.0", "id": "1", "result": {"output": "42"}}))
            }),
        );
        let base = spawn(router).await;
        let link = PeerLink::new(&base, PeerLinkConfig::default()).unwrap();
        let result = link
            .submit_task(&TaskRequest::fresh("s", "how many?"))
            .await
            .unwrap();
        assert_eq!(result.state, parley_core::TaskState::Unknown);
        assert_eq!(result.output, "42");
    }

    #[tokio::test]
    async fn test_response_without_result_is_protocol_error() {
        let router = Router::new().route(
            "/",
            axum::routing::post(|| async { Json(json!({"jsonrpc": "2.0", "id": "1"})) }),
        );
        let base = spawn(router).await;
        let link = PeerLink::new(&base, PeerLinkConfig::default()).unwrap();
        let err = link
            .submit_task(&TaskRequest::fresh("s", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::Protocol { .. }), "{err:?}");
    }

    #[test]
    fn test_error_detail_prefers_rpc_message() {
        let body = r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32601,"message":"unsupported method: x"}}"#;
        assert_eq!(
            error_detail(StatusCode::BAD_REQUEST, body),
            "HTTP 400 Bad Request: unsupported method: x"
        );
        assert_eq!(error_detail(StatusCode::BAD_GATEWAY, ""), "HTTP 502 Bad Gateway");
    }
}
