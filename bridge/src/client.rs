use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{BridgeError, BridgeResult};
use crate::protocol::{
    AssignAllRequest, AssignAllResponse, AssignRequest, BridgeResponse, HealthResponse,
};
use crate::truncate_chars;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const ERROR_SNIPPET_CHARS: usize = 200;

/// Bridge operations used by the portfolio write-back paths.
#[async_trait]
pub trait BridgeApi: Send + Sync {
    async fn health(&self) -> BridgeResult<HealthResponse>;

    async fn assign(&self, request: &AssignRequest) -> BridgeResult<BridgeResponse>;

    async fn assign_all(&self, request: &AssignAllRequest) -> BridgeResult<AssignAllResponse>;
}

/// HTTP client for a running `epm-bridge` server.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl BridgeClient {
    pub fn new(base_url: impl Into<String>) -> BridgeResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> BridgeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BridgeError::Transport)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request and decode the JSON reply.
    pub async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> BridgeResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BridgeError::from_reqwest(e, self.timeout))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BridgeError::from_reqwest(e, self.timeout))?;

        if !status.is_success() {
            return Err(BridgeError::Status {
                status: status.as_u16(),
                snippet: truncate_chars(&text, ERROR_SNIPPET_CHARS).to_string(),
            });
        }
        serde_json::from_str(&text)
            .map_err(|e| BridgeError::Protocol(format!("unexpected bridge response from {path}: {e}")))
    }

    pub async fn list_projects(&self) -> BridgeResult<Value> {
        self.call::<(), _>(Method::GET, "/api/projects", None).await
    }

    pub async fn list_resources(&self) -> BridgeResult<Value> {
        self.call::<(), _>(Method::GET, "/api/resources", None).await
    }

    pub async fn list_tasks(&self, project_name: &str) -> BridgeResult<Value> {
        let path = format!("/api/projects/{}/tasks", urlencoding::encode(project_name));
        self.call::<(), _>(Method::GET, &path, None).await
    }
}

#[async_trait]
impl BridgeApi for BridgeClient {
    async fn health(&self) -> BridgeResult<HealthResponse> {
        self.call::<(), _>(Method::GET, "/health", None).await
    }

    async fn assign(&self, request: &AssignRequest) -> BridgeResult<BridgeResponse> {
        self.call(Method::POST, "/api/assign", Some(request)).await
    }

    async fn assign_all(&self, request: &AssignAllRequest) -> BridgeResult<AssignAllResponse> {
        self.call(Method::POST, "/api/assign-all", Some(request)).await
    }
}
