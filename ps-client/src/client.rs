//! REST client for the Project Server `_api/ProjectServer` surface.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Map, Value, json};
use tokio::time::Instant;

use crate::api::SchedulingApi;
use crate::error::{PsError, PsResult};
use crate::ntlm::NtlmCredentials;
use crate::schema;
use crate::transport::{NtlmTransport, PsResponse};
use crate::types::{
    CustomFieldInfo, FormDigest, PatchTarget, PublishOutcome, QueueStatus, RemoteCustomField,
    RemoteProject, RemoteResource, RemoteTask,
};

const PROJECT_FIELDS: &str = "Id,Name,PercentComplete,Description,StartDate,FinishDate";
const TASK_FIELDS: &str = "Id,Name,PercentComplete,FixedCost,Start,Finish";
const CUSTOM_FIELD_PREFIX: &str = "EPM_";

const X_REQUEST_DIGEST: &str = "x-requestdigest";
const X_HTTP_METHOD: &str = "x-http-method";
const IF_MATCH: &str = "if-match";

/// How long to follow a publish job through the server queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueWaitPolicy {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl Default for QueueWaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(60),
        }
    }
}

/// Connection settings for [`SchedulingServiceClient`].
#[derive(Clone)]
pub struct PsConnectionConfig {
    /// PWA site root, e.g. `http://pserver/pwa`.
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub domain: String,
    pub workstation: String,
    pub request_timeout: Duration,
    pub queue_wait: QueueWaitPolicy,
}

impl PsConnectionConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            domain: domain.into(),
            workstation: String::new(),
            request_timeout: Duration::from_secs(30),
            queue_wait: QueueWaitPolicy::default(),
        }
    }
}

impl std::fmt::Debug for PsConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PsConnectionConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("domain", &self.domain)
            .field("request_timeout", &self.request_timeout)
            .field("queue_wait", &self.queue_wait)
            .finish_non_exhaustive()
    }
}

/// Authenticated client for reads and the checkout → patch → publish cycle.
///
/// Every write step is a single network call; the caller sequences them
/// (see [`SchedulingApi`] for the trait used by the data service).
pub struct SchedulingServiceClient {
    base_url: String,
    transport: NtlmTransport,
    queue_wait: QueueWaitPolicy,
}

impl SchedulingServiceClient {
    pub fn new(config: PsConnectionConfig) -> PsResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(PsError::InvalidConfig("base_url is empty".to_string()));
        }
        let credentials = NtlmCredentials {
            domain: config.domain,
            username: config.username,
            password: config.password,
            workstation: config.workstation,
        };
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            transport: NtlmTransport::new(credentials, config.request_timeout)?,
            queue_wait: config.queue_wait,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/_api/{path}", self.base_url)
    }

    fn project_url(&self, project_id: &str, suffix: &str) -> String {
        self.api_url(&format!(
            "ProjectServer/Projects('{}'){suffix}",
            odata_literal(project_id)
        ))
    }

    async fn get(&self, url: &str) -> PsResult<PsResponse> {
        self.transport
            .send(Method::GET, url, None, HeaderMap::new())
            .await
    }

    async fn post(&self, url: &str, body: &Value, headers: HeaderMap) -> PsResult<PsResponse> {
        let body = body.to_string();
        self.transport
            .send(Method::POST, url, Some(&body), headers)
            .await
    }

    async fn read_collection<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> PsResult<Vec<T>> {
        let response = self.get(url).await?;
        if !response.is_ok() {
            return Err(PsError::UnexpectedStatus {
                operation,
                status: response.status,
            });
        }
        schema::collection(operation, response.body)
    }

    /// Fetch a new form digest from `_api/contextinfo`.
    pub async fn acquire_digest(&self) -> PsResult<FormDigest> {
        let response = self
            .post(&self.api_url("contextinfo"), &json!({}), HeaderMap::new())
            .await
            .map_err(|e| match e {
                PsError::Transport(e) => PsError::DigestUnavailable {
                    reason: e.to_string(),
                },
                other => other,
            })?;
        if !response.is_ok() {
            return Err(PsError::DigestUnavailable {
                reason: format!("context info returned status {}", response.status),
            });
        }
        schema::form_digest(response.body)
            .map(FormDigest::new)
            .ok_or_else(|| PsError::DigestUnavailable {
                reason: "response has no FormDigestValue".to_string(),
            })
    }

    /// Poll `WaitForQueue` until the job settles or the policy deadline passes.
    ///
    /// Failed polls count as "not yet complete"; running out of time is
    /// reported as [`QueueStatus::Unconfirmed`], not as an error.
    pub async fn wait_for_queue(&self, job_id: &str, policy: QueueWaitPolicy) -> QueueStatus {
        let url = self.api_url(&format!(
            "ProjectServer/WaitForQueue('{}')",
            odata_literal(job_id)
        ));
        let deadline = Instant::now() + policy.max_wait;

        while Instant::now() < deadline {
            match self.get(&url).await {
                Ok(response) if response.is_ok() => return QueueStatus::Confirmed,
                Ok(response) => {
                    tracing::debug!(job_id, status = response.status, "queue job still pending");
                }
                Err(err) => {
                    tracing::debug!(job_id, error = %err, "queue poll failed");
                }
            }
            tokio::time::sleep(policy.poll_interval).await;
        }

        tracing::warn!(
            job_id,
            max_wait_secs = policy.max_wait.as_secs(),
            "publish job not confirmed before deadline"
        );
        QueueStatus::Unconfirmed
    }
}

#[async_trait]
impl SchedulingApi for SchedulingServiceClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn test_connection(&self) -> bool {
        let url = self.api_url("ProjectServer/Projects?$top=1&$select=Id");
        match self.get(&url).await {
            Ok(response) => response.is_ok(),
            Err(err) => {
                tracing::warn!(error = %err, "Project Server connection test failed");
                false
            }
        }
    }

    async fn list_projects(&self) -> PsResult<Vec<RemoteProject>> {
        let url = self.api_url(&format!("ProjectServer/Projects?$select={PROJECT_FIELDS}"));
        self.read_collection("list projects", &url).await
    }

    async fn list_tasks(&self, project_id: &str) -> PsResult<Vec<RemoteTask>> {
        let url = self.project_url(project_id, &format!("/Tasks?$select={TASK_FIELDS}"));
        self.read_collection("list tasks", &url).await
    }

    async fn list_resources(&self) -> PsResult<Vec<RemoteResource>> {
        let url = self.api_url("ProjectServer/EnterpriseResources?$select=Id,Name");
        self.read_collection("list resources", &url).await
    }

    async fn list_custom_fields(&self) -> PsResult<BTreeMap<String, CustomFieldInfo>> {
        let url = self.api_url("ProjectServer/CustomFields?$select=Name,Id,InternalName,FieldType");
        let fields: Vec<RemoteCustomField> =
            self.read_collection("list custom fields", &url).await?;
        Ok(fields
            .into_iter()
            .filter(|field| field.name.starts_with(CUSTOM_FIELD_PREFIX))
            .map(|field| {
                (
                    field.name,
                    CustomFieldInfo {
                        id: field.id,
                        internal_name: field.internal_name,
                        field_type: field.field_type,
                    },
                )
            })
            .collect())
    }

    async fn checkout(&self, project_id: &str) -> PsResult<FormDigest> {
        let digest = self.acquire_digest().await?;
        let response = self
            .post(
                &self.project_url(project_id, "/checkOut"),
                &json!({}),
                digest_headers(&digest)?,
            )
            .await?;
        if !response.is_ok() {
            return Err(PsError::CheckoutFailed {
                project_id: project_id.to_string(),
                status: response.status,
            });
        }
        tracing::info!(project_id, "project checked out");
        Ok(digest)
    }

    async fn patch(
        &self,
        project_id: &str,
        target: &PatchTarget,
        updates: &Map<String, Value>,
        digest: &FormDigest,
    ) -> PsResult<()> {
        let url = match target {
            PatchTarget::Project => self.project_url(project_id, "/Draft"),
            PatchTarget::Task(task_id) => self.project_url(
                project_id,
                &format!("/Draft/Tasks('{}')", odata_literal(task_id)),
            ),
        };

        let mut body = Map::new();
        body.insert(
            "__metadata".to_string(),
            json!({ "type": target.metadata_type() }),
        );
        body.extend(updates.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut headers = digest_headers(digest)?;
        headers.insert(X_HTTP_METHOD, HeaderValue::from_static("MERGE"));
        headers.insert(IF_MATCH, HeaderValue::from_static("*"));

        let response = self.post(&url, &Value::Object(body), headers).await?;
        if !matches!(response.status, 200 | 204) {
            return Err(PsError::PatchFailed {
                target: target.describe(project_id),
                status: response.status,
            });
        }
        tracing::debug!(project_id, target = ?target, "draft patched");
        Ok(())
    }

    async fn add_assignment(
        &self,
        project_id: &str,
        task_id: &str,
        resource_id: &str,
        digest: &FormDigest,
    ) -> PsResult<()> {
        let body = json!({
            "parameters": {
                "ResourceId": resource_id,
                "TaskId": task_id,
            }
        });
        let response = self
            .post(
                &self.project_url(project_id, "/Draft/Assignments/Add"),
                &body,
                digest_headers(digest)?,
            )
            .await?;
        if !matches!(response.status, 200 | 201) {
            return Err(PsError::AssignmentFailed {
                project_id: project_id.to_string(),
                status: response.status,
            });
        }
        tracing::info!(project_id, task_id, resource_id, "assignment added to draft");
        Ok(())
    }

    async fn publish(&self, project_id: &str) -> PsResult<PublishOutcome> {
        // The checkout digest may have expired while the draft was patched.
        let digest = self.acquire_digest().await?;
        let response = self
            .post(
                &self.project_url(project_id, "/Draft/publish(true)"),
                &json!({}),
                digest_headers(&digest)?,
            )
            .await?;
        if !response.is_ok() {
            return Err(PsError::PublishFailed {
                project_id: project_id.to_string(),
                status: response.status,
            });
        }

        let Some(job_id) = schema::publish_job_id(&response.body) else {
            tracing::info!(project_id, "project published without queue job");
            return Ok(PublishOutcome {
                job_id: None,
                queue: QueueStatus::NotQueued,
            });
        };

        let queue = self.wait_for_queue(&job_id, self.queue_wait).await;
        tracing::info!(project_id, job_id = %job_id, queue = ?queue, "project published");
        Ok(PublishOutcome {
            job_id: Some(job_id),
            queue,
        })
    }
}

fn digest_headers(digest: &FormDigest) -> PsResult<HeaderMap> {
    let value = HeaderValue::from_str(digest.as_str()).map_err(|_| PsError::DigestUnavailable {
        reason: "digest is not a valid header value".to_string(),
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(X_REQUEST_DIGEST, value);
    Ok(headers)
}

/// Escape a value for use inside an OData string literal (`'...'`).
fn odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}
