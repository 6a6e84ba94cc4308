use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::PsResult;
use crate::types::{
    CustomFieldInfo, FormDigest, PatchTarget, PublishOutcome, RemoteProject, RemoteResource,
    RemoteTask,
};

/// Operations the portfolio layer needs from Project Server.
///
/// [`crate::SchedulingServiceClient`] is the production implementation;
/// tests substitute in-memory fakes.
#[async_trait]
pub trait SchedulingApi: Send + Sync {
    /// PWA root the client talks to, reported by connection status.
    fn base_url(&self) -> &str;

    /// Cheap authenticated probe. Never errors.
    async fn test_connection(&self) -> bool;

    async fn list_projects(&self) -> PsResult<Vec<RemoteProject>>;

    async fn list_tasks(&self, project_id: &str) -> PsResult<Vec<RemoteTask>>;

    async fn list_resources(&self) -> PsResult<Vec<RemoteResource>>;

    /// `EPM_*` enterprise custom fields keyed by display name.
    async fn list_custom_fields(&self) -> PsResult<BTreeMap<String, CustomFieldInfo>>;

    /// Acquire a digest and check the project out for editing.
    ///
    /// Returns the digest to use for the following patch calls.
    async fn checkout(&self, project_id: &str) -> PsResult<FormDigest>;

    async fn patch(
        &self,
        project_id: &str,
        target: &PatchTarget,
        updates: &Map<String, Value>,
        digest: &FormDigest,
    ) -> PsResult<()>;

    async fn add_assignment(
        &self,
        project_id: &str,
        task_id: &str,
        resource_id: &str,
        digest: &FormDigest,
    ) -> PsResult<()>;

    /// Publish and check in the draft using a freshly acquired digest.
    async fn publish(&self, project_id: &str) -> PsResult<PublishOutcome>;

    async fn update_task(
        &self,
        project_id: &str,
        task_id: &str,
        updates: &Map<String, Value>,
        digest: &FormDigest,
    ) -> PsResult<()> {
        self.patch(
            project_id,
            &PatchTarget::Task(task_id.to_string()),
            updates,
            digest,
        )
        .await
    }

    /// Patch project-level draft fields such as `FinishDate`.
    async fn update_project_draft(
        &self,
        project_id: &str,
        updates: &Map<String, Value>,
        digest: &FormDigest,
    ) -> PsResult<()> {
        self.patch(project_id, &PatchTarget::Project, updates, digest)
            .await
    }
}
