//! Records returned by Project Server and the values threaded through the
//! checkout → patch → publish workflow.

use serde::{Deserialize, Serialize};

/// Published project as exposed by `/_api/ProjectServer/Projects`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub percent_complete: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub finish_date: Option<String>,
}

/// Task row from `/Projects('{id}')/Tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteTask {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub percent_complete: Option<f64>,
    #[serde(default)]
    pub fixed_cost: Option<f64>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub finish: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteResource {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RemoteCustomField {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub internal_name: Option<String>,
    #[serde(default)]
    pub field_type: Option<i64>,
}

/// Enterprise custom field, keyed by display name in
/// [`crate::SchedulingApi::list_custom_fields`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldInfo {
    pub id: String,
    pub internal_name: Option<String>,
    pub field_type: Option<i64>,
}

/// Short-lived write authorization token (`X-RequestDigest`).
#[derive(Clone, PartialEq, Eq)]
pub struct FormDigest(String);

impl FormDigest {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for FormDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "FormDigest({prefix}…)")
    }
}

/// Draft entity addressed by a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchTarget {
    /// The project draft itself (`…/Draft`, `PS.DraftProject`).
    Project,
    /// A task in the project draft (`…/Draft/Tasks('{id}')`, `PS.DraftTask`).
    Task(String),
}

impl PatchTarget {
    pub(crate) fn metadata_type(&self) -> &'static str {
        match self {
            Self::Project => "PS.DraftProject",
            Self::Task(_) => "PS.DraftTask",
        }
    }

    pub(crate) fn describe(&self, project_id: &str) -> String {
        match self {
            Self::Project => format!("project draft {project_id}"),
            Self::Task(task_id) => format!("task {task_id} in project {project_id}"),
        }
    }
}

/// Whether the publish job was seen to leave the server queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// `WaitForQueue` answered 200 before the deadline.
    Confirmed,
    /// Polling hit the deadline; the job may still complete later.
    Unconfirmed,
    /// The publish response carried no job id.
    NotQueued,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub job_id: Option<String>,
    pub queue: QueueStatus,
}

impl PublishOutcome {
    pub fn is_confirmed(&self) -> bool {
        self.queue != QueueStatus::Unconfirmed
    }
}
