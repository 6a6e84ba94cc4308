//! Write-back use cases: edits published to Project Server, resource
//! assignment through the automation bridge, and execution of proposed
//! actions.
//!
//! Every REST edit runs checkout → patch → publish and then drops the cached
//! project list. Failures propagate as [`WriteBackError`].

use epm_bridge::{
    AssignAllRequest, AssignAllResponse, AssignRequest, Assignment, BridgeApi, HealthResponse,
};
use epm_ps_client::{PublishOutcome, SchedulingApi};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{WriteBackError, WriteBackResult};
use crate::service::{PROJECTS_KEY, PortfolioDataService};

const PROJECT_SERVER: &str = "Project Server";
const BRIDGE: &str = "PS bridge";

/// Task fields an operator may change. Absent fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub percent_complete: Option<f64>,
    pub fixed_cost: Option<f64>,
}

impl TaskUpdate {
    fn to_patch(self) -> Map<String, Value> {
        let mut patch = Map::new();
        if let Some(pct) = self.percent_complete {
            patch.insert("PercentComplete".to_string(), json!(pct));
        }
        if let Some(cost) = self.fixed_cost {
            patch.insert("FixedCost".to_string(), json!(cost));
        }
        patch
    }
}

/// Resource-to-task assignment. Names enable the bridge path; ids are
/// required for the REST path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceAssignment {
    pub project_id: String,
    pub task_id: Option<String>,
    pub resource_id: Option<String>,
    pub project_name: Option<String>,
    pub task_name: Option<String>,
    pub resource_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentMethod {
    CsomBridge,
    RestApi,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteBackOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<AssignmentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Present for REST edits; tells whether the publish job left the queue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishOutcome>,
}

impl WriteBackOutcome {
    fn published(message: impl Into<String>, publish: PublishOutcome) -> Self {
        Self {
            success: true,
            message: message.into(),
            method: None,
            details: None,
            publish: Some(publish),
        }
    }
}

/// An action proposed by the completion service and confirmed by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum ActionProposal {
    #[serde(rename_all = "camelCase")]
    UpdateTaskProgress {
        project_name: String,
        task_name: String,
        percent_complete: f64,
    },
    #[serde(rename_all = "camelCase")]
    AssignResource {
        project_name: String,
        task_name: String,
        resource_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeHealthReport {
    pub available: bool,
    #[serde(flatten)]
    pub health: Option<HealthResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub id: String,
    pub name: String,
}

/// The single draft change made between checkout and publish.
enum DraftEdit<'a> {
    Task {
        task_id: &'a str,
        updates: Map<String, Value>,
    },
    Project {
        updates: Map<String, Value>,
    },
    Assignment {
        task_id: &'a str,
        resource_id: &'a str,
    },
}

impl PortfolioDataService {
    pub async fn update_task(
        &self,
        project_id: &str,
        task_id: &str,
        update: TaskUpdate,
    ) -> WriteBackResult<WriteBackOutcome> {
        let ps = self.ps_client()?;
        let updates = update.to_patch();
        if updates.is_empty() {
            return Err(WriteBackError::Validation(
                "percentComplete or fixedCost is required".to_string(),
            ));
        }
        let publish = self
            .publish_edit(ps, project_id, DraftEdit::Task { task_id, updates })
            .await?;
        Ok(WriteBackOutcome::published("Task updated and published", publish))
    }

    pub async fn update_schedule(
        &self,
        project_id: &str,
        finish_date: &str,
    ) -> WriteBackResult<WriteBackOutcome> {
        let ps = self.ps_client()?;
        if finish_date.is_empty() {
            return Err(WriteBackError::Validation("finishDate is required".to_string()));
        }
        let mut updates = Map::new();
        updates.insert("FinishDate".to_string(), json!(finish_date));
        let publish = self
            .publish_edit(ps, project_id, DraftEdit::Project { updates })
            .await?;
        Ok(WriteBackOutcome::published("Schedule updated and published", publish))
    }

    /// Assign through the bridge when names are known, else (or when the
    /// bridge fails) through the REST checkout workflow.
    pub async fn assign_resource(
        &self,
        assignment: &ResourceAssignment,
    ) -> WriteBackResult<WriteBackOutcome> {
        let ps = self.ps_client()?;

        if let (Some(project_name), Some(task_name), Some(resource_name), Some(bridge)) = (
            assignment.project_name.as_deref().filter(|s| !s.is_empty()),
            assignment.task_name.as_deref().filter(|s| !s.is_empty()),
            assignment.resource_name.as_deref().filter(|s| !s.is_empty()),
            self.bridge.as_deref(),
        ) {
            let request = single_assignment(project_name, task_name, resource_name);
            match bridge.assign(&request).await {
                Ok(response) if response.success => {
                    self.invalidate_cache(Some(PROJECTS_KEY)).await;
                    return Ok(WriteBackOutcome {
                        success: true,
                        message: format!(
                            "Resource assigned via CSOM: {}",
                            response.message.unwrap_or_default()
                        ),
                        method: Some(AssignmentMethod::CsomBridge),
                        details: response.data,
                        publish: None,
                    });
                }
                Ok(response) => {
                    tracing::warn!(
                        project = project_name,
                        reason = response.message.as_deref().unwrap_or(""),
                        "bridge reported failure, falling back to REST"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        project = project_name,
                        error = %err,
                        "bridge unavailable, falling back to REST"
                    );
                }
            }
        }

        let (Some(task_id), Some(resource_id)) = (
            assignment.task_id.as_deref().filter(|s| !s.is_empty()),
            assignment.resource_id.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Err(WriteBackError::Validation(
                "taskId and resourceId are required for REST assignment".to_string(),
            ));
        };
        let publish = self
            .publish_edit(
                ps,
                &assignment.project_id,
                DraftEdit::Assignment {
                    task_id,
                    resource_id,
                },
            )
            .await?;
        Ok(WriteBackOutcome {
            method: Some(AssignmentMethod::RestApi),
            ..WriteBackOutcome::published("Resource assigned and published", publish)
        })
    }

    pub async fn assign_all(
        &self,
        request: &AssignAllRequest,
    ) -> WriteBackResult<AssignAllResponse> {
        let bridge = self.bridge_client()?;
        let response = bridge.assign_all(request).await?;
        self.invalidate_cache(Some(PROJECTS_KEY)).await;
        tracing::info!(
            projects = response.results.len(),
            success = response.success,
            "bulk assignment finished"
        );
        Ok(response)
    }

    /// Never fails; an unreachable bridge is reported as unavailable.
    pub async fn bridge_health(&self) -> BridgeHealthReport {
        let result = match self.bridge_client() {
            Ok(bridge) => bridge.health().await.map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        match result {
            Ok(health) => BridgeHealthReport {
                available: true,
                health: Some(health),
                error: None,
            },
            Err(error) => BridgeHealthReport {
                available: false,
                health: None,
                error: Some(error),
            },
        }
    }

    pub async fn list_resources(&self) -> WriteBackResult<Vec<ResourceSummary>> {
        let resources = self.ps_client()?.list_resources().await?;
        Ok(resources
            .into_iter()
            .map(|resource| ResourceSummary {
                id: resource.id,
                name: resource.name,
            })
            .collect())
    }

    /// Execute a confirmed action, resolving names against the current
    /// project list.
    pub async fn execute_action(
        &self,
        action: &ActionProposal,
    ) -> WriteBackResult<WriteBackOutcome> {
        match action {
            ActionProposal::UpdateTaskProgress {
                project_name,
                task_name,
                percent_complete,
            } => {
                let projects = self.get_projects().await;
                let project = projects
                    .iter()
                    .find(|project| &project.name == project_name)
                    .ok_or_else(|| {
                        WriteBackError::NotFound(format!("Project \"{project_name}\" not found"))
                    })?;
                let task = project.find_task(task_name).ok_or_else(|| {
                    WriteBackError::NotFound(format!(
                        "Task \"{task_name}\" not found in \"{project_name}\""
                    ))
                })?;
                let ps = self.ps_client()?;
                let ps_id = project.ps_id.as_deref().ok_or_else(|| {
                    WriteBackError::Validation(format!(
                        "Project \"{project_name}\" is not linked to Project Server"
                    ))
                })?;

                let update = TaskUpdate {
                    percent_complete: Some(*percent_complete),
                    fixed_cost: None,
                };
                let publish = self
                    .publish_edit(
                        ps,
                        ps_id,
                        DraftEdit::Task {
                            task_id: &task.id,
                            updates: update.to_patch(),
                        },
                    )
                    .await?;
                Ok(WriteBackOutcome {
                    details: Some(json!({
                        "projectName": project_name,
                        "taskName": task_name,
                        "percentComplete": percent_complete,
                    })),
                    ..WriteBackOutcome::published(
                        format!(
                            "Updated \"{task_name}\" in \"{project_name}\" to {percent_complete}% complete"
                        ),
                        publish,
                    )
                })
            }
            ActionProposal::AssignResource {
                project_name,
                task_name,
                resource_name,
            } => {
                let bridge = self.bridge_client()?;
                let request = single_assignment(project_name, task_name, resource_name);
                let response = bridge.assign(&request).await?;
                if !response.success {
                    return Err(WriteBackError::BridgeRejected(
                        response
                            .message
                            .unwrap_or_else(|| "Bridge assignment failed".to_string()),
                    ));
                }
                self.invalidate_cache(Some(PROJECTS_KEY)).await;
                Ok(WriteBackOutcome {
                    success: true,
                    message: format!(
                        "Assigned {resource_name} to \"{task_name}\" in \"{project_name}\""
                    ),
                    method: Some(AssignmentMethod::CsomBridge),
                    details: Some(json!({
                        "projectName": project_name,
                        "taskName": task_name,
                        "resourceName": resource_name,
                    })),
                    publish: None,
                })
            }
        }
    }

    fn ps_client(&self) -> WriteBackResult<&dyn SchedulingApi> {
        self.ps
            .as_deref()
            .ok_or(WriteBackError::NotConfigured(PROJECT_SERVER))
    }

    fn bridge_client(&self) -> WriteBackResult<&dyn BridgeApi> {
        self.bridge
            .as_deref()
            .ok_or(WriteBackError::NotConfigured(BRIDGE))
    }

    async fn publish_edit(
        &self,
        ps: &dyn SchedulingApi,
        project_id: &str,
        edit: DraftEdit<'_>,
    ) -> WriteBackResult<PublishOutcome> {
        let digest = ps.checkout(project_id).await?;

        let applied = match &edit {
            DraftEdit::Task { task_id, updates } => {
                ps.update_task(project_id, task_id, updates, &digest).await
            }
            DraftEdit::Project { updates } => {
                ps.update_project_draft(project_id, updates, &digest).await
            }
            DraftEdit::Assignment {
                task_id,
                resource_id,
            } => {
                ps.add_assignment(project_id, task_id, resource_id, &digest)
                    .await
            }
        };
        if let Err(err) = applied {
            tracing::warn!(
                project_id,
                error = %err,
                "draft edit failed after checkout; project may remain checked out"
            );
            return Err(err.into());
        }

        let publish = match ps.publish(project_id).await {
            Ok(publish) => publish,
            Err(err) => {
                tracing::warn!(
                    project_id,
                    error = %err,
                    "publish failed; project may remain checked out"
                );
                return Err(err.into());
            }
        };
        if !publish.is_confirmed() {
            tracing::warn!(
                project_id,
                job_id = publish.job_id.as_deref().unwrap_or(""),
                "publish queued but not confirmed"
            );
        }

        self.invalidate_cache(Some(PROJECTS_KEY)).await;
        tracing::info!(project_id, "draft published");
        Ok(publish)
    }
}

fn single_assignment(project_name: &str, task_name: &str, resource_name: &str) -> AssignRequest {
    AssignRequest {
        project_name: project_name.to_string(),
        assignments: vec![Assignment {
            resource_name: resource_name.to_string(),
            task_name: task_name.to_string(),
        }],
    }
}
