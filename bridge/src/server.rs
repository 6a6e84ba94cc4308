//! HTTP front for the automation runner.

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::error::BridgeResult;
use crate::protocol::{
    AssignAllRequest, AssignAllResponse, AssignRequest, BridgeResponse, HealthResponse,
    ProjectResult,
};
use crate::runner::{ActionExtra, AutomationAction, AutomationRunner};

pub const SERVICE_NAME: &str = "ps-bridge";

#[derive(Clone)]
pub struct BridgeState {
    pub runner: Arc<dyn AutomationRunner>,
    pub pwa_url: String,
}

pub fn router(state: BridgeState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/projects", get(list_projects))
        .route("/api/resources", get(list_resources))
        .route("/api/projects/:name/tasks", get(list_tasks))
        .route("/api/assign", post(assign))
        .route("/api/assign-all", post(assign_all))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: BridgeState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health(State(state): State<BridgeState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        pwa_url: state.pwa_url.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn list_projects(State(state): State<BridgeState>) -> BridgeResult<Json<Value>> {
    run(&state, AutomationAction::ListProjects, ActionExtra::default()).await
}

async fn list_resources(State(state): State<BridgeState>) -> BridgeResult<Json<Value>> {
    run(&state, AutomationAction::ListResources, ActionExtra::default()).await
}

async fn list_tasks(
    State(state): State<BridgeState>,
    Path(name): Path<String>,
) -> BridgeResult<Json<Value>> {
    // `Path` has already percent-decoded the segment.
    run(&state, AutomationAction::ListTasks, ActionExtra::project(name)).await
}

async fn assign(State(state): State<BridgeState>, body: Bytes) -> BridgeResult<Json<Value>> {
    let request = AssignRequest::from_json(&body)?;
    tracing::info!(
        project = %request.project_name,
        assignments = request.assignments.len(),
        "assign request"
    );
    let extra = ActionExtra {
        project_name: Some(request.project_name),
        assignments: Some(request.assignments),
    };
    run(&state, AutomationAction::Assign, extra).await
}

async fn assign_all(
    State(state): State<BridgeState>,
    body: Bytes,
) -> BridgeResult<Json<AssignAllResponse>> {
    let request = AssignAllRequest::from_json(&body)?;
    let mut results = Vec::with_capacity(request.project_assignments.len());

    // One process at a time: the automation script holds a project checkout.
    for (project_name, assignments) in request.project_assignments {
        let extra = ActionExtra {
            project_name: Some(project_name.clone()),
            assignments: Some(assignments),
        };
        let response = match state.runner.run(AutomationAction::Assign, extra).await {
            Ok(payload) => {
                let mut response = BridgeResponse::from_payload(payload);
                response.extra.remove("projectName");
                response
            }
            Err(err) => {
                tracing::warn!(project = %project_name, error = %err, "assignment batch failed");
                BridgeResponse::failure(err.to_string())
            }
        };
        results.push(ProjectResult {
            project_name,
            response,
        });
    }

    let response = AssignAllResponse::from_results(results);
    tracing::info!(message = %response.message, "assign-all finished");
    Ok(Json(response))
}

async fn run(
    state: &BridgeState,
    action: AutomationAction,
    extra: ActionExtra,
) -> BridgeResult<Json<Value>> {
    state.runner.run(action, extra).await.map(Json)
}
