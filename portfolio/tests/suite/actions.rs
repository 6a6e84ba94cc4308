use std::sync::Arc;

use epm_bridge::BridgeResponse;
use epm_portfolio::{ActionProposal, AssignmentMethod, WriteBackError};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::{FakeBridge, FakeScheduling, PS_ID, service};

fn progress(project: &str, task: &str, pct: f64) -> ActionProposal {
    ActionProposal::UpdateTaskProgress {
        project_name: project.to_string(),
        task_name: task.to_string(),
        percent_complete: pct,
    }
}

fn assign(resource: &str) -> ActionProposal {
    ActionProposal::AssignResource {
        project_name: "ERP Modernization".to_string(),
        task_name: "Build".to_string(),
        resource_name: resource.to_string(),
    }
}

#[tokio::test]
async fn progress_update_resolves_names_to_ids() {
    let ps = Arc::new(FakeScheduling::with_erp());
    let service = service(Some(Arc::clone(&ps)), None);

    let outcome = service
        .execute_action(&progress("ERP Modernization", "Design", 80.0))
        .await
        .unwrap();

    assert_eq!(
        outcome.message,
        "Updated \"Design\" in \"ERP Modernization\" to 80% complete"
    );
    assert_eq!(
        outcome.details,
        Some(json!({
            "projectName": "ERP Modernization",
            "taskName": "Design",
            "percentComplete": 80.0,
        }))
    );
    assert_eq!(
        ps.calls()[1],
        format!("patch {PS_ID} task t-1 {{\"PercentComplete\":80.0}}")
    );
}

#[tokio::test]
async fn unknown_project_or_task_is_not_found() {
    let service = service(Some(Arc::new(FakeScheduling::with_erp())), None);

    let err = service
        .execute_action(&progress("Nope", "Design", 10.0))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Project \"Nope\" not found");
    assert_eq!(err.status_code(), 404);

    let err = service
        .execute_action(&progress("ERP Modernization", "Deploy", 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, WriteBackError::NotFound(_)));
    assert_eq!(
        err.to_string(),
        "Task \"Deploy\" not found in \"ERP Modernization\""
    );
}

#[tokio::test]
async fn static_projects_have_no_tasks_to_update() {
    let service = service(None, None);

    let err = service
        .execute_action(&progress("ERP Modernization", "Design", 10.0))
        .await
        .unwrap_err();

    assert!(matches!(err, WriteBackError::NotFound(_)));
}

#[tokio::test]
async fn assign_action_goes_through_bridge() {
    let bridge = Arc::new(FakeBridge::succeeding());
    let service = service(None, Some(Arc::clone(&bridge)));

    let outcome = service
        .execute_action(&assign("Tom Okafor"))
        .await
        .unwrap();

    assert_eq!(outcome.method, Some(AssignmentMethod::CsomBridge));
    assert_eq!(
        outcome.message,
        "Assigned Tom Okafor to \"Build\" in \"ERP Modernization\""
    );
    assert_eq!(bridge.requests().len(), 1);
}

#[tokio::test]
async fn assign_action_surfaces_bridge_failures() {
    let rejected = service(
        None,
        Some(Arc::new(FakeBridge::new(|_| {
            Ok(BridgeResponse::failure("Resource not found: Tom Okafor"))
        }))),
    );
    let err = rejected
        .execute_action(&assign("Tom Okafor"))
        .await
        .unwrap_err();
    assert!(matches!(err, WriteBackError::BridgeRejected(ref m) if m == "Resource not found: Tom Okafor"));

    let silent = service(
        None,
        Some(Arc::new(FakeBridge::new(|_| Ok(BridgeResponse::default())))),
    );
    let err = silent.execute_action(&assign("Tom Okafor")).await.unwrap_err();
    assert!(matches!(err, WriteBackError::BridgeRejected(ref m) if m == "Bridge assignment failed"));

    let down = service(None, Some(Arc::new(FakeBridge::unreachable())));
    let err = down.execute_action(&assign("Tom Okafor")).await.unwrap_err();
    assert!(matches!(err, WriteBackError::Bridge(_)));

    let missing = service(None, None);
    let err = missing.execute_action(&assign("Tom Okafor")).await.unwrap_err();
    assert!(matches!(err, WriteBackError::NotConfigured("PS bridge")));
}
