use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use epm_bridge::{ActionExtra, AutomationAction, BridgeState, router};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::{RecordingRunner, protocol_error};

async fn send(state: BridgeState, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn state_with<R: epm_bridge::AutomationRunner + 'static>(runner: Arc<R>) -> BridgeState {
    BridgeState {
        runner,
        pwa_url: "http://ps/pwa".to_string(),
    }
}

#[tokio::test]
async fn health_reports_service() {
    let runner = Arc::new(RecordingRunner::new(|_, _| Ok(json!({}))));
    let (status, body) = send(state_with(runner.clone()), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["service"], json!("ps-bridge"));
    assert_eq!(body["pwaUrl"], json!("http://ps/pwa"));
    assert!(body["timestamp"].as_str().is_some());
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn assign_requires_project_name() {
    let runner = Arc::new(RecordingRunner::new(|_, _| Ok(json!({"success": true}))));
    let (status, body) = send(
        state_with(runner.clone()),
        post_json("/api/assign", json!({"assignments": [{"resourceName": "Sara", "taskName": "Design"}]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "message": "projectName is required"}));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn assign_requires_assignments() {
    let runner = Arc::new(RecordingRunner::new(|_, _| Ok(json!({"success": true}))));
    let (status, body) = send(
        state_with(runner.clone()),
        post_json("/api/assign", json!({"projectName": "ERP", "assignments": []})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"success": false, "message": "assignments array is required"})
    );
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn assign_relays_runner_payload() {
    let runner = Arc::new(RecordingRunner::new(|_, _| {
        Ok(json!({"success": true, "message": "1 assignment added", "added": 1}))
    }));
    let (status, body) = send(
        state_with(runner.clone()),
        post_json(
            "/api/assign",
            json!({"projectName": "ERP", "assignments": [{"resourceName": "Sara", "taskName": "Design"}]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], json!(1));
    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, AutomationAction::Assign);
    assert_eq!(calls[0].1.project_name.as_deref(), Some("ERP"));
}

#[tokio::test]
async fn runner_error_is_500() {
    let runner = Arc::new(RecordingRunner::new(|_, _| {
        Err(protocol_error("invalid JSON from automation process: oops"))
    }));
    let (status, body) = send(state_with(runner), get("/api/projects")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"success": false, "message": "invalid JSON from automation process: oops"})
    );
}

#[tokio::test]
async fn task_listing_decodes_project_name() {
    let runner = Arc::new(RecordingRunner::new(|_, _| Ok(json!({"success": true, "data": []}))));
    let (status, _) = send(
        state_with(runner.clone()),
        get("/api/projects/ERP%20Modernization/tasks"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        runner.calls(),
        vec![(
            AutomationAction::ListTasks,
            ActionExtra::project("ERP Modernization")
        )]
    );
}

#[tokio::test]
async fn assign_all_runs_projects_sequentially_in_order() {
    let runner = Arc::new(RecordingRunner::new(|_, extra: &ActionExtra| {
        Ok(json!({
            "success": true,
            "message": format!("assigned {}", extra.project_name.clone().unwrap_or_default())
        }))
    }));
    let body = r#"{"projectAssignments":{
        "Zeta Rollout": [{"resourceName":"Sara","taskName":"Design"}],
        "Alpha Upgrade": [{"resourceName":"Omar","taskName":"Build"},{"resourceName":"Li","taskName":"Test"}]
    }}"#;
    let request = Request::builder()
        .method("POST")
        .uri("/api/assign-all")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(state_with(runner.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("Processed 2 projects: 2 succeeded"));
    assert_eq!(body["results"][0]["projectName"], json!("Zeta Rollout"));
    assert_eq!(body["results"][1]["message"], json!("assigned Alpha Upgrade"));

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1.project_name.as_deref(), Some("Zeta Rollout"));
    assert_eq!(calls[1].1.project_name.as_deref(), Some("Alpha Upgrade"));
    assert_eq!(calls[1].1.assignments.as_ref().map(Vec::len), Some(2));
}

#[tokio::test]
async fn assign_all_reports_partial_failure() {
    let runner = Arc::new(RecordingRunner::new(|_, extra: &ActionExtra| {
        if extra.project_name.as_deref() == Some("Broken") {
            Err(protocol_error("automation process failed: exit status: 1. Output: "))
        } else {
            Ok(json!({"success": true}))
        }
    }));
    let (status, body) = send(
        state_with(runner),
        post_json(
            "/api/assign-all",
            json!({"projectAssignments": {
                "Broken": [{"resourceName": "Sara", "taskName": "Design"}],
                "Fine": [{"resourceName": "Omar", "taskName": "Build"}]
            }}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Processed 2 projects: 1 succeeded"));
    let broken = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["projectName"] == json!("Broken"))
        .unwrap();
    assert_eq!(broken["success"], json!(false));
}

#[tokio::test]
async fn assign_all_requires_object() {
    let runner = Arc::new(RecordingRunner::new(|_, _| Ok(json!({"success": true}))));
    let (status, body) = send(
        state_with(runner.clone()),
        post_json("/api/assign-all", json!({"projectAssignments": "all"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(runner.calls().is_empty());
}
