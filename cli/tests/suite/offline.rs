use pretty_assertions::assert_eq;
use predicates::str::contains;
use serde_json::{Value, json};
use tempfile::TempDir;

use super::epm_command;

fn run_json(args: &[&str]) -> Value {
    let home = TempDir::new().unwrap();
    let output = epm_command(&home).args(args).assert().success();
    serde_json::from_slice(&output.get_output().stdout).unwrap()
}

#[test]
fn portfolio_from_static_data() {
    let portfolio = run_json(&["portfolio"]);

    assert_eq!(portfolio["totalProjects"], json!(4));
    assert_eq!(portfolio["healthBreakdown"]["red"], json!(1));
    assert_eq!(portfolio["projects"][0]["_source"], json!("static"));
}

#[test]
fn project_lookup_and_not_found() {
    let project = run_json(&["project", "P002"]);
    assert_eq!(project["name"], json!("Customer Portal Redesign"));

    let home = TempDir::new().unwrap();
    epm_command(&home)
        .args(["project", "P999"])
        .assert()
        .code(2)
        .stderr(contains("Project \"P999\" not found"));
}

#[test]
fn status_reports_offline() {
    let status = run_json(&["status"]);

    assert_eq!(status["psEnabled"], json!(false));
    assert_eq!(status["connected"], json!(false));
    assert_eq!(status["serverUrl"], Value::Null);
}

#[test]
fn writes_without_project_server_fail_as_infrastructure() {
    let home = TempDir::new().unwrap();
    epm_command(&home)
        .args([
            "set-finish",
            "--project-id",
            "6f1c2a9e",
            "--finish-date",
            "2025-09-30T17:00:00",
        ])
        .assert()
        .code(3)
        .stderr(contains("Project Server not configured"));
}

#[test]
fn bridge_health_without_bridge() {
    let report = run_json(&["bridge-health"]);

    assert_eq!(
        report,
        json!({"available": false, "error": "PS bridge not configured"})
    );
}

#[test]
fn invalid_action_is_rejected() {
    let home = TempDir::new().unwrap();
    epm_command(&home)
        .args(["execute", r#"{"type":"delete_project","params":{}}"#])
        .assert()
        .code(1)
        .stderr(contains("invalid action proposal"));
}
