use std::sync::Arc;

use epm_bridge::{
    AssignAllRequest, Assignment, BridgeApi, BridgeClient, BridgeState, serve,
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::oneshot;

use super::RecordingRunner;

#[tokio::test]
async fn client_and_server_agree_on_assign_all() {
    let runner = Arc::new(RecordingRunner::new(|_, _| {
        Ok(json!({"success": true, "message": "ok"}))
    }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let state = BridgeState {
        runner: runner.clone(),
        pwa_url: "http://ps/pwa".to_string(),
    };
    let server = tokio::spawn(serve(listener, state, async {
        let _ = stop_rx.await;
    }));

    let mut project_assignments = IndexMap::new();
    for name in ["Beta", "Alpha"] {
        project_assignments.insert(
            name.to_string(),
            vec![Assignment {
                resource_name: "Sara".to_string(),
                task_name: "Design".to_string(),
            }],
        );
    }
    let client = BridgeClient::new(format!("http://{addr}")).unwrap();
    let response = client
        .assign_all(&AssignAllRequest {
            project_assignments,
        })
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(
        response
            .results
            .iter()
            .map(|r| r.project_name.as_str())
            .collect::<Vec<_>>(),
        vec!["Beta", "Alpha"]
    );
    assert_eq!(runner.calls().len(), 2);

    let _ = stop_tx.send(());
    server.await.unwrap().unwrap();
}
