use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use epm_portfolio::{
    DataSource, PROJECTS_KEY, PortfolioDataService, ServiceOptions, StaticDataset,
};
use epm_ps_client::{RemoteProject, SchedulingApi};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::{FakeScheduling, PS_ID, dataset, remote_task, service};

const PORTAL_PS_ID: &str = "0b9d7c55-1e2f-4a3b-8c4d-fedcba987654";

/// ERP plus a second live project, "Customer Portal Redesign".
fn two_live_projects() -> FakeScheduling {
    let mut ps = FakeScheduling::with_erp();
    ps.projects.lock().unwrap().push(RemoteProject {
        id: PORTAL_PS_ID.to_string(),
        name: "Customer Portal Redesign".to_string(),
        percent_complete: Some(55.0),
        description: None,
        start_date: None,
        finish_date: None,
    });
    ps.tasks.insert(
        PORTAL_PS_ID.to_string(),
        vec![remote_task("t-9", "Launch", 500.0, 100.0)],
    );
    ps
}

#[tokio::test]
async fn live_projects_are_merged_and_cached() {
    let ps = Arc::new(FakeScheduling::with_erp());
    let service = service(Some(Arc::clone(&ps)), None);

    let projects = service.get_projects().await;

    assert_eq!(projects.len(), 1);
    let erp = &projects[0];
    assert_eq!(erp.id, "P001");
    assert_eq!(erp.ps_id.as_deref(), Some(PS_ID));
    assert_eq!(erp.source, DataSource::ProjectServer);
    assert_eq!(erp.health, "red");
    assert_eq!(erp.budget, 3_000_000.0);
    assert_eq!(erp.roi, 190.0);
    // Σ 2000 × 50% + 0 × 0%.
    assert_eq!(erp.spent, 1000.0);
    assert_eq!(erp.progress, 40.0);
    assert_eq!(erp.end_date, "2025-06-30");
    assert_eq!(erp.pm_name, "Dana Whitfield");
    assert_eq!(erp.tasks.len(), 2);

    service.get_projects().await;
    assert_eq!(ps.list_calls.load(Ordering::SeqCst), 1);

    let status = service.get_status().await;
    assert!(status.ps_enabled);
    assert!(status.last_sync.is_some());
    assert_eq!(status.cached_keys, vec![PROJECTS_KEY.to_string()]);
}

#[tokio::test]
async fn fallback_is_not_cached() {
    let ps = Arc::new(FakeScheduling::with_erp());
    ps.fail_reads.store(true, Ordering::SeqCst);
    let service = service(Some(Arc::clone(&ps)), None);

    let projects = service.get_projects().await;
    let sources: Vec<DataSource> = projects.iter().map(|p| p.source).collect();
    assert_eq!(sources, vec![DataSource::Static, DataSource::Static]);
    assert!(service.get_status().await.cached_keys.is_empty());
    assert_eq!(service.get_status().await.last_sync, None);

    ps.fail_reads.store(false, Ordering::SeqCst);
    let projects = service.get_projects().await;
    assert_eq!(projects[0].source, DataSource::ProjectServer);
    assert_eq!(ps.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn spend_is_cost_weighted_by_completion() {
    let mut ps = FakeScheduling::with_erp();
    ps.tasks.insert(
        PS_ID.to_string(),
        vec![
            remote_task("t-1", "Design", 1000.0, 50.0),
            remote_task("t-2", "Build", 2000.0, 25.0),
        ],
    );
    let service = service(Some(Arc::new(ps)), None);

    let projects = service.get_projects().await;

    assert_eq!(projects[0].spent, 1000.0);
}

#[tokio::test]
async fn task_fetch_failure_serves_uncached_static_data() {
    let ps = Arc::new(two_live_projects());
    *ps.fail_tasks_for.lock().unwrap() = Some(PORTAL_PS_ID.to_string());
    let service = service(Some(Arc::clone(&ps)), None);

    let projects = service.get_projects().await;

    let ids: Vec<&str> = projects.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["P001", "P002"]);
    assert!(projects.iter().all(|p| p.source == DataSource::Static));
    assert!(service.get_status().await.cached_keys.is_empty());
    assert_eq!(service.get_status().await.last_sync, None);

    *ps.fail_tasks_for.lock().unwrap() = None;
    let projects = service.get_projects().await;
    assert_eq!(projects.len(), 2);
    assert!(projects.iter().all(|p| p.source == DataSource::ProjectServer));
    assert_eq!(ps.list_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        service.get_status().await.cached_keys,
        vec![PROJECTS_KEY.to_string()]
    );
}

#[tokio::test]
async fn empty_live_list_serves_static_data() {
    let ps = Arc::new(FakeScheduling::with_erp());
    ps.projects.lock().unwrap().clear();
    let service = service(Some(Arc::clone(&ps)), None);

    let projects = service.get_projects().await;

    assert_eq!(projects.len(), 2);
    assert_eq!(projects[1].id, "P002");
    assert_eq!(projects[1].source, DataSource::Static);
    assert!(service.get_status().await.cached_keys.is_empty());
}

#[tokio::test]
async fn disabled_service_never_calls_project_server() {
    let ps = Arc::new(FakeScheduling::with_erp());
    let service = PortfolioDataService::new(
        Some(Arc::clone(&ps) as Arc<dyn SchedulingApi>),
        None,
        Arc::new(dataset()),
        ServiceOptions {
            enabled: false,
            ..ServiceOptions::default()
        },
    );

    let projects = service.get_projects().await;

    assert!(!service.is_live());
    assert_eq!(projects[0].source, DataSource::Static);
    assert_eq!(ps.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cache_expires_after_ttl() {
    let ps = Arc::new(FakeScheduling::with_erp());
    let service = PortfolioDataService::new(
        Some(Arc::clone(&ps) as Arc<dyn SchedulingApi>),
        None,
        Arc::new(dataset()),
        ServiceOptions {
            cache_ttl: Duration::from_secs(300),
            enabled: true,
        },
    );

    service.get_projects().await;
    tokio::time::advance(Duration::from_secs(299)).await;
    service.get_projects().await;
    assert_eq!(ps.list_calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    service.get_projects().await;
    assert_eq!(ps.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalidate_forces_refetch() {
    let ps = Arc::new(FakeScheduling::with_erp());
    let service = service(Some(Arc::clone(&ps)), None);

    service.get_projects().await;
    service.invalidate_cache(Some(PROJECTS_KEY)).await;
    service.get_projects().await;
    service.invalidate_cache(None).await;

    assert_eq!(ps.list_calls.load(Ordering::SeqCst), 2);
    assert!(service.get_status().await.cached_keys.is_empty());
}

#[tokio::test]
async fn project_lookup_by_id_or_ps_id() {
    let service = service(Some(Arc::new(FakeScheduling::with_erp())), None);

    assert_eq!(
        service.get_project_by_id("P001").await.map(|p| p.name),
        Some("ERP Modernization".to_string())
    );
    assert_eq!(
        service.get_project_by_id(PS_ID).await.map(|p| p.id),
        Some("P001".to_string())
    );
    assert_eq!(service.get_project_by_id("P999").await, None);
}

#[tokio::test]
async fn connection_status_probes_client() {
    let ps = Arc::new(FakeScheduling::with_erp());
    let live = service(Some(Arc::clone(&ps)), None);

    let status = serde_json::to_value(live.connection_status().await).unwrap();
    assert_eq!(status["connected"], json!(true));
    assert_eq!(status["serverUrl"], json!("http://ps.test/pwa"));
    assert_eq!(status["psEnabled"], json!(true));

    let offline = service(None, None);
    let status = offline.connection_status().await;
    assert!(!status.connected);
    assert_eq!(status.server_url, None);
    assert!(!status.status.ps_enabled);
}

#[tokio::test]
async fn aggregates_over_static_dataset() {
    let data_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    let service = PortfolioDataService::new(
        None,
        None,
        Arc::new(StaticDataset::load_dir(data_dir).unwrap()),
        ServiceOptions::default(),
    );

    let portfolio = service.get_portfolio().await;
    assert_eq!(portfolio.total_projects, 4);
    assert_eq!(portfolio.health_breakdown.red, 1);
    assert_eq!(portfolio.strategic_objectives, 2);

    let strategy = service.get_strategy().await;
    assert_eq!(strategy.objectives[0].project_details.len(), 2);

    let alerts = service.get_alerts().await;
    let messages: Vec<&str> = alerts.iter().map(|a| a.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Customer Portal Redesign is at risk",
            "Critical risk: Scope creep from marketing requests",
            "Dana Whitfield is overloaded (85%)",
            "Customer Portal Redesign budget concern: 90% spent, 55% complete",
        ]
    );

    let scores = service.get_pm_scores();
    assert_eq!(
        scores.top_performer.map(|pm| pm.name),
        Some("Dana Whitfield".to_string())
    );
    assert_eq!(scores.needs_support.len(), 1);

    let risks = service.get_risks_with_summary();
    assert_eq!(risks.summary.total, 5);
    assert_eq!(risks.summary.critical, 1);
    assert_eq!(risks.by_category.financial, 1);

    let context = service.get_project_context().await;
    assert_eq!(context.pms.len(), 3);
    assert_eq!(context.objectives.len(), 2);
}
