use epm_ps_client::{PsError, SchedulingApi};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{BASE_PATH, client_for, odata};

#[tokio::test]
async fn list_projects_decodes_odata_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE_PATH}/ProjectServer/Projects")))
        .and(query_param(
            "$select",
            "Id,Name,PercentComplete,Description,StartDate,FinishDate",
        ))
        .respond_with(odata(json!([
            {
                "Id": "6f1c2a9e-0000-4000-8000-000000000001",
                "Name": "ERP Modernization",
                "PercentComplete": 42,
                "Description": "Health: GREEN | ROI: 120%",
                "StartDate": "2024-01-08T08:00:00",
                "FinishDate": "2024-12-20T17:00:00"
            },
            { "Id": "6f1c2a9e-0000-4000-8000-000000000002", "Name": "Data Lake" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let projects = client_for(&server).list_projects().await.unwrap();

    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].name, "ERP Modernization");
    assert_eq!(projects[0].percent_complete, Some(42.0));
    assert_eq!(
        projects[0].description.as_deref(),
        Some("Health: GREEN | ROI: 120%")
    );
    assert_eq!(projects[1].description, None);
    assert_eq!(projects[1].finish_date, None);
}

#[tokio::test]
async fn list_tasks_targets_project() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE_PATH}/ProjectServer/Projects('p-1')/Tasks")))
        .and(query_param(
            "$select",
            "Id,Name,PercentComplete,FixedCost,Start,Finish",
        ))
        .respond_with(odata(json!([
            { "Id": "t-1", "Name": "Design", "PercentComplete": 100, "FixedCost": 500.5 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = client_for(&server).list_tasks("p-1").await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].fixed_cost, Some(500.5));
    assert_eq!(tasks[0].start, None);
}

#[tokio::test]
async fn non_200_read_is_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE_PATH}/ProjectServer/EnterpriseResources")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).list_resources().await.unwrap_err();

    assert!(
        matches!(err, PsError::UnexpectedStatus { status: 503, .. }),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn missing_results_is_schema_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE_PATH}/ProjectServer/Projects")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "d": {} })))
        .mount(&server)
        .await;

    let err = client_for(&server).list_projects().await.unwrap_err();

    assert!(matches!(err, PsError::Schema { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn custom_fields_keep_only_epm_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE_PATH}/ProjectServer/CustomFields")))
        .respond_with(odata(json!([
            { "Name": "EPM_Health", "Id": "cf-1", "InternalName": "Custom_a1", "FieldType": 21 },
            { "Name": "Cost Center", "Id": "cf-2", "InternalName": "Custom_b2", "FieldType": 21 },
            { "Name": "EPM_ROI", "Id": "cf-3" }
        ])))
        .mount(&server)
        .await;

    let fields = client_for(&server).list_custom_fields().await.unwrap();

    assert_eq!(
        fields.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["EPM_Health", "EPM_ROI"]
    );
    assert_eq!(fields["EPM_Health"].internal_name.as_deref(), Some("Custom_a1"));
    assert_eq!(fields["EPM_ROI"].field_type, None);
}

#[tokio::test]
async fn test_connection_reports_status_without_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE_PATH}/ProjectServer/Projects")))
        .and(query_param("$top", "1"))
        .respond_with(odata(json!([{ "Id": "p-1" }])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE_PATH}/ProjectServer/Projects")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.test_connection().await);
    assert!(!client.test_connection().await);
}
