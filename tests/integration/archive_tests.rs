//! Integration tests for the archiver
//!
//! These tests use wiremock to stand in for the remote API and exercise the
//! HTTP source and the full archive run end-to-end.

use reqwest::Client;
use serde_json::json;
use std::path::Path;
use sumi_archive::config::{parse_config, Config};
use sumi_archive::crawler::{
    archive, build_http_client, DocumentIndex, FetchError, HttpSource, PageStrategy,
    WorkspaceSource, RATE_LIMIT_RETRIES,
};
use sumi_archive::model::{ContentNode, NodeKind};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, output_dir: &Path) -> Config {
    parse_config(&format!(
        r#"
[workspace]
root-id = "9001"

[api]
base-url = "{}"
token = "pk_test"
request-delay-ms = 0
timeout-secs = 5

[export]
output-dir = '{}'
"#,
        base_url,
        output_dir.display()
    ))
    .expect("test config should be valid")
}

fn source_for(server: &MockServer, workspace_id: &str) -> HttpSource {
    HttpSource::new(Client::new(), &server.uri(), workspace_id)
        .expect("mock server URI should parse")
}

async fn mount_json(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a small workspace: one space, one folder with one list, one document
async fn mount_workspace(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2/team/9001/space"))
        .and(header("authorization", "pk_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spaces": [{"id": "s1", "name": "Engineering"}]
        })))
        .mount(server)
        .await;

    mount_json(
        server,
        "/v2/space/s1/folder",
        json!({"folders": [{"id": "f1", "name": "Backend"}]}),
    )
    .await;
    mount_json(server, "/v2/space/s1/list", json!({"lists": []})).await;
    mount_json(
        server,
        "/v2/folder/f1/list",
        json!({"lists": [{"id": "l1", "name": "Sprint"}]}),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/v2/list/l1/task"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [{"id": "t1", "name": "Write docs", "status": {"status": "open"}}],
            "last_page": true
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/workspaces/9001/docs"))
        .and(query_param("parent_id", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [{"id": "d1", "name": "Handbook", "parent": {"id": "s1", "type": 4}}]
        })))
        .mount(server)
        .await;

    // The single-request pages endpoint is left unmounted (404) so the
    // page listing strategy is used, with one content request per page
    mount_json(
        server,
        "/v3/workspaces/9001/docs/d1/page_listing",
        json!([{"id": "p1", "name": "Intro", "pages": [{"id": "p2", "name": "Details"}]}]),
    )
    .await;
    mount_json(
        server,
        "/v3/workspaces/9001/docs/d1/pages/p1",
        json!({"id": "p1", "name": "Intro", "content": "Hello **world**"}),
    )
    .await;
    mount_json(
        server,
        "/v3/workspaces/9001/docs/d1/pages/p2",
        json!({"id": "p2", "name": "Details", "content": ""}),
    )
    .await;
}

#[tokio::test]
async fn test_status_mapping() {
    let mock_server = MockServer::start().await;
    let source = source_for(&mock_server, "9001");

    Mock::given(method("GET"))
        .and(path("/v2/task/limited"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/task/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/task/not-allowed"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/task/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&mock_server)
        .await;

    let limited = source.record_detail("limited").await.unwrap_err();
    assert!(limited.is_rate_limited());

    match source.record_detail("broken").await.unwrap_err() {
        FetchError::Http { status, .. } => assert_eq!(status, 500),
        other => panic!("expected HTTP error, got {:?}", other),
    }

    assert!(source.record_detail("missing").await.unwrap().is_unsupported());
    assert!(source.record_detail("not-allowed").await.unwrap().is_unsupported());

    assert!(matches!(
        source.record_detail("garbled").await.unwrap_err(),
        FetchError::Decode { .. }
    ));
}

#[tokio::test]
async fn test_client_sends_token() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri(), Path::new("./unused"));

    Mock::given(method("GET"))
        .and(path("/v2/team/9001/space"))
        .and(header("authorization", "pk_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spaces": [{"id": "s1", "name": "Engineering"}, {"id": 7, "name": "Numeric"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = build_http_client(&config.api, "pk_test").unwrap();
    let source = HttpSource::new(client, &mock_server.uri(), "9001").unwrap();
    let workspace = ContentNode::new("9001", "Workspace", NodeKind::Workspace);

    let spaces = source.containers(&workspace).await.unwrap().found().unwrap();

    assert_eq!(spaces.len(), 2);
    assert_eq!(spaces[1].id, "7");
    assert_eq!(spaces[1].kind, NodeKind::Space);
    assert_eq!(spaces[0].parent_id.as_deref(), Some("9001"));
}

#[tokio::test]
async fn test_sub_containers_of_lists_are_unsupported() {
    let mock_server = MockServer::start().await;
    let source = source_for(&mock_server, "9001");
    let list = ContentNode::new("l1", "Sprint", NodeKind::List);

    assert!(source.containers(&list).await.unwrap().is_unsupported());
    assert!(source.leaf_groups(&list).await.unwrap().is_unsupported());
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_record_pages_and_views() {
    let mock_server = MockServer::start().await;
    let source = source_for(&mock_server, "9001");

    Mock::given(method("GET"))
        .and(path("/v2/list/l1/task"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [{"id": "t1"}, {"id": "t2"}],
            "last_page": false
        })))
        .mount(&mock_server)
        .await;
    mount_json(
        &mock_server,
        "/v2/folder/f1/view",
        json!({"views": [
            {"id": "v1", "name": "Board", "type": "board"},
            {"id": "d7", "name": "Notes", "type": "doc"}
        ]}),
    )
    .await;

    let list = ContentNode::new("l1", "Sprint", NodeKind::List);
    let page = source.records(&list, 0).await.unwrap().found().unwrap();
    assert_eq!(page.records.len(), 2);
    assert!(!page.last_page);

    let folder = ContentNode::new("f1", "Backend", NodeKind::Folder);
    let views = source
        .documents(&folder, DocumentIndex::Views)
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, "d7");
    assert_eq!(views[0].kind, NodeKind::Document);
}

#[tokio::test]
async fn test_nested_document_pages() {
    let mock_server = MockServer::start().await;
    let source = source_for(&mock_server, "9001");

    mount_json(
        &mock_server,
        "/v3/workspaces/9001/docs/d1/pages",
        json!([{
            "id": "p1",
            "name": "Intro",
            "content": "Top",
            "date_updated": 1700000000000u64,
            "pages": [{"id": "p2", "name": "Nested", "content": "Inner"}]
        }]),
    )
    .await;

    let document = ContentNode::new("d1", "Handbook", NodeKind::Document);
    let pages = source
        .pages(&document, PageStrategy::DocumentPages)
        .await
        .unwrap()
        .found()
        .unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1].parent_id.as_deref(), Some("p1"));
    assert_eq!(pages[1].content, "Inner");
    assert!(pages[0].updated_at.is_some());
}

#[tokio::test]
async fn test_missing_workspace_id_is_structural() {
    let mock_server = MockServer::start().await;
    let source = source_for(&mock_server, "");
    let space = ContentNode::new("s1", "Engineering", NodeKind::Space);

    let err = source
        .documents(&space, DocumentIndex::Documents)
        .await
        .unwrap_err();

    assert!(err.is_structural());
}

#[tokio::test]
async fn test_full_archive_run() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), output.path());

    mount_workspace(&mock_server).await;
    mount_json(
        &mock_server,
        "/v2/task/t1",
        json!({
            "id": "t1",
            "name": "Write docs",
            "description": "Long text",
            "custom_fields": [],
            "checklists": [],
            "status": {"status": "open"}
        }),
    )
    .await;

    let report = archive(&config, "pk_test", Some("abc123")).await.unwrap();

    assert!(!report.has_failures());
    let totals = report.totals();
    assert_eq!(totals.records, 1);
    assert_eq!(totals.records_completed, 1);
    assert_eq!(totals.documents, 1);
    assert_eq!(totals.pages, 2);

    let space = output.path().join("Engineering");
    let csv = std::fs::read_to_string(space.join("Backend/Sprint.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("checklists,custom_fields,description,id,name,status.status")
    );
    assert_eq!(lines.next(), Some(",,Long text,t1,Write docs,open"));

    let intro = std::fs::read_to_string(space.join("docs/Handbook/Intro.md")).unwrap();
    assert_eq!(intro, "# Intro\n\nHello **world**\n");
    let details = std::fs::read_to_string(space.join("docs/Handbook/Intro/Details.md")).unwrap();
    assert!(details.contains("_This page has no content._"));

    let summary = std::fs::read_to_string(output.path().join("ARCHIVE_SUMMARY.md")).unwrap();
    assert!(summary.contains("| Engineering | ok |"));
    assert!(summary.contains("abc123"));

    // Every paced request reached the server, and nothing else did
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(report.requests as usize, received.len());
}

#[tokio::test]
async fn test_rate_limited_detail_keeps_partial_record() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), output.path());

    mount_workspace(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/v2/task/t1"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let report = archive(&config, "pk_test", None).await.unwrap();

    assert!(!report.has_failures());
    assert_eq!(report.totals().records, 1);
    assert_eq!(report.totals().records_partial, 1);
    assert_eq!(report.rate_limit_hits, u64::from(RATE_LIMIT_RETRIES + 1));

    let csv = std::fs::read_to_string(output.path().join("Engineering/Backend/Sprint.csv")).unwrap();
    assert_eq!(csv, "id,name,status.status\nt1,Write docs,open\n");
}

#[tokio::test]
async fn test_rate_limited_page_content_keeps_later_pages() {
    let mock_server = MockServer::start().await;
    let output = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), output.path());

    mount_json(
        &mock_server,
        "/v2/team/9001/space",
        json!({"spaces": [{"id": "s1", "name": "Engineering"}]}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/v3/workspaces/9001/docs"))
        .and(query_param("parent_id", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [{"id": "d1", "name": "Handbook", "parent": {"id": "s1", "type": 4}}]
        })))
        .mount(&mock_server)
        .await;
    mount_json(
        &mock_server,
        "/v3/workspaces/9001/docs/d1/page_listing",
        json!([
            {"id": "p1", "name": "First"},
            {"id": "p2", "name": "Second"},
            {"id": "p3", "name": "Third"}
        ]),
    )
    .await;
    mount_json(
        &mock_server,
        "/v3/workspaces/9001/docs/d1/pages/p1",
        json!({"id": "p1", "content": "One"}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/v3/workspaces/9001/docs/d1/pages/p2"))
        .respond_with(ResponseTemplate::new(429))
        .expect(u64::from(RATE_LIMIT_RETRIES + 1))
        .mount(&mock_server)
        .await;
    mount_json(
        &mock_server,
        "/v3/workspaces/9001/docs/d1/pages/p3",
        json!({"id": "p3", "content": "Three"}),
    )
    .await;

    let report = archive(&config, "pk_test", None).await.unwrap();

    assert!(!report.has_failures());
    assert_eq!(report.totals().pages, 3);
    assert_eq!(report.totals().rate_limited, 1);
    assert_eq!(report.rate_limit_hits, u64::from(RATE_LIMIT_RETRIES + 1));

    let handbook = output.path().join("Engineering/docs/Handbook");
    let read = |name: &str| std::fs::read_to_string(handbook.join(name)).unwrap();
    assert_eq!(read("First.md"), "# First\n\nOne\n");
    assert_eq!(
        read("Second.md"),
        "# Second\n\n_The content of this page could not be fetched._\n"
    );
    assert_eq!(read("Third.md"), "# Third\n\nThree\n");
}
