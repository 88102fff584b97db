use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use bytes::Bytes;
use http_body_util::BodyExt;
use resoconto::application::registry::{InMemoryTokenIndex, TokenIndex};
use resoconto::application::reports::ReportService;
use resoconto::infra::http::{HttpState, build_router};
use resoconto::infra::storage::ArtifactStore;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

fn router_with_base(dir: &TempDir, public_base_url: Option<Url>) -> Router {
    let store = Arc::new(ArtifactStore::new(dir.path().to_path_buf()).expect("storage root"));
    let index: Arc<dyn TokenIndex> = Arc::new(InMemoryTokenIndex::new());
    let reports = Arc::new(ReportService::new(index, store, Duration::from_secs(3600)));
    build_router(HttpState {
        reports,
        public_base_url,
    })
}

fn test_router(dir: &TempDir) -> Router {
    router_with_base(dir, None)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router handles the request");
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    (status, headers, body)
}

async fn post_report(router: &Router, payload: Value) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder()
        .method("POST")
        .uri("/generate-report")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::HOST, "reports.example.test")
        .body(Body::from(payload.to_string()))
        .expect("request builds");
    send(router, request).await
}

async fn get(router: &Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds");
    send(router, request).await
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn artifact_count(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).expect("read dir").count()
}

fn offset_of(haystack: &[u8], needle: &str) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle.as_bytes())
}

#[tokio::test]
async fn direct_generation_returns_a_pdf_attachment() {
    let dir = TempDir::new().expect("tempdir");
    let router = test_router(&dir);

    let (status, headers, body) = post_report(
        &router,
        json!({
            "input_data": {"Event Description": ["A tech conference."]},
            "hashed_link": false
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(header_str(&headers, header::CONTENT_TYPE), "application/pdf");

    let disposition = header_str(&headers, header::CONTENT_DISPOSITION);
    assert!(disposition.starts_with("attachment; filename=\"report_"));
    assert!(disposition.ends_with(".pdf\""));

    assert!(body.starts_with(b"%PDF-"));
    assert!(offset_of(&body, "Event Summary Report").is_some());
    assert!(offset_of(&body, "A tech conference.").is_some());
}

#[tokio::test]
async fn direct_delivery_removes_the_backing_file() {
    let dir = TempDir::new().expect("tempdir");
    let router = test_router(&dir);

    let (status, _, _) = post_report(
        &router,
        json!({"input_data": {"Event Description": ["A tech conference."]}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(artifact_count(&dir), 0);
}

#[tokio::test]
async fn empty_input_data_is_a_bad_request() {
    let dir = TempDir::new().expect("tempdir");
    let router = test_router(&dir);

    let (status, _, body) =
        post_report(&router, json!({"input_data": {}, "hashed_link": false})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let parsed: Value = serde_json::from_slice(&body).expect("json error body");
    assert_eq!(parsed, json!({"error": "Missing input data"}));
    assert_eq!(artifact_count(&dir), 0);
}

#[tokio::test]
async fn missing_input_data_is_a_bad_request() {
    let dir = TempDir::new().expect("tempdir");
    let router = test_router(&dir);

    let (status, _, body) = post_report(&router, json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let parsed: Value = serde_json::from_slice(&body).expect("json error body");
    assert_eq!(parsed, json!({"error": "Missing input data"}));
}

#[tokio::test]
async fn hashed_link_round_trip_consumes_the_report() {
    let dir = TempDir::new().expect("tempdir");
    let router = test_router(&dir);

    let (status, _, body) = post_report(
        &router,
        json!({
            "input_data": {"Event Description": ["A tech conference."]},
            "hashed_link": true
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let parsed: Value = serde_json::from_slice(&body).expect("json link body");
    let url = parsed["url"].as_str().expect("url field");

    let prefix = "http://reports.example.test/download-report/";
    assert!(url.starts_with(prefix), "unexpected url: {url}");
    let token = &url[prefix.len()..];
    assert_eq!(token.len(), 64);
    assert!(token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));

    // Registered but unclaimed: the artifact is still on disk.
    assert_eq!(artifact_count(&dir), 1);

    let (status, headers, body) = get(&router, &format!("/download-report/{token}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header_str(&headers, header::CONTENT_TYPE), "application/pdf");
    assert!(
        header_str(&headers, header::CONTENT_DISPOSITION).starts_with("attachment; filename=")
    );
    assert!(body.starts_with(b"%PDF-"));
    assert_eq!(artifact_count(&dir), 0);

    // The link is single use.
    let (status, _, body) = get(&router, &format!("/download-report/{token}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let parsed: Value = serde_json::from_slice(&body).expect("json error body");
    assert_eq!(parsed, json!({"error": "Report not found"}));
}

#[tokio::test]
async fn configured_base_url_wins_over_the_host_header() {
    let dir = TempDir::new().expect("tempdir");
    let base = Url::parse("https://reports.example.org").expect("base url");
    let router = router_with_base(&dir, Some(base));

    let (status, _, body) = post_report(
        &router,
        json!({
            "input_data": {"Event Description": ["A tech conference."]},
            "hashed_link": true
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let parsed: Value = serde_json::from_slice(&body).expect("json link body");
    let url = parsed["url"].as_str().expect("url field");
    assert!(
        url.starts_with("https://reports.example.org/download-report/"),
        "unexpected url: {url}"
    );
}

#[tokio::test]
async fn never_registered_tokens_are_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let router = test_router(&dir);

    // Short token that could never have been issued.
    let (status, _, _) = get(&router, "/download-report/deadbeef").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Well-formed but unknown token.
    let unknown = "0".repeat(64);
    let (status, _, body) = get(&router, &format!("/download-report/{unknown}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let parsed: Value = serde_json::from_slice(&body).expect("json error body");
    assert_eq!(parsed, json!({"error": "Report not found"}));
}

#[tokio::test]
async fn sections_render_in_request_order() {
    let dir = TempDir::new().expect("tempdir");
    let router = test_router(&dir);

    let (status, _, body) = post_report(
        &router,
        json!({
            "input_data": {
                "Event Description": ["A tech conference."],
                "Key Participants": ["Industry leaders and researchers."],
                "Follow-Up Actions": ["Publish the conference findings."]
            }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let first = offset_of(&body, "Event Description").expect("first section present");
    let second = offset_of(&body, "Key Participants").expect("second section present");
    let third = offset_of(&body, "Follow-Up Actions").expect("third section present");
    assert!(first < second && second < third);
}

#[tokio::test]
async fn version_endpoint_reports_the_crate_version() {
    let dir = TempDir::new().expect("tempdir");
    let router = test_router(&dir);

    let (status, headers, body) = get(&router, "/version").await;

    assert_eq!(status, StatusCode::OK);
    assert!(header_str(&headers, header::CONTENT_TYPE).starts_with("application/json"));
    let parsed: Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(parsed, json!({"version": env!("CARGO_PKG_VERSION")}));
}

#[tokio::test]
async fn privacy_policy_is_served_as_an_attachment() {
    let dir = TempDir::new().expect("tempdir");
    let router = test_router(&dir);

    let (status, headers, body) = get(&router, "/privacy-policy").await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        header_str(&headers, header::CONTENT_DISPOSITION)
            .starts_with("attachment; filename=\"privacy.txt\"")
    );
    assert!(offset_of(&body, "Privacy Policy").is_some());
}

#[tokio::test]
async fn openapi_document_is_served_inline() {
    let dir = TempDir::new().expect("tempdir");
    let router = test_router(&dir);

    let (status, headers, body) = get(&router, "/openapi.yaml").await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::CONTENT_DISPOSITION).is_none());
    assert!(offset_of(&body, "openapi:").is_some());
    assert!(offset_of(&body, "/generate-report").is_some());
}
