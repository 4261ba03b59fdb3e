//! Integration tests for the urlscan client against a local mock server

use serde_json::json;
use std::time::Duration;
use urlscan_client::transport::API_KEY_HEADER;
use urlscan_client::{
    Client, ClientConfig, ClientError, Pro, ScanOptions, SearchQuery, Visibility, WaitOptions,
};
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UUID: &str = "68d9e8a4-7a1c-4a35-9c59-5a2c4e8d1f00";

fn test_client(server: &MockServer, retry: bool) -> Client {
    let config = ClientConfig::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .retry(retry)
        .timeout(Duration::from_secs(10))
        .build_with_env(|_| None)
        .expect("valid config");
    Client::from_config(config).expect("Failed to create client")
}

#[tokio::test]
async fn test_scan_sends_api_key_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/scan/"))
        .and(header(API_KEY_HEADER, "test-key"))
        .and(body_json(json!({
            "url": "https://example.com",
            "visibility": "public",
            "tags": ["demo"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Submission successful",
            "uuid": UUID,
            "result": format!("https://urlscan.io/result/{UUID}/"),
            "api": format!("https://urlscan.io/api/v1/result/{UUID}/"),
            "visibility": "public"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, false);
    let handle = client
        .scan(
            "https://example.com",
            &ScanOptions::new(Visibility::Public).with_tag("demo"),
        )
        .await
        .expect("Scan failed");

    assert_eq!(handle.uuid, UUID);
    assert_eq!(handle.visibility, Some(Visibility::Public));
}

#[tokio::test]
async fn test_user_agent_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/quotas"))
        .and(header(
            "User-Agent",
            concat!("urlscan-rs/", env!("CARGO_PKG_VERSION")),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"limits": {}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let quotas = test_client(&mock_server, false)
        .get_quotas()
        .await
        .expect("Quota lookup failed");
    assert!(quotas.get("limits").is_some());
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/result/{UUID}/")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid API key",
            "status": 401
        })))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server, false)
        .get_result(UUID)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClientError::Authentication { status: 401, ref message } if message == "Invalid API key"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_rate_limit_retry_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/userAgents"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("X-Rate-Limit-Reset-After", "0")
                .set_body_json(json!({"message": "Rate limit exceeded", "status": 429})),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/userAgents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"userAgents": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let agents = test_client(&mock_server, true)
        .get_user_agents()
        .await
        .expect("Retry should succeed");
    assert_eq!(agents, json!({"userAgents": []}));
}

#[tokio::test]
async fn test_rate_limit_without_retry_is_surfaced() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/userAgents"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("X-Rate-Limit-Reset-After", "17.5")
                .set_body_json(json!({"message": "Rate limit exceeded"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server, false)
        .get_user_agents()
        .await
        .unwrap_err();
    match err {
        ClientError::RateLimited { reset_after, .. } => {
            assert_eq!(reset_after, Some(Duration::from_secs(18)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_search_follows_cursor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/search/"))
        .and(query_param("q", "page.domain:example.com"))
        .and(query_param("size", "2"))
        .and(query_param_is_missing("search_after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3,
            "has_more": true,
            "results": [
                {"_id": "a", "sort": [1_700_000_000_300_u64, "a"]},
                {"_id": "b", "sort": [1_700_000_000_200_u64, "b"]}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/search/"))
        .and(query_param("search_after", "1700000000200,b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3,
            "has_more": false,
            "results": [{"_id": "c", "sort": [1_700_000_000_100_u64, "c"]}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let records = test_client(&mock_server, false)
        .search(SearchQuery::new("page.domain:example.com").with_size(2))
        .collect_all()
        .await
        .expect("Search failed");

    let ids: Vec<_> = records.iter().filter_map(|r| r.id()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_wait_for_result_after_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/result/{UUID}/")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Scan is not finished yet",
            "status": 404
        })))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/result/{UUID}/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task": {"uuid": UUID},
            "page": {"url": "https://example.com/"}
        })))
        .mount(&mock_server)
        .await;

    let options = WaitOptions::default()
        .with_interval(Duration::from_millis(20))
        .with_timeout(Duration::from_secs(5));
    let record = test_client(&mock_server, false)
        .wait_for_result(UUID, &options)
        .await
        .expect("Result should become available");

    assert_eq!(record.id(), Some(UUID));
    assert_eq!(
        record.pointer("/page/url"),
        Some(&json!("https://example.com/"))
    );
}

#[tokio::test]
async fn test_screenshot_and_dom() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/screenshots/{UUID}.png")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/dom/{UUID}/")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server, false);
    let png = client.get_screenshot(UUID).await.expect("Screenshot failed");
    assert_eq!(&png[1..], b"PNG");
    let dom = client.get_dom(UUID).await.expect("DOM failed");
    assert_eq!(dom, "<html></html>");
}

#[tokio::test]
async fn test_pro_datadump_download() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/datadump/link/days/api/20260101/20260101.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x1f, 0x8b, 0x08, 0x00]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let pro = Pro::from_client(test_client(&mock_server, false));
    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("20260101.gz");

    let written = pro
        .datadump()
        .download_file("days/api/20260101/20260101.gz", &dest)
        .await
        .expect("Download failed");
    assert_eq!(written, 4);
    assert_eq!(std::fs::read(&dest).expect("read dump"), vec![0x1f, 0x8b, 0x08, 0x00]);
}

#[tokio::test]
async fn test_follow_redirects_toggle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/quotas"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/api/v1/quotas/moved"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/quotas/moved"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"limits": {}})))
        .mount(&mock_server)
        .await;

    let quotas = test_client(&mock_server, false)
        .get_quotas()
        .await
        .expect("Redirect should be followed");
    assert!(quotas.get("limits").is_some());

    let config = ClientConfig::builder()
        .api_key("test-key")
        .base_url(mock_server.uri())
        .follow_redirects(false)
        .build_with_env(|_| None)
        .expect("valid config");
    let err = Client::from_config(config)
        .expect("Failed to create client")
        .get_quotas()
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClientError::Api { status: 302, .. }),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_client_with_proxy_and_no_verify() {
    let config = ClientConfig::builder()
        .api_key("test-key")
        .proxy("http://127.0.0.1:3128")
        .verify(false)
        .build_with_env(|_| None)
        .expect("valid config");
    assert!(Client::from_config(config).is_ok());
}
