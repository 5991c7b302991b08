//! End-to-end over the reqwest transport against a local mock server.

use evalai_sdk::types::{CreateTraceParams, TraceStatus};
use evalai_sdk::{Client, ErrorKind, RetryPolicy};
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

fn client_for(url: String) -> Client {
    Client::builder()
        .use_env(false)
        .api_key("sk-test")
        .organization_id(1)
        .base_url(url)
        .retry(RetryPolicy::new().with_base_delay(Duration::from_millis(5)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_get_sends_credentials_and_decodes() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/traces/7")
        .match_header("authorization", "Bearer sk-test")
        .match_header("x-request-id", Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": 7, "name": "checkout", "traceId": "t-7", "organizationId": 1,
                "status": "success", "createdAt": "2026-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let trace = client_for(server.url()).traces().get(7).await.unwrap();
    assert_eq!(trace.name, "checkout");
    assert_eq!(trace.status, TraceStatus::Success);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/traces")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({"name": "run", "organizationId": 1})))
        .with_status(201)
        .with_body(
            json!({
                "id": 1, "name": "run", "traceId": "t-1", "organizationId": 1,
                "status": "pending", "createdAt": "2026-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let trace = client_for(server.url())
        .traces()
        .create(CreateTraceParams::new("run", "t-1"))
        .await
        .unwrap();
    assert_eq!(trace.id, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_are_retried_up_to_budget() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/evaluations")
        .with_status(503)
        .with_body(r#"{"error":"maintenance"}"#)
        .expect(3)
        .create_async()
        .await;

    let err = client_for(server.url())
        .request_value("/api/evaluations", evalai_sdk::RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InternalError);
    assert_eq!(err.message, "maintenance");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retry_after_header_is_reported() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/organizations/current")
        .with_status(429)
        .with_header("Retry-After", "7")
        .with_body("rate limited")
        .create_async()
        .await;

    let client = Client::builder()
        .use_env(false)
        .api_key("sk-test")
        .base_url(server.url())
        .retry(RetryPolicy::new().with_max_attempts(1))
        .build()
        .unwrap();
    let err = client.organizations().current().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimited);
    assert_eq!(err.retry_after, Some(7));
    assert_eq!(err.message, "Too Many Requests");
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let client = Client::builder()
        .use_env(false)
        .api_key("sk-test")
        .base_url("http://127.0.0.1:9")
        .retry(RetryPolicy::new().with_max_attempts(1))
        .build()
        .unwrap();
    let err = client.organizations().current().await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NetworkError | ErrorKind::Timeout));
}
