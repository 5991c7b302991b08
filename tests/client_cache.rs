//! Response cache and request batching as seen through the client.

mod common;

use common::{builder, client, trace_json, MockTransport, Reply};
use evalai_sdk::transport::HttpResponse;
use evalai_sdk::types::ListTracesParams;
use evalai_sdk::{ErrorKind, RequestOptions};
use serde_json::{json, Value};
use std::time::Duration;

#[tokio::test]
async fn test_repeated_get_is_served_from_cache() {
    let transport = MockTransport::scripted(vec![Reply::json(200, json!([trace_json(1, "a")]))]);
    let client = client(transport.clone());

    let first = client.traces().list(&ListTracesParams::default()).await.unwrap();
    let second = client.traces().list(&ListTracesParams::default()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(transport.count(), 1);

    let stats = client.signals().await.cache;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.size, 1);
}

#[tokio::test]
async fn test_mutation_invalidates_resource() {
    let transport = MockTransport::scripted(vec![
        Reply::json(200, json!([trace_json(1, "a")])),
        Reply::json(200, json!({"message": "deleted"})),
        Reply::json(200, json!([])),
    ]);
    let client = client(transport.clone());

    assert_eq!(client.traces().list(&ListTracesParams::default()).await.unwrap().len(), 1);
    let msg = client.traces().delete(1).await.unwrap();
    assert_eq!(msg.message, "deleted");
    assert!(client.traces().list(&ListTracesParams::default()).await.unwrap().is_empty());
    assert_eq!(transport.count(), 3);
}

#[tokio::test]
async fn test_other_resources_survive_mutation() {
    let transport = MockTransport::scripted(vec![
        Reply::json(200, json!({"id": 5, "name": "Acme", "status": "active", "createdAt": "2026-01-01"})),
        Reply::json(200, json!(trace_json(2, "b"))),
    ]);
    let client = client(transport.clone());

    client
        .request_value("/api/organizations/current", RequestOptions::get())
        .await
        .unwrap();
    client
        .request_value("/api/traces", RequestOptions::post(json!({"name": "b"})))
        .await
        .unwrap();
    client
        .request_value("/api/organizations/current", RequestOptions::get())
        .await
        .unwrap();
    assert_eq!(transport.count(), 2);
}

#[tokio::test]
async fn test_volatile_endpoints_are_not_cached() {
    let transport = MockTransport::scripted(vec![]);
    let client = client(transport.clone());

    for _ in 0..2 {
        client
            .request_value("/api/developer/usage?organizationId=1", RequestOptions::get())
            .await
            .unwrap();
    }
    assert_eq!(transport.count(), 2);
}

#[tokio::test]
async fn test_zero_cache_size_disables_cache() {
    let transport = MockTransport::scripted(vec![]);
    let client = builder(transport.clone()).cache_size(0).build().unwrap();

    for _ in 0..2 {
        client.request_value("/api/traces", RequestOptions::get()).await.unwrap();
    }
    assert_eq!(transport.count(), 2);
    assert!(!client.cache().is_enabled());
}

#[tokio::test]
async fn test_clear_cache() {
    let transport = MockTransport::scripted(vec![]);
    let client = client(transport.clone());

    client.request_value("/api/traces", RequestOptions::get()).await.unwrap();
    client.clear_cache().await.unwrap();
    client.request_value("/api/traces", RequestOptions::get()).await.unwrap();
    assert_eq!(transport.count(), 2);
}

/// Answers the batch endpoint by echoing each item's endpoint; items under
/// `/missing` fail with 404.
fn batch_server() -> std::sync::Arc<MockTransport> {
    MockTransport::with_handler(|req| {
        if !req.url.ends_with("/api/batch") {
            return Reply::json(200, json!({"direct": true}));
        }
        let body: Value = serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
        let responses: Vec<Value> = body["requests"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| {
                let endpoint = item["endpoint"].as_str().unwrap();
                if endpoint.contains("/missing") {
                    json!({"id": item["id"], "status": 404, "error": "gone"})
                } else {
                    json!({"id": item["id"], "status": 200, "data": {"endpoint": endpoint}})
                }
            })
            .collect();
        Reply::Respond(HttpResponse::new(200, json!({ "responses": responses }).to_string()))
    })
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_reads_share_one_batch() {
    let transport = batch_server();
    let client = builder(transport.clone())
        .cache_size(0)
        .enable_batching(true)
        .batch_size(10)
        .batch_delay(Duration::from_millis(50))
        .build()
        .unwrap();

    let (a, b, missing) = tokio::join!(
        client.request_value("/api/traces/1", RequestOptions::get()),
        client.request_value("/api/evaluations/2", RequestOptions::get()),
        client.request_value("/api/traces/missing", RequestOptions::get()),
    );

    assert_eq!(a.unwrap(), json!({"endpoint": "/api/traces/1"}));
    assert_eq!(b.unwrap(), json!({"endpoint": "/api/evaluations/2"}));
    let err = missing.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.message, "gone");

    let seen = transport.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].endpoint(), "/api/batch");
    assert_eq!(seen[0].body_json()["requests"].as_array().unwrap().len(), 3);

    let stats = client.signals().await.batch.unwrap();
    assert_eq!(stats.batches_dispatched, 1);
    assert_eq!(stats.items_dispatched, 3);
}

#[tokio::test(start_paused = true)]
async fn test_full_batch_dispatches_without_waiting() {
    let transport = batch_server();
    let client = builder(transport.clone())
        .cache_size(0)
        .enable_batching(true)
        .batch_size(2)
        .batch_delay(Duration::from_secs(60))
        .build()
        .unwrap();

    let start = tokio::time::Instant::now();
    let (a, b) = tokio::join!(
        client.request_value("/api/traces/1", RequestOptions::get()),
        client.request_value("/api/traces/2", RequestOptions::get()),
    );
    a.unwrap();
    b.unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(transport.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unbatchable_calls_go_direct() {
    let transport = batch_server();
    let client = builder(transport.clone())
        .enable_batching(true)
        .build()
        .unwrap();

    let org = client
        .request_value("/api/organizations/current", RequestOptions::get())
        .await
        .unwrap();
    let created = client
        .request_value("/api/traces", RequestOptions::post(json!({"name": "x"})))
        .await
        .unwrap();
    assert_eq!(org, json!({"direct": true}));
    assert_eq!(created, json!({"direct": true}));
    assert!(transport.requests().iter().all(|r| r.endpoint() != "/api/batch"));
}
