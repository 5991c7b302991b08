//! 请求执行逻辑：限流、超时、鉴权头、错误分类与重试循环。
//!
//! Request execution: one network attempt and the retry loop around it.

use super::config::ClientConfig;
use super::error_classification::{classify_response, classify_transport, timeout_error};
use super::policy::{Decision, PolicyEngine};
use crate::batch::{BatchExecutor, BatchItem, BatchResponse};
use crate::resilience::rate_limiter::RateLimiter;
use crate::telemetry::RequestLogger;
use crate::transport::{HttpMethod, HttpRequest, Transport};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

const AUTHORIZATION: &str = "authorization";
const CONTENT_TYPE: &str = "content-type";
const REQUEST_ID: &str = "x-request-id";

/// Sends requests for one client. Shared between the client and its batch
/// executor.
pub(crate) struct Dispatcher {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: String,
    timeout: Duration,
    policy: PolicyEngine,
    limiter: Option<Arc<RateLimiter>>,
    logger: RequestLogger,
}

impl Dispatcher {
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        limiter: Option<Arc<RateLimiter>>,
        logger: RequestLogger,
    ) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
            policy: PolicyEngine::new(&config.retry),
            limiter,
            logger,
        }
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    pub fn logger(&self) -> &RequestLogger {
        &self.logger
    }

    /// Caller headers are kept except `Authorization`, which always carries
    /// the configured credential.
    fn build_request(
        &self,
        method: HttpMethod,
        url: String,
        body: Option<&Value>,
        headers: &HashMap<String, String>,
        request_id: &str,
    ) -> Result<HttpRequest> {
        let mut out: Vec<(String, String)> = Vec::with_capacity(headers.len() + 3);
        let has_header = |name: &str| headers.keys().any(|k| k.eq_ignore_ascii_case(name));

        if (body.is_some() || method.is_mutation()) && !has_header(CONTENT_TYPE) {
            out.push(("Content-Type".into(), "application/json".into()));
        }
        if !has_header(REQUEST_ID) {
            out.push(("X-Request-Id".into(), request_id.to_string()));
        }
        out.extend(
            headers
                .iter()
                .filter(|(k, _)| !k.eq_ignore_ascii_case(AUTHORIZATION))
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        out.push(("Authorization".into(), format!("Bearer {}", self.api_key)));

        let body = match body {
            Some(v) => Some(Bytes::from(serde_json::to_vec(v)?)),
            None => None,
        };
        Ok(HttpRequest {
            method,
            url,
            headers: out,
            body,
        })
    }

    /// A single attempt: limiter slot, deadline, send, parse, classify.
    pub async fn send_once(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&Value>,
        headers: &HashMap<String, String>,
        attempt: u32,
    ) -> Result<Value> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        let request_id = Uuid::new_v4().to_string();
        let url = self.url_for(endpoint);
        let ctx = ErrorContext::new()
            .with_endpoint(endpoint)
            .with_method(method.as_str())
            .with_request_id(request_id.clone())
            .with_attempt(attempt)
            .with_source("executor");

        let request = self.build_request(method, url.clone(), body, headers, &request_id)?;
        self.logger.log_request(method.as_str(), &url, body);

        let start = Instant::now();
        let response = match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Err(_) => return Err(timeout_error(self.timeout).with_context(ctx)),
            Ok(Err(e)) => return Err(classify_transport(e).with_context(ctx)),
            Ok(Ok(resp)) => resp,
        };
        let elapsed = start.elapsed();

        let data = parse_body(&response.body);
        self.logger
            .log_response(method.as_str(), &url, response.status, elapsed, Some(&data));

        if !response.is_success() {
            let err = classify_response(response.status, &data, Some(&response.headers))
                .with_context(ctx);
            info!(
                http_status = response.status,
                endpoint,
                attempt,
                duration_ms = elapsed.as_millis() as u64,
                error_code = err.code(),
                request_id = %request_id,
                "EvalAI request failed"
            );
            return Err(err);
        }

        debug!(
            http_status = response.status,
            endpoint,
            duration_ms = elapsed.as_millis() as u64,
            "EvalAI request succeeded"
        );
        Ok(data)
    }

    /// Attempts until success, a non-retryable error, or the attempt budget
    /// runs out.
    pub async fn send_with_retry(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&Value>,
        headers: &HashMap<String, String>,
    ) -> Result<Value> {
        let mut attempt = 1;
        loop {
            let err = match self.send_once(method, endpoint, body, headers, attempt).await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };
            match self.policy.decide(&err, attempt) {
                Decision::Retry { delay } => {
                    self.logger.log_retry(
                        attempt + 1,
                        self.policy.max_attempts(),
                        delay,
                        err.code(),
                        &self.url_for(endpoint),
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Decision::Fail => return Err(err),
            }
        }
    }
}

/// Empty or non-JSON bodies parse as an empty object.
fn parse_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return json!({});
    }
    serde_json::from_slice(body).unwrap_or_else(|_| json!({}))
}

/// Ships batches to the platform's batch endpoint through the dispatcher.
pub(crate) struct HttpBatchExecutor {
    dispatcher: Arc<Dispatcher>,
    endpoint: String,
}

impl HttpBatchExecutor {
    pub fn new(dispatcher: Arc<Dispatcher>, endpoint: impl Into<String>) -> Self {
        Self {
            dispatcher,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl BatchExecutor for HttpBatchExecutor {
    async fn execute_batch(&self, items: Vec<BatchItem>) -> Result<Vec<BatchResponse>> {
        let body = json!({ "requests": items });
        let data = self
            .dispatcher
            .send_with_retry(HttpMethod::Post, &self.endpoint, Some(&body), &HashMap::new())
            .await?;
        decode_batch_responses(data, &self.endpoint)
    }
}

/// Accepts `{ "responses": [...] }` or a bare array.
fn decode_batch_responses(data: Value, endpoint: &str) -> Result<Vec<BatchResponse>> {
    let list = match data {
        Value::Array(_) => data,
        Value::Object(mut map) => map.remove("responses").unwrap_or(Value::Null),
        _ => Value::Null,
    };
    if !list.is_array() {
        return Err(Error::new(
            crate::ErrorKind::Unknown,
            "Batch response did not contain a response list",
        )
        .with_context(ErrorContext::new().with_endpoint(endpoint).with_source("batcher")));
    }
    Ok(serde_json::from_value(list)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpResponse, TransportError};
    use std::sync::Mutex;

    struct Capture {
        seen: Mutex<Vec<HttpRequest>>,
        reply: HttpResponse,
    }

    #[async_trait]
    impl Transport for Capture {
        async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    fn dispatcher(reply: HttpResponse) -> (Dispatcher, Arc<Capture>) {
        let transport = Arc::new(Capture { seen: Mutex::new(Vec::new()), reply });
        let config = ClientConfig {
            api_key: "sk-test".into(),
            base_url: "https://api.example.com/".into(),
            ..Default::default()
        };
        (Dispatcher::new(&config, transport.clone(), None, RequestLogger::default()), transport)
    }

    #[tokio::test]
    async fn test_authorization_cannot_be_overridden() {
        let (d, t) = dispatcher(HttpResponse::new(200, "{}"));
        let headers = HashMap::from([
            ("authorization".to_string(), "Bearer stolen".to_string()),
            ("X-Trace".to_string(), "1".to_string()),
        ]);
        d.send_once(HttpMethod::Get, "/api/traces", None, &headers, 1).await.unwrap();

        let req = &t.seen.lock().unwrap()[0];
        assert_eq!(req.url, "https://api.example.com/api/traces");
        assert_eq!(req.header("Authorization"), Some("Bearer sk-test"));
        assert_eq!(req.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("authorization")).count(), 1);
        assert_eq!(req.header("x-trace"), Some("1"));
        assert!(req.header("content-type").is_none());
        assert!(req.header("x-request-id").is_some());
    }

    #[tokio::test]
    async fn test_content_type_on_mutations() {
        let (d, t) = dispatcher(HttpResponse::new(204, ""));
        let out = d.send_once(HttpMethod::Delete, "/api/traces/1", None, &HashMap::new(), 1).await.unwrap();
        assert_eq!(out, json!({}));
        let body = json!({"name": "t"});
        d.send_once(HttpMethod::Post, "/api/traces", Some(&body), &HashMap::new(), 1).await.unwrap();

        let seen = t.seen.lock().unwrap();
        assert_eq!(seen[0].header("content-type"), Some("application/json"));
        assert!(seen[0].body.is_none());
        assert_eq!(seen[1].body.as_deref(), Some(&br#"{"name":"t"}"#[..]));
    }

    #[tokio::test]
    async fn test_error_carries_context() {
        let (d, _) = dispatcher(HttpResponse::new(404, r#"{"error":"Trace not found"}"#));
        let err = d.send_once(HttpMethod::Get, "/api/traces/9", None, &HashMap::new(), 2).await.unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::NotFound);
        assert_eq!(err.message, "Trace not found");
        assert_eq!(err.context.endpoint.as_deref(), Some("/api/traces/9"));
        assert_eq!(err.context.attempt, Some(2));
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b""), json!({}));
        assert_eq!(parse_body(b"  \n"), json!({}));
        assert_eq!(parse_body(b"<html>"), json!({}));
        assert_eq!(parse_body(b"[1,2]"), json!([1, 2]));
    }

    #[test]
    fn test_decode_batch_responses_shapes() {
        let wrapped = json!({"responses": [{"id": "a", "status": 200, "data": {"x": 1}}]});
        let bare = json!([{"id": "b", "status": 404, "error": "Not found"}]);
        assert_eq!(decode_batch_responses(wrapped, "/api/batch").unwrap()[0].id, "a");
        let b = decode_batch_responses(bare, "/api/batch").unwrap();
        assert_eq!(b[0].error.as_deref(), Some("Not found"));
        assert!(decode_batch_responses(json!({"ok": true}), "/api/batch").is_err());
    }
}
