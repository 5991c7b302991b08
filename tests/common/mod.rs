//! Shared fixtures: an in-process transport that scripts responses and
//! records every request it sees.

#![allow(dead_code)]

use async_trait::async_trait;
use evalai_sdk::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use evalai_sdk::{Client, ClientBuilder};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// What the transport does for one request.
pub enum Reply {
    Respond(HttpResponse),
    /// Respond after sleeping (on the tokio clock).
    Delayed(Duration, HttpResponse),
    Fail(TransportError),
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Reply::Respond(HttpResponse::new(status, body.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub request: HttpRequest,
    pub at: Instant,
}

impl Recorded {
    pub fn body_json(&self) -> Value {
        self.request
            .body
            .as_ref()
            .map(|b| serde_json::from_slice(b).unwrap())
            .unwrap_or(Value::Null)
    }

    /// Path and query with the base URL stripped.
    pub fn endpoint(&self) -> &str {
        self.request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&self.request.url)
    }
}

type Handler = Box<dyn Fn(&HttpRequest) -> Reply + Send + Sync>;

pub struct MockTransport {
    queue: Mutex<VecDeque<Reply>>,
    handler: Option<Handler>,
    seen: Mutex<Vec<Recorded>>,
}

impl MockTransport {
    /// Replies are consumed in order; once exhausted every request gets `200 {}`.
    pub fn scripted(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(replies.into()),
            handler: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn with_handler(f: impl Fn(&HttpRequest) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            handler: Some(Box::new(f)),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(Recorded {
            request: request.clone(),
            at: Instant::now(),
        });
        let reply = match &self.handler {
            Some(h) => h(&request),
            None => self
                .queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Reply::Respond(HttpResponse::new(200, "{}"))),
        };
        match reply {
            Reply::Respond(resp) => Ok(resp),
            Reply::Delayed(after, resp) => {
                tokio::time::sleep(after).await;
                Ok(resp)
            }
            Reply::Fail(e) => Err(e),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub const BASE_URL: &str = "https://eval.test";

/// Builder preset for tests: no environment, fixed key and base URL.
pub fn builder(transport: Arc<MockTransport>) -> ClientBuilder {
    Client::builder()
        .use_env(false)
        .api_key("sk-test")
        .base_url(BASE_URL)
        .transport(transport)
}

pub fn client(transport: Arc<MockTransport>) -> Client {
    builder(transport).organization_id(1).build().unwrap()
}

pub fn trace_json(id: u64, name: &str) -> Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "traceId": format!("t-{}", id),
        "organizationId": 1,
        "status": "success",
        "createdAt": "2026-01-01T00:00:00Z"
    })
}
