use crate::transport::HttpMethod;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Per-call options for [`Client::request`](super::Client::request).
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: Option<Value>,
    pub headers: HashMap<String, String>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self::new(HttpMethod::Post).with_body(body)
    }

    pub fn put(body: Value) -> Self {
        Self::new(HttpMethod::Put).with_body(body)
    }

    pub fn patch(body: Value) -> Self {
        Self::new(HttpMethod::Patch).with_body(body)
    }

    pub fn delete() -> Self {
        Self::new(HttpMethod::Delete)
    }

    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn with_json<T: Serialize>(self, body: &T) -> crate::Result<Self> {
        Ok(self.with_body(serde_json::to_value(body)?))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
