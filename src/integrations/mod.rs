//! 集成模块：为第三方异步调用自动记录追踪（需启用 integrations 特性）。
//!
//! Auto-instrumentation for third-party call surfaces.
//!
//! Implement [`TracedCall`] for a thin adapter over the SDK you want to
//! observe, then wrap it with [`trace_service`]. Each call through the
//! returned [`Traced`] records one trace with its duration, status and
//! (optionally) captured input and output. The wrapped service is never
//! modified, and a failure to record a trace never changes the call's result.

use crate::client::Client;
use crate::context::ContextMetadata;
use crate::types::{CreateTraceParams, TraceStatus};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Display;
use std::future::Future;
use tokio::time::Instant;
use tracing::warn;

/// An async operation whose calls should be traced.
#[async_trait]
pub trait TracedCall: Send + Sync {
    type Input: Serialize + Send + 'static;
    type Output: Serialize + Send;
    type Error: Display + Send;

    async fn call(&self, input: Self::Input) -> Result<Self::Output, Self::Error>;

    /// Trace name for a call, e.g. `"OpenAI: gpt-4"`.
    fn trace_name(&self, _input: &Self::Input) -> String {
        "call".to_string()
    }

    /// Extra metadata describing a call (model, sampling parameters, ...).
    fn call_metadata(&self, _input: &Self::Input) -> ContextMetadata {
        ContextMetadata::new()
    }

    /// Metadata derived from a successful output (usage, finish reason, ...).
    fn output_metadata(&self, _output: &Self::Output) -> ContextMetadata {
        ContextMetadata::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOptions {
    pub capture_input: bool,
    pub capture_output: bool,
    pub capture_metadata: bool,
    /// Falls back to the client's configured organization.
    pub organization_id: Option<u64>,
    pub trace_prefix: String,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            capture_input: true,
            capture_output: true,
            capture_metadata: true,
            organization_id: None,
            trace_prefix: "call".to_string(),
        }
    }
}

impl TraceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.trace_prefix = prefix.into();
        self
    }

    pub fn with_organization(mut self, id: u64) -> Self {
        self.organization_id = Some(id);
        self
    }

    pub fn capture_input(mut self, on: bool) -> Self {
        self.capture_input = on;
        self
    }

    pub fn capture_output(mut self, on: bool) -> Self {
        self.capture_output = on;
        self
    }

    pub fn capture_metadata(mut self, on: bool) -> Self {
        self.capture_metadata = on;
        self
    }
}

/// A [`TracedCall`] that records a trace per call.
pub struct Traced<S> {
    inner: S,
    client: Client,
    options: TraceOptions,
}

/// Wrap `inner` so every call is traced through `client`. Trace metadata is
/// layered over the ambient context at record time.
pub fn trace_service<S: TracedCall>(inner: S, client: &Client, options: TraceOptions) -> Traced<S> {
    Traced {
        inner,
        client: client.clone(),
        options,
    }
}

fn new_trace_id(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, chrono::Utc::now().timestamp_millis(), &suffix[..9])
}

impl<S: TracedCall> Traced<S> {
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn options(&self) -> &TraceOptions {
        &self.options
    }

    pub async fn call(&self, input: S::Input) -> Result<S::Output, S::Error> {
        let start = Instant::now();
        let trace_id = new_trace_id(&self.options.trace_prefix);
        let name = self.inner.trace_name(&input);

        let mut metadata = self.inner.call_metadata(&input);
        if self.options.capture_input {
            metadata.insert("input".into(), serde_json::to_value(&input).unwrap_or(Value::Null));
        }

        let result = self.inner.call(input).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let status = match &result {
            Ok(output) => {
                if self.options.capture_output {
                    metadata.insert("output".into(), serde_json::to_value(output).unwrap_or(Value::Null));
                }
                if self.options.capture_metadata {
                    metadata.extend(self.inner.output_metadata(output));
                }
                TraceStatus::Success
            }
            Err(e) => {
                metadata.insert("error".into(), json!(e.to_string()));
                TraceStatus::Error
            }
        };

        record(&self.client, &self.options, name, trace_id, status, duration_ms, metadata).await;
        result
    }
}

#[async_trait]
impl<S: TracedCall> TracedCall for Traced<S> {
    type Input = S::Input;
    type Output = S::Output;
    type Error = S::Error;

    async fn call(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        Traced::call(self, input).await
    }

    fn trace_name(&self, input: &Self::Input) -> String {
        self.inner.trace_name(input)
    }
}

/// Trace a single ad-hoc future under `name`.
pub async fn trace_call<T, E, Fut>(client: &Client, name: &str, fut: Fut, options: &TraceOptions) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let start = Instant::now();
    let trace_id = new_trace_id(&options.trace_prefix);
    let result = fut.await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let mut metadata = ContextMetadata::new();
    let status = match &result {
        Ok(_) => TraceStatus::Success,
        Err(e) => {
            metadata.insert("error".into(), json!(e.to_string()));
            TraceStatus::Error
        }
    };
    record(client, options, name.to_string(), trace_id, status, duration_ms, metadata).await;
    result
}

async fn record(
    client: &Client,
    options: &TraceOptions,
    name: String,
    trace_id: String,
    status: TraceStatus,
    duration_ms: u64,
    metadata: ContextMetadata,
) {
    let mut params = CreateTraceParams::new(name, trace_id)
        .with_status(status)
        .with_duration_ms(duration_ms)
        .with_metadata(metadata);
    params.organization_id = options.organization_id;

    if let Err(e) = client.traces().create(params).await {
        warn!(error_code = e.code(), error = %e, "failed to record trace");
    }
}
