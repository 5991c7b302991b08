//! Batch executor.

use super::collector::BatchItem;
use crate::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;

/// Per-item outcome returned by the batch endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResponse {
    pub fn ok(id: impl Into<String>, data: Value) -> Self {
        Self { id: id.into(), status: 200, data, error: None }
    }
    pub fn failed(id: impl Into<String>, status: u16, error: impl Into<String>) -> Self {
        Self { id: id.into(), status, data: Value::Null, error: Some(error.into()) }
    }
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one drained batch and returns the per-item responses.
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    async fn execute_batch(&self, items: Vec<BatchItem>) -> Result<Vec<BatchResponse>>;
}

/// Adapts an async closure into a [`BatchExecutor`].
pub struct FnBatchExecutor<F>(pub F);

#[async_trait]
impl<F, Fut> BatchExecutor for FnBatchExecutor<F>
where
    F: Fn(Vec<BatchItem>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<BatchResponse>>> + Send,
{
    async fn execute_batch(&self, items: Vec<BatchItem>) -> Result<Vec<BatchResponse>> {
        (self.0)(items).await
    }
}

/// Run `processor` over `items` with at most `concurrency` in flight.
///
/// Results come back in input order regardless of completion order.
pub async fn process_concurrently<T, R, F, Fut>(items: Vec<T>, processor: F, concurrency: usize) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    stream::iter(items.into_iter().map(processor))
        .buffered(concurrency.max(1))
        .collect()
        .await
}
