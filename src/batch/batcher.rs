//! Time/size windowed request coalescing.

use super::collector::{BatchCollector, BatchConfig, BatchItem, Pending};
use super::executor::{BatchExecutor, BatchResponse};
use crate::client::error_classification::classify_response;
use crate::error_code::ErrorKind;
use crate::transport::HttpMethod;
use crate::{Error, ErrorContext, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const BATCHABLE_PREFIXES: &[&str] = &["/traces", "/evaluations", "/annotations", "/results"];

/// Whether a call may be coalesced into a batch: reads of list/detail
/// resources only.
pub fn can_batch(method: HttpMethod, endpoint: &str) -> bool {
    method == HttpMethod::Get && BATCHABLE_PREFIXES.iter().any(|p| endpoint.contains(p))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub queued: usize,
    pub batches_dispatched: u64,
    pub items_dispatched: u64,
}

struct State {
    collector: BatchCollector,
    /// Bumped every time the window closes; a timer only fires for its own window.
    window: u64,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    config: BatchConfig,
    executor: Arc<dyn BatchExecutor>,
    state: Mutex<State>,
    next_id: AtomicU64,
    batches: AtomicU64,
    items: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn close_window(st: &mut State) {
        st.window = st.window.wrapping_add(1);
        if let Some(t) = st.timer.take() {
            t.abort();
        }
    }
}

/// Result slot of an enqueued request.
pub struct PendingResponse {
    id: String,
    rx: oneshot::Receiver<Result<Value>>,
}

impl PendingResponse {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Future for PendingResponse {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(res)) => Poll::Ready(res),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::new(
                ErrorKind::Unknown,
                "Batch dispatch ended without settling the request",
            )
            .with_context(ErrorContext::new().with_request_id(self.id.clone()).with_source("batcher")))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Coalesces independent calls into a single dispatch.
///
/// The first enqueue of a window arms a timer of `batch_delay`; reaching
/// `max_batch_size` dispatches immediately. Dispatch runs on a spawned task,
/// so [`enqueue`](Self::enqueue) must be called from within a tokio runtime.
#[derive(Clone)]
pub struct RequestBatcher {
    inner: Arc<Inner>,
}

impl RequestBatcher {
    pub fn new(config: BatchConfig, executor: Arc<dyn BatchExecutor>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    collector: BatchCollector::new(config.clone()),
                    window: 0,
                    timer: None,
                }),
                config,
                executor,
                next_id: AtomicU64::new(0),
                batches: AtomicU64::new(0),
                items: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.inner.config
    }

    pub fn enqueue(
        &self,
        method: HttpMethod,
        endpoint: impl Into<String>,
        body: Option<Value>,
        headers: HashMap<String, String>,
    ) -> PendingResponse {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("req_{}_{}", n, chrono::Utc::now().timestamp_millis());
        let mut item = BatchItem::new(id.clone(), method, endpoint).with_headers(headers);
        if let Some(b) = body {
            item = item.with_body(b);
        }

        let (tx, rx) = oneshot::channel();
        let ready = {
            let mut st = self.inner.lock();
            let added = st.collector.add(Pending { item, tx });
            if added.should_flush() {
                Inner::close_window(&mut st);
                Some(st.collector.take_batch())
            } else {
                if st.timer.is_none() {
                    st.timer = Some(self.arm_timer(st.window));
                }
                None
            }
        };

        if let Some(batch) = ready {
            let inner = self.inner.clone();
            tokio::spawn(async move { dispatch(&inner, batch).await });
        }
        PendingResponse { id, rx }
    }

    fn arm_timer(&self, window: u64) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.config.batch_delay).await;
            let chunks = {
                let mut st = inner.lock();
                if st.window != window {
                    return;
                }
                st.window = st.window.wrapping_add(1);
                st.timer = None;
                st.collector.drain_chunks()
            };
            for batch in chunks {
                dispatch(&inner, batch).await;
            }
        })
    }

    /// Dispatch everything queued now and wait until it is settled.
    pub async fn flush(&self) {
        let chunks = {
            let mut st = self.inner.lock();
            Inner::close_window(&mut st);
            st.collector.drain_chunks()
        };
        for batch in chunks {
            dispatch(&self.inner, batch).await;
        }
    }

    /// Reject everything queued; returns the number of rejected requests.
    pub fn clear(&self) -> usize {
        let chunks = {
            let mut st = self.inner.lock();
            Inner::close_window(&mut st);
            st.collector.drain_chunks()
        };
        let mut rejected = 0;
        for p in chunks.into_iter().flatten() {
            let err = Error::new(ErrorKind::Unknown, "Batch queue cleared").with_context(
                ErrorContext::new()
                    .with_endpoint(p.item.endpoint.clone())
                    .with_request_id(p.item.id.clone())
                    .with_source("batcher"),
            );
            let _ = p.tx.send(Err(err));
            rejected += 1;
        }
        rejected
    }

    pub fn queue_len(&self) -> usize {
        self.inner.lock().collector.len()
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats {
            queued: self.queue_len(),
            batches_dispatched: self.inner.batches.load(Ordering::Relaxed),
            items_dispatched: self.inner.items.load(Ordering::Relaxed),
        }
    }
}

async fn dispatch(inner: &Inner, batch: Vec<Pending>) {
    if batch.is_empty() {
        return;
    }
    inner.batches.fetch_add(1, Ordering::Relaxed);
    inner.items.fetch_add(batch.len() as u64, Ordering::Relaxed);
    debug!(size = batch.len(), "dispatching batch");

    let items: Vec<BatchItem> = batch.iter().map(|p| p.item.clone()).collect();
    match inner.executor.execute_batch(items).await {
        Ok(responses) => {
            let mut by_id: HashMap<String, BatchResponse> =
                responses.into_iter().map(|r| (r.id.clone(), r)).collect();
            for p in batch {
                let outcome = match by_id.remove(&p.item.id) {
                    Some(r) if r.is_success() => Ok(r.data),
                    Some(r) => Err(settle_failure(&p.item, r)),
                    None => Err(Error::new(ErrorKind::NetworkError, "No response received for request")
                        .with_context(
                            ErrorContext::new()
                                .with_endpoint(p.item.endpoint.clone())
                                .with_request_id(p.item.id.clone())
                                .with_source("batcher"),
                        )),
                };
                let _ = p.tx.send(outcome);
            }
        }
        Err(e) => {
            warn!(error = %e, size = batch.len(), "batch dispatch failed");
            for p in batch {
                let _ = p.tx.send(Err(e.clone()));
            }
        }
    }
}

fn settle_failure(item: &BatchItem, resp: BatchResponse) -> Error {
    let mut body = match resp.data {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(msg) = resp.error {
        body.insert("error".to_string(), Value::String(msg));
    }
    let mut err = classify_response(resp.status, &Value::Object(body), None);
    err.context = ErrorContext::new()
        .with_method(item.method.as_str())
        .with_endpoint(item.endpoint.clone())
        .with_request_id(item.id.clone())
        .with_source("batcher");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::FnBatchExecutor;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    type Calls = Arc<Mutex<Vec<(Duration, Vec<String>)>>>;

    /// Executor that echoes each item's endpoint and records batch composition.
    fn echo_executor(calls: Calls, start: Instant) -> Arc<dyn BatchExecutor> {
        Arc::new(FnBatchExecutor(move |items: Vec<BatchItem>| {
            let calls = calls.clone();
            async move {
                calls
                    .lock()
                    .unwrap()
                    .push((start.elapsed(), items.iter().map(|i| i.endpoint.clone()).collect()));
                Ok(items
                    .into_iter()
                    .map(|i| BatchResponse::ok(i.id, json!({ "endpoint": i.endpoint })))
                    .collect())
            }
        }))
    }

    fn get(b: &RequestBatcher, endpoint: &str) -> PendingResponse {
        b.enqueue(HttpMethod::Get, endpoint, None, HashMap::new())
    }

    #[test]
    fn test_can_batch() {
        assert!(can_batch(HttpMethod::Get, "/api/traces"));
        assert!(can_batch(HttpMethod::Get, "/api/llm-judge/results"));
        assert!(!can_batch(HttpMethod::Post, "/api/traces"));
        assert!(!can_batch(HttpMethod::Get, "/api/organizations/current"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_timer_groups_requests() {
        let calls: Calls = Arc::default();
        let b = RequestBatcher::new(BatchConfig::new(), echo_executor(calls.clone(), Instant::now()));

        let r1 = get(&b, "/api/traces/1");
        let r2 = get(&b, "/api/traces/2");
        assert_eq!(b.queue_len(), 2);

        let (v1, v2) = tokio::join!(r1, r2);
        assert_eq!(v1.unwrap(), json!({"endpoint": "/api/traces/1"}));
        assert_eq!(v2.unwrap(), json!({"endpoint": "/api/traces/2"}));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Duration::from_millis(50));
        assert_eq!(calls[0].1.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_threshold_dispatches_immediately() {
        let calls: Calls = Arc::default();
        let b = RequestBatcher::new(
            BatchConfig::new().with_max_batch_size(2),
            echo_executor(calls.clone(), Instant::now()),
        );

        let r1 = get(&b, "/api/traces/1");
        let r2 = get(&b, "/api/traces/2");
        let r3 = get(&b, "/api/traces/3");
        let (a, b2, c) = tokio::join!(r1, r2, r3);
        assert!(a.is_ok() && b2.is_ok() && c.is_ok());

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, Duration::ZERO);
        assert_eq!(calls[0].1, vec!["/api/traces/1", "/api/traces/2"]);
        // the third item opened a fresh window
        assert_eq!(calls[1].0, Duration::from_millis(50));
        assert_eq!(calls[1].1, vec!["/api/traces/3"]);
        assert_eq!(b.stats().batches_dispatched, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settles_by_id_with_classified_errors() {
        let exec = Arc::new(FnBatchExecutor(|items: Vec<BatchItem>| async move {
            let mut out = Vec::new();
            // answer out of order, fail the second, skip the third
            out.push(BatchResponse::failed(items[1].id.clone(), 404, "trace not found"));
            out.push(BatchResponse::ok(items[0].id.clone(), json!(1)));
            Ok(out)
        }));
        let b = RequestBatcher::new(BatchConfig::new(), exec);
        let r1 = get(&b, "/api/traces/1");
        let r2 = get(&b, "/api/traces/2");
        let r3 = get(&b, "/api/traces/3");
        b.flush().await;

        assert_eq!(r1.await.unwrap(), json!(1));
        let e2 = r2.await.unwrap_err();
        assert_eq!(e2.kind, ErrorKind::NotFound);
        assert_eq!(e2.message, "trace not found");
        let e3 = r3.await.unwrap_err();
        assert_eq!(e3.kind, ErrorKind::NetworkError);
        assert_eq!(e3.message, "No response received for request");
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_failure_rejects_every_item() {
        let exec = Arc::new(FnBatchExecutor(|_items: Vec<BatchItem>| async move {
            Err::<Vec<BatchResponse>, _>(Error::from_kind(ErrorKind::InternalError).with_status(503))
        }));
        let b = RequestBatcher::new(BatchConfig::new(), exec);
        let r1 = get(&b, "/api/traces/1");
        let r2 = get(&b, "/api/evaluations/2");
        let (e1, e2) = tokio::join!(r1, r2);
        assert_eq!(e1.unwrap_err().kind, ErrorKind::InternalError);
        assert_eq!(e2.unwrap_err().http_status, 503);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_drains_in_max_size_chunks() {
        let calls: Calls = Arc::default();
        let b = RequestBatcher::new(
            BatchConfig::new().with_max_batch_size(3).with_batch_delay(Duration::from_secs(10)),
            echo_executor(calls.clone(), Instant::now()),
        );
        let pending: Vec<_> = (0..2).map(|i| get(&b, &format!("/api/traces/{}", i))).collect();
        b.flush().await;
        for p in pending {
            assert!(p.await.is_ok());
        }
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(calls.lock().unwrap()[0].0, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_rejects_queued_items() {
        let calls: Calls = Arc::default();
        let b = RequestBatcher::new(BatchConfig::new(), echo_executor(calls.clone(), Instant::now()));
        let r1 = get(&b, "/api/traces/1");
        let r2 = get(&b, "/api/traces/2");
        assert_eq!(b.clear(), 2);
        assert_eq!(b.queue_len(), 0);

        let e = r1.await.unwrap_err();
        assert_eq!(e.kind, ErrorKind::Unknown);
        assert_eq!(e.message, "Batch queue cleared");
        assert!(r2.await.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ids_are_unique() {
        let calls: Calls = Arc::default();
        let b = RequestBatcher::new(BatchConfig::new(), echo_executor(calls, Instant::now()));
        let a = get(&b, "/api/traces");
        let c = get(&b, "/api/traces");
        assert_ne!(a.id(), c.id());
        assert!(a.id().starts_with("req_1_"));
        b.clear();
    }
}
