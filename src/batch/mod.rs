//! 请求批处理模块：在时间/数量窗口内合并独立请求，一次发送。
//!
//! # Request Batching Module
//!
//! Groups independent read calls issued close together into one dispatch to
//! the batch endpoint, then settles each caller's pending result from the
//! per-item responses.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RequestBatcher`] | Windowed queue: timer or size threshold triggers dispatch |
//! | [`BatchConfig`] | Maximum batch size and window length |
//! | [`BatchItem`] | One queued request as sent on the wire |
//! | [`BatchExecutor`] | Sends a drained batch, returns [`BatchResponse`]s |
//! | [`process_concurrently`] | Bounded-concurrency map that keeps input order |
//! | [`batch_process`] | Chunked bulk runs with progress, error collection and stop-on-error |
//! | [`stream_cases`] | Sequential per-case outcomes as a stream |
//!
//! ## Example
//!
//! ```rust
//! use evalai_sdk::batch::{BatchConfig, BatchItem, BatchResponse, FnBatchExecutor, RequestBatcher};
//! use evalai_sdk::transport::HttpMethod;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn demo() -> evalai_sdk::Result<()> {
//! let executor = Arc::new(FnBatchExecutor(|items: Vec<BatchItem>| async move {
//!     Ok(items.into_iter().map(|i| BatchResponse::ok(i.id, serde_json::json!({}))).collect())
//! }));
//! let batcher = RequestBatcher::new(BatchConfig::new(), executor);
//! let a = batcher.enqueue(HttpMethod::Get, "/api/traces/1", None, HashMap::new());
//! let b = batcher.enqueue(HttpMethod::Get, "/api/traces/2", None, HashMap::new());
//! let (a, b) = tokio::join!(a, b);
//! # a?; b?;
//! # Ok(())
//! # }
//! ```

mod batcher;
mod bulk;
mod collector;
mod executor;

pub use batcher::{can_batch, BatchStats, PendingResponse, RequestBatcher};
pub use bulk::{
    batch_process, chunk, stream_cases, BatchFailure, BatchOptions, BatchProgress, BatchResult, BatchSummary,
    CaseOutcome, DEFAULT_CHUNK_SIZE,
};
pub use collector::{BatchAddResult, BatchConfig, BatchItem};
pub use executor::{process_concurrently, BatchExecutor, BatchResponse, FnBatchExecutor};
