//! Caller-side bulk helpers.
//!
//! Unlike [`RequestBatcher`](super::RequestBatcher), nothing here coalesces
//! wire requests. These helpers drive many independent calls in chunks,
//! report progress and collect failures instead of stopping at the first one.

use crate::{Error, Result};
use futures::future::join_all;
use futures::stream::{self, Stream};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Reported after every finished chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub total: usize,
    /// Items settled so far, successful or not.
    pub completed: usize,
    pub failed: usize,
    /// 1-based number of the chunk just finished.
    pub batch: usize,
    pub total_batches: usize,
}

/// One item that failed, with its position.
#[derive(Debug, Clone)]
pub struct BatchFailure<T> {
    /// 0-based chunk number.
    pub batch: usize,
    /// Position inside the chunk.
    pub index: usize,
    pub item: T,
    pub error: Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct BatchResult<T, R> {
    /// Outputs of the successful items, in input order.
    pub successful: Vec<R>,
    pub failed: Vec<BatchFailure<T>>,
    pub summary: BatchSummary,
}

type ProgressFn = Arc<dyn Fn(&BatchProgress) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(usize, usize, &Error) + Send + Sync>;

/// Options for [`batch_process`].
#[derive(Clone)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Run the items of a chunk concurrently instead of one by one.
    pub parallel: bool,
    /// Pause between chunks; not applied after the last one.
    pub delay: Duration,
    pub continue_on_error: bool,
    on_progress: Option<ProgressFn>,
    on_error: Option<ErrorFn>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_CHUNK_SIZE,
            parallel: true,
            delay: Duration::ZERO,
            continue_on_error: true,
            on_progress: None,
            on_error: None,
        }
    }
}

impl fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("batch_size", &self.batch_size)
            .field("parallel", &self.parallel)
            .field("delay", &self.delay)
            .field("continue_on_error", &self.continue_on_error)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Stop after the chunk holding the first failure and return that error.
    pub fn stop_on_error(mut self) -> Self {
        self.continue_on_error = false;
        self
    }

    pub fn on_progress(mut self, f: impl Fn(&BatchProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    /// Called with `(chunk, index, error)` for every failed item.
    pub fn on_error(mut self, f: impl Fn(usize, usize, &Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

/// Split `items` into consecutive chunks of `size`; the last may be shorter.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

/// Run `processor` over `items` chunk by chunk.
///
/// Every item of a chunk settles before the next chunk starts. With
/// `continue_on_error` off, the first failure is returned once its chunk has
/// settled and later chunks never start.
pub async fn batch_process<T, R, F, Fut>(
    items: Vec<T>,
    processor: F,
    options: &BatchOptions,
) -> Result<BatchResult<T, R>>
where
    T: Clone,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let total = items.len();
    let size = options.batch_size.max(1);
    let total_batches = (total + size - 1) / size;
    let mut result = BatchResult {
        successful: Vec::with_capacity(total),
        failed: Vec::new(),
        summary: BatchSummary {
            total,
            ..Default::default()
        },
    };

    let mut rest = items.into_iter();
    for batch in 0..total_batches {
        let chunk: Vec<T> = rest.by_ref().take(size).collect();
        let outcomes = if options.parallel {
            join_all(chunk.iter().cloned().map(&processor)).await
        } else {
            let mut out = Vec::with_capacity(chunk.len());
            for item in chunk.iter().cloned() {
                out.push(processor(item).await);
            }
            out
        };

        let mut abort = None;
        for (index, (item, outcome)) in chunk.into_iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(output) => {
                    result.successful.push(output);
                    result.summary.successful += 1;
                }
                Err(error) => {
                    if let Some(f) = &options.on_error {
                        f(batch, index, &error);
                    }
                    if !options.continue_on_error && abort.is_none() {
                        abort = Some(error.clone());
                    }
                    result.failed.push(BatchFailure { batch, index, item, error });
                    result.summary.failed += 1;
                }
            }
        }
        if let Some(error) = abort {
            debug!(batch = batch + 1, total_batches, "bulk run stopped on error");
            return Err(error);
        }

        let progress = BatchProgress {
            total,
            completed: result.summary.successful + result.summary.failed,
            failed: result.summary.failed,
            batch: batch + 1,
            total_batches,
        };
        debug!(
            batch = progress.batch,
            total_batches,
            completed = progress.completed,
            failed = progress.failed,
            "bulk chunk finished"
        );
        if let Some(f) = &options.on_progress {
            f(&progress);
        }

        if !options.delay.is_zero() && batch + 1 < total_batches {
            tokio::time::sleep(options.delay).await;
        }
    }
    Ok(result)
}

/// Outcome of one case from [`stream_cases`].
#[derive(Debug)]
pub struct CaseOutcome<T, R> {
    /// `case-<index>`
    pub case_id: String,
    pub case: T,
    pub result: Result<R>,
    pub completed: usize,
    pub total: usize,
}

impl<T, R> CaseOutcome<T, R> {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `executor` over `cases` one at a time, yielding each outcome as it
/// finishes. A failing case is yielded like any other; the stream goes on.
pub fn stream_cases<T, R, F, Fut>(cases: Vec<T>, executor: F) -> impl Stream<Item = CaseOutcome<T, R>>
where
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let total = cases.len();
    stream::unfold((cases.into_iter().enumerate(), executor), move |(mut iter, mut exec)| async move {
        let (index, case) = iter.next()?;
        let result = exec(case.clone()).await;
        let outcome = CaseOutcome {
            case_id: format!("case-{}", index),
            case,
            result,
            completed: index + 1,
            total,
        };
        Some((outcome, (iter, exec)))
    })
}
