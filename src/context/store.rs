//! Storage backends for ambient context frames.

use super::ContextMetadata;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::futures::TaskLocalFuture;

/// A fully merged, immutable frame.
pub(crate) type Frame = Arc<ContextMetadata>;

/// Where the active context frame lives while a call subtree runs.
///
/// The trait is generic over the scoped computation, so it is used through
/// concrete types or [`ContextBackend`] rather than as a trait object.
pub trait ContextStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Metadata of the innermost active frame.
    fn current(&self) -> Option<ContextMetadata>;

    /// Run `f` with `frame` active; the frame is gone when `f` returns or unwinds.
    fn run_sync<R>(&self, frame: ContextMetadata, f: impl FnOnce() -> R) -> R
    where
        Self: Sized;

    /// Wrap `fut` so `frame` is active whenever it is polled.
    fn scope<F: Future>(&self, frame: ContextMetadata, fut: F) -> Scoped<F>
    where
        Self: Sized;
}

tokio::task_local! {
    static TASK_FRAME: Frame;
}

/// Frames carried by a tokio task-local; follows a future across suspension
/// points and worker threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocalStore;

impl ContextStore for TaskLocalStore {
    fn name(&self) -> &'static str {
        "task_local"
    }

    fn current(&self) -> Option<ContextMetadata> {
        TASK_FRAME.try_with(|f| (**f).clone()).ok()
    }

    fn run_sync<R>(&self, frame: ContextMetadata, f: impl FnOnce() -> R) -> R {
        TASK_FRAME.sync_scope(Arc::new(frame), f)
    }

    fn scope<F: Future>(&self, frame: ContextMetadata, fut: F) -> Scoped<F> {
        Scoped {
            inner: ScopedInner::TaskLocal(Box::pin(TASK_FRAME.scope(Arc::new(frame), fut))),
        }
    }
}

thread_local! {
    static STACK: RefCell<Vec<(u64, Frame)>> = const { RefCell::new(Vec::new()) };
}

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

struct StackGuard(u64);

impl StackGuard {
    fn push(frame: Frame) -> Self {
        let id = NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed);
        STACK.with(|s| s.borrow_mut().push((id, frame)));
        Self(id)
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        let id = self.0;
        let _ = STACK.try_with(|s| {
            let mut s = s.borrow_mut();
            if let Some(pos) = s.iter().rposition(|(fid, _)| *fid == id) {
                s.remove(pos);
            }
        });
    }
}

/// Frames kept on a per-thread stack.
///
/// Usable without a tokio runtime. A scoped future pushes its frame only for
/// the duration of each poll, so scoped futures joined on one thread keep
/// their own frames.
///
/// Not sound wherever a frame has to outlive a poll:
/// - tasks spawned from inside a scope do not inherit it, and may run on a
///   thread whose stack holds someone else's frames;
/// - a [`run_sync`](ContextStore::run_sync) frame stays on the thread's stack
///   until the closure returns, so any future polled inside it (for example
///   through `block_on`) sees that frame as ambient context.
///
/// Prefer [`TaskLocalStore`] inside a runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackStore;

impl ContextStore for StackStore {
    fn name(&self) -> &'static str {
        "stack"
    }

    fn current(&self) -> Option<ContextMetadata> {
        STACK.with(|s| s.borrow().last().map(|(_, f)| (**f).clone()))
    }

    fn run_sync<R>(&self, frame: ContextMetadata, f: impl FnOnce() -> R) -> R {
        let _guard = StackGuard::push(Arc::new(frame));
        f()
    }

    fn scope<F: Future>(&self, frame: ContextMetadata, fut: F) -> Scoped<F> {
        Scoped {
            inner: ScopedInner::Stack {
                frame: Arc::new(frame),
                fut: Box::pin(fut),
            },
        }
    }
}

/// The process-wide store, picked once.
#[derive(Debug, Clone, Copy)]
pub enum ContextBackend {
    TaskLocal(TaskLocalStore),
    Stack(StackStore),
}

impl ContextBackend {
    /// Task-local inside a tokio runtime, thread-local stack otherwise.
    pub fn detect() -> Self {
        if tokio::runtime::Handle::try_current().is_ok() {
            Self::TaskLocal(TaskLocalStore)
        } else {
            Self::Stack(StackStore)
        }
    }
}

impl ContextStore for ContextBackend {
    fn name(&self) -> &'static str {
        match self {
            Self::TaskLocal(s) => s.name(),
            Self::Stack(s) => s.name(),
        }
    }

    fn current(&self) -> Option<ContextMetadata> {
        match self {
            Self::TaskLocal(s) => s.current(),
            Self::Stack(s) => s.current(),
        }
    }

    fn run_sync<R>(&self, frame: ContextMetadata, f: impl FnOnce() -> R) -> R {
        match self {
            Self::TaskLocal(s) => s.run_sync(frame, f),
            Self::Stack(s) => s.run_sync(frame, f),
        }
    }

    fn scope<F: Future>(&self, frame: ContextMetadata, fut: F) -> Scoped<F> {
        match self {
            Self::TaskLocal(s) => s.scope(frame, fut),
            Self::Stack(s) => s.scope(frame, fut),
        }
    }
}

/// Future returned by [`ContextStore::scope`].
pub struct Scoped<F: Future> {
    inner: ScopedInner<F>,
}

enum ScopedInner<F: Future> {
    TaskLocal(Pin<Box<TaskLocalFuture<Frame, F>>>),
    Stack { frame: Frame, fut: Pin<Box<F>> },
}

impl<F: Future> Future for Scoped<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            ScopedInner::TaskLocal(fut) => fut.as_mut().poll(cx),
            ScopedInner::Stack { frame, fut } => {
                let _guard = StackGuard::push(frame.clone());
                fut.as_mut().poll(cx)
            }
        }
    }
}
