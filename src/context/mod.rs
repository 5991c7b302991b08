//! 上下文传播：在嵌套异步调用间隐式传递键值元数据。
//!
//! # Context Propagation
//!
//! An ambient key/value bag that follows a call subtree without being passed
//! as a parameter. Frames nest: the visible metadata is the deep merge of all
//! enclosing frames, innermost winning. A frame is gone once its scope exits,
//! including on error or panic.
//!
//! ```rust
//! use evalai_sdk::context::{current_context, to_metadata, with_context};
//! use serde_json::json;
//!
//! # async fn demo() {
//! with_context(to_metadata(json!({"user_id": "123"})), async {
//!     with_context(to_metadata(json!({"request_id": "req-456"})), async {
//!         let ctx = current_context().unwrap();
//!         assert_eq!(ctx["user_id"], "123");
//!         assert_eq!(ctx["request_id"], "req-456");
//!     })
//!     .await;
//! })
//! .await;
//! # }
//! ```
//!
//! The storage backend is chosen once per process: a tokio task-local when the
//! first use happens inside a runtime, a thread-local stack otherwise. Call
//! [`install_context_store`] before first use to pick explicitly.

mod store;

pub use store::{ContextBackend, ContextStore, Scoped, StackStore, TaskLocalStore};

use crate::{Error, ErrorContext, Result};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::future::Future;

pub type ContextMetadata = Map<String, Value>;

static BACKEND: OnceCell<ContextBackend> = OnceCell::new();

fn backend() -> &'static ContextBackend {
    BACKEND.get_or_init(ContextBackend::detect)
}

/// Pick the process-wide store. Fails once any context API has been used.
pub fn install_context_store(store: ContextBackend) -> Result<()> {
    BACKEND.set(store).map_err(|_| {
        Error::validation(
            "context store already initialized",
            ErrorContext::new().with_source("context"),
        )
    })
}

/// Name of the active store (`"task_local"` or `"stack"`).
pub fn context_store_name() -> &'static str {
    backend().name()
}

/// Object metadata from a JSON value; non-objects yield an empty map.
pub fn to_metadata(value: Value) -> ContextMetadata {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Recursively merge `overlay` into `base`. Nested objects merge key by key;
/// any other value in `overlay` replaces the one in `base`.
pub fn deep_merge(base: &mut ContextMetadata, overlay: &ContextMetadata) {
    for (k, v) in overlay {
        match (base.get_mut(k), v) {
            (Some(Value::Object(dst)), Value::Object(src)) => deep_merge(dst, src),
            _ => {
                base.insert(k.clone(), v.clone());
            }
        }
    }
}

fn enter(metadata: &ContextMetadata) -> ContextMetadata {
    let mut merged = current_context().unwrap_or_default();
    deep_merge(&mut merged, metadata);
    merged
}

/// A reusable bundle of metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    metadata: ContextMetadata,
}

impl EvalContext {
    pub fn new(metadata: ContextMetadata) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &ContextMetadata {
        &self.metadata
    }

    /// Run `fut` with this context layered over any enclosing one.
    pub fn run<F: Future>(&self, fut: F) -> Scoped<F> {
        backend().scope(enter(&self.metadata), fut)
    }

    pub fn run_sync<R>(&self, f: impl FnOnce() -> R) -> R {
        backend().run_sync(enter(&self.metadata), f)
    }

    /// New context with `extra` merged over this one's metadata.
    pub fn with(&self, extra: ContextMetadata) -> EvalContext {
        let mut metadata = self.metadata.clone();
        deep_merge(&mut metadata, &extra);
        EvalContext { metadata }
    }
}

pub fn create_context(metadata: ContextMetadata) -> EvalContext {
    EvalContext::new(metadata)
}

pub fn with_context<F: Future>(metadata: ContextMetadata, fut: F) -> Scoped<F> {
    backend().scope(enter(&metadata), fut)
}

pub fn with_context_sync<R>(metadata: ContextMetadata, f: impl FnOnce() -> R) -> R {
    backend().run_sync(enter(&metadata), f)
}

/// Metadata of the innermost active frame, if any.
pub fn current_context() -> Option<ContextMetadata> {
    backend().current()
}

/// Ambient metadata with `explicit` merged on top (explicit wins).
pub fn merge_with_context(explicit: Option<&ContextMetadata>) -> ContextMetadata {
    let mut merged = current_context().unwrap_or_default();
    if let Some(extra) = explicit {
        deep_merge(&mut merged, extra);
    }
    merged
}
