//! Minimal prelude for application code.

pub use crate::client::{Client, ClientBuilder, ClientConfig, RequestOptions, RetryPolicy};
pub use crate::context::{create_context, with_context, ContextMetadata};
pub use crate::error::Error;
pub use crate::error_code::ErrorKind;
pub use crate::resilience::backoff::BackoffStrategy;
pub use crate::types::{CreateTraceParams, ListTracesParams, Trace, TraceStatus};
pub use crate::Result;
