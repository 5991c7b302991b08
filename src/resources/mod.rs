//! 资源接口：按业务领域划分的 API 访问视图。
//!
//! Resource facades.
//!
//! Each facade is a borrowing view over a [`Client`](crate::Client), obtained
//! through `client.traces()`, `client.evaluations()` and so on. Every call is
//! routed through [`Client::request`](crate::Client::request), so caching,
//! batching, rate limiting and retries apply uniformly.

mod annotations;
mod developer;
mod evaluations;
mod llm_judge;
mod organizations;
mod traces;

pub use annotations::{AnnotationItems, AnnotationTasks, Annotations};
pub use developer::{ApiKeys, Developer, Webhooks};
pub use evaluations::Evaluations;
pub use llm_judge::LlmJudge;
pub use organizations::Organizations;
pub use traces::Traces;

use crate::context::{merge_with_context, ContextMetadata};
use crate::Result;
use serde::Serialize;
use serde_json::Value;

/// Ambient context with `explicit` merged on top, explicit keys winning.
/// `None` when there is neither.
pub(crate) fn with_ambient(explicit: Option<ContextMetadata>) -> Option<ContextMetadata> {
    let merged = merge_with_context(explicit.as_ref());
    if merged.is_empty() && explicit.is_none() {
        None
    } else {
        Some(merged)
    }
}

/// Append the non-null fields of `params` to `path` as a query string.
/// Keys come out in sorted order.
pub(crate) fn with_query<P: Serialize>(path: &str, params: &P) -> Result<String> {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    let mut empty = true;
    if let Value::Object(map) = serde_json::to_value(params)? {
        for (key, value) in map {
            let value = match value {
                Value::Null => continue,
                Value::String(s) => s,
                other => other.to_string(),
            };
            query.append_pair(&key, &value);
            empty = false;
        }
    }
    if empty {
        return Ok(path.to_string());
    }
    Ok(format!("{}?{}", path, query.finish()))
}
