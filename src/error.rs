use crate::error_code::ErrorKind;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Endpoint path the failing request targeted (e.g. "/api/traces")
    pub endpoint: Option<String>,
    /// HTTP method of the failing request
    pub method: Option<String>,
    /// Client-generated request id, also sent as `x-request-id`
    pub request_id: Option<String>,
    /// 1-based attempt number the error was observed on
    pub attempt: Option<u32>,
    /// Component that raised the error (e.g. "executor", "batcher", "config")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.endpoint.is_none()
            && self.method.is_none()
            && self.request_id.is_none()
            && self.attempt.is_none()
            && self.source.is_none()
    }
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let (Some(method), Some(endpoint)) = (&ctx.method, &ctx.endpoint) {
        parts.push(format!("{} {}", method, endpoint));
    } else if let Some(ref endpoint) = ctx.endpoint {
        parts.push(format!("endpoint: {}", endpoint));
    }
    if let Some(attempt) = ctx.attempt {
        parts.push(format!("attempt: {}", attempt));
    }
    if let Some(ref id) = ctx.request_id {
        parts.push(format!("request_id: {}", id));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

/// Shared, clonable underlying cause.
#[derive(Clone)]
pub struct Cause(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for Cause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// The single failure type surfaced by the SDK.
///
/// Callers should branch on [`Error::kind`], never on the message text.
/// The value is `Clone` so one classified failure can settle every pending
/// item of a batch.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}{}", format_context(.context))]
pub struct Error {
    pub kind: ErrorKind,
    /// HTTP status of the failing response; 0 when no response was received
    pub http_status: u16,
    pub message: String,
    /// Opaque `details` echoed from the error body
    pub details: Option<Value>,
    /// Seconds the backend asked the caller to wait (rate limiting)
    pub retry_after: Option<u64>,
    /// When a feature quota resets
    pub reset_at: Option<DateTime<Utc>>,
    pub context: ErrorContext,
    #[source]
    cause: Option<Cause>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            http_status: 0,
            message: message.into(),
            details: None,
            retry_after: None,
            reset_at: None,
            context: ErrorContext::new(),
            cause: None,
        }
    }

    /// Error of `kind` carrying the kind's default message.
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind, kind.message())
    }

    pub fn missing_credential() -> Self {
        Self::from_kind(ErrorKind::MissingCredential)
            .with_context(ErrorContext::new().with_source("config"))
    }

    pub fn missing_organization() -> Self {
        Self::from_kind(ErrorKind::MissingOrganization)
    }

    /// Locally detected invalid input or configuration.
    pub fn validation(msg: impl Into<String>, context: ErrorContext) -> Self {
        Self::new(ErrorKind::ValidationError, msg).with_context(context)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = status;
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }

    pub fn with_reset_at(mut self, at: DateTime<Utc>) -> Self {
        self.reset_at = Some(at);
        self
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Cause(Arc::new(cause)));
        self
    }

    /// Stable wire code of the kind (e.g. `RATE_LIMIT_EXCEEDED`).
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn retryable(&self) -> bool {
        self.kind.retryable()
    }

    pub fn documentation(&self) -> String {
        self.kind.documentation()
    }

    pub fn solutions(&self) -> &'static [&'static str] {
        self.kind.solutions()
    }

    /// Multi-line report with documentation link, numbered solutions and
    /// retry/reset hints.
    pub fn detailed_message(&self) -> String {
        let mut out = format!("{}: {}", self.code(), self.message);
        if !self.context.is_empty() {
            out.push_str(&format_context(&self.context));
        }
        out.push_str(&format!("\n\nDocumentation: {}", self.documentation()));
        out.push_str("\n\nSolutions:");
        for (i, s) in self.solutions().iter().enumerate() {
            out.push_str(&format!("\n  {}. {}", i + 1, s));
        }
        if let Some(secs) = self.retry_after {
            out.push_str(&format!("\n\nRetry after: {} seconds", secs));
        }
        if let Some(at) = self.reset_at {
            out.push_str(&format!("\n\nLimit resets at: {}", at.to_rfc3339()));
        }
        out
    }

    /// Structured report of the error, suitable for logging sinks.
    pub fn to_json(&self) -> Value {
        json!({
            "name": "EvalAIError",
            "code": self.code(),
            "kind": self.kind,
            "message": self.message,
            "statusCode": self.http_status,
            "details": self.details,
            "retryable": self.retryable(),
            "retryAfter": self.retry_after,
            "resetAt": self.reset_at.map(|t| t.to_rfc3339()),
            "documentation": self.documentation(),
            "solutions": self.solutions(),
            "endpoint": self.context.endpoint,
            "requestId": self.context.request_id,
        })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::new(ErrorKind::Unknown, format!("Failed to decode response: {}", e))
            .with_context(ErrorContext::new().with_source("json"))
            .with_cause(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_includes_code_and_context() {
        let err = Error::from_kind(ErrorKind::NotFound).with_status(404).with_context(
            ErrorContext::new()
                .with_method("GET")
                .with_endpoint("/api/traces/9")
                .with_attempt(1),
        );
        assert_eq!(
            err.to_string(),
            "NOT_FOUND: Resource not found (GET /api/traces/9, attempt: 1)"
        );
    }

    #[test]
    fn test_detailed_message_lists_solutions() {
        let err = Error::from_kind(ErrorKind::RateLimited).with_retry_after(2);
        let text = err.detailed_message();
        assert!(text.starts_with("RATE_LIMIT_EXCEEDED: Rate limit exceeded"));
        assert!(text.contains("Documentation: https://docs.ai-eval-platform.com/errors/rate-limit"));
        assert!(text.contains("  1. Wait before retrying"));
        assert!(text.contains("Retry after: 2 seconds"));
    }

    #[test]
    fn test_to_json_shape() {
        let err = Error::new(ErrorKind::ValidationError, "name is required")
            .with_status(422)
            .with_details(json!({"field": "name"}));
        let v = err.to_json();
        assert_eq!(v["code"], "VALIDATION_ERROR");
        assert_eq!(v["kind"], "validation_error");
        assert_eq!(v["statusCode"], 422);
        assert_eq!(v["details"]["field"], "name");
        assert_eq!(v["retryable"], false);
    }

    #[test]
    fn test_cause_is_exposed_as_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = Error::from_kind(ErrorKind::NetworkError).with_cause(io);
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("reset by peer"));
        let cloned = err.clone();
        assert!(cloned.source().is_some());
    }

    #[test]
    fn test_json_decode_error_is_unknown() {
        let e = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err: Error = e.into();
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert!(!err.retryable());
    }
}
