//! Error classification logic
//!
//! Turns a failed response (status + parsed body + headers) or a transport
//! failure into a typed [`Error`].

use crate::error_code::ErrorKind;
use crate::transport::TransportError;
use crate::Error;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Classify a non-success HTTP response.
///
/// An explicit `code` in the body wins over the status mapping. The message
/// is taken from `error`, then `message`, then the status reason phrase.
pub fn classify_response(
    status: u16,
    body: &Value,
    headers: Option<&HashMap<String, String>>,
) -> Error {
    let kind = body
        .get("code")
        .and_then(Value::as_str)
        .map(ErrorKind::from_code)
        .unwrap_or_else(|| ErrorKind::from_http_status(status));

    let mut err = Error::new(kind, message_from_body(status, body)).with_status(status);
    if let Some(details) = body.get("details").filter(|d| !d.is_null()) {
        err = err.with_details(details.clone());
    }

    match kind {
        ErrorKind::RateLimited => {
            if let Some(secs) = retry_after_secs(body, headers) {
                err = err.with_retry_after(secs);
            }
        }
        ErrorKind::FeatureLimitReached => {
            if let Some(at) = body.pointer("/details/resetAt").and_then(parse_reset_at) {
                err = err.with_reset_at(at);
            }
        }
        _ => {}
    }
    err
}

/// Classify a failure that never produced an HTTP response.
pub fn classify_transport(err: TransportError) -> Error {
    if err.is_timeout() {
        return Error::from_kind(ErrorKind::Timeout).with_status(408).with_cause(err);
    }
    Error::new(ErrorKind::NetworkError, format!("Network request failed: {}", err))
        .with_status(0)
        .with_cause(err)
}

/// The local per-attempt deadline expired.
pub fn timeout_error(after: Duration) -> Error {
    Error::new(
        ErrorKind::Timeout,
        format!("Request timed out after {}ms", after.as_millis()),
    )
    .with_status(408)
}

fn message_from_body(status: u16, body: &Value) -> String {
    let from = |field: &str| -> Option<String> {
        match body.get(field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(o) => o.get("message").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    };
    from("error")
        .or_else(|| from("message"))
        .unwrap_or_else(|| reason_phrase(status))
}

fn reason_phrase(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {}", status))
}

fn retry_after_secs(body: &Value, headers: Option<&HashMap<String, String>>) -> Option<u64> {
    let from_body = body
        .pointer("/details/retryAfter")
        .or_else(|| body.get("retryAfter"))
        .or_else(|| body.get("retry_after"))
        .and_then(as_secs);
    from_body.or_else(|| {
        headers?
            .get("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
    })
}

fn as_secs(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.ceil() as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_reset_at(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|d| d.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}
