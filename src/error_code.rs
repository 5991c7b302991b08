//! 错误分类：定义 SDK 的 12 种错误类型及其重试语义与修复建议。
//!
//! Error taxonomy of the platform API.
//!
//! Every failure the runtime surfaces is tagged with exactly one [`ErrorKind`].
//! The kind fixes the stable wire code, the documentation link, the remediation
//! suggestions and whether an automatic retry is sanctioned.
//!
//! | Kind                    | Wire code                 | Retryable |
//! |-------------------------|---------------------------|-----------|
//! | `missing_credential`    | `MISSING_API_KEY`         | no        |
//! | `missing_organization`  | `MISSING_ORGANIZATION_ID` | no        |
//! | `validation_error`      | `VALIDATION_ERROR`        | no        |
//! | `unauthorized`          | `UNAUTHORIZED`            | no        |
//! | `forbidden`             | `FORBIDDEN`               | no        |
//! | `not_found`             | `NOT_FOUND`               | no        |
//! | `rate_limited`          | `RATE_LIMIT_EXCEEDED`     | yes       |
//! | `timeout`               | `TIMEOUT`                 | yes       |
//! | `network_error`         | `NETWORK_ERROR`           | yes       |
//! | `internal_error`        | `INTERNAL_SERVER_ERROR`   | yes       |
//! | `feature_limit_reached` | `FEATURE_LIMIT_REACHED`   | no        |
//! | `unknown`               | `UNKNOWN_ERROR`           | no        |
//!
//! ## Example
//!
//! ```rust
//! use evalai_sdk::error_code::ErrorKind;
//!
//! let kind = ErrorKind::from_code("RATE_LIMIT_EXCEEDED");
//! assert_eq!(kind, ErrorKind::RateLimited);
//! assert!(kind.retryable());
//! assert_eq!(ErrorKind::from_http_status(404), ErrorKind::NotFound);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

const DOCS_BASE: &str = "https://docs.ai-eval-platform.com/errors";

/// Classification of an SDK failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No API key was configured
    MissingCredential,
    /// The operation needs an organization id and none was supplied
    MissingOrganization,
    /// The backend rejected the request payload (422)
    ValidationError,
    /// Invalid or expired credential (401)
    Unauthorized,
    /// Valid credential without access to the resource (403)
    Forbidden,
    /// Resource does not exist (404)
    NotFound,
    /// Request rate exceeded (429)
    RateLimited,
    /// The request did not complete in time (408 or local timer)
    Timeout,
    /// The request never produced an HTTP response
    NetworkError,
    /// Server-side failure (5xx)
    InternalError,
    /// Plan quota for a feature is used up
    FeatureLimitReached,
    /// Anything the classifier could not place
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 12] = [
        Self::MissingCredential,
        Self::MissingOrganization,
        Self::ValidationError,
        Self::Unauthorized,
        Self::Forbidden,
        Self::NotFound,
        Self::RateLimited,
        Self::Timeout,
        Self::NetworkError,
        Self::InternalError,
        Self::FeatureLimitReached,
        Self::Unknown,
    ];

    /// Stable wire code, as sent by the backend in `{ code }`.
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "MISSING_API_KEY",
            Self::MissingOrganization => "MISSING_ORGANIZATION_ID",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMIT_EXCEEDED",
            Self::Timeout => "TIMEOUT",
            Self::NetworkError => "NETWORK_ERROR",
            Self::InternalError => "INTERNAL_SERVER_ERROR",
            Self::FeatureLimitReached => "FEATURE_LIMIT_REACHED",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Snake-case name (e.g. `"rate_limited"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MissingOrganization => "missing_organization",
            Self::ValidationError => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::NetworkError => "network_error",
            Self::InternalError => "internal_error",
            Self::FeatureLimitReached => "feature_limit_reached",
            Self::Unknown => "unknown",
        }
    }

    /// Default human message for the kind.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingCredential => "API key is required to initialize the SDK",
            Self::MissingOrganization => "Organization ID is required for this operation",
            Self::ValidationError => "Request validation failed",
            Self::Unauthorized => "Authentication failed",
            Self::Forbidden => "Access forbidden",
            Self::NotFound => "Resource not found",
            Self::RateLimited => "Rate limit exceeded",
            Self::Timeout => "Request timed out",
            Self::NetworkError => "Network connectivity issue",
            Self::InternalError => "Internal server error",
            Self::FeatureLimitReached => "Feature usage limit reached",
            Self::Unknown => "Unknown error",
        }
    }

    /// Whether the runtime may retry this kind automatically.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout | Self::NetworkError | Self::InternalError
        )
    }

    /// Link to the documentation page for this kind.
    pub fn documentation(&self) -> String {
        let slug = match self {
            Self::MissingCredential => "missing-api-key",
            Self::MissingOrganization => "missing-org-id",
            Self::ValidationError => "validation",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not-found",
            Self::RateLimited => "rate-limit",
            Self::Timeout => "timeout",
            Self::NetworkError => "network",
            Self::InternalError => "server-error",
            Self::FeatureLimitReached => "feature-limit",
            Self::Unknown => return DOCS_BASE.to_string(),
        };
        format!("{}/{}", DOCS_BASE, slug)
    }

    /// Ordered remediation suggestions.
    pub fn solutions(&self) -> &'static [&'static str] {
        match self {
            Self::MissingCredential => &[
                "Set the EVALAI_API_KEY environment variable",
                "Pass the key explicitly: ClientBuilder::new().api_key(\"...\")",
                "Get an API key from https://platform.ai-eval-platform.com/settings/api-keys",
            ],
            Self::MissingOrganization => &[
                "Set the EVALAI_ORGANIZATION_ID environment variable",
                "Configure it on the client: ClientBuilder::new().organization_id(123)",
                "Pass organization_id in the method parameters",
            ],
            Self::ValidationError => &[
                "Check the error details for specific validation failures",
                "Verify all required fields are provided",
                "Ensure field types match the expected format",
            ],
            Self::Unauthorized => &[
                "Verify your API key is correct",
                "Check if your API key has expired",
                "Ensure your API key has the required permissions",
            ],
            Self::Forbidden => &[
                "Check if you have permission for this resource",
                "Verify you're using the correct organization ID",
                "Contact support if you believe this is an error",
            ],
            Self::NotFound => &[
                "Verify the resource ID is correct",
                "Check if the resource was deleted",
                "Ensure you're querying the correct organization",
            ],
            Self::RateLimited => &[
                "Wait before retrying (check retry_after)",
                "Upgrade your plan for higher rate limits",
                "Lower the client request rate with requests_per_second",
            ],
            Self::Timeout => &[
                "Increase the timeout: ClientBuilder::new().timeout(Duration::from_secs(60))",
                "Check your network connection",
                "The service may be experiencing high load",
            ],
            Self::NetworkError => &[
                "Check your internet connection",
                "Verify the base URL is correct",
                "Check if you can reach the API endpoint",
            ],
            Self::InternalError => &[
                "Retry the request after a brief delay",
                "Check status page: https://status.ai-eval-platform.com",
                "Contact support if the issue persists",
            ],
            Self::FeatureLimitReached => &[
                "Upgrade your plan for higher limits",
                "Wait for your usage to reset (check reset_at)",
                "Optimize your usage patterns",
            ],
            Self::Unknown => &["Check the API documentation for more information"],
        }
    }

    /// Maps a backend-supplied code to a kind.
    ///
    /// Accepts the wire codes (`"RATE_LIMIT_EXCEEDED"`) and the snake names
    /// (`"rate_limited"`), case-insensitively. Unrecognized codes map to
    /// [`ErrorKind::Unknown`].
    pub fn from_code(code: &str) -> Self {
        let normalized = code.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.code() == normalized || k.name().eq_ignore_ascii_case(code.trim()))
            .unwrap_or(Self::Unknown)
    }

    /// Maps an HTTP status to a kind when the body carries no explicit code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            408 => Self::Timeout,
            422 => Self::ValidationError,
            429 => Self::RateLimited,
            s if s >= 500 => Self::InternalError,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        let retryable: Vec<_> = ErrorKind::ALL.iter().filter(|k| k.retryable()).collect();
        assert_eq!(
            retryable,
            vec![
                &ErrorKind::RateLimited,
                &ErrorKind::Timeout,
                &ErrorKind::NetworkError,
                &ErrorKind::InternalError
            ]
        );
    }

    #[test]
    fn test_from_code_accepts_wire_and_snake_names() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_code(kind.code()), kind);
            assert_eq!(ErrorKind::from_code(kind.name()), kind);
        }
        assert_eq!(ErrorKind::from_code("rate_limit_exceeded"), ErrorKind::RateLimited);
        assert_eq!(ErrorKind::from_code("SOMETHING_NEW"), ErrorKind::Unknown);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::from_http_status(401), ErrorKind::Unauthorized);
        assert_eq!(ErrorKind::from_http_status(403), ErrorKind::Forbidden);
        assert_eq!(ErrorKind::from_http_status(408), ErrorKind::Timeout);
        assert_eq!(ErrorKind::from_http_status(422), ErrorKind::ValidationError);
        assert_eq!(ErrorKind::from_http_status(429), ErrorKind::RateLimited);
        assert_eq!(ErrorKind::from_http_status(503), ErrorKind::InternalError);
        assert_eq!(ErrorKind::from_http_status(400), ErrorKind::Unknown);
        assert_eq!(ErrorKind::from_http_status(409), ErrorKind::Unknown);
    }

    #[test]
    fn test_every_kind_has_remediation() {
        for kind in ErrorKind::ALL {
            assert!(!kind.solutions().is_empty(), "{} has no solutions", kind.name());
            assert!(kind.documentation().starts_with(DOCS_BASE));
        }
    }

    #[test]
    fn test_serde_uses_snake_names() {
        let json = serde_json::to_string(&ErrorKind::FeatureLimitReached).unwrap();
        assert_eq!(json, "\"feature_limit_reached\"");
        let back: ErrorKind = serde_json::from_str("\"network_error\"").unwrap();
        assert_eq!(back, ErrorKind::NetworkError);
    }
}
