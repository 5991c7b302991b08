//! Which responses are cached, and for how long.

use std::time::Duration;

/// Standard time-to-live tiers.
pub struct CacheTtl;

impl CacheTtl {
    pub const SHORT: Duration = Duration::from_secs(30);
    pub const MEDIUM: Duration = Duration::from_secs(5 * 60);
    pub const LONG: Duration = Duration::from_secs(30 * 60);
    pub const HOUR: Duration = Duration::from_secs(60 * 60);
}

const NO_CACHE: &[&str] = &["/health", "/usage", "/deliveries"];

/// Only reads are cached; volatile endpoints are never cached.
pub fn should_cache(method: &str, endpoint: &str) -> bool {
    method.eq_ignore_ascii_case("GET") && !NO_CACHE.iter().any(|p| endpoint.contains(p))
}

/// TTL for a cached response of `endpoint`.
pub fn ttl_for(endpoint: &str) -> Duration {
    if endpoint.contains("/api-keys") || endpoint.contains("/webhooks") {
        CacheTtl::LONG
    } else if endpoint.contains("/evaluations") || endpoint.contains("/configs") {
        CacheTtl::MEDIUM
    } else if endpoint.contains("/traces") || endpoint.contains("/results") {
        CacheTtl::SHORT
    } else {
        CacheTtl::MEDIUM
    }
}

/// Resource prefix invalidated by a mutation of `endpoint`.
///
/// `/api/traces/42/spans?x=1` → `/api/traces`. Paths outside `/api` fall back
/// to their first segment.
pub fn resource_prefix(endpoint: &str) -> String {
    let path = endpoint.split(&['?', '#'][..]).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => "/".to_string(),
        ["api", resource, ..] => format!("/api/{}", resource),
        [first, ..] => format!("/{}", first),
    }
}
