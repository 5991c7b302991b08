//! Cache key generation.

use serde_json::Value;
use std::fmt;

/// Key of a cached response: `METHOD:url:serialized-params`.
///
/// Params are serialized with sorted object keys so two logically equal
/// parameter sets map to the same key. The key is kept in plain text so
/// invalidation can match on endpoint substrings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(method: &str, url: &str, params: Option<&Value>) -> Self {
        let params = params.map(canonical_json).unwrap_or_default();
        Self(format!("{}:{}:{}", method.to_ascii_uppercase(), url, params))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.0.contains(pattern)
    }
}

// serde_json::Map is BTreeMap-backed, so `to_string` already emits sorted keys.
fn canonical_json(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_format() {
        let k = CacheKey::new("get", "/api/traces", Some(&json!({"limit": 10})));
        assert_eq!(k.as_str(), "GET:/api/traces:{\"limit\":10}");
        let k = CacheKey::new("GET", "/api/traces/1", None);
        assert_eq!(k.as_str(), "GET:/api/traces/1:");
    }

    #[test]
    fn test_param_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"offset":0,"limit":5}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"limit":5,"offset":0}"#).unwrap();
        assert_eq!(
            CacheKey::new("GET", "/api/evaluations", Some(&a)),
            CacheKey::new("GET", "/api/evaluations", Some(&b))
        );
    }

    #[test]
    fn test_null_params_equal_absent() {
        assert_eq!(
            CacheKey::new("GET", "/x", Some(&Value::Null)),
            CacheKey::new("GET", "/x", None)
        );
    }
}
