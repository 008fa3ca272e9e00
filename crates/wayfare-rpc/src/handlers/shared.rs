//! Shared handler utilities used across RPC methods.

use serde_json::Value;
use wayfare_core::{CacheParams, WayfareError};

/// Extract an optional parameter, supporting both snake_case and camelCase.
pub(crate) fn get_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a Value> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .filter(|v| !v.is_null())
}

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    get_param(params, snake, camel).and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
pub(crate) fn require_str_param(
    params: &Value,
    snake: &str,
    camel: &str,
) -> wayfare_core::Result<String> {
    get_str_param(params, snake, camel)
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
        .ok_or_else(|| WayfareError::InvalidParams {
            message: format!("Missing required parameter: {}", snake),
        })
}

/// Extract the request parameters a cache entry is keyed on.
///
/// A missing `params` object means "no parameters".
pub(crate) fn cache_params(params: &Value) -> wayfare_core::Result<CacheParams> {
    match get_param(params, "params", "params") {
        Some(value) => CacheParams::from_json(value),
        None => Ok(CacheParams::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_and_camel_case() {
        let snake = json!({"ttl_seconds": 60});
        let camel = json!({"ttlSeconds": 30});

        assert_eq!(get_param(&snake, "ttl_seconds", "ttlSeconds"), Some(&json!(60)));
        assert_eq!(get_param(&camel, "ttl_seconds", "ttlSeconds"), Some(&json!(30)));
        assert_eq!(get_param(&json!({"ttl_seconds": null}), "ttl_seconds", "ttlSeconds"), None);
    }

    #[test]
    fn test_require_str_param() {
        let params = json!({"endpoint": "hotels", "blank": "  "});

        assert_eq!(
            require_str_param(&params, "endpoint", "endpoint").unwrap(),
            "hotels"
        );
        assert!(matches!(
            require_str_param(&params, "blank", "blank"),
            Err(WayfareError::InvalidParams { .. })
        ));
        assert!(require_str_param(&params, "missing", "missing").is_err());
    }

    #[test]
    fn test_cache_params() {
        let params = cache_params(&json!({"params": {"keyword": "paris", "max": 5}})).unwrap();
        assert_eq!(params.len(), 2);

        assert!(cache_params(&json!({})).unwrap().is_empty());
        assert!(cache_params(&json!({"params": null})).unwrap().is_empty());
        assert!(cache_params(&json!({"params": {"nested": {"a": 1}}})).is_err());
    }
}
