//! Response wrapping for operator clients.
//!
//! Clients expect `{success: bool, ...data}`. Handlers return raw data and this
//! module shapes it per method.

use serde_json::{json, Value};

/// Wrap a handler result in the response shape expected for `method`.
pub fn wrap_response(method: &str, result: Value) -> Value {
    match method {
        "cache_stats" => {
            json!({
                "success": true,
                "stats": if result.is_null() { json!({}) } else { result }
            })
        }

        // Structured responses get a success flag merged in
        "cache_clear" | "cache_cleanup" | "cache_auto_cleanup" | "cache_get" | "cache_set" => {
            match result {
                Value::Object(mut obj) => {
                    obj.entry("success").or_insert(json!(true));
                    Value::Object(obj)
                }
                Value::Null => json!({"success": true}),
                other => json!({"success": true, "result": other}),
            }
        }

        _ => result,
    }
}
