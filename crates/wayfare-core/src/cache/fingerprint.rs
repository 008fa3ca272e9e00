//! Request parameters and the content-addressed cache key derived from them.
//!
//! A fingerprint is `sha256(endpoint + ":" + json(sorted params))`, hex encoded.
//! Parameters are a flat map of scalars; the map is kept sorted at all times
//! so insertion order never reaches the digest.

use crate::error::{Result, WayfareError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Number(Number),
    Bool(bool),
}

impl ParamValue {
    fn to_json(&self) -> Value {
        match self {
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Number(n) => Value::Number(n.clone()),
            ParamValue::Bool(b) => Value::Bool(*b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Number(value.into())
    }
}

impl TryFrom<f64> for ParamValue {
    type Error = WayfareError;

    /// Integral floats are stored as integers so `20.0` and `20` hash alike,
    /// the same way a JavaScript caller would serialize them.
    fn try_from(value: f64) -> Result<Self> {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            return Ok(ParamValue::Number((value as i64).into()));
        }
        Number::from_f64(value)
            .map(ParamValue::Number)
            .ok_or_else(|| WayfareError::Validation {
                field: "params".into(),
                message: format!("{} is not a finite number", value),
            })
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => f.write_str(s),
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Flat, order-independent request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheParams(BTreeMap<String, ParamValue>);

impl CacheParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build parameters from an untyped JSON value.
    ///
    /// Only an object whose values are strings, numbers or booleans is accepted;
    /// `null`, arrays and nested objects are rejected rather than serialized
    /// implicitly.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| WayfareError::Validation {
            field: "params".into(),
            message: format!("expected an object, got {}", json_kind(value)),
        })?;

        let mut params = CacheParams::new();
        for (key, value) in object {
            let scalar = match value {
                Value::String(s) => ParamValue::String(s.clone()),
                Value::Number(n) => match n.as_f64() {
                    // Same canonical form as TryFrom<f64>, so 20.0 and 20 collide
                    Some(f) if n.is_f64() => {
                        ParamValue::try_from(f).map_err(|_| WayfareError::Validation {
                            field: format!("params.{}", key),
                            message: format!("{} is not a finite number", f),
                        })?
                    }
                    _ => ParamValue::Number(n.clone()),
                },
                Value::Bool(b) => ParamValue::Bool(*b),
                other => {
                    return Err(WayfareError::Validation {
                        field: format!("params.{}", key),
                        message: format!(
                            "expected a string, number or boolean, got {}",
                            json_kind(other)
                        ),
                    })
                }
            };
            params.0.insert(key.clone(), scalar);
        }
        Ok(params)
    }

    /// The canonical JSON form: compact, keys in sorted order.
    pub fn to_canonical_json(&self) -> String {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map).to_string()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for CacheParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = CacheParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Stable identity of a cached provider response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint for an endpoint and its parameters.
    pub fn derive(endpoint: &str, params: &CacheParams) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        hasher.update(b":");
        hasher.update(params.to_canonical_json().as_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }

    /// Wrap a fingerprint previously read back from the store.
    pub(crate) fn from_stored(value: String) -> Self {
        Fingerprint(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_keys() {
        let params = CacheParams::new()
            .with("subType", "CITY,AIRPORT")
            .with("keyword", "paris")
            .with("page[limit]", 10);
        assert_eq!(
            params.to_canonical_json(),
            r#"{"keyword":"paris","page[limit]":10,"subType":"CITY,AIRPORT"}"#
        );
    }

    #[test]
    fn test_fingerprint_matches_known_digest() {
        // sha256 of `gemini:{"locationQuery":"Lisbon"}`
        let params = CacheParams::new().with("locationQuery", "Lisbon");
        let expected = {
            let mut h = Sha256::new();
            h.update(br#"gemini:{"locationQuery":"Lisbon"}"#);
            hex::encode(h.finalize())
        };
        assert_eq!(Fingerprint::derive("gemini", &params).as_str(), expected);
    }

    #[test]
    fn test_integral_float_json_matches_integer() {
        let float = CacheParams::from_json(&json!({"radius": 20.0})).unwrap();
        let integer = CacheParams::from_json(&json!({"radius": 20})).unwrap();
        let typed = CacheParams::new().with("radius", ParamValue::try_from(20.0).unwrap());

        assert_eq!(float.to_canonical_json(), r#"{"radius":20}"#);
        assert_eq!(
            Fingerprint::derive("hotels", &float),
            Fingerprint::derive("hotels", &integer)
        );
        assert_eq!(
            Fingerprint::derive("hotels", &float),
            Fingerprint::derive("hotels", &typed)
        );

        let fractional = CacheParams::from_json(&json!({"radius": 20.5})).unwrap();
        assert_eq!(fractional.to_canonical_json(), r#"{"radius":20.5}"#);
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = Fingerprint::derive("hotels", &CacheParams::new());
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp.as_str(), fp.as_str().to_lowercase());
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a: CacheParams = [("latitude", "41.39"), ("longitude", "2.17"), ("radius", "20")]
            .into_iter()
            .collect();
        let b: CacheParams = [("radius", "20"), ("latitude", "41.39"), ("longitude", "2.17")]
            .into_iter()
            .collect();
        assert_eq!(Fingerprint::derive("poi", &a), Fingerprint::derive("poi", &b));
    }

    #[test]
    fn test_value_types_are_distinguished() {
        let as_string = CacheParams::new().with("adults", "1");
        let as_number = CacheParams::new().with("adults", 1);
        assert_ne!(
            Fingerprint::derive("hotels", &as_string),
            Fingerprint::derive("hotels", &as_number)
        );
    }

    #[test]
    fn test_integral_float_hashes_like_integer() {
        let float = CacheParams::new().with("radius", ParamValue::try_from(20.0).unwrap());
        let int = CacheParams::new().with("radius", 20);
        assert_eq!(
            Fingerprint::derive("poi", &float),
            Fingerprint::derive("poi", &int)
        );
    }

    #[test]
    fn test_non_finite_float_rejected() {
        assert!(ParamValue::try_from(f64::NAN).is_err());
        assert!(ParamValue::try_from(f64::INFINITY).is_err());
        assert!(ParamValue::try_from(48.8566).is_ok());
    }

    #[test]
    fn test_from_json_accepts_flat_scalars() {
        let params = CacheParams::from_json(&json!({
            "cityCode": "PAR",
            "adults": 2,
            "nonStop": false
        }))
        .unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("cityCode"), Some(&ParamValue::from("PAR")));
        assert_eq!(params.get("adults"), Some(&ParamValue::from(2)));
        assert_eq!(params.get("nonStop"), Some(&ParamValue::from(false)));
    }

    #[test]
    fn test_from_json_rejects_nested_values() {
        let err = CacheParams::from_json(&json!({"geo": {"lat": 1}})).unwrap_err();
        assert!(matches!(err, WayfareError::Validation { ref field, .. } if field == "params.geo"));

        assert!(CacheParams::from_json(&json!({"tags": ["a", "b"]})).is_err());
        assert!(CacheParams::from_json(&json!({"returnDate": null})).is_err());
        assert!(CacheParams::from_json(&json!(["keyword", "paris"])).is_err());
    }

    #[test]
    fn test_serde_roundtrip_keeps_scalars() {
        let params = CacheParams::new()
            .with("keyword", "rome")
            .with("max", 20)
            .with("ssl", true);
        let text = serde_json::to_string(&params).unwrap();
        assert_eq!(text, params.to_canonical_json());
        let back: CacheParams = serde_json::from_str(&text).unwrap();
        assert_eq!(back, params);
    }
}
