//! JSON parsing and serialization, and conversions to/from
//! [`monarch_core::Value`] so event payloads and config trees can move
//! through JSON without a bespoke encoder.

use std::collections::BTreeMap;

use monarch_core::Value;
use serde_json::Value as JsonValue;

#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("JSON number {0} has no exact integer representation")]
    LossyNumber(serde_json::Number),
}

pub struct Json;

impl Json {
    pub fn parse(text: &str) -> Result<Value, JsonError> {
        let json: JsonValue = serde_json::from_str(text)?;
        to_value(&json)
    }

    pub fn stringify(value: &Value) -> String {
        serde_json::to_string(&from_value(value)).expect("Value always converts to valid JSON")
    }

    pub fn stringify_pretty(value: &Value) -> String {
        serde_json::to_string_pretty(&from_value(value))
            .expect("Value always converts to valid JSON")
    }
}

/// Converts a `serde_json::Value` into a [`Value`]. Fails only on numbers
/// with no exact `i64` representation (floats, or integers out of range),
/// since [`Value`] has no numeric type besides `Int`.
pub fn to_value(json: &JsonValue) -> Result<Value, JsonError> {
    Ok(match json {
        JsonValue::Null => Value::Map(BTreeMap::new()),
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| JsonError::LossyNumber(n.clone()))?,
        JsonValue::String(s) => Value::Str(s.clone()),
        JsonValue::Array(items) => {
            Value::Array(items.iter().map(to_value).collect::<Result<_, _>>()?)
        }
        JsonValue::Object(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k.clone(), to_value(v)?);
            }
            Value::Map(out)
        }
    })
}

/// Converts a [`Value`] into a `serde_json::Value`; always succeeds,
/// since every `Value` variant has a direct JSON equivalent.
pub fn from_value(value: &Value) -> JsonValue {
    match value {
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => JsonValue::Number((*i).into()),
        Value::Str(s) => JsonValue::String(s.clone()),
        Value::Map(map) => {
            JsonValue::Object(map.iter().map(|(k, v)| (k.clone(), from_value(v))).collect())
        }
        Value::Array(items) => JsonValue::Array(items.iter().map(from_value).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_then_stringify_round_trips_scalars() {
        let value = Json::parse(r#"{"a":1,"b":true,"c":"x"}"#).unwrap();
        assert_eq!(value.get_path("a"), Some(&Value::Int(1)));
        assert_eq!(value.get_path("b"), Some(&Value::Bool(true)));
        assert_eq!(value.get_path("c"), Some(&Value::Str("x".into())));
    }

    #[test]
    fn parse_rejects_non_exact_float() {
        let err = Json::parse(r#"{"a":1.5}"#).unwrap_err();
        assert!(matches!(err, JsonError::LossyNumber(_)));
    }

    #[test]
    fn stringify_nested_array() {
        let value = Value::Array(vec![Value::Int(1), Value::Str("x".into())]);
        assert_eq!(Json::stringify(&value), r#"[1,"x"]"#);
    }
}
