//! The dynamically-typed value shared by [`crate::state::State`] variables
//! and [`crate::event::Event`] payloads: a sum type over the scalar and
//! structured shapes both need, rather than a class hierarchy.
//!
//! `State` only ever stores [`Value::Bool`], [`Value::Int`], or
//! [`Value::Str`] — `Map`/`Array` are rejected by `State::set` with
//! [`crate::error::Error::ProtocolMisuse`]. Event payloads use the full
//! range, since an event is a structured document, not a scalar cell.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    Map(BTreeMap<String, Value>),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up a dotted path (`"kernel.max_thread_count"`) through nested
    /// `Map`s, returning `None` as soon as a segment is missing or the
    /// value at that point isn't a map.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Map(_) => "map",
            Value::Array(_) => "array",
        }
    }

    /// Structural subset test used by event filters: every leaf in `filter`
    /// must equal the corresponding leaf in `self`.
    pub fn matches_filter(&self, filter: &Value) -> bool {
        match (self, filter) {
            (_, Value::Map(filter_map)) => match self.as_map() {
                Some(self_map) => filter_map
                    .iter()
                    .all(|(k, fv)| self_map.get(k).is_some_and(|sv| sv.matches_filter(fv))),
                None => false,
            },
            (a, b) => a == b,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_subset() {
        let mut event = BTreeMap::new();
        event.insert("type".to_string(), Value::Str("net.http.request".into()));
        event.insert("path".to_string(), Value::Str("/".into()));
        let event = Value::Map(event);

        let mut filter = BTreeMap::new();
        filter.insert("path".to_string(), Value::Str("/".into()));
        let filter = Value::Map(filter);

        assert!(event.matches_filter(&filter));
    }

    #[test]
    fn get_path_walks_nested_maps() {
        let mut inner = BTreeMap::new();
        inner.insert("max_thread_count".to_string(), Value::Int(8));
        let mut outer = BTreeMap::new();
        outer.insert("kernel".to_string(), Value::Map(inner));
        let value = Value::Map(outer);

        assert_eq!(
            value.get_path("kernel.max_thread_count"),
            Some(&Value::Int(8))
        );
        assert_eq!(value.get_path("kernel.missing"), None);
        assert_eq!(value.get_path("missing.max_thread_count"), None);
    }

    #[test]
    fn filter_rejects_mismatch() {
        let mut event = BTreeMap::new();
        event.insert("path".to_string(), Value::Str("/a".into()));
        let event = Value::Map(event);

        let mut filter = BTreeMap::new();
        filter.insert("path".to_string(), Value::Str("/b".into()));
        let filter = Value::Map(filter);

        assert!(!event.matches_filter(&filter));
    }
}
