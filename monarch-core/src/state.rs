//! Process-wide typed key/value store guarding operation admission.
//!
//! A variable's type may change on assignment, lookups are case-sensitive,
//! and getters report success/failure rather than throwing (absence and
//! type mismatch are both treated as "guard condition not satisfied" by
//! callers).

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Error;
use crate::value::Value;

/// A named, typed cell. Only [`Value::Bool`], [`Value::Int`], and
/// [`Value::Str`] are legal here; anything else is a caller bug.
#[derive(Default)]
pub struct State {
    vars: RwLock<HashMap<String, Value>>,
}

impl State {
    pub fn new() -> Self {
        State {
            vars: RwLock::new(HashMap::new()),
        }
    }

    /// Looks up a variable by name. Returns `None` if the variable does not
    /// exist; the caller cannot distinguish "absent" from "wrong type" here.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.read().unwrap().get(name).cloned()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_int())
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_str().map(str::to_owned))
    }

    /// Sets a variable, creating it if absent and overwriting its type if
    /// present. Rejects `Value::Map`/`Value::Array`: a state variable's type
    /// is one of {Bool, Int, String} per the data model, never a structured
    /// value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        if !matches!(value, Value::Bool(_) | Value::Int(_) | Value::Str(_)) {
            return Err(Error::ProtocolMisuse(format!(
                "state variables may only be bool, int, or string, got {}",
                value.kind()
            )));
        }
        self.vars.write().unwrap().insert(name.into(), value);
        Ok(())
    }

    pub fn remove(&self, name: &str) {
        self.vars.write().unwrap().remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.read().unwrap().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let state = State::new();
        state.set("ready", true).unwrap();
        assert_eq!(state.get_bool("ready"), Some(true));
    }

    #[test]
    fn get_is_case_sensitive() {
        let state = State::new();
        state.set("Ready", true).unwrap();
        assert_eq!(state.get_bool("ready"), None);
    }

    #[test]
    fn type_change_on_reassignment() {
        let state = State::new();
        state.set("x", 1i64).unwrap();
        assert_eq!(state.get_int("x"), Some(1));
        state.set("x", "now a string").unwrap();
        assert_eq!(state.get_int("x"), None);
        assert_eq!(state.get_str("x"), Some("now a string".to_string()));
    }

    #[test]
    fn remove_drops_variable() {
        let state = State::new();
        state.set("x", 1i64).unwrap();
        state.remove("x");
        assert!(!state.contains("x"));
    }

    #[test]
    fn set_rejects_structured_values() {
        let state = State::new();
        let err = state.set("x", Value::Array(vec![Value::Int(1)])).unwrap_err();
        assert!(matches!(err, Error::ProtocolMisuse(_)));
        assert!(!state.contains("x"));
    }
}
