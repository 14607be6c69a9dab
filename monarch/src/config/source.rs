//! The individual sources a [`super::ConfigManager`] merges: a TOML file,
//! a prefix-scoped slice of the process environment, and a compiled-in
//! defaults tree.

use std::collections::BTreeMap;
use std::path::PathBuf;

use monarch_core::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// One layer of configuration. Implementors return a `Value::Map` (or
/// `Value::Map` with no keys when there's nothing to contribute);
/// [`super::ConfigManager::merge`] rejects anything else.
pub trait ConfigSource {
    fn load(&self) -> Result<Value, ConfigError>;
}

/// Reads and parses a TOML file. Missing files are not an error — the
/// absence of optional config is normal — but a malformed file is.
pub struct FileSource {
    path: PathBuf,
    optional: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource {
            path: path.into(),
            optional: false,
        }
    }

    /// Treats a missing file as an empty layer instead of an error.
    pub fn optional(path: impl Into<PathBuf>) -> Self {
        FileSource {
            path: path.into(),
            optional: true,
        }
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<Value, ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(source) if self.optional && source.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Value::Map(BTreeMap::new()));
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        toml_value_to_value(
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?,
        )
    }
}

fn toml_value_to_value(value: toml::Value) -> Result<Value, ConfigError> {
    Ok(match value {
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Integer(i) => Value::Int(i),
        // Value has no float variant; config floats truncate to int.
        toml::Value::Float(f) => Value::Int(f as i64),
        toml::Value::String(s) => Value::Str(s),
        toml::Value::Datetime(dt) => Value::Str(dt.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(toml_value_to_value)
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => {
            let mut map = BTreeMap::new();
            for (k, v) in table {
                map.insert(k, toml_value_to_value(v)?);
            }
            Value::Map(map)
        }
    })
}

/// Picks up every environment variable starting with `prefix`, stripping
/// the prefix and lower-casing the rest to form a flat key (e.g.
/// `MONARCH_MAX_THREAD_COUNT` under prefix `MONARCH_` becomes
/// `max_thread_count`). Values are always strings; callers that need a
/// typed value should parse through `Value::as_str`.
pub struct EnvSource {
    prefix: String,
    nested_under: Option<String>,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        EnvSource {
            prefix: prefix.into(),
            nested_under: None,
        }
    }

    /// Nests every discovered key one level under `section` instead of at
    /// the top of the tree (so `MONARCH_MAX_THREAD_COUNT` lands at
    /// `kernel.max_thread_count` rather than `max_thread_count`).
    pub fn nested_under(mut self, section: impl Into<String>) -> Self {
        self.nested_under = Some(section.into());
        self
    }
}

impl ConfigSource for EnvSource {
    fn load(&self) -> Result<Value, ConfigError> {
        let mut flat = BTreeMap::new();
        for (key, value) in std::env::vars() {
            if let Some(rest) = key.strip_prefix(&self.prefix) {
                if rest.is_empty() {
                    continue;
                }
                flat.insert(rest.to_lowercase(), Value::Str(value));
            }
        }
        let value = Value::Map(flat);
        Ok(match &self.nested_under {
            Some(section) => {
                let mut outer = BTreeMap::new();
                outer.insert(section.clone(), value);
                Value::Map(outer)
            }
            None => value,
        })
    }
}

/// A fixed, compiled-in tree — the lowest-priority layer, always merged
/// first so every other source can override it.
pub struct DefaultsSource {
    value: Value,
}

impl DefaultsSource {
    pub fn new(value: Value) -> Self {
        DefaultsSource { value }
    }
}

impl ConfigSource for DefaultsSource {
    fn load(&self) -> Result<Value, ConfigError> {
        Ok(self.value.clone())
    }
}
