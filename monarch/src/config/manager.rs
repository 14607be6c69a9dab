//! Merges a list of [`super::ConfigSource`] layers into one tree:
//! left-to-right, maps merge key-by-key recursively, anything else
//! (scalars, arrays, or a type change across layers) replaces outright.

use std::collections::BTreeMap;

use monarch_core::Value;

use super::source::{ConfigError, ConfigSource};

pub struct ConfigManager;

impl ConfigManager {
    /// Loads and merges every source in order; a later source's value at a
    /// given path always wins over an earlier one's, except where both
    /// sides are maps, in which case their keys are merged recursively.
    pub fn merge(sources: &[Box<dyn ConfigSource>]) -> Result<Value, ConfigError> {
        let mut acc = Value::Map(BTreeMap::new());
        for source in sources {
            acc = merge_values(acc, source.load()?);
        }
        Ok(acc)
    }
}

fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Map(mut base_map), Value::Map(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge_values(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Map(base_map)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DefaultsSource, FileSource};
    use std::io::Write;

    fn map(pairs: &[(&str, Value)]) -> Value {
        let mut m = BTreeMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        Value::Map(m)
    }

    #[test]
    fn later_source_overrides_earlier_scalar() {
        let defaults = map(&[("max_thread_count", Value::Int(4))]);
        let overrides = map(&[("max_thread_count", Value::Int(8))]);
        let merged = merge_values(defaults, overrides);
        assert_eq!(
            merged.get_path("max_thread_count"),
            Some(&Value::Int(8))
        );
    }

    #[test]
    fn nested_maps_merge_key_by_key() {
        let defaults = map(&[(
            "kernel",
            map(&[
                ("max_thread_count", Value::Int(4)),
                ("jobs_per_thread", Value::Int(4)),
            ]),
        )]);
        let overrides = map(&[("kernel", map(&[("max_thread_count", Value::Int(16))]))]);
        let merged = merge_values(defaults, overrides);
        assert_eq!(
            merged.get_path("kernel.max_thread_count"),
            Some(&Value::Int(16))
        );
        assert_eq!(
            merged.get_path("kernel.jobs_per_thread"),
            Some(&Value::Int(4))
        );
    }

    #[test]
    fn merge_across_real_sources() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[kernel]\nmax_thread_count = 12").unwrap();

        let sources: Vec<Box<dyn ConfigSource>> = vec![
            Box::new(DefaultsSource::new(map(&[(
                "kernel",
                map(&[
                    ("max_thread_count", Value::Int(4)),
                    ("jobs_per_thread", Value::Int(4)),
                ]),
            )]))),
            Box::new(FileSource::new(file.path())),
        ];

        let merged = ConfigManager::merge(&sources).unwrap();
        assert_eq!(
            merged.get_path("kernel.max_thread_count"),
            Some(&Value::Int(12))
        );
        assert_eq!(
            merged.get_path("kernel.jobs_per_thread"),
            Some(&Value::Int(4))
        );
    }
}
