//! Layered configuration: a handful of [`ConfigSource`]s merged left to
//! right into one [`monarch_core::Value`] tree, with typed accessors for
//! the fields the kernel actually reads (`module_paths`, `max_thread_count`,
//! `jobs_per_thread`, `fiber_worker_count`).

mod manager;
mod source;

pub use manager::ConfigManager;
pub use source::{ConfigError, ConfigSource, DefaultsSource, EnvSource, FileSource};

use std::path::PathBuf;

use monarch_core::microkernel::Config as KernelConfig;
use monarch_core::Value;

/// Pulls the fields [`monarch_core::microkernel::Config`] needs out of a
/// merged configuration tree, falling back to its `Default` for anything
/// absent or mistyped.
pub fn kernel_config_from(value: &Value) -> KernelConfig {
    let mut config = KernelConfig::default();

    if let Some(paths) = value.get_path("kernel.module_paths").and_then(as_str_vec) {
        config.module_paths = paths.into_iter().map(PathBuf::from).collect();
    }
    if let Some(n) = value
        .get_path("kernel.max_thread_count")
        .and_then(as_usize)
    {
        config.max_thread_count = n;
    }
    if let Some(n) = value
        .get_path("kernel.jobs_per_thread")
        .and_then(as_usize)
    {
        config.jobs_per_thread = n;
    }
    if let Some(n) = value
        .get_path("kernel.fiber_worker_count")
        .and_then(as_usize)
    {
        config.fiber_worker_count = n;
    }

    config
}

fn as_usize(value: &Value) -> Option<usize> {
    match value {
        Value::Int(n) if *n >= 0 => Some(*n as usize),
        _ => None,
    }
}

fn as_str_vec(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Str(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_config_from_empty_value_is_default() {
        let value = Value::Map(Default::default());
        let config = kernel_config_from(&value);
        assert_eq!(config, KernelConfig::default());
    }
}
