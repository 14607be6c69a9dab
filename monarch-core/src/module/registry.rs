//! A process-local registry of `#[monarch::module]`-declared metadata,
//! populated via `linkme`.
//!
//! This is orthogonal to [`crate::module::library::ModuleLibrary`]: the
//! library discovers modules by `dlopen`-ing separate image files, which
//! each get their own copy of this distributed slice and so cannot see one
//! another through it. `MODULE_DESCRIPTORS` exists for the case where a
//! module crate is linked directly into a single binary — most often its
//! own test binary — and wants to enumerate its declared modules without
//! going through the dynamic loader at all.

use std::collections::HashMap;

use linkme::distributed_slice;
use once_cell::sync::Lazy;

/// A module's declared identity and dependencies, known at compile time.
#[derive(Debug, Clone, Copy)]
pub struct StaticDescriptor {
    pub name: &'static str,
    pub version: &'static str,
    pub dependencies: &'static [&'static str],
}

#[distributed_slice]
pub static MODULE_DESCRIPTORS: [StaticDescriptor] = [..];

static BY_NAME: Lazy<HashMap<&'static str, StaticDescriptor>> =
    Lazy::new(|| MODULE_DESCRIPTORS.iter().map(|d| (d.name, *d)).collect());

/// Every module linked into this binary via `#[monarch::module]`.
pub fn all() -> &'static [StaticDescriptor] {
    &MODULE_DESCRIPTORS
}

/// Looks up a linked module's declared metadata by name, without scanning
/// the full slice.
pub fn by_name(name: &str) -> Option<StaticDescriptor> {
    BY_NAME.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_is_absent() {
        // monarch-core itself links no #[monarch::module] items; any name
        // misses both the slice and the lookup table built from it.
        assert!(by_name("nonexistent").is_none());
        assert!(all().is_empty());
    }
}
