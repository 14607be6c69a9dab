//! The trait a loadable module implements; `#[monarch::module]` (in the
//! `monarch-macros` crate) generates the C ABI wrapper functions in
//! [`crate::module::abi`] around an impl of this trait.

use crate::module::ModuleContext;

/// A user module: constructed once per load, initialized against the
/// running kernel's [`ModuleContext`], and cleaned up on unload.
pub trait Module: Sized + Send + 'static {
    /// Name used as this module's unique identity in the library.
    const NAME: &'static str;
    /// Version string; not currently range-matched against dependents'
    /// declarations (declared dependencies are matched by name only).
    const VERSION: &'static str;
    /// Names of modules that must already be initialized before this one.
    const DEPENDENCIES: &'static [&'static str] = &[];

    /// Constructs the module instance. Must not fail; do fallible setup in
    /// [`Module::initialize`] instead, where a context and an error return
    /// path are both available.
    fn new() -> Self;

    /// Registers operations, fibers, and event taps against `context`.
    /// Returning `Err` aborts the whole load batch and rolls back every
    /// module already initialized in it.
    fn initialize(&mut self, context: &ModuleContext) -> Result<(), String>;

    /// Best-effort teardown. Errors are reported but never abort the
    /// unload sweep.
    fn cleanup(&mut self) -> Result<(), String> {
        Ok(())
    }
}
