//! Dynamic module loading over a C ABI: discovering module images,
//! resolving their dependency graph, and driving initialize/cleanup in
//! topological order.

pub mod abi;
pub mod context;
pub mod loader;
pub mod library;
pub mod registry;
pub mod traits;

pub use abi::{ModuleApi, ModuleContextHandle, ModuleDescriptor};
pub use context::ModuleContext;
pub use loader::ModuleInfo;
pub use library::ModuleLibrary;
pub use traits::Module;
