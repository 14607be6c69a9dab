//! Monarch: re-exports the execution kernel ([`monarch_core`]) and its
//! module macro ([`monarch_macros`]), and wires in the ambient collaborators
//! a hosted system actually needs: configuration, logging, and thin trait
//! boundaries for network, crypto, compression, structured-data, SQL,
//! validation, and URL handling. None of the collaborator modules are
//! production protocol implementations — the kernel only needs the trait
//! boundary; see each module's doc comment for what it actually ships.

pub mod compress;
pub mod config;
pub mod crypto;
pub mod data;
pub mod error;
pub mod log;
pub mod net;
pub mod sql;
pub mod url;
pub mod validation;

pub use monarch_core as core;
pub use monarch_core::{
    DispatcherConfig, Error as CoreError, Event, EventController, EventId, FiberControl, FiberId,
    FiberScheduler, Guard, GuardResult, Kernel, MicroKernel, Module, ModuleLibrary, Mutator,
    NullMutator, Operation, OperationDispatcher, OperationFlags, Result as CoreResult, State,
    Value,
};
pub use monarch_core::microkernel::Config as MicroKernelConfig;
pub use monarch_macros::module;

pub use error::Error;

/// Re-exported so `#[monarch::module]`'s generated code can reach
/// `linkme` without the module crate declaring its own dependency on it.
pub use monarch_core::linkme;
