//! Monarch execution kernel: guarded operations dispatched over a thread
//! pool, cooperative fibers layered on top, a hierarchical event bus, and
//! dependency-resolved dynamic module loading.
//!
//! No inheritance hierarchies, no raw stack switching, and errors are
//! values ([`error::Error`]), not exceptions.

/// Re-exported so `monarch-macros`' generated code can refer to
/// `::monarch_core::linkme` without the downstream module crate needing its
/// own direct dependency on `linkme`.
pub use linkme;

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod fiber;
pub mod kernel;
pub mod microkernel;
pub mod module;
pub mod operation;
pub mod state;
pub mod value;

pub use dispatcher::{DispatcherConfig, OperationDispatcher};
pub use error::{Error, Result};
pub use event::{Event, EventController, EventId};
pub use fiber::{FiberControl, FiberId, FiberScheduler};
pub use kernel::Kernel;
pub use microkernel::{Config, MicroKernel};
pub use module::{Module, ModuleContext, ModuleLibrary};
pub use operation::{Guard, GuardResult, Mutator, NullMutator, Operation, OperationFlags};
pub use state::State;
pub use value::Value;
