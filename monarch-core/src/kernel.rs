//! Ties [`State`] and [`OperationDispatcher`] together into the single
//! entry point the rest of the kernel (fibers, events, modules) schedules
//! work through: a small facade struct owning the long-lived subsystem
//! handles, rather than free functions threading them through every call.

use std::sync::Arc;

use crate::dispatcher::{DispatcherConfig, OperationDispatcher};
use crate::operation::{Mutator, Operation, OperationBuilder};
use crate::state::State;

/// Owns the process-wide [`State`] and the [`OperationDispatcher`] that
/// admits operations against it. Cloning a `Kernel` shares both.
#[derive(Clone)]
pub struct Kernel {
    state: Arc<State>,
    dispatcher: OperationDispatcher,
}

impl Kernel {
    pub fn new(config: DispatcherConfig) -> Self {
        let state = Arc::new(State::new());
        let dispatcher = OperationDispatcher::new(Arc::clone(&state), config);
        Kernel { state, dispatcher }
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    pub fn dispatcher(&self) -> &OperationDispatcher {
        &self.dispatcher
    }

    /// Builds an operation via the same builder surface as
    /// [`Operation::new`], queues it, and returns the handle immediately.
    pub fn run_operation<F>(&self, runnable: F) -> Operation
    where
        F: FnOnce(&Operation) + Send + 'static,
    {
        let op = Operation::new(runnable).build();
        self.dispatcher.queue(op.clone());
        op
    }

    pub fn run_builder(&self, builder: OperationBuilder) -> Operation {
        let op = builder.build();
        self.dispatcher.queue(op.clone());
        op
    }

    /// Queues `runnable` and blocks the caller until it reaches a terminal
    /// state, returning the handle so the caller can inspect
    /// `error()`/`is_canceled()`.
    pub fn run_operation_and_wait<F>(&self, runnable: F) -> Operation
    where
        F: FnOnce(&Operation) + Send + 'static,
    {
        let op = self.run_operation(runnable);
        op.join();
        op
    }

    /// Convenience for submitting an operation with a guard and/or mutator
    /// already attached via [`Operation::new`]'s builder, then waiting.
    pub fn run_guarded_and_wait<F, M>(&self, runnable: F, guard: impl crate::operation::Guard + 'static, mutator: M) -> Operation
    where
        F: FnOnce(&Operation) + Send + 'static,
        M: Mutator + 'static,
    {
        let op = Operation::new(runnable).guard(guard).mutator(mutator).build();
        self.dispatcher.queue(op.clone());
        op.join();
        op
    }

    /// Interrupts all running operations and drains the queue, blocking
    /// until quiescent. Used by [`crate::microkernel::MicroKernel::stop`].
    pub fn terminate(&self) {
        self.dispatcher.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn run_operation_and_wait_blocks_until_done() {
        let kernel = Kernel::new(DispatcherConfig::default());
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = Arc::clone(&ran);
        kernel.run_operation_and_wait(move |_| {
            ran2.store(true, Ordering::SeqCst);
        });
        assert!(ran.load(Ordering::SeqCst));
    }
}
