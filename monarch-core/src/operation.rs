//! Operations: immutable records pairing a unit of work with a guard and a
//! pair of state mutators.
//!
//! [`Mutator`]'s `pre`/`post` methods default to no-ops, and a guard check
//! resolves to one of three outcomes (here [`GuardResult`]) rather than a
//! plain boolean, so a permanently-failing precondition can cancel an
//! operation instead of leaving it queued forever.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use bitflags::bitflags;

use crate::state::State;

/// The result of evaluating an operation's guard against [`State`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardResult {
    /// The operation's precondition holds; admit it now.
    Execute,
    /// The precondition does not hold yet; leave it queued.
    Wait,
    /// The precondition can never hold; cancel the operation.
    Cancel,
}

/// A pure predicate over [`State`] deciding Execute / Wait / Cancel.
pub trait Guard: Send + Sync {
    fn check(&self, state: &State) -> GuardResult;
}

impl<F> Guard for F
where
    F: Fn(&State) -> GuardResult + Send + Sync,
{
    fn check(&self, state: &State) -> GuardResult {
        self(state)
    }
}

/// Paired callbacks run under the dispatcher's coordination lock
/// immediately before and after an operation executes. Only `Execute`
/// invokes `pre`; a guard's `Cancel` result never does.
pub trait Mutator: Send + Sync {
    fn pre(&self, _state: &State, _op: &Operation) {}
    fn post(&self, _state: &State, _op: &Operation) {}
}

/// A no-op mutator, used when an operation doesn't need to touch state.
pub struct NullMutator;
impl Mutator for NullMutator {}

bitflags! {
    pub struct OperationFlags: u8 {
        const STARTED     = 0b0000_0001;
        const FINISHED     = 0b0000_0010;
        const CANCELED     = 0b0000_0100;
        const INTERRUPTED = 0b0000_1000;
        const STOPPED     = 0b0001_0000;
    }
}

type Runnable = dyn FnOnce(&Operation) + Send;

struct Inner {
    runnable: Mutex<Option<Box<Runnable>>>,
    guard: Option<Box<dyn Guard>>,
    mutator: Box<dyn Mutator>,
    priority: i32,
    user_data: Mutex<Option<Box<dyn Any + Send + Sync>>>,
    flags: AtomicU8,
    interrupted: AtomicBool,
    error: Mutex<Option<String>>,
    done: Mutex<bool>,
    done_cond: Condvar,
}

/// An immutable record carrying a runnable, an optional guard, an optional
/// state mutator, a priority, a user data bag, and a monotonic flag set.
///
/// Cheap to clone: it's a reference-counted handle, dropped once every
/// clone has released it.
#[derive(Clone)]
pub struct Operation {
    inner: Arc<Inner>,
}

impl Operation {
    pub fn new<F>(runnable: F) -> OperationBuilder
    where
        F: FnOnce(&Operation) + Send + 'static,
    {
        OperationBuilder {
            runnable: Box::new(runnable),
            guard: None,
            mutator: None,
            priority: 0,
            user_data: None,
        }
    }

    pub fn priority(&self) -> i32 {
        self.inner.priority
    }

    pub fn flags(&self) -> OperationFlags {
        OperationFlags::from_bits_truncate(self.inner.flags.load(Ordering::SeqCst))
    }

    fn set_flag(&self, flag: OperationFlags) {
        self.inner.flags.fetch_or(flag.bits(), Ordering::SeqCst);
    }

    /// Cooperative cancellation flag: runnables should poll this (or block
    /// on primitives that honor it) rather than being forcibly unwound.
    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::SeqCst)
    }

    /// Requests cooperative interruption of a running operation.
    pub fn interrupt(&self) {
        self.inner.interrupted.store(true, Ordering::SeqCst);
        self.set_flag(OperationFlags::INTERRUPTED);
    }

    pub fn is_finished(&self) -> bool {
        self.flags().contains(OperationFlags::FINISHED)
    }

    pub fn is_canceled(&self) -> bool {
        self.flags().contains(OperationFlags::CANCELED)
    }

    pub fn set_user_data<T: Any + Send + Sync>(&self, value: T) {
        *self.inner.user_data.lock().unwrap() = Some(Box::new(value));
    }

    /// Returns a clone of the user data bag's contents if it holds a `T`,
    /// `None` if it's empty or holds some other type.
    pub fn user_data<T: Any + Send + Sync + Clone>(&self) -> Option<T> {
        self.inner
            .user_data
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|boxed| boxed.downcast_ref::<T>())
            .cloned()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.error.lock().unwrap().clone()
    }

    pub(crate) fn set_error(&self, message: impl Into<String>) {
        *self.inner.error.lock().unwrap() = Some(message.into());
    }

    pub(crate) fn guard_result(&self, state: &State) -> GuardResult {
        match &self.inner.guard {
            Some(g) => g.check(state),
            None => GuardResult::Execute,
        }
    }

    pub(crate) fn mutate_pre(&self, state: &State) {
        self.inner.mutator.pre(state, self);
    }

    pub(crate) fn mutate_post(&self, state: &State) {
        self.inner.mutator.post(state, self);
    }

    pub(crate) fn take_runnable(&self) -> Option<Box<Runnable>> {
        self.inner.runnable.lock().unwrap().take()
    }

    pub(crate) fn mark_started(&self) {
        self.set_flag(OperationFlags::STARTED);
    }

    pub(crate) fn mark_canceled(&self) {
        self.set_flag(OperationFlags::CANCELED);
        self.finish_wake();
    }

    pub(crate) fn mark_finished(&self) {
        self.set_flag(OperationFlags::FINISHED);
        self.finish_wake();
    }

    fn finish_wake(&self) {
        let mut done = self.inner.done.lock().unwrap();
        *done = true;
        self.inner.done_cond.notify_all();
    }

    /// Blocks the calling thread until the operation reaches a terminal
    /// state (finished or canceled). Used by `Kernel::run_operation_and_wait`.
    pub fn join(&self) {
        let mut done = self.inner.done.lock().unwrap();
        while !*done {
            done = self.inner.done_cond.wait(done).unwrap();
        }
    }

    pub(crate) fn ptr_eq(&self, other: &Operation) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

pub struct OperationBuilder {
    runnable: Box<Runnable>,
    guard: Option<Box<dyn Guard>>,
    mutator: Option<Box<dyn Mutator>>,
    priority: i32,
    user_data: Option<Box<dyn Any + Send + Sync>>,
}

impl OperationBuilder {
    pub fn guard(mut self, guard: impl Guard + 'static) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    pub fn mutator(mut self, mutator: impl Mutator + 'static) -> Self {
        self.mutator = Some(Box::new(mutator));
        self
    }

    /// Priority is advisory only; the dispatcher admits in FIFO arrival
    /// order within the guard-satisfied set.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn user_data<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.user_data = Some(Box::new(value));
        self
    }

    pub fn build(self) -> Operation {
        Operation {
            inner: Arc::new(Inner {
                runnable: Mutex::new(Some(self.runnable)),
                guard: self.guard,
                mutator: self.mutator.unwrap_or_else(|| Box::new(NullMutator)),
                priority: self.priority,
                user_data: Mutex::new(self.user_data),
                flags: AtomicU8::new(0),
                interrupted: AtomicBool::new(false),
                error: Mutex::new(None),
                done: Mutex::new(false),
                done_cond: Condvar::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_data_round_trips_through_builder() {
        let op = Operation::new(|_| {}).user_data(42i64).build();
        assert_eq!(op.user_data::<i64>(), Some(42));
    }

    #[test]
    fn set_user_data_overwrites_and_wrong_type_reads_none() {
        let op = Operation::new(|_| {}).build();
        assert_eq!(op.user_data::<String>(), None);

        op.set_user_data("hello".to_string());
        assert_eq!(op.user_data::<String>(), Some("hello".to_string()));
        assert_eq!(op.user_data::<i64>(), None);
    }
}
