//! Thread pool that admits, runs, and reaps [`Operation`]s.
//!
//! A dispatch pass holds the dispatcher's coordination lock (here, the
//! `queue` mutex) for the duration of each guard check, so every guard
//! observes a consistent [`State`] snapshot: a `checkGuard()` / `execute()`
//! split rather than a single combined admission step.

use std::collections::VecDeque;
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::operation::{GuardResult, Operation};
use crate::state::State;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Size of the thread pool.
    pub pool_size: usize,
    /// Configurable upper bound of operations admitted per pool thread at
    /// once (`jobsPerThread`).
    pub jobs_per_thread: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            pool_size: 4,
            jobs_per_thread: 4,
        }
    }
}

struct Inner {
    state: Arc<State>,
    queue: Mutex<VecDeque<Operation>>,
    running: Mutex<Vec<Operation>>,
    in_flight: AtomicUsize,
    capacity: usize,
    job_tx: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    quiescent: Condvar,
    quiescent_lock: Mutex<()>,
}

/// Admits queued operations when their guards allow, executes them on a
/// thread pool, and applies their state mutations.
///
/// Cheap to clone: an `Arc`-backed handle, so completion callbacks running
/// on pool threads can hold their own reference back into the dispatcher.
#[derive(Clone)]
pub struct OperationDispatcher {
    inner: Arc<Inner>,
}

impl OperationDispatcher {
    pub fn new(state: Arc<State>, config: DispatcherConfig) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let mut workers = Vec::with_capacity(config.pool_size);
        for _ in 0..config.pool_size {
            let job_rx = Arc::clone(&job_rx);
            workers.push(thread::spawn(move || loop {
                let job = { job_rx.lock().unwrap().recv() };
                match job {
                    Ok(job) => job(),
                    Err(_) => break,
                }
            }));
        }

        OperationDispatcher {
            inner: Arc::new(Inner {
                state,
                queue: Mutex::new(VecDeque::new()),
                running: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                capacity: (config.pool_size * config.jobs_per_thread).max(1),
                job_tx: Mutex::new(Some(job_tx)),
                workers: Mutex::new(workers),
                quiescent: Condvar::new(),
                quiescent_lock: Mutex::new(()),
            }),
        }
    }

    /// Inserts `op`, marks it queued, and returns immediately.
    pub fn queue(&self, op: Operation) {
        self.inner.queue.lock().unwrap().push_back(op);
        self.dispatch_pass();
    }

    /// Best-effort removal of a not-yet-started operation; cancels it if
    /// still present in the queue.
    pub fn dequeue(&self, op: &Operation) -> bool {
        let mut queue = self.inner.queue.lock().unwrap();
        if let Some(pos) = queue.iter().position(|queued| queued.ptr_eq(op)) {
            let op = queue.remove(pos).unwrap();
            op.mark_canceled();
            op.mutate_post(&self.inner.state);
            true
        } else {
            false
        }
    }

    /// Interrupts all running operations and empties the queue, blocking
    /// until every operation has reached a terminal state.
    pub fn terminate(&self) {
        {
            let mut queue = self.inner.queue.lock().unwrap();
            while let Some(op) = queue.pop_front() {
                op.mark_canceled();
                op.mutate_post(&self.inner.state);
            }
        }
        {
            let running = self.inner.running.lock().unwrap().clone();
            for op in running {
                op.interrupt();
            }
        }

        let guard = self.inner.quiescent_lock.lock().unwrap();
        let _unused = self
            .inner
            .quiescent
            .wait_while(guard, |_| !self.inner.running.lock().unwrap().is_empty())
            .unwrap();
    }

    /// A single front-to-back scan of the queue: for each operation,
    /// evaluates its guard against a consistent [`State`] snapshot and
    /// either admits it to the pool (`Execute`), leaves it queued (`Wait`),
    /// or cancels it (`Cancel`). Only `Execute` invokes `mutator.pre`.
    fn dispatch_pass(&self) {
        let mut to_execute = Vec::new();
        {
            let mut queue = self.inner.queue.lock().unwrap();
            let mut idx = 0;
            while idx < queue.len() {
                if self.inner.in_flight.load(Ordering::SeqCst) + to_execute.len()
                    >= self.inner.capacity
                {
                    break;
                }
                let result = queue[idx].guard_result(&self.inner.state);
                match result {
                    GuardResult::Execute => {
                        let op = queue.remove(idx).unwrap();
                        op.mark_started();
                        op.mutate_pre(&self.inner.state);
                        to_execute.push(op);
                    }
                    GuardResult::Wait => idx += 1,
                    GuardResult::Cancel => {
                        let op = queue.remove(idx).unwrap();
                        op.mark_canceled();
                        op.mutate_post(&self.inner.state);
                    }
                }
            }
        }

        for op in to_execute {
            self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
            self.inner.running.lock().unwrap().push(op.clone());
            self.spawn(op);
        }
    }

    fn spawn(&self, op: Operation) {
        let dispatcher = self.clone();
        let tx = self.inner.job_tx.lock().unwrap();
        if let Some(tx) = tx.as_ref() {
            let _ = tx.send(Box::new(move || {
                let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
                    if let Some(runnable) = op.take_runnable() {
                        runnable(&op);
                    }
                }));
                if let Err(payload) = result {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "operation runnable panicked".to_string());
                    op.set_error(message);
                }
                dispatcher.complete(op);
            }));
        }
    }

    fn complete(&self, op: Operation) {
        op.mutate_post(&self.inner.state);
        op.mark_finished();
        self.inner
            .running
            .lock()
            .unwrap()
            .retain(|running| !running.ptr_eq(&op));
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.quiescent.notify_all();
        self.dispatch_pass();
    }

    pub fn queued_len(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }

    pub fn running_len(&self) -> usize {
        self.inner.running.lock().unwrap().len()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        *self.job_tx.lock().unwrap() = None;
        for worker in self.workers.lock().unwrap().drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use std::sync::atomic::AtomicI32;
    use std::time::Duration;

    #[test]
    fn guard_gating_runs_in_order() {
        // S1: B (trivially satisfied guard) must run before A (gated on
        // B's mutator flipping `ready`), leaving the counter at 2.
        let state = Arc::new(State::new());
        state.set("ready", false).unwrap();
        let dispatcher = OperationDispatcher::new(Arc::clone(&state), DispatcherConfig::default());

        let counter = Arc::new(AtomicI32::new(0));

        let counter_a = Arc::clone(&counter);
        let op_a = Operation::new(move |_| {
            counter_a.store(1, Ordering::SeqCst);
        })
        .guard(|state: &State| {
            if state.get_bool("ready") == Some(true) {
                GuardResult::Execute
            } else {
                GuardResult::Wait
            }
        })
        .build();

        struct SetReady;
        impl crate::operation::Mutator for SetReady {
            fn pre(&self, state: &State, _op: &Operation) {
                state.set("ready", true).unwrap();
            }
        }

        let counter_b = Arc::clone(&counter);
        let op_b = Operation::new(move |_| {
            counter_b.fetch_add(1, Ordering::SeqCst);
        })
        .mutator(SetReady)
        .build();

        dispatcher.queue(op_a.clone());
        dispatcher.queue(op_b.clone());

        op_a.join();
        op_b.join();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn terminate_cancels_long_running_op() {
        let state = Arc::new(State::new());
        let dispatcher = OperationDispatcher::new(state, DispatcherConfig::default());

        let op = Operation::new(|op: &Operation| {
            for _ in 0..1000 {
                if op.is_interrupted() {
                    return;
                }
                thread::sleep(Duration::from_millis(5));
            }
        })
        .build();

        dispatcher.queue(op.clone());
        thread::sleep(Duration::from_millis(20));
        dispatcher.terminate();

        assert!(op.is_interrupted());
    }

    #[test]
    fn unsatisfiable_guard_is_canceled_not_executed() {
        let state = Arc::new(State::new());
        let dispatcher = OperationDispatcher::new(state, DispatcherConfig::default());
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = Arc::clone(&ran);
        let op = Operation::new(move |_| {
            ran2.fetch_add(1, Ordering::SeqCst);
        })
        .guard(|_: &State| GuardResult::Cancel)
        .build();

        dispatcher.queue(op.clone());
        op.join();

        assert!(op.is_canceled());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
