//! Cooperative fiber scheduler.
//!
//! `FiberId` allocation draws from ids `reap` has freed before minting a new
//! one off a monotonic counter, a ready queue is scanned by N scheduler
//! operations, and sleep/wakeup move a fiber out of and back into that
//! queue. Stack switching is replaced by [`FiberContext`]'s condvar baton.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crate::fiber::context::{FiberContext, ResumeOutcome};
use crate::fiber::message_center::Mailbox;
use crate::kernel::Kernel;
use crate::operation::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiberId(u64);

type FiberBody = dyn FnOnce(&FiberControl) + Send + 'static;

struct FiberSlot {
    context: Arc<FiberContext>,
    mailbox: Arc<Mailbox>,
    body: Option<Box<FiberBody>>,
    thread: Option<thread::JoinHandle<()>>,
    /// Set by the fiber itself (via [`FiberControl::sleep`]) just before it
    /// yields, so the scheduler knows to park it instead of requeuing it.
    sleep_requested: Arc<AtomicBool>,
}

struct Inner {
    kernel: Kernel,
    fibers: Mutex<HashMap<FiberId, FiberSlot>>,
    ready: Mutex<VecDeque<FiberId>>,
    sleeping: Mutex<HashMap<FiberId, ()>>,
    free_ids: Mutex<VecDeque<u64>>,
    next_id: AtomicU64,
    fiber_available: Condvar,
    availability_lock: Mutex<()>,
    shutdown: AtomicBool,
    worker_ops: Mutex<Vec<Operation>>,
    /// Scheduler-wide: suppresses further New-fiber stack spawns once one
    /// fails, until [`FiberScheduler::reap`] reclaims a dead fiber's
    /// resources and this flips back to `true`, mirroring the "retry after
    /// any stack is reclaimed" memory-pressure heuristic.
    try_init: AtomicBool,
}

/// Schedules cooperative fibers across a pool of dispatcher-owned worker
/// operations. Cheap to clone; all clones share the same scheduler state.
#[derive(Clone)]
pub struct FiberScheduler {
    inner: Arc<Inner>,
}

impl FiberScheduler {
    /// Starts `num_workers` scheduler-loop operations on `kernel`'s
    /// dispatcher.
    pub fn start(kernel: Kernel, num_workers: usize) -> Self {
        let inner = Arc::new(Inner {
            kernel: kernel.clone(),
            fibers: Mutex::new(HashMap::new()),
            ready: Mutex::new(VecDeque::new()),
            sleeping: Mutex::new(HashMap::new()),
            free_ids: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            fiber_available: Condvar::new(),
            availability_lock: Mutex::new(()),
            shutdown: AtomicBool::new(false),
            worker_ops: Mutex::new(Vec::new()),
            try_init: AtomicBool::new(true),
        });

        let scheduler = FiberScheduler { inner };
        let mut worker_ops = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let worker = scheduler.clone();
            worker_ops.push(kernel.run_operation(move |_op| worker.worker_loop()));
        }
        *scheduler.inner.worker_ops.lock().unwrap() = worker_ops;
        scheduler
    }

    /// Registers a new fiber body and returns its id. The fiber's OS thread
    /// is not spawned until a worker first resumes it.
    pub fn spawn<F>(&self, body: F) -> FiberId
    where
        F: FnOnce(&FiberControl) + Send + 'static,
    {
        let id = self.allocate_id();
        let slot = FiberSlot {
            context: Arc::new(FiberContext::new()),
            mailbox: Arc::new(Mailbox::new()),
            body: Some(Box::new(body)),
            thread: None,
            sleep_requested: Arc::new(AtomicBool::new(false)),
        };
        self.inner.fibers.lock().unwrap().insert(id, slot);
        self.inner.ready.lock().unwrap().push_back(id);
        self.inner.fiber_available.notify_all();
        id
    }

    /// Moves a sleeping fiber back onto the ready queue. A no-op if the
    /// fiber isn't currently sleeping (spurious wakeups are tolerated).
    pub fn wakeup(&self, id: FiberId) {
        if self.inner.sleeping.lock().unwrap().remove(&id).is_some() {
            self.inner.ready.lock().unwrap().push_back(id);
            self.inner.fiber_available.notify_all();
        }
    }

    /// Posts `message` to `target`'s mailbox and wakes it if sleeping.
    pub fn send(&self, target: FiberId, message: crate::value::Value) -> bool {
        let mailbox = {
            let fibers = self.inner.fibers.lock().unwrap();
            fibers.get(&target).map(|slot| Arc::clone(&slot.mailbox))
        };
        match mailbox {
            Some(mailbox) => {
                mailbox.push(message);
                self.wakeup(target);
                true
            }
            None => false,
        }
    }

    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.fiber_available.notify_all();
        let ops = self.inner.worker_ops.lock().unwrap().clone();
        for op in ops {
            op.join();
        }
    }

    /// Pops a recycled id if `reap` has returned one, otherwise mints the
    /// next never-used id. Ids freed by `reap` are genuinely reused, not
    /// just drawn from a monotonic counter.
    fn allocate_id(&self) -> FiberId {
        let mut ids = self.inner.free_ids.lock().unwrap();
        match ids.pop_front() {
            Some(id) => FiberId(id),
            None => {
                let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
                FiberId(id)
            }
        }
    }

    fn worker_loop(&self) {
        while !self.inner.shutdown.load(Ordering::SeqCst) {
            match self.next_fiber() {
                Some(id) => self.run_one(id),
                None => self.wait_for_fiber(),
            }
        }
    }

    fn next_fiber(&self) -> Option<FiberId> {
        self.inner.ready.lock().unwrap().pop_front()
    }

    fn wait_for_fiber(&self) {
        let guard = self.inner.availability_lock.lock().unwrap();
        let _ = self
            .inner
            .fiber_available
            .wait_timeout(guard, Duration::from_millis(50))
            .unwrap();
    }

    fn run_one(&self, id: FiberId) {
        if !self.ensure_started(id) {
            // Spawn failed; the slot is already requeued by ensure_started.
            return;
        }

        let context = {
            let fibers = self.inner.fibers.lock().unwrap();
            fibers.get(&id).map(|slot| Arc::clone(&slot.context))
        };
        let Some(context) = context else { return };

        match context.resume() {
            ResumeOutcome::Exited => self.reap(id),
            ResumeOutcome::Yielded => {
                let asked_to_sleep = {
                    let fibers = self.inner.fibers.lock().unwrap();
                    fibers
                        .get(&id)
                        .map(|slot| slot.sleep_requested.swap(false, Ordering::SeqCst))
                        .unwrap_or(false)
                };
                if asked_to_sleep {
                    self.inner.sleeping.lock().unwrap().insert(id, ());
                } else {
                    self.inner.ready.lock().unwrap().push_back(id);
                }
            }
        }
    }

    /// Lazily spawns the fiber's dedicated OS thread on first use. Returns
    /// `false` (and requeues `id`) if the thread could not be spawned, or if
    /// spawning is currently suppressed scheduler-wide after a prior
    /// failure — in both cases the caller can retry once a dead fiber is
    /// reaped and [`FiberScheduler::reap`] lifts the suppression.
    fn ensure_started(&self, id: FiberId) -> bool {
        let mut fibers = self.inner.fibers.lock().unwrap();
        let Some(slot) = fibers.get_mut(&id) else {
            return false;
        };
        if slot.thread.is_some() {
            return true;
        }
        if !self.inner.try_init.load(Ordering::SeqCst) {
            drop(fibers);
            self.inner.ready.lock().unwrap().push_back(id);
            return false;
        }
        let Some(body) = slot.body.take() else {
            return false;
        };

        let context = Arc::clone(&slot.context);
        let mailbox = Arc::clone(&slot.mailbox);
        let sleep_requested = Arc::clone(&slot.sleep_requested);
        let scheduler = self.clone();

        let spawned = thread::Builder::new()
            .name(format!("monarch-fiber-{}", id.0))
            .spawn(move || {
                context.wait_for_first_resume();
                let control = FiberControl {
                    id,
                    context: Arc::clone(&context),
                    mailbox,
                    sleep_requested,
                    scheduler,
                };
                body(&control);
                context.finish();
            });

        match spawned {
            Ok(handle) => {
                slot.thread = Some(handle);
                true
            }
            Err(_) => {
                self.inner.try_init.store(false, Ordering::SeqCst);
                drop(fibers);
                self.inner.ready.lock().unwrap().push_back(id);
                false
            }
        }
    }

    /// Removes `id`'s slot, joins its OS thread, returns the id to the free
    /// list for reuse, and lifts any spawn-suppression from a prior
    /// failure — every reclaimed fiber is another chance for a stuck New
    /// fiber to retry.
    fn reap(&self, id: FiberId) {
        let slot = self.inner.fibers.lock().unwrap().remove(&id);
        if let Some(mut slot) = slot {
            if let Some(thread) = slot.thread.take() {
                let _ = thread.join();
            }
        }
        self.inner.free_ids.lock().unwrap().push_back(id.0);
        self.inner.try_init.store(true, Ordering::SeqCst);
        self.inner.fiber_available.notify_all();
    }
}

/// Handle a fiber's own body uses to cooperate with the scheduler: yield,
/// sleep, and exchange messages with other fibers.
pub struct FiberControl {
    id: FiberId,
    context: Arc<FiberContext>,
    mailbox: Arc<Mailbox>,
    sleep_requested: Arc<AtomicBool>,
    scheduler: FiberScheduler,
}

impl FiberControl {
    pub fn id(&self) -> FiberId {
        self.id
    }

    /// Gives up the remaining turn; the scheduler will run another ready
    /// fiber and resume this one again later.
    pub fn yield_now(&self) {
        self.context.yield_now();
    }

    /// Yields and asks the scheduler to park this fiber until
    /// [`FiberScheduler::wakeup`] (or a message arrives).
    pub fn sleep(&self) {
        self.sleep_requested.store(true, Ordering::SeqCst);
        self.context.yield_now();
    }

    pub fn wakeup(&self, target: FiberId) {
        self.scheduler.wakeup(target);
    }

    pub fn send(&self, target: FiberId, message: crate::value::Value) -> bool {
        self.scheduler.send(target, message)
    }

    /// Drains this fiber's own mailbox; never blocks.
    pub fn drain_messages(&self) -> Vec<crate::value::Value> {
        self.mailbox.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DispatcherConfig;
    use crate::value::Value;
    use std::sync::atomic::AtomicI32;
    use std::time::Duration as StdDuration;

    #[test]
    fn two_fibers_interleave_cooperatively() {
        let kernel = Kernel::new(DispatcherConfig::default());
        let scheduler = FiberScheduler::start(kernel, 1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_a = Arc::clone(&order);
        scheduler.spawn(move |control| {
            order_a.lock().unwrap().push('a');
            control.yield_now();
            order_a.lock().unwrap().push('c');
        });

        let order_b = Arc::clone(&order);
        scheduler.spawn(move |control| {
            order_b.lock().unwrap().push('b');
            control.yield_now();
            order_b.lock().unwrap().push('d');
        });

        thread::sleep(StdDuration::from_millis(200));
        scheduler.shutdown();

        assert_eq!(*order.lock().unwrap(), vec!['a', 'b', 'c', 'd']);
    }

    #[test]
    fn sleeping_fiber_resumes_after_wakeup() {
        let kernel = Kernel::new(DispatcherConfig::default());
        let scheduler = FiberScheduler::start(kernel, 2);
        let woke = Arc::new(AtomicI32::new(0));

        let woke2 = Arc::clone(&woke);
        let id = scheduler.spawn(move |control| {
            control.sleep();
            woke2.fetch_add(1, Ordering::SeqCst);
        });

        thread::sleep(StdDuration::from_millis(50));
        assert_eq!(woke.load(Ordering::SeqCst), 0);

        scheduler.wakeup(id);
        thread::sleep(StdDuration::from_millis(100));
        scheduler.shutdown();

        assert_eq!(woke.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn message_send_wakes_sleeping_fiber() {
        let kernel = Kernel::new(DispatcherConfig::default());
        let scheduler = FiberScheduler::start(kernel, 2);
        let received = Arc::new(Mutex::new(None));

        let received2 = Arc::clone(&received);
        let id = scheduler.spawn(move |control| {
            control.sleep();
            *received2.lock().unwrap() = control.drain_messages().into_iter().next();
        });

        thread::sleep(StdDuration::from_millis(50));
        scheduler.send(id, Value::Int(42));
        thread::sleep(StdDuration::from_millis(100));
        scheduler.shutdown();

        assert_eq!(*received.lock().unwrap(), Some(Value::Int(42)));
    }

    #[test]
    fn reaped_fiber_id_is_recycled() {
        let kernel = Kernel::new(DispatcherConfig::default());
        let scheduler = FiberScheduler::start(kernel, 1);

        let first = scheduler.spawn(|_| {});
        thread::sleep(StdDuration::from_millis(100));

        let second = scheduler.spawn(|_| {});
        scheduler.shutdown();

        assert_eq!(first, second);
    }
}
