//! The cooperative hand-off primitive fibers use in place of stack
//! switching.
//!
//! The context-swap primitive is kept abstract: rather than raw
//! `ucontext`/`setjmp`-style stack switching, each fiber runs on its own
//! dedicated OS thread, and the swap/swap-back pair becomes a two-state
//! baton passed over a `Condvar`. Exactly one side runs at a time; the
//! other blocks.

use std::sync::{Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    Scheduler,
    Fiber,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The fiber yielded and is still alive.
    Yielded,
    /// The fiber's body returned; it will never run again.
    Exited,
}

pub struct FiberContext {
    turn: Mutex<Turn>,
    cond: Condvar,
}

impl FiberContext {
    pub fn new() -> Self {
        FiberContext {
            turn: Mutex::new(Turn::Scheduler),
            cond: Condvar::new(),
        }
    }

    /// Called from the scheduler's worker thread: hands control to the
    /// fiber and blocks until it yields back or exits.
    pub fn resume(&self) -> ResumeOutcome {
        let mut turn = self.turn.lock().unwrap();
        *turn = Turn::Fiber;
        self.cond.notify_all();
        while *turn == Turn::Fiber {
            turn = self.cond.wait(turn).unwrap();
        }
        match *turn {
            Turn::Scheduler => ResumeOutcome::Yielded,
            Turn::Exited => ResumeOutcome::Exited,
            Turn::Fiber => unreachable!("woke up still holding the fiber's turn"),
        }
    }

    /// Called from inside the fiber's own OS thread: hands control back to
    /// the scheduler and blocks until resumed again.
    pub fn yield_now(&self) {
        let mut turn = self.turn.lock().unwrap();
        *turn = Turn::Scheduler;
        self.cond.notify_all();
        while *turn == Turn::Scheduler {
            turn = self.cond.wait(turn).unwrap();
        }
    }

    /// Called once, from inside the fiber's own OS thread, at entry: blocks
    /// until the first `resume()`.
    pub fn wait_for_first_resume(&self) {
        let mut turn = self.turn.lock().unwrap();
        while *turn == Turn::Scheduler {
            turn = self.cond.wait(turn).unwrap();
        }
    }

    /// Called once, from inside the fiber's own OS thread, when its body
    /// returns: marks the context permanently exited and wakes the
    /// scheduler.
    pub fn finish(&self) {
        let mut turn = self.turn.lock().unwrap();
        *turn = Turn::Exited;
        self.cond.notify_all();
    }
}

impl Default for FiberContext {
    fn default() -> Self {
        Self::new()
    }
}
