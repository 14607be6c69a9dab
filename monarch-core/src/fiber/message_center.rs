//! Per-fiber deferred mailbox.
//!
//! A message sent to a fiber is never delivered synchronously: it waits in
//! the fiber's mailbox until that fiber's own thread calls
//! [`Mailbox::drain`] — a queue-and-pull model rather than a push
//! callback, since the target may not be runnable at send time.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::value::Value;

#[derive(Default)]
pub struct Mailbox {
    queue: Mutex<VecDeque<Value>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Mailbox {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, message: Value) {
        self.queue.lock().unwrap().push_back(message);
    }

    /// Removes and returns the oldest undelivered message, if any.
    pub fn pop(&self) -> Option<Value> {
        self.queue.lock().unwrap().pop_front()
    }

    /// Removes and returns every undelivered message, oldest first.
    pub fn drain(&self) -> Vec<Value> {
        self.queue.lock().unwrap().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_drain_in_arrival_order() {
        let mailbox = Mailbox::new();
        mailbox.push(Value::Int(1));
        mailbox.push(Value::Int(2));
        assert_eq!(mailbox.drain(), vec![Value::Int(1), Value::Int(2)]);
        assert!(mailbox.is_empty());
    }
}
