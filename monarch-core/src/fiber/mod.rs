//! Cooperative fiber scheduling: user-mode tasks multiplexed onto a small
//! pool of scheduler operations, plus the per-fiber mailbox that delivers
//! messages to them.

mod context;
pub mod message_center;
mod scheduler;

pub use context::{FiberContext, ResumeOutcome};
pub use message_center::Mailbox;
pub use scheduler::{FiberControl, FiberId, FiberScheduler};
