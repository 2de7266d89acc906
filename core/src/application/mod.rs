//! Application layer - Use case services.
//!
//! The state machines built on the ports: waiting for a port, terminating
//! its owner, and the snapshot/diff state behind watch mode. Each takes its
//! configuration by value at construction; nothing here is process-global.

mod terminate;
mod wait;
mod watch;

pub use terminate::{ProcessTerminator, TerminateOutcome, TerminatePlan};
pub use wait::{wait_for_port, WaitOptions, WaitOutcome};
pub use watch::{PortWatchFrame, PortWatchState, StatChanges, WatchConfig, WatchSnapshot, WatchState};
