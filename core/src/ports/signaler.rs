//! Process signaler port (interface).

use crate::domain::TerminationSignal;
use crate::error::Result;

/// Port for delivering signals to processes.
///
/// This trait defines the interface for process termination.
/// Implementations handle platform-specific signal handling.
pub trait ProcessSignaler: Send + Sync {
    /// Deliver `signal` to `pid`.
    ///
    /// Returns `Ok(false)` when the process had already exited, which callers
    /// treat as success. Fails with `PermissionDenied` when not allowed.
    fn send(&self, pid: u32, signal: TerminationSignal) -> Result<bool>;

    /// Zero-effect liveness probe (signal 0).
    ///
    /// A process we may not signal still counts as alive.
    fn is_alive(&self, pid: u32) -> bool;
}
