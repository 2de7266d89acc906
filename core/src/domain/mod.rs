//! Domain layer - Pure data models.
//!
//! These types have no I/O dependencies and are rebuilt from scratch on every scan.

mod listener;
mod signal;
mod sort;

// Re-export all domain types
pub use listener::{
    Connection, ConnectionState, Listener, ProcessInfo, Protocol, ResourceStats, ScanResult,
};
pub use signal::TerminationSignal;
pub use sort::{sort_listeners, SortKey};
