//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with external systems.

mod runner;
pub mod scanner;
#[cfg(unix)]
mod signaler;

// Re-export main types for convenience
pub use runner::SystemRunner;
pub use scanner::{Platform, PortScanner, ScanOptions};
#[cfg(unix)]
pub use signaler::NixSignaler;
