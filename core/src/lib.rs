//! Portwarden Core Library
//!
//! Correlates listening sockets with the processes that own them.
//! Provides functionality to:
//! - Scan listening ports and count their established connections
//! - Inspect a single port with its connections and resource usage
//! - Wait for a port to become used or free
//! - Track watch-mode snapshots and diff them tick to tick
//! - Terminate a port's owner with optional SIGKILL escalation
//! - Persist user defaults
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data models
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: External system implementations
//! - `application`: Use case services
//!
//! # Platform Support
//! - macOS: Uses `lsof` and `ps` commands
//! - Linux: Uses `ss`, `ps` and `/proc`

// Hexagonal architecture layers
pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub mod config;
pub mod error;

// Re-export domain types (primary API)
pub use domain::{
    sort_listeners, Connection, ConnectionState, Listener, ProcessInfo, Protocol, ResourceStats,
    ScanResult, SortKey, TerminationSignal,
};

// Re-export other commonly used types
pub use adapters::{Platform, PortScanner, ScanOptions, SystemRunner};
#[cfg(unix)]
pub use adapters::NixSignaler;
pub use application::{
    wait_for_port, PortWatchFrame, PortWatchState, ProcessTerminator, StatChanges,
    TerminateOutcome, TerminatePlan, WaitOptions, WaitOutcome, WatchConfig, WatchSnapshot,
    WatchState,
};
pub use config::{ConfigStore, Settings};
pub use error::{Error, Result};
pub use ports::{CommandOutput, CommandRunner, ProcessSignaler, Scanner};
