//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces that the application layer uses
//! to interact with external systems. Implementations live in `adapters`.

mod runner;
mod scanner;
mod signaler;

pub use runner::{CommandOutput, CommandRunner};
pub use scanner::Scanner;
pub use signaler::ProcessSignaler;
