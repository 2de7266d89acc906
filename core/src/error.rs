//! Error types for the portwarden-core library.

use thiserror::Error;

/// Result type alias for portwarden operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scanning ports and managing processes.
#[derive(Error, Debug)]
pub enum Error {
    /// An external utility could not be launched.
    #[error("Command execution failed: {0}")]
    Execution(String),

    /// Failed to decode command output.
    #[error("Failed to parse output: {0}")]
    Parse(String),

    /// The target process does not exist.
    #[error("Process {0} not found")]
    ProcessNotFound(u32),

    /// Not allowed to signal or inspect the target process.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),

    /// Terminal could not be set up or restored.
    #[error("Terminal error: {0}")]
    Terminal(String),
}

impl Error {
    /// Process exit code for this error.
    ///
    /// `1` covers the "not found" family, `2` is permission denied and
    /// everything else is reported as a generic failure (`1`).
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::PermissionDenied(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ProcessNotFound(1234);
        assert!(err.to_string().contains("1234"));

        let err = Error::UnsupportedPlatform("windows".to_string());
        assert_eq!(err.to_string(), "Platform not supported: windows");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::PermissionDenied("pid 1".into()).exit_code(), 2);
        assert_eq!(Error::ProcessNotFound(1).exit_code(), 1);
        assert_eq!(Error::Execution("lsof".into()).exit_code(), 1);
    }
}
