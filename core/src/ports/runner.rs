//! External command runner port (interface).

use crate::error::Result;

/// Captured result of one external utility invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the utility exited with status zero.
    pub success: bool,
    /// Standard output, lossily decoded.
    pub stdout: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}

/// Port for running external utilities.
///
/// Implementations return `Err(Error::Execution)` only when the program could
/// not be launched at all; a non-zero exit is reported through
/// [`CommandOutput::success`].
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[&str],
    ) -> impl std::future::Future<Output = Result<CommandOutput>> + Send;
}
