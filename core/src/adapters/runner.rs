//! External command runner backed by `tokio::process`.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ports::{CommandOutput, CommandRunner};

/// Runs utilities from `PATH` with stdout captured and stderr discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!(program = program, args = ?args, "running external command");

        let output = Command::new(program)
            .args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Execution(format!("Failed to run {}: {}", program, e)))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_execution_error() {
        let runner = SystemRunner::new();
        let result = runner.run("portwarden-no-such-utility", &[]).await;
        assert!(matches!(result, Err(Error::Execution(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout_and_status() {
        let runner = SystemRunner::new();

        let output = runner.run("sh", &["-c", "echo hello"]).await.unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");

        let output = runner.run("sh", &["-c", "exit 3"]).await.unwrap();
        assert!(!output.success);
    }
}
