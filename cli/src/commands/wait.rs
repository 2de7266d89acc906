//! Wait command - block until a port is in use or free.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result};
use portwarden_core::{wait_for_port, WaitOptions, WaitOutcome};
use tokio::process::Command;
use tracing::debug;

use super::Context;
use crate::output::format_elapsed;

#[derive(Debug, Clone)]
pub struct WaitArgs {
    pub port: u16,
    pub timeout: Option<Duration>,
    pub interval: Option<Duration>,
    pub invert: bool,
    pub quiet: bool,
    pub exec: Option<String>,
}

pub async fn run(ctx: &Context, args: WaitArgs) -> Result<ExitCode> {
    let scanner = ctx.scanner()?;
    let options = WaitOptions {
        timeout: args.timeout.unwrap_or_else(|| ctx.settings.wait_timeout()),
        interval: args.interval.unwrap_or_else(|| ctx.settings.wait_interval()),
        invert: args.invert,
    };

    if !args.quiet {
        if args.invert {
            println!("Waiting for port {} to be free...", args.port);
        } else {
            println!("Waiting for port {}...", args.port);
        }
    }

    let outcome = wait_for_port(&scanner, args.port, options).await;

    if !args.quiet {
        println!("{}", report(args.port, args.invert, &outcome));
    }
    if !outcome.success {
        return Ok(ExitCode::from(1));
    }

    match args.exec {
        Some(command) => Ok(ExitCode::from(run_hook(&command).await?)),
        None => Ok(ExitCode::SUCCESS),
    }
}

fn report(port: u16, invert: bool, outcome: &WaitOutcome) -> String {
    if !outcome.success {
        let state = if invert {
            "is still in use."
        } else {
            "is not available."
        };
        return format!("Timeout: port {} {}", port, state);
    }

    let elapsed = format_elapsed(outcome.elapsed);
    if invert {
        return format!("✓ Port {} is now free after {}", port, elapsed);
    }
    match &outcome.process_name {
        Some(name) => format!("✓ Port {} is now open ({}) after {}", port, name, elapsed),
        None => format!("✓ Port {} is now open after {}", port, elapsed),
    }
}

/// Run `command` through `sh -c` with inherited stdio; its exit code becomes ours.
async fn run_hook(command: &str) -> Result<u8> {
    debug!(command = %command, "Running post-wait command");
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .await
        .with_context(|| format!("Failed to run '{}'", command))?;

    // Killed by a signal: no code to forward
    let code = status.code().unwrap_or(1);
    Ok(code.clamp(0, 255) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool, process_name: Option<&str>) -> WaitOutcome {
        WaitOutcome {
            success,
            elapsed: Duration::from_millis(1234),
            process_name: process_name.map(str::to_string),
        }
    }

    #[test]
    fn test_report_timeout() {
        assert_eq!(
            report(3000, false, &outcome(false, None)),
            "Timeout: port 3000 is not available."
        );
        assert_eq!(
            report(3000, true, &outcome(false, None)),
            "Timeout: port 3000 is still in use."
        );
    }

    #[test]
    fn test_report_success() {
        assert_eq!(
            report(5432, false, &outcome(true, Some("postgres"))),
            "✓ Port 5432 is now open (postgres) after 1.234s"
        );
        assert_eq!(
            report(5432, false, &outcome(true, None)),
            "✓ Port 5432 is now open after 1.234s"
        );
        assert_eq!(
            report(5432, true, &outcome(true, None)),
            "✓ Port 5432 is now free after 1.234s"
        );
    }

    #[tokio::test]
    async fn test_hook_exit_code_is_forwarded() {
        assert_eq!(run_hook("exit 0").await.unwrap(), 0);
        assert_eq!(run_hook("exit 7").await.unwrap(), 7);
    }
}
