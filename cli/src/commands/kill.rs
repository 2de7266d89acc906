//! Kill command - terminate the process listening on a port.

use std::fmt::Write as _;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use portwarden_core::{
    Error, Listener, Scanner, TerminateOutcome, TerminatePlan, TerminationSignal,
};
use serde_json::json;

use super::Context;
use crate::output::format_duration;
use crate::prompt;

#[derive(Debug, Clone)]
pub struct KillArgs {
    pub port: u16,
    pub yes: bool,
    pub signal: String,
    pub force: bool,
    pub timeout: Option<Duration>,
    pub quiet: bool,
}

pub async fn run(ctx: &Context, args: KillArgs) -> Result<ExitCode> {
    let signal: TerminationSignal = args.signal.parse()?;
    let scanner = ctx.scanner()?;

    let Some(listener) = scanner.get_port(args.port).await? else {
        println!("Port {} is not in use.", args.port);
        return Ok(ExitCode::from(1));
    };

    let Some(pid) = listener.pid else {
        println!(
            "Port {} is in use but its owner is not visible. Try running with sudo.",
            args.port
        );
        return Ok(ExitCode::from(2));
    };

    if !args.yes {
        print!("{}", confirmation(args.port, pid, &listener));
        if !prompt::confirm("Confirm") {
            println!("Aborted.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let grace = args.timeout.unwrap_or_else(|| ctx.settings.kill_timeout());
    let plan = TerminatePlan::new(signal, grace).with_escalation(args.force);
    let chatty = !args.quiet && !ctx.opts.json;

    let outcome = match terminate(pid, &plan).await {
        Ok(outcome) => outcome,
        Err(Error::PermissionDenied(_)) => {
            println!("Permission denied. Try running with sudo.");
            return Ok(ExitCode::from(2));
        }
        Err(Error::ProcessNotFound(_)) => {
            println!("Process {} exited before it could be signaled.", pid);
            return Ok(ExitCode::from(1));
        }
        Err(e) => return Err(e.into()),
    };

    if chatty {
        println!("{}", sent_message(signal, pid));
    }

    if ctx.opts.json {
        let report = json!({
            "port": args.port,
            "pid": pid,
            "signal": signal,
            "outcome": outcome,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if chatty || outcome == TerminateOutcome::StillRunning {
        println!("{}", outcome_message(outcome, grace));
    }

    Ok(ExitCode::from(outcome.exit_code() as u8))
}

#[cfg(unix)]
async fn terminate(pid: u32, plan: &TerminatePlan) -> portwarden_core::Result<TerminateOutcome> {
    use portwarden_core::{NixSignaler, ProcessTerminator};

    ProcessTerminator::new(NixSignaler::new())
        .terminate(pid, plan)
        .await
}

#[cfg(not(unix))]
async fn terminate(_pid: u32, _plan: &TerminatePlan) -> portwarden_core::Result<TerminateOutcome> {
    Err(Error::UnsupportedPlatform(std::env::consts::OS.to_string()))
}

fn confirmation(port: u16, pid: u32, listener: &Listener) -> String {
    let (process, user, uptime) = match &listener.process {
        Some(p) => (p.display_name(), p.user.as_str(), p.uptime_seconds),
        None => ("unknown", "unknown", 0),
    };

    let mut out = String::new();
    let _ = writeln!(out, "Kill process on port {}?", port);
    let _ = writeln!(out, "  Process: {}", process);
    let _ = writeln!(out, "  PID:     {}", pid);
    let _ = writeln!(out, "  User:    {}", user);
    if uptime > 0 {
        let _ = writeln!(out, "  Uptime:  {}", format_duration(uptime));
    }
    let _ = writeln!(out);
    out
}

fn sent_message(signal: TerminationSignal, pid: u32) -> String {
    format!("Sent {} ({}) to PID {}", signal, signal.number(), pid)
}

fn outcome_message(outcome: TerminateOutcome, grace: Duration) -> String {
    match outcome {
        TerminateOutcome::Terminated => "Process terminated.".to_string(),
        TerminateOutcome::Escalated => format!(
            "Process didn't exit within {}, sent SIGKILL. Process killed.",
            format_grace(grace)
        ),
        TerminateOutcome::StillRunning => "Process didn't terminate.".to_string(),
    }
}

/// Whole seconds as `5s` or `1m30s`, anything finer in milliseconds.
fn format_grace(grace: Duration) -> String {
    if grace.subsec_millis() == 0 && grace.as_secs() > 0 {
        format_duration(grace.as_secs())
    } else {
        format!("{}ms", grace.as_millis())
    }
}
