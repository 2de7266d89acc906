//! Pid command - list every port a process listens on.

use std::process::ExitCode;

use anyhow::Result;
use portwarden_core::sort_listeners;

use super::Context;
use crate::output;

pub async fn run(ctx: &Context, pid: u32) -> Result<ExitCode> {
    let scanner = ctx.scanner()?;
    let mut result = scanner.scan().await?;
    result.listeners.retain(|l| l.pid == Some(pid));
    sort_listeners(&mut result.listeners, ctx.sort_key());

    if ctx.opts.json {
        println!("{}", output::json_listing(&result)?);
        return Ok(ExitCode::SUCCESS);
    }

    if result.listeners.is_empty() {
        println!("No ports found for PID {}", pid);
        return Ok(ExitCode::SUCCESS);
    }

    print!("{}", ctx.formatter().format(&result.listeners));
    Ok(ExitCode::SUCCESS)
}
