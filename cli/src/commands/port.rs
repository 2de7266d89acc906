//! Port command - details for a single port, optionally live.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use portwarden_core::Scanner;

use super::Context;
use crate::output;
use crate::tui;

pub async fn run(
    ctx: &Context,
    port: u16,
    watch: bool,
    interval: Option<Duration>,
) -> Result<ExitCode> {
    let scanner = ctx.scanner()?;

    if watch {
        let interval = interval.unwrap_or_else(|| ctx.settings.watch_interval());
        tui::watch_port(&scanner, port, interval).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let listener = scanner.get_port(port).await?;

    if ctx.opts.json {
        println!("{}", output::json_detail(listener.as_ref())?);
        return Ok(ExitCode::SUCCESS);
    }

    match listener {
        Some(l) => print!("{}", ctx.formatter().format_detail(&l)),
        None => println!("Port {} is not in use.", port),
    }
    Ok(ExitCode::SUCCESS)
}
