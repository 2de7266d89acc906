//! List command - show all listening ports.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use portwarden_core::sort_listeners;

use super::Context;
use crate::output;
use crate::tui;

pub async fn run(ctx: &Context, watch: bool, interval: Option<Duration>) -> Result<ExitCode> {
    let scanner = ctx.scanner()?;

    if watch {
        tui::watch_all(&scanner, ctx.watch_config(interval)).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut result = scanner.scan().await?;
    sort_listeners(&mut result.listeners, ctx.sort_key());

    if ctx.opts.json {
        println!("{}", output::json_listing(&result)?);
    } else {
        print!("{}", ctx.formatter().format(&result.listeners));
    }

    Ok(ExitCode::SUCCESS)
}
