//! Find command - search listeners by name, user, port or PID.

use std::process::ExitCode;

use anyhow::Result;
use portwarden_core::{sort_listeners, Scanner};

use super::Context;
use crate::output;

pub async fn run(ctx: &Context, pattern: &str) -> Result<ExitCode> {
    let scanner = ctx.scanner()?;
    let found = scanner.find_by_pattern(pattern).await?;
    let mut result = scanner.stamp(found);
    sort_listeners(&mut result.listeners, ctx.sort_key());

    if ctx.opts.json {
        println!("{}", output::json_listing(&result)?);
        return Ok(ExitCode::SUCCESS);
    }

    if result.listeners.is_empty() {
        println!("No ports found matching '{}'", pattern);
        return Ok(ExitCode::SUCCESS);
    }

    print!("{}", ctx.formatter().format(&result.listeners));
    Ok(ExitCode::SUCCESS)
}
