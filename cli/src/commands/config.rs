//! Config command - show or change saved defaults.

use std::process::ExitCode;

use anyhow::Result;
use portwarden_core::{ConfigStore, Settings};

use super::Context;

pub async fn show(ctx: &Context) -> Result<ExitCode> {
    if ctx.opts.json {
        println!("{}", serde_json::to_string_pretty(&ctx.settings)?);
        return Ok(ExitCode::SUCCESS);
    }

    let store = ConfigStore::new()?;
    println!("Config: {}", store.path().display());
    print!("{}", describe(&ctx.settings));
    Ok(ExitCode::SUCCESS)
}

pub async fn set(ctx: &Context, key: &str, value: &str) -> Result<ExitCode> {
    let store = ConfigStore::new()?;
    let settings = store.update(key, value).await?;

    if ctx.opts.json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        println!("Set {} = {}", key, value);
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn path() -> Result<ExitCode> {
    let store = ConfigStore::new()?;
    println!("{}", store.path().display());
    Ok(ExitCode::SUCCESS)
}

fn describe(settings: &Settings) -> String {
    format!(
        "  watchIntervalMs: {}\n  sortBy:          {}\n  waitTimeoutMs:   {}\n  waitIntervalMs:  {}\n  killTimeoutMs:   {}\n  includeIpv6:     {}\n",
        settings.watch_interval_ms,
        settings.sort_by.as_str(),
        settings.wait_timeout_ms,
        settings.wait_interval_ms,
        settings.kill_timeout_ms,
        settings.include_ipv6,
    )
}
