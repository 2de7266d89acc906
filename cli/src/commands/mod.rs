//! Command implementations and the state they share.

pub mod config;
pub mod find;
pub mod kill;
pub mod list;
pub mod pid;
pub mod port;
pub mod wait;

use std::convert::Infallible;
use std::time::Duration;

use anyhow::Result;
use portwarden_core::{ConfigStore, PortScanner, ScanOptions, Settings, SortKey, WatchConfig};
use tracing::warn;

use crate::output::TableFormatter;

/// Flags accepted by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalOpts {
    pub json: bool,
    pub no_header: bool,
    pub tcp: bool,
    pub udp: bool,
    pub sort: Option<SortKey>,
}

/// Global flags merged with saved settings. Flags win.
#[derive(Debug, Clone)]
pub struct Context {
    pub opts: GlobalOpts,
    pub settings: Settings,
}

impl Context {
    /// Load saved settings. A missing or unreadable config never blocks a
    /// command; defaults are used instead.
    pub async fn load(opts: GlobalOpts) -> Self {
        let settings = match ConfigStore::new() {
            Ok(store) => match store.load().await {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(path = %store.path().display(), error = %e, "Ignoring unreadable config");
                    Settings::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "No config location available");
                Settings::default()
            }
        };

        Self::new(opts, settings)
    }

    pub fn new(opts: GlobalOpts, settings: Settings) -> Self {
        Self { opts, settings }
    }

    pub fn sort_key(&self) -> SortKey {
        self.opts.sort.unwrap_or(self.settings.sort_by)
    }

    /// `--tcp` drops UDP and `--udp` drops TCP; both together leave nothing.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            include_tcp: !self.opts.udp,
            include_udp: !self.opts.tcp,
            include_ipv6: self.settings.include_ipv6,
        }
    }

    pub fn scanner(&self) -> Result<PortScanner> {
        Ok(PortScanner::new(self.scan_options())?)
    }

    pub fn formatter(&self) -> TableFormatter {
        TableFormatter::new(self.opts.no_header)
    }

    pub fn watch_config(&self, interval: Option<Duration>) -> WatchConfig {
        WatchConfig {
            interval: interval.unwrap_or_else(|| self.settings.watch_interval()),
            sort_by: self.sort_key(),
            tcp_only: self.opts.tcp,
            udp_only: self.opts.udp,
        }
    }
}

/// Parse `1500`, `1500ms`, `2s`, `1.5s`, `5m` or `1h`. A bare number is seconds.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let s = input.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration: {}", input))?;
    let millis = match unit.trim() {
        "ms" => value,
        "" | "s" => value * 1000.0,
        "m" => value * 60_000.0,
        "h" => value * 3_600_000.0,
        other => return Err(format!("unknown duration unit '{}' in {}", other, input)),
    };

    if !millis.is_finite() || millis.round() < 1.0 {
        return Err(format!("duration must be at least 1ms: {}", input));
    }
    Ok(Duration::from_millis(millis.round() as u64))
}

/// Unknown keys fall back to port order.
pub fn parse_sort(input: &str) -> std::result::Result<SortKey, Infallible> {
    Ok(SortKey::from(input))
}
