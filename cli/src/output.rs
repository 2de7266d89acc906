//! Plain-text and JSON rendering of scan results.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::Local;
use portwarden_core::{Listener, ScanResult};

/// Renders listener tables and single-port details.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableFormatter {
    pub no_header: bool,
}

impl TableFormatter {
    pub fn new(no_header: bool) -> Self {
        Self { no_header }
    }

    pub fn format(&self, listeners: &[Listener]) -> String {
        if listeners.is_empty() {
            return "No listening ports found.\n".to_string();
        }

        let mut out = String::new();
        if !self.no_header {
            let _ = writeln!(
                out,
                "{:<8} {:<8} {:<8} {:<10} {:<24} {:<7} {}",
                "PORT", "PROTO", "PID", "USER", "COMMAND", "CONNS", "UPTIME"
            );
        }

        for l in listeners {
            let pid = l.pid.map_or_else(|| "-".to_string(), |p| p.to_string());
            let (user, command, uptime) = match &l.process {
                Some(p) => (
                    non_empty(&p.user),
                    non_empty(p.display_name()),
                    if p.uptime_seconds > 0 {
                        format_duration(p.uptime_seconds)
                    } else {
                        "-".to_string()
                    },
                ),
                None => ("-".to_string(), "-".to_string(), "-".to_string()),
            };

            let _ = writeln!(
                out,
                "{:<8} {:<8} {:<8} {:<10} {:<24} {:<7} {}",
                l.port,
                l.protocol,
                pid,
                truncate(&user, 10),
                truncate(&command, 24),
                l.connection_count,
                uptime
            );
        }

        out
    }

    pub fn format_detail(&self, l: &Listener) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Port {}", l.port);
        let _ = writeln!(out, "{}\n", "═".repeat(63));

        let _ = writeln!(out, "Process");
        match &l.process {
            Some(p) => {
                let _ = writeln!(out, "  PID:         {}", p.pid);
                let _ = writeln!(out, "  Command:     {}", p.display_name());
                if !p.cmdline.is_empty() {
                    let _ = writeln!(out, "  Full:        {}", p.cmdline.join(" "));
                }
                match p.uid {
                    Some(uid) => {
                        let _ = writeln!(out, "  User:        {} (uid: {})", p.user, uid);
                    }
                    None => {
                        let _ = writeln!(out, "  User:        {}", p.user);
                    }
                }
                if let Some(start) = p.start_time {
                    let _ = writeln!(
                        out,
                        "  Started:     {} ({} ago)",
                        start.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                        format_duration(p.uptime_seconds)
                    );
                } else if p.uptime_seconds > 0 {
                    let _ = writeln!(out, "  Uptime:      {}", format_duration(p.uptime_seconds));
                }
            }
            None => {
                if let Some(pid) = l.pid {
                    let _ = writeln!(out, "  PID:         {}", pid);
                }
                let _ = writeln!(out, "  (permission denied or process info unavailable)");
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Listening");
        let address = if l.address == "0.0.0.0" || l.address == "::" {
            format!("{} (all interfaces)", l.address)
        } else {
            l.address.clone()
        };
        let _ = writeln!(out, "  Address:     {}:{}", address, l.port);
        let _ = writeln!(out, "  Protocol:    {}", l.protocol.as_str().to_uppercase());

        if !l.connections.is_empty() {
            let _ = writeln!(out, "\nConnections ({} established)", l.connections.len());
            let _ = writeln!(out, "  {:<42} {:<14} {}", "REMOTE ADDRESS", "STATE", "DURATION");
            for c in &l.connections {
                let remote = format!("{}:{}", c.remote_addr, c.remote_port);
                let duration = match c.duration_seconds {
                    Some(secs) if secs > 0 => format_duration(secs),
                    _ => "-".to_string(),
                };
                let _ = writeln!(out, "  {:<42} {:<14} {}", remote, c.state, duration);
            }
        }

        if let Some(stats) = &l.stats {
            let _ = writeln!(out, "\nProcess Stats");
            let _ = writeln!(out, "  Memory:      {} (RSS)", format_bytes(stats.memory_rss));
            let _ = writeln!(out, "  CPU:         {:.1}%", stats.cpu_percent);
            let _ = writeln!(out, "  FDs:         {} open", stats.fd_count);
            let _ = writeln!(out, "  Threads:     {}", stats.thread_count);
        }

        out
    }
}

/// Pretty JSON for a full listing.
pub fn json_listing(result: &ScanResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

/// Pretty JSON for one port; `{}` when unused.
pub fn json_detail(listener: Option<&Listener>) -> serde_json::Result<String> {
    match listener {
        Some(l) => serde_json::to_string_pretty(l),
        None => Ok("{}".to_string()),
    }
}

fn non_empty(s: &str) -> String {
    if s.is_empty() {
        "-".to_string()
    } else {
        s.to_string()
    }
}

/// Shorten `s` to at most `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let head: String = s.chars().take(max - 3).collect();
    format!("{}...", head)
}

/// Human-readable size: `512 B`, `1.5 KB`, `2.0 GB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    let suffix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, suffix)
}

/// Compact duration: `45s`, `2m5s`, `26h3m4s`.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Elapsed wall time rounded to milliseconds: `150ms`, `1.234s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.3}s", millis as f64 / 1000.0)
    }
}
