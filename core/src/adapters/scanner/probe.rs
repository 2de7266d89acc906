//! Per-process enrichment: identity summary and resource statistics.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::{ProcessInfo, ResourceStats};
use crate::ports::CommandRunner;

use super::utils::Utils;
use super::Platform;

/// What one `ps` probe reports about a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ProcessSummary {
    pub uptime_seconds: u64,
    pub uid: Option<u32>,
    pub user: String,
    pub args: Vec<String>,
}

impl ProcessSummary {
    /// Enrich `process` in place; `now` anchors the derived start time.
    pub fn apply(&self, process: &mut ProcessInfo, now: DateTime<Utc>) {
        process.uptime_seconds = self.uptime_seconds;
        process.start_time = i64::try_from(self.uptime_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|elapsed| now.checked_sub_signed(elapsed));
        process.uid = self.uid;
        if process.user.is_empty() {
            process.user = self.user.clone();
        }
        if !self.args.is_empty() {
            process.command = Utils::truncate_command(&self.args.join(" "));
            process.cmdline = self.args.clone();
        }
    }
}

/// Parse a `ps` elapsed-time value into seconds.
///
/// Accepts `[[DD-]HH:]MM:SS`. Components that fail to parse count as zero.
pub fn parse_elapsed(value: &str) -> u64 {
    let value = value.trim();
    let (days, clock) = match value.split_once('-') {
        Some((days, clock)) => (days.parse::<u64>().unwrap_or(0), clock),
        None => (0, value),
    };

    let parts: Vec<u64> = clock
        .split(':')
        .map(|p| p.parse::<u64>().unwrap_or(0))
        .collect();

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => (0, 0, 0),
    };

    days * 86_400 + hours * 3_600 + minutes * 60 + seconds
}

/// Parse `ps -o etime=,uid=,user=,args=` output.
fn parse_summary(output: &str) -> Option<ProcessSummary> {
    let line = output.lines().find(|l| !l.trim().is_empty())?;
    let mut fields = line.split_whitespace();

    let uptime_seconds = parse_elapsed(fields.next()?);
    let uid = fields.next()?.parse().ok();
    let user = fields.next()?.to_string();
    let args = fields.map(str::to_string).collect();

    Some(ProcessSummary {
        uptime_seconds,
        uid,
        user,
        args,
    })
}

/// Parse `ps -o rss=,%cpu=` output into (bytes, percent).
fn parse_usage(output: &str) -> Option<(u64, f64)> {
    let line = output.lines().find(|l| !l.trim().is_empty())?;
    let mut fields = line.split_whitespace();
    let rss_kib: u64 = fields.next()?.parse().ok()?;
    let cpu: f64 = fields.next()?.parse().ok()?;
    Some((rss_kib * 1024, cpu))
}

/// Runs the per-pid utilities. Every failure degrades to "no data".
pub(super) struct ProcessProbe<'a, R> {
    runner: &'a R,
    platform: Platform,
}

impl<'a, R: CommandRunner> ProcessProbe<'a, R> {
    pub fn new(runner: &'a R, platform: Platform) -> Self {
        Self { runner, platform }
    }

    async fn capture(&self, program: &str, args: &[&str]) -> Option<String> {
        match self.runner.run(program, args).await {
            Ok(output) => Some(output.stdout),
            Err(e) => {
                debug!(program = program, error = %e, "probe command failed");
                None
            }
        }
    }

    /// Uptime, uid, user and argument vector for `pid`.
    pub async fn summary(&self, pid: u32) -> Option<ProcessSummary> {
        let pid_arg = pid.to_string();
        let output = self
            .capture("ps", &["-o", "etime=,uid=,user=,args=", "-p", &pid_arg])
            .await?;
        parse_summary(&output)
    }

    /// Memory, CPU, descriptor and thread counts for `pid`.
    pub async fn stats(&self, pid: u32) -> ResourceStats {
        let pid_arg = pid.to_string();
        let mut stats = ResourceStats::default();

        if let Some(output) = self.capture("ps", &["-o", "rss=,%cpu=", "-p", &pid_arg]).await {
            if let Some((rss, cpu)) = parse_usage(&output) {
                stats.memory_rss = rss;
                stats.cpu_percent = cpu;
            }
        }

        stats.fd_count = match self.platform {
            Platform::Darwin => self
                .capture("lsof", &["-p", &pid_arg])
                .await
                .map_or(0, |o| Utils::count_rows(&o, 1)),
            Platform::Linux => {
                let fd_dir = format!("/proc/{}/fd", pid);
                self.capture("ls", &["-1", &fd_dir])
                    .await
                    .map_or(0, |o| Utils::count_rows(&o, 0))
            }
        };

        let thread_flag = match self.platform {
            Platform::Darwin => "-M",
            Platform::Linux => "-T",
        };
        stats.thread_count = self
            .capture("ps", &[thread_flag, "-p", &pid_arg])
            .await
            .map_or(0, |o| Utils::count_rows(&o, 1));

        stats
    }
}
