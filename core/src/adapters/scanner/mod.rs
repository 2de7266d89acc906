//! Port scanner adapter.
//!
//! Enumerates sockets with the platform's utility (`lsof` on macOS, `ss` on
//! Linux), then correlates them with their owning processes. All external
//! programs go through a [`CommandRunner`], so both pipelines can be driven
//! from canned output on any host.

mod builder;
mod darwin;
mod linux;
mod probe;
mod utils;

use tracing::{debug, warn};

use crate::domain::{ConnectionState, Listener, Protocol, ScanResult};
use crate::error::{Error, Result};
use crate::ports::{CommandOutput, CommandRunner, Scanner};

use super::SystemRunner;
use builder::ListenerBuilder;

// ============================================================================
// Platform
// ============================================================================

/// Operating system families with a known socket enumeration pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Darwin,
    Linux,
}

impl Platform {
    /// The platform this binary runs on.
    pub fn current() -> Result<Self> {
        Self::from_name(std::env::consts::OS)
    }

    pub fn from_name(os: &str) -> Result<Self> {
        match os {
            "macos" | "darwin" => Ok(Platform::Darwin),
            "linux" => Ok(Platform::Linux),
            other => Err(Error::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Darwin => "darwin",
            Platform::Linux => "linux",
        }
    }

    fn list_command(&self, options: &ScanOptions) -> (&'static str, Vec<String>) {
        match self {
            Platform::Darwin => ("lsof", darwin::list_args(options.include_tcp, options.include_udp)),
            Platform::Linux => ("ss", linux::list_args()),
        }
    }

    fn port_command(&self, port: u16) -> (&'static str, Vec<String>) {
        match self {
            Platform::Darwin => ("lsof", darwin::port_args(port)),
            Platform::Linux => ("ss", linux::port_args(port)),
        }
    }

    fn parse(&self, output: &str) -> Vec<SocketEntry> {
        match self {
            Platform::Darwin => darwin::parse_lsof(output),
            Platform::Linux => linux::parse_ss(output),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Raw entries / options
// ============================================================================

/// One socket line from the enumeration utility, before correlation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SocketEntry {
    /// Short command name; `None` when the owner is not visible.
    pub command: Option<String>,
    pub pid: Option<u32>,
    pub user: Option<String>,
    pub protocol: Protocol,
    pub local_addr: String,
    pub local_port: u16,
    pub remote: Option<(String, u16)>,
    pub state: ConnectionState,
}

/// Which sockets a listing keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub include_tcp: bool,
    pub include_udp: bool,
    pub include_ipv6: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            include_tcp: true,
            include_udp: true,
            include_ipv6: true,
        }
    }
}

impl ScanOptions {
    fn admits(&self, listener: &Listener) -> bool {
        let protocol_ok = match listener.protocol {
            Protocol::Tcp => self.include_tcp,
            Protocol::Udp => self.include_udp,
        };
        protocol_ok && (self.include_ipv6 || !listener.address.contains(':'))
    }
}

// ============================================================================
// PortScanner
// ============================================================================

/// The main port scanner, parameterized over how utilities are run.
pub struct PortScanner<R = SystemRunner> {
    platform: Platform,
    options: ScanOptions,
    runner: R,
}

impl PortScanner<SystemRunner> {
    /// Create a scanner for the current platform.
    pub fn new(options: ScanOptions) -> Result<Self> {
        Ok(Self::with_runner(Platform::current()?, options, SystemRunner::new()))
    }
}

impl<R: CommandRunner> PortScanner<R> {
    pub fn with_runner(platform: Platform, options: ScanOptions, runner: R) -> Self {
        Self {
            platform,
            options,
            runner,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.run(program, &args).await
    }

    /// A full listing stamped with time, platform and hostname.
    pub async fn scan(&self) -> Result<ScanResult> {
        let listeners = self.list_listeners().await?;
        Ok(self.stamp(listeners))
    }

    /// Wrap listeners from any query in a [`ScanResult`] for this host.
    pub fn stamp(&self, listeners: Vec<Listener>) -> ScanResult {
        ScanResult::new(listeners, self.platform.name(), hostname())
    }
}

impl<R: CommandRunner> Scanner for PortScanner<R> {
    async fn list_listeners(&self) -> Result<Vec<Listener>> {
        let (program, args) = self.platform.list_command(&self.options);
        // lsof exits 1 when nothing matches; the output is still authoritative
        let output = self.run(program, &args).await?;

        let entries = self.platform.parse(&output.stdout);
        debug!(platform = %self.platform, entries = entries.len(), "enumerated sockets");

        let mut listeners = ListenerBuilder::new(&self.runner, self.platform)
            .build_listeners(&entries)
            .await;
        listeners.retain(|l| self.options.admits(l));
        Ok(listeners)
    }

    async fn get_port(&self, port: u16) -> Result<Option<Listener>> {
        let (program, args) = self.platform.port_command(port);
        let output = self.run(program, &args).await?;
        if !output.success {
            debug!(port = port, "port query exited non-zero; treating as unused");
            return Ok(None);
        }

        let entries = self.platform.parse(&output.stdout);
        Ok(ListenerBuilder::new(&self.runner, self.platform)
            .build_port_detail(&entries, port)
            .await)
    }
}

#[cfg(unix)]
fn hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!(error = %e, "failed to read hostname");
            String::new()
        }
    }
}

#[cfg(not(unix))]
fn hostname() -> String {
    String::new()
}
