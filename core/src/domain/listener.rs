//! Listener, process and connection domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Protocol
// ============================================================================

/// Transport protocol of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Parse a protocol token as printed by lsof (`TCP`) or ss (`tcp`, `udp6`).
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "tcp" | "tcp4" | "tcp6" => Some(Protocol::Tcp),
            "udp" | "udp4" | "udp6" => Some(Protocol::Udp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ConnectionState
// ============================================================================

/// TCP socket state, normalised across lsof and ss spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Listen,
    Established,
    SynSent,
    SynReceived,
    FinWait1,
    FinWait2,
    TimeWait,
    CloseWait,
    LastAck,
    Closing,
    Closed,
    /// Unconnected datagram socket (`UNCONN` in ss).
    Unconnected,
    Unknown,
}

impl ConnectionState {
    /// Parse a state token such as `LISTEN`, `(ESTABLISHED)`, `ESTAB` or `TIME-WAIT`.
    pub fn parse(token: &str) -> Self {
        let token = token
            .trim_matches(|c| c == '(' || c == ')')
            .to_ascii_uppercase()
            .replace('-', "_");

        match token.as_str() {
            "LISTEN" => ConnectionState::Listen,
            "ESTABLISHED" | "ESTAB" => ConnectionState::Established,
            "SYN_SENT" => ConnectionState::SynSent,
            "SYN_RECV" | "SYN_RECEIVED" => ConnectionState::SynReceived,
            "FIN_WAIT1" | "FIN_WAIT_1" => ConnectionState::FinWait1,
            "FIN_WAIT2" | "FIN_WAIT_2" => ConnectionState::FinWait2,
            "TIME_WAIT" => ConnectionState::TimeWait,
            "CLOSE_WAIT" => ConnectionState::CloseWait,
            "LAST_ACK" => ConnectionState::LastAck,
            "CLOSING" => ConnectionState::Closing,
            "CLOSED" => ConnectionState::Closed,
            "UNCONN" => ConnectionState::Unconnected,
            _ => ConnectionState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Listen => "LISTEN",
            ConnectionState::Established => "ESTABLISHED",
            ConnectionState::SynSent => "SYN_SENT",
            ConnectionState::SynReceived => "SYN_RECEIVED",
            ConnectionState::FinWait1 => "FIN_WAIT1",
            ConnectionState::FinWait2 => "FIN_WAIT2",
            ConnectionState::TimeWait => "TIME_WAIT",
            ConnectionState::CloseWait => "CLOSE_WAIT",
            ConnectionState::LastAck => "LAST_ACK",
            ConnectionState::Closing => "CLOSING",
            ConnectionState::Closed => "CLOSED",
            ConnectionState::Unconnected => "UNCONNECTED",
            ConnectionState::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ProcessInfo
// ============================================================================

/// The process owning a listening socket, as observed during one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
    /// Process ID.
    pub pid: u32,
    /// Short process name as reported by the enumeration utility.
    pub name: String,
    /// Full command line, truncated for display.
    pub command: String,
    /// Argument vector.
    #[serde(default)]
    pub cmdline: Vec<String>,
    /// Owning user name.
    pub user: String,
    /// Owning numeric user ID, if it could be resolved.
    #[serde(default)]
    pub uid: Option<u32>,
    /// Wall-clock start time derived from the elapsed time.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Seconds since the process started.
    pub uptime_seconds: u64,
}

impl ProcessInfo {
    /// Create a process record carrying only what the enumeration utility reported.
    pub fn new(pid: u32, name: impl Into<String>, user: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            pid,
            command: name.clone(),
            name,
            cmdline: Vec::new(),
            user: user.into(),
            uid: None,
            start_time: None,
            uptime_seconds: 0,
        }
    }

    /// Name to show a human: the command when known, otherwise the bare name.
    pub fn display_name(&self) -> &str {
        if self.command.is_empty() {
            &self.name
        } else {
            &self.command
        }
    }
}

// ============================================================================
// Connection / ResourceStats
// ============================================================================

/// An established connection accepted on a listening port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub local_addr: String,
    pub local_port: u16,
    pub remote_addr: String,
    pub remote_port: u16,
    pub state: ConnectionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

/// Resource usage of the owning process. Only collected for detail queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStats {
    /// Resident set size in bytes.
    #[serde(rename = "memoryRSS")]
    pub memory_rss: u64,
    pub cpu_percent: f64,
    pub fd_count: u32,
    pub thread_count: u32,
}

// ============================================================================
// Listener
// ============================================================================

/// A listening endpoint and the process that owns it.
///
/// At most one `Listener` exists per port within a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listener {
    pub port: u16,
    pub protocol: Protocol,
    /// Bound address; the wildcard is normalised to `0.0.0.0`.
    pub address: String,
    /// Owning PID, `None` when the owner could not be identified.
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<Connection>,
    /// Number of established connections, counted even when `connections` is not collected.
    pub connection_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ResourceStats>,
}

impl Listener {
    pub fn new(port: u16, protocol: Protocol, address: impl Into<String>, pid: Option<u32>) -> Self {
        Self {
            port,
            protocol,
            address: address.into(),
            pid,
            process: None,
            connections: Vec::new(),
            connection_count: 0,
            stats: None,
        }
    }

    pub fn with_process(mut self, process: ProcessInfo) -> Self {
        self.process = Some(process);
        self
    }

    pub fn with_connection_count(mut self, count: usize) -> Self {
        self.connection_count = count;
        self
    }

    /// Short process name, if the owner is known.
    pub fn process_name(&self) -> Option<&str> {
        self.process.as_ref().map(|p| p.name.as_str())
    }

    pub fn user(&self) -> Option<&str> {
        self.process.as_ref().map(|p| p.user.as_str())
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.process.as_ref().map_or(0, |p| p.uptime_seconds)
    }

    /// Whether this listener matches a search pattern.
    ///
    /// A numeric pattern matches by port or by PID; independently, any pattern
    /// matches case-insensitively as a substring of the process name, command or user.
    pub fn matches_pattern(&self, pattern: &str) -> bool {
        if let Ok(number) = pattern.trim().parse::<u32>() {
            if u32::from(self.port) == number || self.pid == Some(number) {
                return true;
            }
        }

        let Some(process) = &self.process else {
            return false;
        };

        let needle = pattern.to_lowercase();
        process.name.to_lowercase().contains(&needle)
            || process.command.to_lowercase().contains(&needle)
            || process.user.to_lowercase().contains(&needle)
    }
}

impl std::fmt::Display for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.protocol, self.address, self.port)?;
        match (&self.pid, self.process_name()) {
            (Some(pid), Some(name)) => write!(f, " (PID: {}, Process: {})", pid, name),
            (Some(pid), None) => write!(f, " (PID: {})", pid),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// ScanResult
// ============================================================================

/// One snapshot of listeners, as handed to formatters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub listeners: Vec<Listener>,
    pub scan_time: DateTime<Utc>,
    pub platform: String,
    pub hostname: String,
}

impl ScanResult {
    pub fn new(listeners: Vec<Listener>, platform: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            listeners,
            scan_time: Utc::now(),
            platform: platform.into(),
            hostname: hostname.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nginx() -> Listener {
        Listener::new(80, Protocol::Tcp, "0.0.0.0", Some(443))
            .with_process(ProcessInfo::new(443, "nginx", "www-data"))
    }

    #[test]
    fn test_protocol_parse() {
        assert_eq!(Protocol::parse("TCP"), Some(Protocol::Tcp));
        assert_eq!(Protocol::parse("udp6"), Some(Protocol::Udp));
        assert_eq!(Protocol::parse("IPv4"), None);
    }

    #[test]
    fn test_connection_state_parse() {
        assert_eq!(ConnectionState::parse("(LISTEN)"), ConnectionState::Listen);
        assert_eq!(ConnectionState::parse("ESTAB"), ConnectionState::Established);
        assert_eq!(ConnectionState::parse("(ESTABLISHED)"), ConnectionState::Established);
        assert_eq!(ConnectionState::parse("TIME-WAIT"), ConnectionState::TimeWait);
        assert_eq!(ConnectionState::parse("bogus"), ConnectionState::Unknown);
    }

    #[test]
    fn test_display_name_prefers_command() {
        let mut process = ProcessInfo::new(1, "node", "dev");
        process.command = "node server.js".to_string();
        assert_eq!(process.display_name(), "node server.js");

        process.command.clear();
        assert_eq!(process.display_name(), "node");
    }

    #[test]
    fn test_matches_pattern_by_port_or_pid() {
        let listener = nginx();
        // 443 is the PID here, not the port.
        assert!(listener.matches_pattern("443"));
        assert!(listener.matches_pattern("80"));
        assert!(!listener.matches_pattern("8080"));
    }

    #[test]
    fn test_matches_pattern_substring() {
        let listener = nginx();
        assert!(listener.matches_pattern("NGI"));
        assert!(listener.matches_pattern("www"));
        assert!(!listener.matches_pattern("postgres"));
    }

    #[test]
    fn test_numeric_pattern_still_matches_substrings() {
        let listener = Listener::new(5000, Protocol::Tcp, "127.0.0.1", Some(9))
            .with_process(ProcessInfo::new(9, "python3", "dev"));
        assert!(listener.matches_pattern("3"));
    }

    #[test]
    fn test_unknown_owner_only_matches_numbers() {
        let listener = Listener::new(22, Protocol::Tcp, "0.0.0.0", None);
        assert!(listener.matches_pattern("22"));
        assert!(!listener.matches_pattern("sshd"));
    }

    #[test]
    fn test_listener_json_shape() {
        let listener = nginx().with_connection_count(3);
        let json = serde_json::to_value(&listener).unwrap();
        assert_eq!(json["port"], 80);
        assert_eq!(json["protocol"], "tcp");
        assert_eq!(json["connectionCount"], 3);
        assert_eq!(json["process"]["uptimeSeconds"], 0);
        assert!(json.get("connections").is_none());
        assert!(json.get("stats").is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(nginx().to_string(), "tcp/0.0.0.0:80 (PID: 443, Process: nginx)");
    }
}
