//! Linux socket enumeration using ss.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{ConnectionState, Protocol};

use super::utils::Utils;
use super::SocketEntry;

fn users_regex() -> Option<&'static Regex> {
    static USERS: OnceLock<Option<Regex>> = OnceLock::new();
    USERS
        .get_or_init(|| Regex::new(r#"users:\(\("(.+?)",pid=(\d+),fd=(\d+)\)"#).ok())
        .as_ref()
}

/// Arguments for a full socket listing.
///
/// Both tables are always requested so the Netid column is present;
/// protocol filtering happens after parsing.
pub(super) fn list_args() -> Vec<String> {
    vec!["-Htuanp".to_string()]
}

/// Arguments for a single-port query (`ss` filter on the source port).
pub(super) fn port_args(port: u16) -> Vec<String> {
    vec![
        "-Htuanp".to_string(),
        "sport".to_string(),
        "=".to_string(),
        format!(":{}", port),
    ]
}

/// Parse ss output into socket entries.
///
/// Expected ss output format:
/// ```text
/// tcp   LISTEN 0      4096   [::ffff:127.0.0.1]:63342       *:*    users:(("rustrover",pid=53561,fd=54))
/// tcp   ESTAB  0      0            10.0.0.5:22       10.0.0.9:50123 users:(("sshd",pid=901,fd=4))
/// ```
///
/// Sockets whose owner is not visible (no process column) keep
/// `pid = None`.
pub(super) fn parse_ss(output: &str) -> Vec<SocketEntry> {
    let mut entries = Vec::new();

    for line in output.lines() {
        // Parse columns: [Netid] [State] [Recv-Q] [Send-Q] [Local] [Peer] [Process]
        let components: Vec<&str> = line.split_whitespace().collect();
        if components.len() < 6 {
            continue;
        }

        let Some(protocol) = Protocol::parse(components[0]) else {
            continue;
        };
        let state = ConnectionState::parse(components[1]);

        let Some((local_addr, local_port)) = Utils::parse_address(components[4]) else {
            continue;
        };
        let remote = Utils::parse_address(components[5]);

        let process_column = components[6..].join(" ");
        let owner = users_regex().and_then(|re| re.captures(&process_column));
        let (command, pid) = match owner {
            Some(caps) => (Some(caps[1].to_string()), caps[2].parse().ok()),
            None => (None, None),
        };

        entries.push(SocketEntry {
            command,
            pid,
            user: None,
            protocol,
            local_addr,
            local_port,
            remote,
            state,
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    const SS_OUTPUT: &str = r#"tcp   LISTEN 0      4096   [::ffff:127.0.0.1]:63342       *:*    users:(("rustrover",pid=53561,fd=54))
tcp   LISTEN 0      128           0.0.0.0:22        0.0.0.0:*    users:(("sshd",pid=812,fd=3))
tcp   ESTAB  0      0            10.0.0.5:22       10.0.0.9:50123 users:(("sshd",pid=901,fd=4))
udp   UNCONN 0      0       127.0.0.53%lo:53        0.0.0.0:*
tcp   LISTEN 0      511                 *:8080            *:*
"#;

    #[test]
    fn test_parse_ss_output() {
        let entries = parse_ss(SS_OUTPUT);
        assert_eq!(entries.len(), 5);

        assert_eq!(entries[0].command.as_deref(), Some("rustrover"));
        assert_eq!(entries[0].pid, Some(53561));
        assert_eq!(entries[0].local_addr, "::ffff:127.0.0.1");
        assert_eq!(entries[0].local_port, 63342);
        assert_eq!(entries[0].state, ConnectionState::Listen);
        assert_eq!(entries[0].remote, None);
    }

    #[test]
    fn test_established_is_normalized() {
        let entries = parse_ss(SS_OUTPUT);
        assert_eq!(entries[2].state, ConnectionState::Established);
        assert_eq!(entries[2].remote, Some(("10.0.0.9".to_string(), 50123)));
    }

    #[test]
    fn test_missing_process_column() {
        let entries = parse_ss(SS_OUTPUT);

        assert_eq!(entries[3].protocol, Protocol::Udp);
        assert_eq!(entries[3].local_addr, "127.0.0.53");
        assert_eq!(entries[3].pid, None);
        assert_eq!(entries[3].command, None);

        assert_eq!(entries[4].local_addr, "0.0.0.0");
        assert_eq!(entries[4].local_port, 8080);
        assert_eq!(entries[4].pid, None);
    }

    #[test]
    fn test_skips_header_and_short_lines() {
        let output = "Netid State Recv-Q Send-Q Local Address:Port Peer Address:Port Process\n\
                      tcp LISTEN 0\n";
        assert!(parse_ss(output).is_empty());
    }
}
