//! macOS socket enumeration using lsof.

use crate::domain::{ConnectionState, Protocol};

use super::utils::Utils;
use super::SocketEntry;

/// Arguments for a full socket listing.
///
/// Flags explained:
/// - -i: Internet sockets only (narrowed to one protocol when asked)
/// - -n: Show IP addresses (don't resolve to hostnames)
/// - -P: Show port numbers (don't resolve to service names)
/// - +c 0: Show full command name (unlimited length)
pub(super) fn list_args(tcp: bool, udp: bool) -> Vec<String> {
    let selector = match (tcp, udp) {
        (true, false) => "-iTCP",
        (false, true) => "-iUDP",
        _ => "-i",
    };
    vec![
        selector.to_string(),
        "-n".to_string(),
        "-P".to_string(),
        "+c".to_string(),
        "0".to_string(),
    ]
}

/// Arguments for a single-port query.
pub(super) fn port_args(port: u16) -> Vec<String> {
    vec![
        "-i".to_string(),
        format!(":{}", port),
        "-n".to_string(),
        "-P".to_string(),
        "+c".to_string(),
        "0".to_string(),
    ]
}

/// Parse lsof output into socket entries.
///
/// Expected lsof output format:
/// ```text
/// COMMAND    PID  USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
/// node     34805  code   19u  IPv6 0x3d8015e195af1f3f      0t0  TCP [::1]:3000 (LISTEN)
/// node     34805  code   21u  IPv6 0x3d8015e195af2a1f      0t0  TCP [::1]:3000->[::1]:52144 (ESTABLISHED)
/// ```
///
/// Lines with fewer than nine columns, a non-numeric PID or an unreadable
/// address are skipped.
pub(super) fn parse_lsof(output: &str) -> Vec<SocketEntry> {
    let mut entries = Vec::new();

    for line in output.lines() {
        if line.is_empty() || line.starts_with("COMMAND") {
            continue;
        }

        // Parse lsof columns: COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME [STATE]
        let components: Vec<&str> = line.split_whitespace().collect();
        if components.len() < 9 {
            continue;
        }

        let pid: u32 = match components[1].parse() {
            Ok(p) => p,
            Err(_) => continue,
        };

        let Some(protocol) = Protocol::parse(components[7]) else {
            continue;
        };

        let (local, remote) = match components[8].split_once("->") {
            Some((local, remote)) => (local, Utils::parse_address(remote)),
            None => (components[8], None),
        };
        let Some((local_addr, local_port)) = Utils::parse_address(local) else {
            continue;
        };

        let state = components
            .get(9)
            .map(|s| ConnectionState::parse(s))
            .unwrap_or(ConnectionState::Unknown);

        entries.push(SocketEntry {
            command: Some(Utils::decode_escaped(components[0])),
            pid: Some(pid),
            user: Some(components[2].to_string()),
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

    const LSOF_OUTPUT: &str = r#"COMMAND    PID  USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
node     34805  code   19u  IPv6 0x3d8015e195af1f3f      0t0  TCP [::1]:3000 (LISTEN)
nginx      443  root    6u  IPv4 0x1234567890abcdef      0t0  TCP *:80 (LISTEN)
nginx      443  root    7u  IPv4 0x1234567890abcd01      0t0  TCP 10.0.0.5:80->10.0.0.9:51515 (ESTABLISHED)
Code\x20Helper  1234  user   10u  IPv4 0x1234567890abcdef      0t0  UDP *:5353
"#;

    #[test]
    fn test_parse_lsof_output() {
        let entries = parse_lsof(LSOF_OUTPUT);
        assert_eq!(entries.len(), 4);

        assert_eq!(entries[0].command.as_deref(), Some("node"));
        assert_eq!(entries[0].pid, Some(34805));
        assert_eq!(entries[0].user.as_deref(), Some("code"));
        assert_eq!(entries[0].protocol, Protocol::Tcp);
        assert_eq!(entries[0].local_addr, "::1");
        assert_eq!(entries[0].local_port, 3000);
        assert_eq!(entries[0].state, ConnectionState::Listen);

        assert_eq!(entries[1].local_addr, "0.0.0.0");
        assert_eq!(entries[1].local_port, 80);
    }

    #[test]
    fn test_parse_established_remote() {
        let entries = parse_lsof(LSOF_OUTPUT);
        let established = &entries[2];
        assert_eq!(established.state, ConnectionState::Established);
        assert_eq!(established.local_port, 80);
        assert_eq!(established.remote, Some(("10.0.0.9".to_string(), 51515)));
    }

    #[test]
    fn test_unescape_and_missing_state() {
        let entries = parse_lsof(LSOF_OUTPUT);
        let udp = &entries[3];
        assert_eq!(udp.command.as_deref(), Some("Code Helper"));
        assert_eq!(udp.protocol, Protocol::Udp);
        assert_eq!(udp.state, ConnectionState::Unknown);
    }

    #[test]
    fn test_skips_malformed_lines() {
        let output = "garbage line\nnode abc code 19u IPv6 0x0 0t0 TCP [::1]:3000 (LISTEN)\n\
                      node 1 code 19u IPv6 0x0 0t0 TCP nonsense (LISTEN)\n";
        assert!(parse_lsof(output).is_empty());
    }

    #[test]
    fn test_args() {
        assert_eq!(list_args(true, true)[0], "-i");
        assert_eq!(list_args(true, false)[0], "-iTCP");
        assert_eq!(list_args(false, true)[0], "-iUDP");
        assert_eq!(port_args(8080)[1], ":8080");
    }
}
