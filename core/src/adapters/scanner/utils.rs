/// Longest command line kept on a listener before truncation.
const MAX_COMMAND_CHARS: usize = 200;

pub struct Utils;

impl Utils {
    /// Parse an address:port string.
    ///
    /// Handles multiple address formats:
    /// - IPv4: "127.0.0.1:3000" or "*:8080"
    /// - IPv6: "\[::1]:3000" or "\[fe80::1]%eth0:8080"
    ///
    /// The host is normalized: brackets and interface scopes are dropped and
    /// a wildcard (`*` or empty) becomes `0.0.0.0`.
    pub fn parse_address(address: &str) -> Option<(String, u16)> {
        if let Some(rest) = address.strip_prefix('[') {
            // IPv6 format: [::1]:3000
            let bracket_end = rest.find(']')?;
            let host = &rest[..bracket_end];
            let tail = &rest[bracket_end + 1..];
            if !tail.starts_with(':') && !tail.starts_with('%') {
                return None;
            }
            let (_, port_str) = tail.rsplit_once(':')?;
            let port: u16 = port_str.parse().ok()?;
            Some((Self::normalize_host(host), port))
        } else {
            // IPv4 format: 127.0.0.1:3000 or *:8080
            let (host, port_str) = address.rsplit_once(':')?;
            let port: u16 = port_str.parse().ok()?;
            Some((Self::normalize_host(host), port))
        }
    }

    fn normalize_host(host: &str) -> String {
        let host = match host.split_once('%') {
            Some((bare, _)) => bare,
            None => host,
        };
        if host.is_empty() || host == "*" {
            "0.0.0.0".to_string()
        } else {
            host.to_string()
        }
    }

    /// Decode `\xNN` escapes that lsof uses for unprintable command bytes.
    ///
    /// Incomplete escapes are kept verbatim.
    pub fn decode_escaped(input: &str) -> String {
        let raw = input.as_bytes();
        let mut bytes = Vec::with_capacity(raw.len());
        let mut i = 0;

        while i < raw.len() {
            if raw[i] == b'\\' && raw.get(i + 1) == Some(&b'x') {
                let hex = raw.get(i + 2..i + 4).and_then(|pair| {
                    std::str::from_utf8(pair)
                        .ok()
                        .filter(|pair| pair.bytes().all(|b| b.is_ascii_hexdigit()))
                        .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                });
                if let Some(byte) = hex {
                    bytes.push(byte);
                    i += 4;
                    continue;
                }
            }
            bytes.push(raw[i]);
            i += 1;
        }

        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Truncate a command line to a displayable length, marking the cut.
    pub fn truncate_command(command: &str) -> String {
        if command.chars().count() > MAX_COMMAND_CHARS {
            let head: String = command.chars().take(MAX_COMMAND_CHARS).collect();
            format!("{}...", head)
        } else {
            command.to_string()
        }
    }

    /// Count non-empty output rows, minus `header_rows`.
    pub fn count_rows(output: &str, header_rows: usize) -> u32 {
        let rows = output.lines().filter(|l| !l.trim().is_empty()).count();
        u32::try_from(rows.saturating_sub(header_rows)).unwrap_or(u32::MAX)
    }
}
