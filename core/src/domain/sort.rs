//! Listener ordering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::Listener;

/// Key used to order listener tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Port,
    Pid,
    User,
    /// Most connections first.
    Conns,
    /// Longest running first.
    Uptime,
}

impl SortKey {
    /// Strict parse; `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "port" => Some(SortKey::Port),
            "pid" => Some(SortKey::Pid),
            "user" => Some(SortKey::User),
            "conns" | "connections" => Some(SortKey::Conns),
            "uptime" => Some(SortKey::Uptime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Port => "port",
            SortKey::Pid => "pid",
            SortKey::User => "user",
            SortKey::Conns => "conns",
            SortKey::Uptime => "uptime",
        }
    }

    fn compare(&self, a: &Listener, b: &Listener) -> Ordering {
        match self {
            SortKey::Port => a.port.cmp(&b.port),
            SortKey::Pid => a.pid.cmp(&b.pid),
            SortKey::User => a.user().unwrap_or("").cmp(b.user().unwrap_or("")),
            SortKey::Conns => b.connection_count.cmp(&a.connection_count),
            SortKey::Uptime => b.uptime_seconds().cmp(&a.uptime_seconds()),
        }
    }
}

/// Unknown names fall back to [`SortKey::Port`].
impl From<&str> for SortKey {
    fn from(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort listeners in place (stable).
pub fn sort_listeners(listeners: &mut [Listener], key: SortKey) {
    listeners.sort_by(|a, b| key.compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProcessInfo, Protocol};

    fn listener(port: u16, pid: u32, user: &str, conns: usize, uptime: u64) -> Listener {
        let mut process = ProcessInfo::new(pid, "proc", user);
        process.uptime_seconds = uptime;
        Listener::new(port, Protocol::Tcp, "0.0.0.0", Some(pid))
            .with_process(process)
            .with_connection_count(conns)
    }

    fn ports(listeners: &[Listener]) -> Vec<u16> {
        listeners.iter().map(|l| l.port).collect()
    }

    #[test]
    fn test_parse_sort_key() {
        assert_eq!(SortKey::from("PID"), SortKey::Pid);
        assert_eq!(SortKey::from("conns"), SortKey::Conns);
        assert_eq!(SortKey::from("nonsense"), SortKey::Port);
        assert_eq!(SortKey::parse("nonsense"), None);
        assert_eq!(SortKey::parse(" Uptime "), Some(SortKey::Uptime));
    }

    #[test]
    fn test_sort_orders() {
        let mut listeners = vec![
            listener(8080, 30, "carol", 1, 10),
            listener(22, 10, "root", 5, 500),
            listener(443, 20, "alice", 3, 50),
        ];

        sort_listeners(&mut listeners, SortKey::Port);
        assert_eq!(ports(&listeners), vec![22, 443, 8080]);

        sort_listeners(&mut listeners, SortKey::User);
        assert_eq!(ports(&listeners), vec![443, 8080, 22]);

        sort_listeners(&mut listeners, SortKey::Conns);
        assert_eq!(ports(&listeners), vec![22, 443, 8080]);

        sort_listeners(&mut listeners, SortKey::Uptime);
        assert_eq!(ports(&listeners), vec![22, 443, 8080]);

        sort_listeners(&mut listeners, SortKey::Pid);
        assert_eq!(ports(&listeners), vec![22, 443, 8080]);
    }

    #[test]
    fn test_unknown_owner_sorts_first_by_pid() {
        let mut listeners = vec![
            listener(80, 5, "root", 0, 0),
            Listener::new(22, Protocol::Tcp, "0.0.0.0", None),
        ];
        sort_listeners(&mut listeners, SortKey::Pid);
        assert_eq!(ports(&listeners), vec![22, 80]);
    }
}
