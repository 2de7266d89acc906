//! Turns raw socket entries into listener records.

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use crate::domain::{Connection, ConnectionState, Listener, ProcessInfo};
use crate::ports::CommandRunner;

use super::probe::{ProcessProbe, ProcessSummary};
use super::{Platform, SocketEntry};

/// Builds listeners from one enumeration pass.
///
/// Nothing is cached between calls; every build probes the owning
/// processes again.
pub(super) struct ListenerBuilder<'a, R> {
    probe: ProcessProbe<'a, R>,
}

impl<'a, R: CommandRunner> ListenerBuilder<'a, R> {
    pub fn new(runner: &'a R, platform: Platform) -> Self {
        Self {
            probe: ProcessProbe::new(runner, platform),
        }
    }

    /// One listener per port (first LISTEN entry wins), with the number of
    /// ESTABLISHED entries sharing that local port.
    pub async fn build_listeners(&self, entries: &[SocketEntry]) -> Vec<Listener> {
        let mut counts: HashMap<u16, usize> = HashMap::new();
        let mut seen: HashSet<u16> = HashSet::new();
        let mut owners: Vec<&SocketEntry> = Vec::new();

        for entry in entries {
            match entry.state {
                ConnectionState::Established => {
                    *counts.entry(entry.local_port).or_default() += 1;
                }
                ConnectionState::Listen => {
                    if seen.insert(entry.local_port) {
                        owners.push(entry);
                    }
                }
                _ => {}
            }
        }

        // One probe per distinct pid within this build
        let mut summaries: HashMap<u32, Option<ProcessSummary>> = HashMap::new();
        for pid in owners.iter().filter_map(|e| e.pid) {
            if !summaries.contains_key(&pid) {
                let summary = self.probe.summary(pid).await;
                summaries.insert(pid, summary);
            }
        }

        owners
            .into_iter()
            .map(|entry| {
                let summary = entry.pid.and_then(|pid| summaries.get(&pid)).and_then(Option::as_ref);
                let count = counts.get(&entry.local_port).copied().unwrap_or(0);
                listener_from(entry, summary).with_connection_count(count)
            })
            .collect()
    }

    /// Detailed view of `port`: the first LISTEN entry plus every
    /// ESTABLISHED connection on that local port and the owner's stats.
    pub async fn build_port_detail(&self, entries: &[SocketEntry], port: u16) -> Option<Listener> {
        let owner = entries
            .iter()
            .find(|e| e.state == ConnectionState::Listen && e.local_port == port)?;

        let connections: Vec<Connection> = entries
            .iter()
            .filter(|e| e.state == ConnectionState::Established && e.local_port == port)
            .filter_map(|e| {
                let (remote_addr, remote_port) = e.remote.clone()?;
                Some(Connection {
                    local_addr: e.local_addr.clone(),
                    local_port: e.local_port,
                    remote_addr,
                    remote_port,
                    state: e.state,
                    duration_seconds: None,
                })
            })
            .collect();

        let summary = match owner.pid {
            Some(pid) => self.probe.summary(pid).await,
            None => None,
        };

        let mut listener = listener_from(owner, summary.as_ref()).with_connection_count(connections.len());
        listener.connections = connections;
        if let Some(pid) = owner.pid {
            listener.stats = Some(self.probe.stats(pid).await);
        }

        Some(listener)
    }
}

fn listener_from(entry: &SocketEntry, summary: Option<&ProcessSummary>) -> Listener {
    let listener = Listener::new(
        entry.local_port,
        entry.protocol,
        entry.local_addr.clone(),
        entry.pid,
    );

    let (Some(pid), Some(name)) = (entry.pid, entry.command.as_deref()) else {
        return listener;
    };

    let mut process = ProcessInfo::new(pid, name, entry.user.clone().unwrap_or_default());
    if let Some(summary) = summary {
        summary.apply(&mut process, Utc::now());
    }
    listener.with_process(process)
}
