//! Watch engine state: per-tick snapshot diffing for the all-ports view and
//! stat change tracking for the single-port view.
//!
//! These types hold no terminal state; a driver feeds them scans and draws
//! what they return.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use crate::domain::{sort_listeners, Listener, Protocol, ResourceStats, SortKey};
use crate::error::Result;
use crate::ports::Scanner;

// ============================================================================
// All ports
// ============================================================================

/// Settings for the all-ports watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    pub interval: Duration,
    pub sort_by: SortKey,
    pub tcp_only: bool,
    pub udp_only: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            sort_by: SortKey::Port,
            tcp_only: false,
            udp_only: false,
        }
    }
}

/// What one tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchSnapshot {
    /// Current listeners, filtered and sorted.
    pub listeners: Vec<Listener>,
    /// Ports present now but not on the previous tick.
    pub added: BTreeSet<u16>,
    /// Ports present on the previous tick but not now.
    pub removed: BTreeSet<u16>,
}

impl WatchSnapshot {
    pub fn is_added(&self, port: u16) -> bool {
        self.added.contains(&port)
    }
}

/// Previous/current snapshot pair for the all-ports watch.
#[derive(Debug)]
pub struct WatchState {
    config: WatchConfig,
    previous: HashMap<u16, Listener>,
    snapshot: WatchSnapshot,
    ticks: u64,
}

impl WatchState {
    pub fn new(config: WatchConfig) -> Self {
        Self {
            config,
            previous: HashMap::new(),
            snapshot: WatchSnapshot::default(),
            ticks: 0,
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// The result of the last successful tick.
    pub fn snapshot(&self) -> &WatchSnapshot {
        &self.snapshot
    }

    /// Number of successful ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Scan and apply. On error nothing changes and the error is returned
    /// for the caller to skip.
    pub async fn refresh<S: Scanner>(&mut self, scanner: &S) -> Result<&WatchSnapshot> {
        let listeners = scanner.list_listeners().await?;
        Ok(self.apply(listeners))
    }

    /// Filter, sort and diff `listeners` against the previous tick.
    pub fn apply(&mut self, mut listeners: Vec<Listener>) -> &WatchSnapshot {
        // Both filters apply independently; setting both leaves nothing
        if self.config.tcp_only {
            listeners.retain(|l| l.protocol == Protocol::Tcp);
        }
        if self.config.udp_only {
            listeners.retain(|l| l.protocol == Protocol::Udp);
        }
        sort_listeners(&mut listeners, self.config.sort_by);

        let current: HashMap<u16, Listener> =
            listeners.iter().map(|l| (l.port, l.clone())).collect();

        let added = current
            .keys()
            .filter(|port| !self.previous.contains_key(port))
            .copied()
            .collect();
        let removed = self
            .previous
            .keys()
            .filter(|port| !current.contains_key(port))
            .copied()
            .collect();

        self.previous = current;
        self.ticks += 1;
        self.snapshot = WatchSnapshot {
            listeners,
            added,
            removed,
        };
        &self.snapshot
    }
}

// ============================================================================
// Single port
// ============================================================================

/// Which displayed values moved since the previous tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatChanges {
    pub memory: bool,
    pub cpu: bool,
    pub fds: bool,
    pub threads: bool,
    pub connections: bool,
}

impl StatChanges {
    pub fn any(&self) -> bool {
        self.memory || self.cpu || self.fds || self.threads || self.connections
    }
}

/// One tick of the single-port watch.
#[derive(Debug, Clone, PartialEq)]
pub struct PortWatchFrame {
    pub port: u16,
    /// `None` when the port is not in use.
    pub listener: Option<Listener>,
    /// The port is in use now but was not on the previous tick.
    pub became_active: bool,
    /// The port was in use on the previous tick but is not now.
    pub exited: bool,
    pub changes: StatChanges,
    /// Current minus previous connection count.
    pub connection_delta: i64,
}

#[derive(Debug, Clone, Copy)]
struct PortSample {
    connection_count: usize,
    stats: Option<ResourceStats>,
}

/// Change tracking for one port.
#[derive(Debug)]
pub struct PortWatchState {
    port: u16,
    previous: Option<PortSample>,
}

impl PortWatchState {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            previous: None,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Query the port and apply. On error nothing changes.
    pub async fn refresh<S: Scanner>(&mut self, scanner: &S) -> Result<PortWatchFrame> {
        let listener = scanner.get_port(self.port).await?;
        Ok(self.apply(listener))
    }

    pub fn apply(&mut self, listener: Option<Listener>) -> PortWatchFrame {
        let Some(listener) = listener else {
            let exited = self.previous.take().is_some();
            return PortWatchFrame {
                port: self.port,
                listener: None,
                became_active: false,
                exited,
                changes: StatChanges::default(),
                connection_delta: 0,
            };
        };

        let sample = PortSample {
            connection_count: listener.connection_count,
            stats: listener.stats,
        };

        let (changes, connection_delta) = match self.previous {
            Some(prev) => compare(&prev, &sample),
            None => (StatChanges::default(), 0),
        };
        let became_active = self.previous.is_none();
        self.previous = Some(sample);

        PortWatchFrame {
            port: self.port,
            listener: Some(listener),
            became_active,
            exited: false,
            changes,
            connection_delta,
        }
    }
}

fn compare(prev: &PortSample, cur: &PortSample) -> (StatChanges, i64) {
    let delta = cur.connection_count as i64 - prev.connection_count as i64;
    let mut changes = StatChanges {
        connections: delta != 0,
        ..StatChanges::default()
    };

    if let (Some(a), Some(b)) = (prev.stats, cur.stats) {
        changes.memory = a.memory_rss != b.memory_rss;
        changes.cpu = a.cpu_percent != b.cpu_percent;
        changes.fds = a.fd_count != b.fd_count;
        changes.threads = a.thread_count != b.thread_count;
    }

    (changes, delta)
}
