//! Poller: block until a port is in use (or free) within a deadline.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::ports::Scanner;

/// Parameters for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
    /// Wait for the port to become free instead of in use.
    pub invert: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            interval: Duration::from_millis(100),
            invert: false,
        }
    }
}

/// How a wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome {
    pub success: bool,
    pub elapsed: Duration,
    /// Owner of the port, when waiting for it to be in use.
    pub process_name: Option<String>,
}

/// Poll `scanner` for `port` until the target state holds or the timeout passes.
///
/// Scan errors are logged and retried; they never end the wait early. The
/// final sleep is clipped to the deadline.
pub async fn wait_for_port<S: Scanner>(scanner: &S, port: u16, options: WaitOptions) -> WaitOutcome {
    let start = Instant::now();
    let deadline = start + options.timeout;

    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }

        match scanner.get_port(port).await {
            Ok(listener) => {
                let in_use = listener.is_some();
                if in_use != options.invert {
                    let process_name = listener
                        .and_then(|l| l.process)
                        .map(|p| p.display_name().to_string())
                        .filter(|name| !name.is_empty());
                    return WaitOutcome {
                        success: true,
                        elapsed: start.elapsed(),
                        process_name,
                    };
                }
            }
            Err(e) => {
                debug!(port = port, error = %e, "port poll failed, retrying");
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        sleep(options.interval.min(remaining)).await;
    }

    WaitOutcome {
        success: false,
        elapsed: start.elapsed(),
        process_name: None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use parking_lot::Mutex;
    use tokio::time;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;
    use crate::domain::{Listener, ProcessInfo, Protocol};
    use crate::error::{Error, Result};

    #[derive(Clone, Copy)]
    enum Poll {
        Free,
        InUse,
        Fail,
    }

    /// Scripted scanner; the last scripted answer repeats.
    struct ScriptedScanner {
        script: Mutex<VecDeque<Poll>>,
        polls: Mutex<usize>,
    }

    impl ScriptedScanner {
        fn new(script: &[Poll]) -> Self {
            Self {
                script: Mutex::new(script.iter().copied().collect()),
                polls: Mutex::new(0),
            }
        }

        fn polls(&self) -> usize {
            *self.polls.lock()
        }
    }

    impl Scanner for ScriptedScanner {
        async fn list_listeners(&self) -> Result<Vec<Listener>> {
            Ok(Vec::new())
        }

        async fn get_port(&self, port: u16) -> Result<Option<Listener>> {
            *self.polls.lock() += 1;
            let next = {
                let mut script = self.script.lock();
                if script.len() > 1 {
                    script.pop_front()
                } else {
                    script.front().copied()
                }
            };

            match next.unwrap_or(Poll::Free) {
                Poll::Free => Ok(None),
                Poll::Fail => Err(Error::Execution("lsof busy".to_string())),
                Poll::InUse => {
                    let mut process = ProcessInfo::new(4242, "node", "dev");
                    process.command = "node server.js".to_string();
                    Ok(Some(
                        Listener::new(port, Protocol::Tcp, "0.0.0.0", Some(4242)).with_process(process),
                    ))
                }
            }
        }
    }

    fn options(timeout_ms: u64, interval_ms: u64, invert: bool) -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(interval_ms),
            invert,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_never_in_use() {
        let scanner = ScriptedScanner::new(&[Poll::Free]);

        let outcome = wait_for_port(&scanner, 3000, options(200, 50, false)).await;

        assert!(!outcome.success);
        assert!(outcome.elapsed >= Duration::from_millis(200));
        assert!(outcome.elapsed < Duration::from_millis(250));
        assert_eq!(outcome.process_name, None);
        assert_eq!(scanner.polls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_between_polls() {
        let scanner = ScriptedScanner::new(&[Poll::Free, Poll::Free, Poll::InUse]);

        let outcome = wait_for_port(&scanner, 3000, options(1000, 50, false)).await;

        assert!(outcome.success);
        assert_eq!(outcome.elapsed, Duration::from_millis(100));
        assert_eq!(outcome.process_name.as_deref(), Some("node server.js"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_retried() {
        let scanner = ScriptedScanner::new(&[Poll::Fail, Poll::Fail, Poll::InUse]);

        let outcome = wait_for_port(&scanner, 3000, options(1000, 100, false)).await;

        assert!(outcome.success);
        assert_eq!(scanner.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invert_waits_for_free() {
        let scanner = ScriptedScanner::new(&[Poll::InUse, Poll::InUse, Poll::Free]);

        let outcome = wait_for_port(&scanner, 3000, options(1000, 100, true)).await;

        assert!(outcome.success);
        assert_eq!(outcome.elapsed, Duration::from_millis(200));
        assert_eq!(outcome.process_name, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_oversleeps_deadline() {
        let scanner = ScriptedScanner::new(&[Poll::Free]);

        let outcome = wait_for_port(&scanner, 3000, options(150, 100, false)).await;

        assert!(!outcome.success);
        assert_eq!(outcome.elapsed, Duration::from_millis(150));
        assert_eq!(scanner.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_between_polls() {
        let scanner = ScriptedScanner::new(&[Poll::Free, Poll::InUse]);
        let mut wait = task::spawn(wait_for_port(&scanner, 3000, options(1000, 100, false)));

        assert_pending!(wait.poll());
        assert_eq!(scanner.polls(), 1);

        time::advance(Duration::from_millis(100)).await;
        assert!(wait.is_woken());
        let outcome = assert_ready!(wait.poll());
        assert!(outcome.success);
        assert_eq!(scanner.polls(), 2);
    }
}
