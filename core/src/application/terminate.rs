//! Kill orchestrator: signal, wait, optionally escalate to SIGKILL.

use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::domain::TerminationSignal;
use crate::error::{Error, Result};
use crate::ports::ProcessSignaler;

/// How one termination should proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminatePlan {
    pub signal: TerminationSignal,
    /// How long to wait for exit after the first signal.
    pub grace: Duration,
    /// Send SIGKILL if the process outlives `grace`.
    pub escalate: bool,
    /// How long to wait for exit after SIGKILL.
    pub kill_grace: Duration,
    pub poll_interval: Duration,
}

impl Default for TerminatePlan {
    fn default() -> Self {
        Self {
            signal: TerminationSignal::Term,
            grace: Duration::from_secs(5),
            escalate: false,
            kill_grace: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl TerminatePlan {
    pub fn new(signal: TerminationSignal, grace: Duration) -> Self {
        Self {
            signal,
            grace,
            ..Self::default()
        }
    }

    pub fn with_escalation(mut self, escalate: bool) -> Self {
        self.escalate = escalate;
        self
    }
}

/// Terminal result of a termination attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminateOutcome {
    /// Exited after the requested signal.
    Terminated,
    /// Exited only after SIGKILL.
    Escalated,
    /// Still alive once every budget was spent.
    StillRunning,
}

impl TerminateOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            TerminateOutcome::Terminated | TerminateOutcome::Escalated => 0,
            TerminateOutcome::StillRunning => 3,
        }
    }
}

/// Drives a [`ProcessSignaler`] through the escalation sequence.
pub struct ProcessTerminator<S: ProcessSignaler> {
    signaler: S,
}

impl<S: ProcessSignaler> ProcessTerminator<S> {
    pub fn new(signaler: S) -> Self {
        Self { signaler }
    }

    /// Terminate `pid` according to `plan`.
    ///
    /// Fails with `ProcessNotFound` if the process is gone before the first
    /// signal and with `PermissionDenied` if it may not be signaled. A process
    /// that exits between the probe and the signal counts as terminated.
    pub async fn terminate(&self, pid: u32, plan: &TerminatePlan) -> Result<TerminateOutcome> {
        if !self.signaler.is_alive(pid) {
            return Err(Error::ProcessNotFound(pid));
        }

        info!(pid = pid, signal = %plan.signal, "sending signal");
        if !self.signaler.send(pid, plan.signal)? {
            debug!(pid = pid, "process exited before the signal landed");
            return Ok(TerminateOutcome::Terminated);
        }

        if self.wait_for_exit(pid, plan.grace, plan.poll_interval).await {
            return Ok(TerminateOutcome::Terminated);
        }

        if !plan.escalate || plan.signal == TerminationSignal::Kill {
            return Ok(TerminateOutcome::StillRunning);
        }

        warn!(pid = pid, grace_ms = plan.grace.as_millis() as u64, "process survived, escalating to SIGKILL");
        if !self.signaler.send(pid, TerminationSignal::Kill)? {
            return Ok(TerminateOutcome::Escalated);
        }

        if self.wait_for_exit(pid, plan.kill_grace, plan.poll_interval).await {
            Ok(TerminateOutcome::Escalated)
        } else {
            Ok(TerminateOutcome::StillRunning)
        }
    }

    /// Poll liveness until the process is gone or `budget` runs out.
    async fn wait_for_exit(&self, pid: u32, budget: Duration, interval: Duration) -> bool {
        let deadline = Instant::now() + budget;
        loop {
            if !self.signaler.is_alive(pid) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(interval.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[derive(Default)]
    struct MockState {
        alive: bool,
        sent: Vec<TerminationSignal>,
        fatal: Vec<TerminationSignal>,
        deny: bool,
        vanish_on_send: bool,
        probes_until_exit: Option<usize>,
    }

    /// Scripted process: dies on any signal in `fatal`, or after a number
    /// of liveness probes once signaled.
    #[derive(Default)]
    struct MockSignaler {
        state: Mutex<MockState>,
    }

    impl MockSignaler {
        fn alive() -> Self {
            let signaler = Self::default();
            signaler.state.lock().alive = true;
            signaler
        }

        fn dies_on(self, signal: TerminationSignal) -> Self {
            self.state.lock().fatal.push(signal);
            self
        }

        fn sent(&self) -> Vec<TerminationSignal> {
            self.state.lock().sent.clone()
        }
    }

    impl ProcessSignaler for &MockSignaler {
        fn send(&self, pid: u32, signal: TerminationSignal) -> Result<bool> {
            let mut state = self.state.lock();
            if state.deny {
                return Err(Error::PermissionDenied(format!("pid {}", pid)));
            }
            state.sent.push(signal);
            if state.vanish_on_send {
                state.alive = false;
                return Ok(false);
            }
            if state.fatal.contains(&signal) {
                state.alive = false;
            }
            Ok(true)
        }

        fn is_alive(&self, _pid: u32) -> bool {
            let mut state = self.state.lock();
            if !state.sent.is_empty() {
                if let Some(remaining) = state.probes_until_exit.as_mut() {
                    if *remaining == 0 {
                        state.alive = false;
                    } else {
                        *remaining -= 1;
                    }
                }
            }
            state.alive
        }
    }

    fn plan(signal: TerminationSignal, escalate: bool) -> TerminatePlan {
        TerminatePlan::new(signal, Duration::from_millis(500)).with_escalation(escalate)
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_process() {
        let signaler = MockSignaler::default();
        let terminator = ProcessTerminator::new(&signaler);

        let result = terminator.terminate(99, &plan(TerminationSignal::Term, true)).await;
        assert!(matches!(result, Err(Error::ProcessNotFound(99))));
        assert!(signaler.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied() {
        let signaler = MockSignaler::alive();
        signaler.state.lock().deny = true;
        let terminator = ProcessTerminator::new(&signaler);

        let err = assert_err!(terminator.terminate(1, &plan(TerminationSignal::Term, false)).await);
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_exit() {
        let signaler = MockSignaler::alive().dies_on(TerminationSignal::Term);
        let terminator = ProcessTerminator::new(&signaler);

        let outcome = assert_ok!(terminator.terminate(10, &plan(TerminationSignal::Term, true)).await);
        assert_eq!(outcome, TerminateOutcome::Terminated);
        assert_eq!(signaler.sent(), vec![TerminationSignal::Term]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_during_grace_period() {
        let signaler = MockSignaler::alive();
        signaler.state.lock().probes_until_exit = Some(3);
        let terminator = ProcessTerminator::new(&signaler);

        let start = Instant::now();
        let outcome = assert_ok!(terminator.terminate(10, &plan(TerminationSignal::Int, false)).await);
        assert_eq!(outcome, TerminateOutcome::Terminated);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalates_exactly_once() {
        let signaler = MockSignaler::alive().dies_on(TerminationSignal::Kill);
        let terminator = ProcessTerminator::new(&signaler);

        let outcome = assert_ok!(terminator.terminate(10, &plan(TerminationSignal::Term, true)).await);
        assert_eq!(outcome, TerminateOutcome::Escalated);
        assert_eq!(
            signaler.sent(),
            vec![TerminationSignal::Term, TerminationSignal::Kill]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_still_running_after_escalation() {
        let signaler = MockSignaler::alive();
        let terminator = ProcessTerminator::new(&signaler);

        let start = Instant::now();
        let outcome = assert_ok!(terminator.terminate(10, &plan(TerminationSignal::Term, true)).await);
        assert_eq!(outcome, TerminateOutcome::StillRunning);
        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(
            signaler.sent(),
            vec![TerminationSignal::Term, TerminationSignal::Kill]
        );
        // grace + kill_grace
        assert_eq!(start.elapsed(), Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_escalation_without_flag() {
        let signaler = MockSignaler::alive();
        let terminator = ProcessTerminator::new(&signaler);

        let outcome = assert_ok!(terminator.terminate(10, &plan(TerminationSignal::Term, false)).await);
        assert_eq!(outcome, TerminateOutcome::StillRunning);
        assert_eq!(signaler.sent(), vec![TerminationSignal::Term]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kill_is_never_repeated() {
        let signaler = MockSignaler::alive();
        let terminator = ProcessTerminator::new(&signaler);

        let outcome = assert_ok!(terminator.terminate(10, &plan(TerminationSignal::Kill, true)).await);
        assert_eq!(outcome, TerminateOutcome::StillRunning);
        assert_eq!(signaler.sent(), vec![TerminationSignal::Kill]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exited_before_signal_is_success() {
        let signaler = MockSignaler::alive();
        signaler.state.lock().vanish_on_send = true;
        let terminator = ProcessTerminator::new(&signaler);

        let outcome = assert_ok!(terminator.terminate(10, &plan(TerminationSignal::Term, true)).await);
        assert_eq!(outcome, TerminateOutcome::Terminated);
        assert_eq!(outcome.exit_code(), 0);
    }
}
