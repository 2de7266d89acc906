//! Unix signal delivery via `nix`.

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::debug;

use crate::domain::TerminationSignal;
use crate::error::{Error, Result};
use crate::ports::ProcessSignaler;

/// Sends real signals with `kill(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NixSignaler;

impl NixSignaler {
    pub fn new() -> Self {
        Self
    }
}

fn to_nix(signal: TerminationSignal) -> Signal {
    match signal {
        TerminationSignal::Hup => Signal::SIGHUP,
        TerminationSignal::Int => Signal::SIGINT,
        TerminationSignal::Term => Signal::SIGTERM,
        TerminationSignal::Kill => Signal::SIGKILL,
    }
}

fn to_pid(pid: u32) -> Result<Pid> {
    i32::try_from(pid)
        .ok()
        .filter(|p| *p > 0)
        .map(Pid::from_raw)
        .ok_or(Error::ProcessNotFound(pid))
}

impl ProcessSignaler for NixSignaler {
    fn send(&self, pid: u32, sig: TerminationSignal) -> Result<bool> {
        let target = to_pid(pid)?;
        debug!(pid = pid, signal = %sig, "sending signal");

        match signal::kill(target, to_nix(sig)) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(Errno::EPERM) => Err(Error::PermissionDenied(format!(
                "not allowed to send {} to process {}",
                sig, pid
            ))),
            Err(e) => Err(Error::Execution(format!(
                "Failed to send {} to process {}: {}",
                sig, pid, e
            ))),
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        let Ok(target) = to_pid(pid) else {
            return false;
        };
        match signal::kill(target, None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }
}
