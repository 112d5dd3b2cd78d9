use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{KillSignal, ProcessRecord};

#[derive(Debug, Error, PartialEq)]
pub enum ControlError {
    #[error("permission denied signalling pid {pid} (running as {user})")]
    PermissionDenied { pid: u32, user: String },
    #[error("failed to signal pid {pid}: {reason}")]
    Signal { pid: u32, reason: String },
    #[error("process signalling is not supported on this platform")]
    #[cfg_attr(unix, allow(dead_code))]
    Unsupported,
}

pub trait ProcessController {
    fn signal(&self, pid: u32, signal: KillSignal) -> Result<(), ControlError>;
}

/// Sends real signals with `kill(2)`.
pub struct SignalController;

#[cfg(unix)]
impl ProcessController for SignalController {
    fn signal(&self, pid: u32, signal: KillSignal) -> Result<(), ControlError> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid).map_err(|_| ControlError::Signal {
            pid,
            reason: "pid out of range".to_string(),
        })?;
        let sig = match signal {
            KillSignal::Term => Signal::SIGTERM,
            KillSignal::Kill => Signal::SIGKILL,
            KillSignal::Hup => Signal::SIGHUP,
            KillSignal::Int => Signal::SIGINT,
        };

        kill(Pid::from_raw(raw), sig).map_err(|errno| match errno {
            Errno::EPERM => ControlError::PermissionDenied {
                pid,
                user: whoami::username(),
            },
            other => ControlError::Signal {
                pid,
                reason: other.desc().to_string(),
            },
        })
    }
}

#[cfg(not(unix))]
impl ProcessController for SignalController {
    fn signal(&self, _pid: u32, _signal: KillSignal) -> Result<(), ControlError> {
        Err(ControlError::Unsupported)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct KillSummary {
    pub signalled: Vec<u32>,
    pub failed: Vec<u32>,
}

/// Distinct PIDs in scoreboard order. Threaded MPMs repeat a PID across
/// slots; init, pid 0 and our own process are never targets.
pub fn target_pids(records: &[ProcessRecord], own_pid: u32) -> Vec<u32> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|r| r.pid)
        .filter(|&pid| pid > 1 && pid != own_pid)
        .filter(|pid| seen.insert(*pid))
        .collect()
}

pub fn kill_procs(
    records: &[ProcessRecord],
    signal: KillSignal,
    dry_run: bool,
    controller: &dyn ProcessController,
) -> KillSummary {
    let mut summary = KillSummary::default();

    for pid in target_pids(records, std::process::id()) {
        if dry_run {
            info!("🔍 Dry run: would send {} to pid {}", signal, pid);
            summary.signalled.push(pid);
            continue;
        }

        match controller.signal(pid, signal) {
            Ok(()) => {
                info!("🔪 Sent {} to pid {}", signal, pid);
                summary.signalled.push(pid);
            }
            Err(e) => {
                warn!("⚠️ {}", e);
                summary.failed.push(pid);
            }
        }
    }

    summary
}
