//! Termination of a running peer.

use std::io;
use std::process::Child;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::LAUNCHER_TARGET;

/// Time a peer is given to exit after the termination request.
pub(super) const TERMINATION_GRACE: Duration = Duration::from_millis(200);

const GRACE_POLL: Duration = Duration::from_millis(20);

/// Asks the child to exit, then kills it if it outlives the grace period.
pub(super) fn terminate(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(target: LAUNCHER_TARGET, pid = child.id(), ?status, "peer already exited");
        }
        Ok(None) => {
            request_exit(child);
            wait_or_kill(child);
        }
        Err(error) => {
            warn!(
                target: LAUNCHER_TARGET,
                pid = child.id(),
                %error,
                "failed to check peer status, waiting before killing"
            );
            wait_or_kill(child);
        }
    }
}

fn request_exit(child: &Child) {
    #[cfg(unix)]
    {
        let Ok(pid) = libc::pid_t::try_from(child.id()) else {
            warn!(target: LAUNCHER_TARGET, pid = child.id(), "pid out of range for kill(2)");
            return;
        };
        // SAFETY: `kill(2)` is memory-safe even when the PID is invalid; the
        // kernel simply returns an error.
        let result = unsafe { libc::kill(pid, libc::SIGTERM) };
        if result != 0 {
            debug!(
                target: LAUNCHER_TARGET,
                pid,
                error = %io::Error::last_os_error(),
                "SIGTERM was not delivered"
            );
        }
    }
    #[cfg(not(unix))]
    {
        debug!(target: LAUNCHER_TARGET, pid = child.id(), "no graceful exit request on this platform");
    }
}

fn wait_or_kill(child: &mut Child) {
    let deadline = Instant::now() + TERMINATION_GRACE;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: LAUNCHER_TARGET, pid = child.id(), ?status, "peer exited");
                return;
            }
            Ok(None) => thread::sleep(GRACE_POLL),
            Err(_) => break,
        }
    }

    warn!(target: LAUNCHER_TARGET, pid = child.id(), "peer did not exit in time; killing");
    kill(child);
}

/// Kills the child and reaps it.
pub(super) fn kill(child: &mut Child) {
    if let Err(error) = child.kill()
        && error.kind() != io::ErrorKind::InvalidInput
    {
        debug!(target: LAUNCHER_TARGET, pid = child.id(), %error, "kill failed");
    }
    if let Err(error) = child.wait() {
        debug!(target: LAUNCHER_TARGET, pid = child.id(), %error, "reaping peer failed");
    }
}
