//! Errors raised while starting a peer process.

use std::ffi::OsString;
use std::io;
use std::process::ExitStatus;

use camino::Utf8PathBuf;
use jsonipc_config::EndpointPreparationError;
use thiserror::Error;

/// Failures of [`PeerProcess::spawn`](super::PeerProcess::spawn).
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The executable could not be found.
    #[error("peer executable {executable:?} was not found")]
    BinaryNotFound {
        /// Executable that was looked up.
        executable: OsString,
    },

    /// The executable was found but could not be started.
    #[error("failed to start {executable:?}: {source}")]
    SpawnFailed {
        /// Executable that failed to start.
        executable: OsString,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A leftover socket file could not be removed.
    #[error("failed to remove stale socket '{path}': {source}")]
    StaleSocket {
        /// Socket path that could not be removed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The socket directory could not be prepared.
    #[error(transparent)]
    Prepare(#[from] EndpointPreparationError),

    /// The peer exited before its endpoint accepted connections.
    #[error("peer exited before it was ready ({status})")]
    ExitedEarly {
        /// Exit status reported by the operating system.
        status: ExitStatus,
    },

    /// The peer kept running but never accepted connections.
    #[error("peer did not accept connections on {endpoint} after {attempts} attempts")]
    NotReady {
        /// Endpoint that was probed.
        endpoint: String,
        /// Number of probes made.
        attempts: u32,
    },

    /// Querying the child's status failed.
    #[error("failed to query peer process status: {source}")]
    Status {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
