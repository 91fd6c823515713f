//! Starting and stopping a peer process that serves the IPC protocol.
//!
//! [`PeerProcess::spawn`] clears any stale socket file left by a previous run,
//! starts the executable with its endpoint flag, and polls until the endpoint
//! accepts connections. The child is terminated when the handle is stopped or
//! dropped.

mod config;
mod error;
mod lifecycle;

use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

use jsonipc_config::{ClientSettings, IpcEndpoint};
use tracing::{debug, info, trace};

use crate::transport;

pub use config::{
    DEFAULT_EXECUTABLE, DEFAULT_IPC_FLAG, DEFAULT_READINESS_ATTEMPTS, DEFAULT_READINESS_INTERVAL,
    LaunchConfig,
};
pub use error::LaunchError;

pub(crate) const LAUNCHER_TARGET: &str = "jsonipc::launcher";

/// A running peer process.
#[derive(Debug)]
pub struct PeerProcess {
    child: Child,
    endpoint: IpcEndpoint,
}

impl PeerProcess {
    /// Starts the peer described by `config` and waits until it is ready.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the executable cannot be started, a stale
    /// socket cannot be removed, the peer exits early, or it never accepts
    /// connections. The child is terminated before returning an error.
    pub fn spawn(config: &LaunchConfig) -> Result<Self, LaunchError> {
        let endpoint = config.endpoint().clone();
        remove_stale_socket(&endpoint)?;
        endpoint.prepare_filesystem()?;

        let mut command = Command::new(config.executable());
        command.args(config.arguments()).stdin(Stdio::null());
        if let Some(dir) = config.working_dir() {
            command.current_dir(dir);
        }
        if config.is_quiet() {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let child = command.spawn().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LaunchError::BinaryNotFound {
                    executable: config.executable().clone(),
                }
            } else {
                LaunchError::SpawnFailed {
                    executable: config.executable().clone(),
                    source,
                }
            }
        })?;
        debug!(
            target: LAUNCHER_TARGET,
            pid = child.id(),
            %endpoint,
            "peer process started"
        );

        let mut process = Self { child, endpoint };
        process.await_ready(config)?;
        Ok(process)
    }

    fn await_ready(&mut self, config: &LaunchConfig) -> Result<(), LaunchError> {
        let attempts = config.readiness_attempts();
        let interval = config.readiness_interval();
        for attempt in 1..=attempts {
            thread::sleep(interval);
            if let Some(status) = self
                .child
                .try_wait()
                .map_err(|source| LaunchError::Status { source })?
            {
                return Err(LaunchError::ExitedEarly { status });
            }
            if transport::probe(&self.endpoint, interval) {
                info!(
                    target: LAUNCHER_TARGET,
                    pid = self.child.id(),
                    endpoint = %self.endpoint,
                    attempt,
                    "peer is ready"
                );
                return Ok(());
            }
            trace!(target: LAUNCHER_TARGET, attempt, "peer not ready yet");
        }
        Err(LaunchError::NotReady {
            endpoint: self.endpoint.to_string(),
            attempts,
        })
    }

    /// Operating system identifier of the child.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Endpoint the peer listens on.
    #[must_use]
    pub const fn endpoint(&self) -> &IpcEndpoint {
        &self.endpoint
    }

    /// Client settings addressing this peer, with default tuning.
    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings::new(self.endpoint.clone())
    }

    /// Returns the exit status if the child has exited.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while querying the child.
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Terminates the peer: a termination request, a short grace period, then
    /// a kill.
    pub fn stop(&mut self) {
        lifecycle::terminate(&mut self.child);
    }
}

impl Drop for PeerProcess {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            lifecycle::kill(&mut self.child);
        }
    }
}

fn remove_stale_socket(endpoint: &IpcEndpoint) -> Result<(), LaunchError> {
    let Some(path) = endpoint.unix_path() else {
        return Ok(());
    };
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(target: LAUNCHER_TARGET, %path, "removed stale socket");
            Ok(())
        }
        Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LaunchError::StaleSocket {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixListener;
    use std::os::unix::process::ExitStatusExt;
    use std::thread::JoinHandle;
    use std::time::{Duration, Instant};

    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    struct SocketDir {
        _dir: TempDir,
        path: Utf8PathBuf,
    }

    #[fixture]
    fn socket_dir() -> SocketDir {
        let dir = tempfile::tempdir().expect("temp dir");
        let path =
            Utf8PathBuf::from_path_buf(dir.path().join("peer.sock")).expect("utf-8 temp path");
        SocketDir { _dir: dir, path }
    }

    fn fast(config: LaunchConfig) -> LaunchConfig {
        config.with_readiness(5, Duration::from_millis(20)).with_quiet(true)
    }

    /// Binds the endpoint from a helper thread once `spawn` has cleared it,
    /// standing in for a peer that opens its socket shortly after start-up.
    fn listen_after(path: &Utf8PathBuf, delay: Duration) -> JoinHandle<UnixListener> {
        let socket = path.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            UnixListener::bind(socket.as_std_path()).expect("bind endpoint")
        })
    }

    fn long_running(path: &Utf8PathBuf, script: &str) -> LaunchConfig {
        LaunchConfig::new(IpcEndpoint::unix(path.clone()))
            .with_executable("sh")
            .with_arg("-c")
            .with_arg(script)
            .with_arg("jsonipc-peer")
            .with_readiness(25, Duration::from_millis(20))
            .with_quiet(true)
    }

    #[rstest]
    fn missing_executable_is_reported(socket_dir: SocketDir) {
        let config = fast(
            LaunchConfig::new(IpcEndpoint::unix(socket_dir.path))
                .with_executable("/nonexistent/jsonipc-peer"),
        );

        let error = PeerProcess::spawn(&config).expect_err("binary does not exist");
        assert!(matches!(error, LaunchError::BinaryNotFound { .. }));
    }

    #[rstest]
    fn immediately_exiting_peer_is_reported(socket_dir: SocketDir) {
        let config = fast(LaunchConfig::new(IpcEndpoint::unix(socket_dir.path)).with_executable("true"));

        let error = PeerProcess::spawn(&config).expect_err("peer exits at once");
        assert!(matches!(error, LaunchError::ExitedEarly { .. }));
    }

    #[rstest]
    fn peer_that_never_listens_is_not_ready(socket_dir: SocketDir) {
        let config = fast(
            LaunchConfig::new(IpcEndpoint::unix(socket_dir.path))
                .with_executable("sh")
                .with_arg("-c")
                .with_arg("exec sleep 5")
                .with_arg("jsonipc-peer"),
        );

        let error = PeerProcess::spawn(&config).expect_err("the shell never listens");
        assert!(matches!(error, LaunchError::NotReady { attempts: 5, .. }));
    }

    #[rstest]
    fn stale_socket_file_is_removed(socket_dir: SocketDir) {
        std::fs::write(socket_dir.path.as_std_path(), b"stale").expect("write stale file");

        remove_stale_socket(&IpcEndpoint::unix(socket_dir.path.clone())).expect("removal");

        assert!(!socket_dir.path.as_std_path().exists());
    }

    #[rstest]
    fn ready_peer_stops_on_termination_request(socket_dir: SocketDir) {
        let config = long_running(&socket_dir.path, "exec sleep 5");
        let listener = listen_after(&socket_dir.path, Duration::from_millis(60));

        let mut peer = PeerProcess::spawn(&config).expect("peer becomes ready");
        let _listener = listener.join().expect("listener thread");
        assert_eq!(peer.endpoint(), &IpcEndpoint::unix(socket_dir.path.clone()));

        peer.stop();

        let status = peer
            .try_wait()
            .expect("status query")
            .expect("peer has exited");
        assert_eq!(status.signal(), Some(libc::SIGTERM));
    }

    #[rstest]
    fn peer_ignoring_termination_is_killed_after_grace(socket_dir: SocketDir) {
        let config = long_running(&socket_dir.path, "trap '' TERM; exec sleep 5");
        let listener = listen_after(&socket_dir.path, Duration::from_millis(60));

        let mut peer = PeerProcess::spawn(&config).expect("peer becomes ready");
        let _listener = listener.join().expect("listener thread");

        let started = Instant::now();
        peer.stop();
        let elapsed = started.elapsed();

        let status = peer
            .try_wait()
            .expect("status query")
            .expect("peer has exited");
        assert_eq!(status.signal(), Some(libc::SIGKILL));
        assert!(
            elapsed >= lifecycle::TERMINATION_GRACE,
            "killed after {elapsed:?}"
        );
    }
}
