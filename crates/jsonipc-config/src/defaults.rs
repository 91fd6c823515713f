use std::time::Duration;

#[cfg(unix)]
use camino::Utf8PathBuf;
#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

use crate::endpoint::IpcEndpoint;
use crate::logging::LogFormat;

/// Default TCP port used when Unix domain sockets are not available.
pub const DEFAULT_TCP_PORT: u16 = 9779;

/// Time a command waits for its reply before failing.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Time allowed for establishing the transport connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Size of each read issued against the transport.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// Largest partial document the framer buffers before discarding it.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// File name of the socket inside the runtime directory.
#[cfg(unix)]
const SOCKET_FILE_NAME: &str = "jsonipc.sock";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Computes the default IPC endpoint.
///
/// On Unix this is a socket under the user's runtime directory, falling back to
/// a per-user directory below the system temporary directory. Other platforms
/// use TCP on the loopback interface.
#[must_use]
pub fn default_endpoint() -> IpcEndpoint {
    default_endpoint_inner()
}

#[cfg(unix)]
fn default_endpoint_inner() -> IpcEndpoint {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("jsonipc");
    if apply_namespace {
        base.push(user_namespace());
    }

    IpcEndpoint::unix(base.join(SOCKET_FILE_NAME))
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = std::env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn default_endpoint_inner() -> IpcEndpoint {
    IpcEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}
