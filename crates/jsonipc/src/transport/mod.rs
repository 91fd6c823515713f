//! Duplex byte channels to the peer.
//!
//! A [`Transport`] is chosen once, when connecting, from the endpoint's
//! transport kind. The rest of the client only sees the trait, so reading,
//! writing and closing never branch on the platform.

use std::io;
use std::time::Duration;

use jsonipc_config::IpcEndpoint;
use tracing::debug;

use crate::connection::CONNECTION_TARGET;
use crate::error::TransportError;

mod tcp;
#[cfg(unix)]
mod unix;

pub use tcp::TcpTransport;
#[cfg(unix)]
pub use unix::UnixSocketTransport;

/// An open, bidirectional byte stream.
///
/// Reads and writes take `&self` so the reader thread can block in
/// [`Transport::read`] while other threads write. [`Transport::close`] must
/// unblock a pending read, which then returns end-of-stream or an error.
pub trait Transport: Send + Sync {
    /// Reads up to `buf.len()` bytes, returning 0 once the peer has closed.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes every byte of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write_all(&self, bytes: &[u8]) -> io::Result<()>;

    /// Shuts the channel down in both directions.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error. Closing an already closed channel
    /// succeeds.
    fn close(&self) -> io::Result<()>;
}

/// Connects to `endpoint`, selecting the transport from its kind.
///
/// # Errors
///
/// Returns [`TransportError`] when the endpoint cannot be resolved or
/// connected, or names a Unix socket on a platform without them.
pub fn connect(
    endpoint: &IpcEndpoint,
    timeout: Duration,
) -> Result<Box<dyn Transport>, TransportError> {
    match endpoint {
        IpcEndpoint::Tcp { host, port } => {
            let transport = TcpTransport::connect(host, *port, timeout)?;
            Ok(Box::new(transport))
        }
        #[cfg(unix)]
        IpcEndpoint::Unix { path } => {
            let transport = UnixSocketTransport::connect(path, timeout).map_err(|source| {
                TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                }
            })?;
            Ok(Box::new(transport))
        }
        #[cfg(not(unix))]
        IpcEndpoint::Unix { .. } => Err(TransportError::UnsupportedUnix {
            endpoint: endpoint.to_string(),
        }),
    }
}

/// Returns true when something accepts connections at `endpoint`.
#[must_use]
pub fn probe(endpoint: &IpcEndpoint, timeout: Duration) -> bool {
    match connect(endpoint, timeout) {
        Ok(transport) => {
            if let Err(error) = transport.close() {
                debug!(target: CONNECTION_TARGET, %error, "closing probe connection failed");
            }
            true
        }
        Err(_) => false,
    }
}

pub(crate) fn ignore_not_connected(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(error) if error.kind() == io::ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn reports_listening_endpoint_as_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let port = listener.local_addr().expect("local address").port();

        assert!(probe(&IpcEndpoint::tcp("127.0.0.1", port), Duration::from_secs(1)));
    }

    #[rstest]
    fn reports_closed_endpoint_as_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
            listener.local_addr().expect("local address").port()
        };

        assert!(!probe(&IpcEndpoint::tcp("127.0.0.1", port), Duration::from_millis(200)));
    }
}
