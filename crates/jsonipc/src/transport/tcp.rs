use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::TransportError;

use super::{Transport, ignore_not_connected};

/// Transport over a TCP connection.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Resolves `host` and connects within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Resolve`] when the host has no usable address
    /// and [`TransportError::Connect`] when the connection fails.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, TransportError> {
        let endpoint = format!("tcp://{host}:{port}");
        let address = resolve(host, port).map_err(|source| TransportError::Resolve {
            endpoint: endpoint.clone(),
            source,
        })?;
        let stream = TcpStream::connect_timeout(&address, timeout)
            .and_then(|stream| {
                stream.set_nodelay(true)?;
                Ok(stream)
            })
            .map_err(|source| TransportError::Connect { endpoint, source })?;
        Ok(Self::from_stream(stream))
    }

    /// Wraps an already connected stream.
    #[must_use]
    pub const fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }
}

fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

impl Transport for TcpTransport {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.stream).read(buf)
    }

    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        (&self.stream).write_all(bytes)?;
        (&self.stream).flush()
    }

    fn close(&self) -> io::Result<()> {
        ignore_not_connected(self.stream.shutdown(Shutdown::Both))
    }
}
