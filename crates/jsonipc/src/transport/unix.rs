use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use camino::Utf8Path;
use socket2::{Domain, SockAddr, Socket, Type};

use super::{Transport, ignore_not_connected};

/// Transport over a Unix domain stream socket.
#[derive(Debug)]
pub struct UnixSocketTransport {
    stream: UnixStream,
}

impl UnixSocketTransport {
    /// Connects to the socket at `path` within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while creating or connecting the socket.
    pub fn connect(path: &Utf8Path, timeout: Duration) -> io::Result<Self> {
        let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
        let address = SockAddr::unix(path.as_std_path())?;
        socket.connect_timeout(&address, timeout)?;
        Ok(Self::from_stream(UnixStream::from(OwnedFd::from(socket))))
    }

    /// Wraps an already connected stream, such as one half of a socket pair.
    #[must_use]
    pub const fn from_stream(stream: UnixStream) -> Self {
        Self { stream }
    }
}

impl Transport for UnixSocketTransport {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.stream).read(buf)
    }

    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        (&self.stream).write_all(bytes)
    }

    fn close(&self) -> io::Result<()> {
        ignore_not_connected(self.stream.shutdown(Shutdown::Both))
    }
}
