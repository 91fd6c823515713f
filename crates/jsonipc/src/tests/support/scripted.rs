//! A transport whose writes always fail.

use std::io;
use std::sync::{Condvar, Mutex};

use crate::transport::Transport;

/// Reads block until the transport is closed; writes report a broken pipe.
#[derive(Default)]
pub(crate) struct FailingWriteTransport {
    closed: Mutex<bool>,
    wake: Condvar,
}

impl Transport for FailingWriteTransport {
    fn read(&self, _buf: &mut [u8]) -> io::Result<usize> {
        let mut closed = self.closed.lock().expect("closed flag");
        while !*closed {
            closed = self.wake.wait(closed).expect("closed flag");
        }
        Ok(0)
    }

    fn write_all(&self, _bytes: &[u8]) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }

    fn close(&self) -> io::Result<()> {
        *self.closed.lock().expect("closed flag") = true;
        self.wake.notify_all();
        Ok(())
    }
}
