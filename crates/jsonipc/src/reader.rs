//! The per-connection reader loop.

use std::io;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::connection::{ConnectionState, StateCell};
use crate::dispatcher::Dispatcher;
use crate::framer::Framer;
use crate::registry::RequestRegistry;
use crate::transport::Transport;

pub(crate) const READER_TARGET: &str = "jsonipc::reader";

/// Name given to every reader thread.
pub(crate) const READER_THREAD_NAME: &str = "jsonipc-reader";

/// Everything the reader thread owns for the lifetime of a connection.
pub(crate) struct ReaderLoop {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) framer: Framer,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) state: Arc<StateCell>,
    pub(crate) registry: Arc<RequestRegistry>,
    pub(crate) chunk_size: usize,
}

/// Marks the connection closed and fails pending requests however the loop
/// ends, including by a panicking event handler.
struct CloseOnExit {
    state: Arc<StateCell>,
    registry: Arc<RequestRegistry>,
}

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        let previous = self.state.replace(ConnectionState::Closed);
        self.registry.close();
        if previous == ConnectionState::Open {
            info!(target: READER_TARGET, "connection closed by peer");
        }
    }
}

impl ReaderLoop {
    /// Reads until end-of-stream or a read error.
    pub(crate) fn run(self) {
        let Self {
            transport,
            mut framer,
            mut dispatcher,
            state,
            registry,
            chunk_size,
        } = self;
        let _close_on_exit = CloseOnExit {
            state: Arc::clone(&state),
            registry,
        };
        let mut chunk = vec![0_u8; chunk_size];

        loop {
            match transport.read(&mut chunk) {
                Ok(0) => {
                    debug!(target: READER_TARGET, "end of stream");
                    break;
                }
                Ok(read) => {
                    let bytes = chunk.get(..read).unwrap_or_default();
                    for frame in framer.feed(bytes) {
                        dispatcher.accept(frame);
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    if state.get() == ConnectionState::Closing {
                        debug!(target: READER_TARGET, %error, "read ended during shutdown");
                    } else {
                        warn!(target: READER_TARGET, %error, "read failed; closing connection");
                    }
                    break;
                }
            }
        }
    }
}
