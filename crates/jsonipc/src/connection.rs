//! Ownership of one transport, its reader thread and its pending requests.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use jsonipc_config::ClientSettings;
use tracing::{debug, warn};

use crate::dispatcher::{ConnectionStats, Dispatcher, EventHandler, StatsCounters};
use crate::error::{ClientError, TransportError};
use crate::framer::Framer;
use crate::protocol::CommandRequest;
use crate::reader::{READER_THREAD_NAME, ReaderLoop};
use crate::registry::RequestRegistry;
use crate::transport::Transport;

pub(crate) const CONNECTION_TARGET: &str = "jsonipc::connection";

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// The reader thread is being started.
    Connecting,
    /// Commands may be sent.
    Open,
    /// [`Client::stop`](crate::Client::stop) is tearing the connection down.
    Closing,
    /// The transport is closed and every pending request has failed.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        formatter.write_str(label)
    }
}

/// Shared, lock-protected [`ConnectionState`].
#[derive(Debug)]
pub(crate) struct StateCell(Mutex<ConnectionState>);

impl StateCell {
    const fn new(state: ConnectionState) -> Self {
        Self(Mutex::new(state))
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self) -> ConnectionState {
        *self.lock()
    }

    /// Stores `next`, returning the previous state.
    pub(crate) fn replace(&self, next: ConnectionState) -> ConnectionState {
        std::mem::replace(&mut *self.lock(), next)
    }

    /// Enters [`ConnectionState::Closing`] unless already closed, returning the
    /// previous state.
    fn begin_closing(&self) -> ConnectionState {
        let mut state = self.lock();
        let previous = *state;
        if previous != ConnectionState::Closed {
            *state = ConnectionState::Closing;
        }
        previous
    }

    /// Moves from `from` to `to` only if the state is still `from`.
    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        let mut state = self.lock();
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }
}

/// Serialises writes so concurrent commands never interleave on the wire.
struct FrameWriter {
    transport: Arc<dyn Transport>,
    buffer: Vec<u8>,
}

impl FrameWriter {
    fn write(&mut self, request: &CommandRequest) -> Result<(), ClientError> {
        self.buffer.clear();
        request.encode_line(&mut self.buffer)?;
        self.transport.write_all(&self.buffer).map_err(|error| {
            warn!(
                target: CONNECTION_TARGET,
                request_id = request.request_id,
                %error,
                "write failed"
            );
            ClientError::ConnectionClosed
        })
    }
}

/// A live connection to the peer.
///
/// Lock order is fixed: the registry lock is released before the writer lock
/// is taken, and neither is held while waiting for a reply.
pub(crate) struct Connection {
    transport: Arc<dyn Transport>,
    registry: Arc<RequestRegistry>,
    stats: Arc<StatsCounters>,
    state: Arc<StateCell>,
    writer: Mutex<FrameWriter>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Takes ownership of `transport` and starts its reader thread.
    pub(crate) fn open(
        transport: Box<dyn Transport>,
        settings: &ClientSettings,
        handler: Box<dyn EventHandler>,
    ) -> Result<Self, TransportError> {
        let transport: Arc<dyn Transport> = Arc::from(transport);
        let registry = Arc::new(RequestRegistry::new());
        let stats = Arc::new(StatsCounters::default());
        let state = Arc::new(StateCell::new(ConnectionState::Connecting));

        let reader_loop = ReaderLoop {
            transport: Arc::clone(&transport),
            framer: Framer::new(settings.max_frame_bytes()),
            dispatcher: Dispatcher::new(Arc::clone(&registry), Arc::clone(&stats), handler),
            state: Arc::clone(&state),
            registry: Arc::clone(&registry),
            chunk_size: settings.read_chunk_size(),
        };
        let handle = thread::Builder::new()
            .name(READER_THREAD_NAME.to_owned())
            .spawn(move || reader_loop.run())
            .map_err(|source| TransportError::SpawnReader { source })?;

        if state.transition(ConnectionState::Connecting, ConnectionState::Open) {
            debug!(target: CONNECTION_TARGET, endpoint = %settings.endpoint(), "connection open");
        }

        Ok(Self {
            writer: Mutex::new(FrameWriter {
                transport: Arc::clone(&transport),
                buffer: Vec::new(),
            }),
            transport,
            registry,
            stats,
            state,
            reader: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub(crate) fn stats(&self) -> ConnectionStats {
        self.stats.snapshot()
    }

    /// Writes one command line under the write lock.
    pub(crate) fn write(&self, request: &CommandRequest) -> Result<(), ClientError> {
        if self.state() != ConnectionState::Open {
            return Err(ClientError::ConnectionClosed);
        }
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(request)
    }

    /// Closes the transport, joins the reader and fails pending requests.
    ///
    /// Safe to call repeatedly and from any thread. When called on the reader
    /// thread itself the join is skipped.
    pub(crate) fn stop(&self) {
        let previous = self.state.begin_closing();
        if previous != ConnectionState::Closed {
            debug!(target: CONNECTION_TARGET, from = %previous, "stopping connection");
        }

        if let Err(error) = self.transport.close() {
            debug!(target: CONNECTION_TARGET, %error, "transport close failed");
        }

        let handle = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reader) = handle {
            if reader.thread().id() == thread::current().id() {
                debug!(target: CONNECTION_TARGET, "stop called from reader thread; not joining");
            } else if reader.join().is_err() {
                warn!(target: CONNECTION_TARGET, "reader thread panicked");
            }
        }

        self.registry.close();
        self.state.replace(ConnectionState::Closed);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.stop();
    }
}
