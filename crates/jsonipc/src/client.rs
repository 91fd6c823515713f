//! The public client facade.

use std::time::Duration;

use jsonipc_config::ClientSettings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::connection::{CONNECTION_TARGET, Connection, ConnectionState};
use crate::dispatcher::{ConnectionStats, DiscardEvents, EventHandler};
use crate::error::{ClientError, FramingError, TransportError};
use crate::protocol::CommandRequest;
use crate::transport::{self, Transport};

/// A connection to a peer speaking the line-delimited JSON IPC protocol.
///
/// Commands may be sent concurrently from any number of threads through a
/// shared reference. Each call blocks until its own reply arrives, the request
/// timeout elapses, or the connection closes. Notifications are delivered to
/// the [`EventHandler`] supplied at construction.
///
/// Dropping the client stops it.
pub struct Client {
    connection: Connection,
    request_timeout: Duration,
}

impl Client {
    /// Connects to the configured endpoint, discarding notifications.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the endpoint cannot be reached.
    pub fn connect(settings: &ClientSettings) -> Result<Self, TransportError> {
        Self::connect_with_handler(settings, DiscardEvents)
    }

    /// Connects to the configured endpoint, routing notifications to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the endpoint cannot be reached.
    pub fn connect_with_handler<H>(settings: &ClientSettings, handler: H) -> Result<Self, TransportError>
    where
        H: EventHandler,
    {
        let transport = transport::connect(settings.endpoint(), settings.connect_timeout())?;
        Self::from_transport(transport, settings, handler)
    }

    /// Runs the protocol over an already open transport.
    ///
    /// The endpoint in `settings` is only used for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::SpawnReader`] when the reader thread cannot
    /// be started.
    pub fn from_transport<H>(
        transport: Box<dyn Transport>,
        settings: &ClientSettings,
        handler: H,
    ) -> Result<Self, TransportError>
    where
        H: EventHandler,
    {
        let connection = Connection::open(transport, settings, Box::new(handler))?;
        Ok(Self {
            connection,
            request_timeout: settings.request_timeout(),
        })
    }

    /// Sends `command` with `args` and returns the reply's `data`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Protocol`] when the peer reports a failure;
    /// - [`ClientError::Timeout`] when no reply arrives in time;
    /// - [`ClientError::ConnectionClosed`] when the client is stopped, the peer
    ///   has gone away, or the write fails;
    /// - [`ClientError::Framing`] when the reply cannot be decoded.
    pub fn send<I>(&self, command: &str, args: I) -> Result<Value, ClientError>
    where
        I: IntoIterator<Item = Value>,
    {
        if self.connection.state() != ConnectionState::Open {
            return Err(ClientError::ConnectionClosed);
        }
        let registry = self.connection.registry();
        let pending = registry.allocate()?;
        let request = CommandRequest::new(pending.id(), command, args);

        debug!(
            target: CONNECTION_TARGET,
            request_id = request.request_id,
            command,
            "sending command"
        );

        if let Err(error) = self.connection.write(&request) {
            registry.discard(request.request_id);
            return Err(error);
        }

        registry.wait(pending, self.request_timeout)?.into_result()
    }

    /// Sends `command` with arguments of any serialisable type.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Framing`] when an argument cannot be serialised,
    /// otherwise the errors of [`Self::send`].
    pub fn command<A>(&self, command: &str, args: &[A]) -> Result<Value, ClientError>
    where
        A: Serialize,
    {
        let values = args
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| FramingError::Encode { source })?;
        self.send(command, values)
    }

    /// Sends `command` and decodes the reply's `data` into `R`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Framing`] when the data does not match `R`,
    /// otherwise the errors of [`Self::send`].
    pub fn request<R, I>(&self, command: &str, args: I) -> Result<R, ClientError>
    where
        R: DeserializeOwned,
        I: IntoIterator<Item = Value>,
    {
        let data = self.send(command, args)?;
        serde_json::from_value(data).map_err(|source| ClientError::from(FramingError::Decode { source }))
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Snapshot of the connection's diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> ConnectionStats {
        self.connection.stats()
    }

    /// Number of commands awaiting a reply.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.connection.registry().pending_count()
    }

    /// Time each command waits for its reply.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Closes the connection and fails every outstanding command.
    ///
    /// Idempotent, and safe to call from an [`EventHandler`] running on the
    /// reader thread.
    pub fn stop(&self) {
        self.connection.stop();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Client")
            .field("state", &self.state())
            .field("pending_requests", &self.pending_requests())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
