//! Error types surfaced by the client and its transports.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failures visible to callers of [`Client`](crate::Client).
///
/// Every failure of a command maps to exactly one of these kinds; transport
/// and codec errors raised while a command is in flight are folded into them.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No reply arrived within the request timeout.
    #[error("no reply to request {request_id} within {timeout:?}")]
    Timeout {
        /// Identifier of the request that timed out.
        request_id: u64,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The peer replied with a failure reason.
    #[error("peer reported failure: {0}")]
    Protocol(String),

    /// The connection is closing or closed.
    #[error("connection is closed")]
    ConnectionClosed,

    /// A message could not be encoded or decoded.
    #[error(transparent)]
    Framing(#[from] FramingError),
}

impl ClientError {
    /// Returns the peer-reported reason for protocol failures.
    #[must_use]
    pub fn protocol_reason(&self) -> Option<&str> {
        match self {
            Self::Protocol(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Failures to turn bytes into protocol messages or back.
#[derive(Debug, Error)]
pub enum FramingError {
    /// A newline-delimited fragment was not valid JSON.
    #[error("discarded a document that is not valid JSON: {source}")]
    Decode {
        /// Parser error for the fragment.
        #[source]
        source: serde_json::Error,
    },

    /// A partial document grew past the buffering limit.
    #[error("discarded a partial document larger than {limit} bytes")]
    Oversized {
        /// Configured maximum frame size in bytes.
        limit: usize,
    },

    /// A reply carried a request identifier but its other fields were invalid.
    #[error("reply to request {request_id} is malformed: {source}")]
    MalformedReply {
        /// Identifier found in the reply.
        request_id: u64,
        /// Decoder error for the reply body.
        #[source]
        source: serde_json::Error,
    },

    /// An outbound command could not be serialised.
    #[error("failed to encode command: {source}")]
    Encode {
        /// Serialiser error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while establishing a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP host name did not resolve.
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        /// Endpoint being resolved.
        endpoint: String,
        /// Resolver error.
        #[source]
        source: io::Error,
    },

    /// The endpoint refused or failed the connection.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// Endpoint being connected.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Unix domain sockets are not available on this platform.
    #[error("platform does not support Unix sockets: {endpoint}")]
    UnsupportedUnix {
        /// Endpoint that was requested.
        endpoint: String,
    },

    /// The reader thread could not be started.
    #[error("failed to start reader thread: {source}")]
    SpawnReader {
        /// Thread builder error.
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Returns true when the error means nothing is listening at the endpoint.
    #[must_use]
    pub fn is_peer_absent(&self) -> bool {
        match self {
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::NotFound
                    | io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }
}
