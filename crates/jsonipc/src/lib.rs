//! Client engine for line-delimited JSON IPC peers.
//!
//! The crate speaks the protocol used by media players such as mpv on their
//! `--input-ipc-server` socket: each message is one JSON document terminated
//! by a newline, commands carry a `request_id` that the peer echoes in its
//! reply, and unsolicited notifications carry an `event` name.
//!
//! A [`Client`] owns one [`Transport`], a reader thread that frames inbound
//! bytes, and a registry correlating each command with its reply. Commands may
//! be sent from many threads at once; notifications are delivered in peer
//! order to an [`EventHandler`]. The [`launcher`] module starts a peer process
//! and the [`Capabilities`] table records what the peer advertises.

mod capabilities;
mod client;
mod connection;
mod dispatcher;
mod error;
mod framer;
pub mod launcher;
mod protocol;
mod reader;
mod registry;
pub mod transport;

#[cfg(all(test, unix))]
mod tests;

pub use capabilities::{COMMAND_LIST, Capabilities, CapabilityError, PROPERTY_LIST, Properties};
pub use client::Client;
pub use connection::ConnectionState;
pub use dispatcher::{ConnectionStats, DiscardEvents, EventHandler};
pub use error::{ClientError, FramingError, TransportError};
pub use framer::Framer;
pub use jsonipc_config::{ClientSettings, IpcEndpoint};
pub use protocol::{CommandRequest, Notification, Reply, SUCCESS};
pub use registry::{PendingRequest, RequestRegistry};
pub use transport::Transport;
