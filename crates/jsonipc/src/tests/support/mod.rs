//! Shared fixtures for client tests.

mod fake_peer;
mod scripted;

use std::io;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use mockall::mock;

use crate::transport::Transport;
use crate::{Client, ClientSettings, IpcEndpoint, Notification};

pub(crate) use fake_peer::{FakePeer, request_id_of};
pub(crate) use scripted::FailingWriteTransport;

mock! {
    pub PeerTransport {}
    impl Transport for PeerTransport {
        fn read(&self, buf: &mut [u8]) -> io::Result<usize>;
        fn write_all(&self, bytes: &[u8]) -> io::Result<()>;
        fn close(&self) -> io::Result<()>;
    }
}

/// Settings used by every in-process client.
pub(crate) fn test_settings(request_timeout: Duration) -> ClientSettings {
    ClientSettings::new(IpcEndpoint::unix("/nonexistent/jsonipc-test.sock"))
        .with_request_timeout(request_timeout)
}

/// A client wired to a fake peer, with notifications collected on a channel.
pub(crate) struct PeerHarness {
    pub(crate) client: Client,
    pub(crate) peer: FakePeer,
    pub(crate) events: Receiver<Notification>,
}

/// Connects a client to a fresh fake peer.
pub(crate) fn connect_to_fake_peer(request_timeout: Duration) -> PeerHarness {
    let (transport, peer) = FakePeer::pair();
    let (sender, events) = mpsc::channel();
    let client = Client::from_transport(Box::new(transport), &test_settings(request_timeout), sender)
        .expect("client should start");
    PeerHarness {
        client,
        peer,
        events,
    }
}

/// Polls `condition` until it holds or `limit` elapses.
pub(crate) fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
