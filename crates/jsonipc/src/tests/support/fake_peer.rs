//! An in-process peer on the far end of a Unix socket pair.

use std::io::{BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::{Value, json};

use crate::transport::UnixSocketTransport;

const PEER_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// The peer side of a client connection.
pub(crate) struct FakePeer {
    writer: UnixStream,
    reader: BufReader<UnixStream>,
}

impl FakePeer {
    /// Creates a connected transport and the peer on its far end.
    pub(crate) fn pair() -> (UnixSocketTransport, Self) {
        let (local, remote) = UnixStream::pair().expect("socket pair");
        remote
            .set_read_timeout(Some(PEER_READ_TIMEOUT))
            .expect("set peer read timeout");
        let reader = BufReader::new(remote.try_clone().expect("clone peer stream"));
        (
            UnixSocketTransport::from_stream(local),
            Self {
                writer: remote,
                reader,
            },
        )
    }

    /// Reads the next command line sent by the client.
    pub(crate) fn next_command(&mut self) -> Option<Value> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(serde_json::from_str(&line).expect("client sent valid JSON")),
        }
    }

    /// Writes raw bytes exactly as given.
    pub(crate) fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).expect("peer write");
    }

    /// Writes one document followed by a newline.
    pub(crate) fn send_document(&mut self, document: &Value) {
        let mut line = serde_json::to_vec(document).expect("encode document");
        line.push(b'\n');
        self.send_raw(&line);
    }

    /// Replies to `request_id` with `error` and optional `data`.
    pub(crate) fn reply(&mut self, request_id: u64, error: &str, data: Option<Value>) {
        let mut document = json!({"request_id": request_id, "error": error});
        if let (Some(value), Some(fields)) = (data, document.as_object_mut()) {
            fields.insert(String::from("data"), value);
        }
        self.send_document(&document);
    }

    /// Closes the peer's side of the connection.
    pub(crate) fn hang_up(&self) {
        drop(self.writer.shutdown(Shutdown::Both));
    }

    /// Answers every command on a background thread.
    ///
    /// `respond` maps each command document to the reply to send, or `None`
    /// to stay silent. The thread ends when the client closes.
    pub(crate) fn serve<F>(mut self, mut respond: F) -> JoinHandle<()>
    where
        F: FnMut(&Value) -> Option<Value> + Send + 'static,
    {
        thread::spawn(move || {
            while let Some(command) = self.next_command() {
                if let Some(reply) = respond(&command) {
                    self.send_document(&reply);
                }
            }
        })
    }
}

/// Identifier carried by a command document.
pub(crate) fn request_id_of(command: &Value) -> u64 {
    command
        .get("request_id")
        .and_then(Value::as_u64)
        .expect("command carries a request id")
}
