//! Correlation of outbound requests with their replies.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{ClientError, FramingError};
use crate::protocol::Reply;

/// What the reader delivers to a waiting request.
pub(crate) type Outcome = Result<Reply, FramingError>;

/// A request that has been assigned an identifier and awaits its reply.
#[derive(Debug)]
pub struct PendingRequest {
    id: u64,
    receiver: Receiver<Outcome>,
}

impl PendingRequest {
    /// Identifier sent to the peer with the command.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    pending: HashMap<u64, SyncSender<Outcome>>,
    closed: bool,
}

/// Issues request identifiers and tracks one completion slot per request.
///
/// The identifier counter and the pending table live behind a single lock so
/// an identifier is never observable before its slot exists. Entries leave the
/// table exactly once: when resolved, when their waiter times out, or when the
/// registry is closed.
#[derive(Debug, Default)]
pub struct RequestRegistry {
    state: Mutex<RegistryState>,
}

impl RequestRegistry {
    /// Creates an open registry whose first identifier is zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Reserves a fresh identifier and an unsignalled completion slot.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionClosed`] once [`Self::close`] has run.
    pub fn allocate(&self) -> Result<PendingRequest, ClientError> {
        let mut state = self.lock();
        if state.closed {
            return Err(ClientError::ConnectionClosed);
        }
        let id = state.next_id;
        state.next_id += 1;
        let (sender, receiver) = mpsc::sync_channel(1);
        state.pending.insert(id, sender);
        Ok(PendingRequest { id, receiver })
    }

    /// Completes the request `id` with `outcome`.
    ///
    /// Returns `false` when no request with that identifier is pending, in
    /// which case the outcome is dropped.
    pub(crate) fn resolve(&self, id: u64, outcome: Outcome) -> bool {
        let Some(sender) = self.lock().pending.remove(&id) else {
            return false;
        };
        sender.try_send(outcome).is_ok()
    }

    /// Blocks until the request completes or `timeout` elapses.
    ///
    /// On timeout the slot is removed so a late reply is dropped rather than
    /// retained. A reply that was delivered while the deadline expired is still
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] when the deadline passes,
    /// [`ClientError::ConnectionClosed`] when the registry closes first, and
    /// [`ClientError::Framing`] when the reply could not be decoded.
    pub fn wait(&self, pending: PendingRequest, timeout: Duration) -> Result<Reply, ClientError> {
        let PendingRequest { id, receiver } = pending;
        match receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome.map_err(ClientError::from),
            Err(RecvTimeoutError::Disconnected) => Err(ClientError::ConnectionClosed),
            Err(RecvTimeoutError::Timeout) => {
                self.discard(id);
                match receiver.try_recv() {
                    Ok(outcome) => outcome.map_err(ClientError::from),
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                        Err(ClientError::Timeout {
                            request_id: id,
                            timeout,
                        })
                    }
                }
            }
        }
    }

    /// Forgets the slot for `id` without signalling it.
    pub(crate) fn discard(&self, id: u64) {
        self.lock().pending.remove(&id);
    }

    /// Refuses further allocations and fails every pending request.
    ///
    /// Dropping the completion senders wakes each waiter with
    /// [`ClientError::ConnectionClosed`].
    pub fn close(&self) {
        let drained = {
            let mut state = self.lock();
            state.closed = true;
            std::mem::take(&mut state.pending)
        };
        drop(drained);
    }

    /// Returns true once [`Self::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of requests awaiting a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}
