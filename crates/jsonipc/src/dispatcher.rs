//! Routing of framed documents to waiting requests or the event subscriber.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::FramingError;
use crate::protocol::{Inbound, Notification};
use crate::reader::READER_TARGET;
use crate::registry::RequestRegistry;

/// Receives notifications on the connection's reader thread.
///
/// Handlers run synchronously between reads, so a handler that blocks stalls
/// both notification delivery and reply correlation.
pub trait EventHandler: Send + 'static {
    /// Called once per notification, in the order the peer sent them.
    fn on_event(&mut self, notification: Notification);
}

impl<F> EventHandler for F
where
    F: FnMut(Notification) + Send + 'static,
{
    fn on_event(&mut self, notification: Notification) {
        self(notification);
    }
}

impl EventHandler for Sender<Notification> {
    fn on_event(&mut self, notification: Notification) {
        if self.send(notification).is_err() {
            trace!(target: READER_TARGET, "notification receiver has gone away");
        }
    }
}

/// Handler that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardEvents;

impl EventHandler for DiscardEvents {
    fn on_event(&mut self, notification: Notification) {
        trace!(target: READER_TARGET, event = notification.event(), "notification discarded");
    }
}

/// Diagnostic counters for one connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ConnectionStats {
    /// Lines that failed to parse or outgrew the frame limit.
    pub framing_errors: u64,
    /// Documents that were neither replies nor notifications.
    pub unrecognised: u64,
    /// Replies with no pending request, usually because it timed out.
    pub dropped_replies: u64,
    /// Notifications handed to the subscriber.
    pub notifications: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    framing_errors: AtomicU64,
    unrecognised: AtomicU64,
    dropped_replies: AtomicU64,
    notifications: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
            unrecognised: self.unrecognised.load(Ordering::Relaxed),
            dropped_replies: self.dropped_replies.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_framing_error(&self) {
        self.framing_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Classifies inbound documents and routes them.
pub(crate) struct Dispatcher {
    registry: Arc<RequestRegistry>,
    stats: Arc<StatsCounters>,
    handler: Box<dyn EventHandler>,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<RequestRegistry>,
        stats: Arc<StatsCounters>,
        handler: Box<dyn EventHandler>,
    ) -> Self {
        Self {
            registry,
            stats,
            handler,
        }
    }

    /// Routes one framing result.
    pub(crate) fn accept(&mut self, frame: Result<Value, FramingError>) {
        match frame {
            Ok(document) => self.route(document),
            Err(error) => {
                self.stats.record_framing_error();
                warn!(target: READER_TARGET, %error, "skipping undecodable input");
            }
        }
    }

    pub(crate) fn route(&mut self, document: Value) {
        match Inbound::classify(document) {
            Inbound::Reply {
                request_id,
                outcome,
            } => {
                if let Err(error) = &outcome {
                    self.stats.record_framing_error();
                    warn!(target: READER_TARGET, request_id, %error, "malformed reply");
                }
                if self.registry.resolve(request_id, outcome) {
                    trace!(target: READER_TARGET, request_id, "reply delivered");
                } else {
                    self.stats.dropped_replies.fetch_add(1, Ordering::Relaxed);
                    debug!(target: READER_TARGET, request_id, "dropping reply with no pending request");
                }
            }
            Inbound::Notification(notification) => {
                self.stats.notifications.fetch_add(1, Ordering::Relaxed);
                trace!(target: READER_TARGET, event = notification.event(), "notification");
                self.handler.on_event(notification);
            }
            Inbound::Unrecognised(document) => {
                self.stats.unrecognised.fetch_add(1, Ordering::Relaxed);
                warn!(target: READER_TARGET, %document, "ignoring unrecognised document");
            }
        }
    }
}
