//! Message types of the line-delimited JSON IPC protocol.
//!
//! Outbound commands carry a `request_id` which the peer echoes in its reply.
//! Inbound documents are either replies (they carry `request_id`) or
//! notifications (they carry `event`).

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ClientError, FramingError};

/// Field naming the request identifier in commands and replies.
pub const REQUEST_ID_FIELD: &str = "request_id";

/// Field naming the event in notifications.
pub const EVENT_FIELD: &str = "event";

/// The `error` value the peer uses to signal success.
pub const SUCCESS: &str = "success";

/// A command sent to the peer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRequest {
    /// Command name followed by its arguments.
    pub command: Vec<Value>,
    /// Identifier the peer echoes in its reply.
    pub request_id: u64,
}

impl CommandRequest {
    /// Builds a request for `name` with the given arguments.
    #[must_use]
    pub fn new<I>(request_id: u64, name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut command = vec![Value::String(name.to_owned())];
        command.extend(args);
        Self {
            command,
            request_id,
        }
    }

    /// Returns the command name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.command.first().and_then(Value::as_str).unwrap_or_default()
    }

    /// Appends the request to `buffer` as one newline-terminated line.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::Encode`] if serialisation fails.
    pub fn encode_line(&self, buffer: &mut Vec<u8>) -> Result<(), FramingError> {
        serde_json::to_writer(&mut *buffer, self).map_err(|source| FramingError::Encode { source })?;
        buffer.push(b'\n');
        Ok(())
    }
}

/// A reply to a previously sent command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reply {
    /// Identifier of the command being answered.
    pub request_id: u64,
    /// `"success"` or a failure reason.
    pub error: String,
    /// Result payload, `null` when the peer sent none.
    #[serde(default)]
    pub data: Value,
}

impl Reply {
    /// Returns true when the peer reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error == SUCCESS
    }

    /// Converts the reply into the command's result.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] carrying the peer's reason when the
    /// reply is not a success.
    pub fn into_result(self) -> Result<Value, ClientError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ClientError::Protocol(self.error))
        }
    }
}

/// An unsolicited message from the peer.
///
/// The whole decoded object is retained, so handlers can read any payload
/// field alongside the event name.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    event: String,
    body: Map<String, Value>,
}

impl Notification {
    /// Name of the event.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Looks up a field of the notification.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    /// The full decoded notification, including the `event` field.
    #[must_use]
    pub const fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Consumes the notification, returning the decoded object.
    #[must_use]
    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }
}

impl Serialize for Notification {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.body.serialize(serializer)
    }
}

/// Classification of one framed inbound document.
#[derive(Debug)]
pub(crate) enum Inbound {
    Reply {
        request_id: u64,
        outcome: Result<Reply, FramingError>,
    },
    Notification(Notification),
    Unrecognised(Value),
}

impl Inbound {
    pub(crate) fn classify(document: Value) -> Self {
        let Value::Object(map) = document else {
            return Self::Unrecognised(document);
        };

        match map.get(REQUEST_ID_FIELD).map(Value::as_u64) {
            Some(Some(request_id)) => {
                let outcome = serde_json::from_value(Value::Object(map))
                    .map_err(|source| FramingError::MalformedReply { request_id, source });
                return Self::Reply {
                    request_id,
                    outcome,
                };
            }
            Some(None) => return Self::Unrecognised(Value::Object(map)),
            None => {}
        }

        match map.get(EVENT_FIELD) {
            Some(Value::String(name)) => {
                let event = name.clone();
                Self::Notification(Notification { event, body: map })
            }
            _ => Self::Unrecognised(Value::Object(map)),
        }
    }
}
