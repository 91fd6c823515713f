//! The peer's advertised properties and commands.
//!
//! A [`Capabilities`] table is discovered once per connection and then
//! consulted locally, so callers can check a name before sending a command
//! that would only fail on the peer.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::client::Client;
use crate::error::ClientError;

/// Property listing every property the peer exposes.
pub const PROPERTY_LIST: &str = "property-list";

/// Property listing every command the peer accepts.
pub const COMMAND_LIST: &str = "command-list";

const GET_PROPERTY: &str = "get_property";
const SET_PROPERTY: &str = "set_property";

/// Errors raised by capability checks.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The peer does not advertise the property.
    #[error("peer has no property named '{0}'")]
    UnknownProperty(String),

    /// The peer does not advertise the command.
    #[error("peer has no command named '{0}'")]
    UnknownCommand(String),

    /// The underlying command failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Sorted sets of the property and command names a peer supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    properties: BTreeSet<String>,
    commands: BTreeSet<String>,
}

impl Capabilities {
    /// Queries the peer's property and command lists.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when either query fails.
    pub fn discover(client: &Client) -> Result<Self, ClientError> {
        let properties = client.send(GET_PROPERTY, [Value::from(PROPERTY_LIST)])?;
        let commands = client.send(GET_PROPERTY, [Value::from(COMMAND_LIST)])?;
        Ok(Self::from_lists(&properties, &commands))
    }

    /// Builds the table from raw list values.
    ///
    /// Entries may be plain strings or objects carrying a `name` field; any
    /// other entry is ignored.
    #[must_use]
    pub fn from_lists(properties: &Value, commands: &Value) -> Self {
        Self {
            properties: names(properties),
            commands: names(commands),
        }
    }

    /// Returns true when the peer advertises `name` as a property.
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }

    /// Returns true when the peer advertises `name` as a command.
    #[must_use]
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains(name)
    }

    /// Property names in sorted order.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(String::as_str)
    }

    /// Command names in sorted order.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }

    /// Fails unless `name` is an advertised property.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::UnknownProperty`].
    pub fn require_property(&self, name: &str) -> Result<(), CapabilityError> {
        if self.has_property(name) {
            Ok(())
        } else {
            Err(CapabilityError::UnknownProperty(name.to_owned()))
        }
    }

    /// Fails unless `name` is an advertised command.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::UnknownCommand`].
    pub fn require_command(&self, name: &str) -> Result<(), CapabilityError> {
        if self.has_command(name) {
            Ok(())
        } else {
            Err(CapabilityError::UnknownCommand(name.to_owned()))
        }
    }
}

fn names(list: &Value) -> BTreeSet<String> {
    let Some(entries) = list.as_array() else {
        return BTreeSet::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(name) => Some(name.clone()),
            Value::Object(fields) => fields.get("name").and_then(Value::as_str).map(str::to_owned),
            _ => None,
        })
        .collect()
}

/// Property access checked against a capability table.
#[derive(Debug, Clone, Copy)]
pub struct Properties<'a> {
    client: &'a Client,
    capabilities: &'a Capabilities,
}

impl<'a> Properties<'a> {
    /// Pairs a client with the table discovered from it.
    #[must_use]
    pub const fn new(client: &'a Client, capabilities: &'a Capabilities) -> Self {
        Self {
            client,
            capabilities,
        }
    }

    /// Reads a property.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::UnknownProperty`] without contacting the peer
    /// when the property is not advertised, otherwise the command's failure.
    pub fn get(&self, name: &str) -> Result<Value, CapabilityError> {
        self.capabilities.require_property(name)?;
        Ok(self.client.send(GET_PROPERTY, [Value::from(name)])?)
    }

    /// Writes a property.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::UnknownProperty`] without contacting the peer
    /// when the property is not advertised, otherwise the command's failure.
    pub fn set(&self, name: &str, value: Value) -> Result<(), CapabilityError> {
        self.capabilities.require_property(name)?;
        self.client.send(SET_PROPERTY, [Value::from(name), value])?;
        Ok(())
    }
}
