//! Shared configuration for the JSON IPC client and its command-line tool.
//!
//! The crate defines how IPC endpoints are addressed ([`IpcEndpoint`]), the
//! tuning knobs of a client connection ([`ClientSettings`]), and the logging
//! defaults used by binaries. Library code never reads the environment; the
//! command-line tool layers flags and environment variables on top of these
//! defaults.

mod defaults;
mod endpoint;
mod logging;
mod settings;

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_LOG_FILTER, DEFAULT_MAX_FRAME_BYTES, DEFAULT_READ_CHUNK_SIZE,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_TCP_PORT, default_endpoint, default_log_filter,
    default_log_format,
};
pub use endpoint::{EndpointParseError, EndpointPreparationError, IpcEndpoint};
pub use logging::{LogFormat, LogFormatParseError};
pub use settings::ClientSettings;
