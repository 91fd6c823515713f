//! Error types for the command-line runtime.

use std::io;

use jsonipc::{ClientError, TransportError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Connect(#[from] TransportError),
    #[error("command failed: {0}")]
    Command(#[from] ClientError),
    #[error("failed to encode output: {0}")]
    Encode(serde_json::Error),
    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),
}
