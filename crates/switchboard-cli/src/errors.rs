//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use switchboard::ClientError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("invalid message: {0}")]
    InvalidMessage(serde_json::Error),
    #[error("failed to encode output: {0}")]
    EncodeOutput(serde_json::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
    #[error(transparent)]
    Client(#[from] ClientError),
}
