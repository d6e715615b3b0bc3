use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::token::CorrelationToken;
use crate::transport::TransportError;

/// Errors returned by [`Client`](super::Client) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The outbound message could not be serialised.
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    /// Connecting, handshaking, or writing failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The dispatcher is unavailable.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// No reply arrived before the deadline; the waiting listener was removed.
    #[error("no reply for {token} within {timeout_ms} ms")]
    ReplyTimeout {
        /// Token attached to the request.
        token: CorrelationToken,
        /// Deadline that elapsed.
        timeout_ms: u64,
    },
    /// The connection closed before a reply arrived.
    #[error("connection closed while waiting for a reply to {token}")]
    Disconnected {
        /// Token attached to the request.
        token: CorrelationToken,
    },
}
