use std::io;

use thiserror::Error;

/// Errors raised while talking to the proxy over a socket.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reading or writing the stream failed.
    #[error("proxy stream I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The TCP host name did not resolve.
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        /// Endpoint as configured.
        endpoint: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// The connection attempt failed or timed out.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// Endpoint as configured.
        endpoint: String,
        /// Connection failure.
        #[source]
        source: io::Error,
    },
    /// The proxy closed or stalled before sending the client id.
    #[error("proxy handshake with {endpoint} failed: {source}")]
    Handshake {
        /// Endpoint as configured.
        endpoint: String,
        /// Read failure.
        #[source]
        source: io::Error,
    },
    /// An outbound payload does not fit in a `u32` length prefix.
    #[error("frame of {len} bytes exceeds the protocol limit")]
    FrameTooLarge {
        /// Encoded payload length.
        len: usize,
    },
    /// Unix sockets are not available on this platform.
    #[error("platform does not support Unix sockets: {0}")]
    UnsupportedUnixTransport(String),
    /// The outbound side has been shut down.
    #[error("proxy connection is closed")]
    Closed,
}

/// Errors reported by a native [`EventSource`](super::EventSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source will not produce any further events.
    #[error("event source closed")]
    Closed,
    /// A single poll or send failed; later calls may succeed.
    #[error("event source failed: {0}")]
    Failed(String),
}
