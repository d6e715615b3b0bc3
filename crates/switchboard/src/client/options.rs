use std::time::Duration;

use switchboard_config::{
    Config, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_MAX_FRAME_BYTES, DEFAULT_REPLY_TIMEOUT_MS,
    DEFAULT_UNHANDLED_CAPACITY, SocketEndpoint, default_socket_endpoint,
};

/// Settings for a [`Client`](super::Client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Proxy endpoint used by [`Client::connect`](super::Client::connect).
    pub endpoint: SocketEndpoint,
    /// Deadline for connecting and for reading the handshake.
    pub connect_timeout: Duration,
    /// Deadline for correlated replies; `None` waits indefinitely.
    pub reply_timeout: Option<Duration>,
    /// Capacity of the unclaimed-message queue.
    pub unhandled_capacity: usize,
    /// Largest inbound frame accepted, in bytes.
    pub max_frame_bytes: u32,
}

impl ClientOptions {
    /// Options for `endpoint` with default limits.
    #[must_use]
    pub fn new(endpoint: SocketEndpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    /// Replaces the reply deadline.
    #[must_use]
    pub const fn with_reply_timeout(mut self, reply_timeout: Option<Duration>) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    /// Replaces the unclaimed-message capacity.
    #[must_use]
    pub const fn with_unhandled_capacity(mut self, capacity: usize) -> Self {
        self.unhandled_capacity = capacity;
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: default_socket_endpoint(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            reply_timeout: Some(Duration::from_millis(DEFAULT_REPLY_TIMEOUT_MS)),
            unhandled_capacity: DEFAULT_UNHANDLED_CAPACITY,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl From<&Config> for ClientOptions {
    fn from(config: &Config) -> Self {
        Self {
            endpoint: config.proxy_socket().clone(),
            connect_timeout: config.connect_timeout(),
            reply_timeout: config.reply_timeout(),
            unhandled_capacity: config.unhandled_capacity(),
            max_frame_bytes: config.max_frame_bytes(),
        }
    }
}
