//! Shared configuration for the switchboard client and command-line tool.
//!
//! [`Config`] is layered by `ortho_config`: built-in defaults first, then a
//! configuration file (`--config-path` or `SWITCHBOARD_CONFIG_PATH`), then
//! `SWITCHBOARD_*` environment variables, and finally command-line flags.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod socket;

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_MAX_FRAME_BYTES, DEFAULT_PROXY_HOST,
    DEFAULT_PROXY_PORT, DEFAULT_REPLY_TIMEOUT_MS, DEFAULT_UNHANDLED_CAPACITY, default_log_filter,
    default_log_filter_string, default_log_format, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError};

use defaults::{
    default_connect_timeout_ms, default_max_frame_bytes, default_reply_timeout_ms,
    default_unhandled_capacity,
};

/// Resolved configuration for a proxy client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SWITCHBOARD")]
pub struct Config {
    /// Endpoint of the message proxy.
    #[serde(default = "default_socket_endpoint")]
    #[ortho_config(default = default_socket_endpoint())]
    pub proxy_socket: SocketEndpoint,
    /// `tracing` filter directive applied by the binaries.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format of the log subscriber.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Deadline for a correlated reply; `0` waits indefinitely.
    #[serde(default = "default_reply_timeout_ms")]
    #[ortho_config(default = DEFAULT_REPLY_TIMEOUT_MS)]
    pub reply_timeout_ms: u64,
    /// Deadline for establishing the proxy connection.
    #[serde(default = "default_connect_timeout_ms")]
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
    /// Number of unclaimed messages retained before the oldest is dropped.
    #[serde(default = "default_unhandled_capacity")]
    #[ortho_config(default = DEFAULT_UNHANDLED_CAPACITY)]
    pub unhandled_capacity: usize,
    /// Largest inbound frame payload accepted, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    #[ortho_config(default = DEFAULT_MAX_FRAME_BYTES)]
    pub max_frame_bytes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            reply_timeout_ms: default_reply_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            unhandled_capacity: default_unhandled_capacity(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl Config {
    /// Endpoint of the message proxy.
    #[must_use]
    pub const fn proxy_socket(&self) -> &SocketEndpoint {
        &self.proxy_socket
    }

    /// Log filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Reply deadline for request/reply calls, or `None` to wait forever.
    #[must_use]
    pub fn reply_timeout(&self) -> Option<Duration> {
        (self.reply_timeout_ms > 0).then(|| Duration::from_millis(self.reply_timeout_ms))
    }

    /// Connection deadline.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Capacity of the unclaimed-message queue.
    #[must_use]
    pub const fn unhandled_capacity(&self) -> usize {
        self.unhandled_capacity
    }

    /// Largest inbound frame payload accepted.
    #[must_use]
    pub const fn max_frame_bytes(&self) -> u32 {
        self.max_frame_bytes
    }
}
