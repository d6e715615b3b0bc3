use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Host the proxy listens on unless configured otherwise.
pub const DEFAULT_PROXY_HOST: &str = "127.0.0.1";

/// Default TCP port of the message proxy.
pub const DEFAULT_PROXY_PORT: u16 = 9779;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default deadline for a correlated reply, in milliseconds.
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 30_000;

/// Default deadline for establishing the proxy connection, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default number of unclaimed messages retained before the oldest is dropped.
pub const DEFAULT_UNHANDLED_CAPACITY: usize = 1024;

/// Default upper bound on a single inbound frame payload.
pub const DEFAULT_MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Endpoint used when no proxy socket is configured.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_PROXY_HOST, DEFAULT_PROXY_PORT)
}

#[must_use]
pub(crate) const fn default_reply_timeout_ms() -> u64 {
    DEFAULT_REPLY_TIMEOUT_MS
}

#[must_use]
pub(crate) const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

#[must_use]
pub(crate) const fn default_unhandled_capacity() -> usize {
    DEFAULT_UNHANDLED_CAPACITY
}

#[must_use]
pub(crate) const fn default_max_frame_bytes() -> u32 {
    DEFAULT_MAX_FRAME_BYTES
}
