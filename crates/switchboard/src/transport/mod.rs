//! Transports linking the dispatcher to the proxy.
//!
//! The socket variant speaks length-prefixed JSON frames over TCP or a Unix
//! domain socket; the proxy announces the session's client id as a bare
//! big-endian `u32` before the first frame. The native variant polls an
//! [`EventSource`] for JSON strings and writes through any [`FrameSink`].

mod connection;
mod errors;
mod framing;
mod reader;
mod source;
mod writer;

pub use self::connection::{Connection, connect, handshake};
pub use self::errors::{SourceError, TransportError};
pub use self::framing::{Frame, read_frame, read_u32, write_frame};
pub use self::reader::{read_until_closed, spawn_socket_reader};
pub use self::source::{EventSource, POLL_INTERVAL, StopFlag, poll_until_closed, spawn_source_reader};
pub use self::writer::{FrameSink, FrameWriter};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
