//! Socket connections to the proxy.
//!
//! [`Connection`] wraps either transport behind one `Read + Write` type so the
//! reader and writer halves stay transport agnostic.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

#[cfg(unix)]
use std::os::{fd::OwnedFd, unix::net::UnixStream};

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};
use switchboard_config::SocketEndpoint;
use tracing::debug;

use super::{TRANSPORT_TARGET, TransportError, framing};
use crate::message::ClientId;

/// An open stream to the proxy.
#[derive(Debug)]
pub enum Connection {
    /// TCP stream.
    Tcp(TcpStream),
    /// Unix domain socket stream.
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Connection {
    /// Opens a second handle onto the same stream.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while duplicating the socket.
    pub fn try_clone(&self) -> io::Result<Self> {
        match self {
            Self::Tcp(stream) => stream.try_clone().map(Self::Tcp),
            #[cfg(unix)]
            Self::Unix(stream) => stream.try_clone().map(Self::Unix),
        }
    }

    /// Shuts down one or both directions of the stream.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised by the socket.
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.shutdown(how),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(how),
        }
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Connects to `endpoint`, giving up after `timeout`.
///
/// # Errors
///
/// Returns [`TransportError::Resolve`], [`TransportError::Connect`], or
/// [`TransportError::UnsupportedUnixTransport`].
pub fn connect(endpoint: &SocketEndpoint, timeout: Duration) -> Result<Connection, TransportError> {
    match endpoint {
        SocketEndpoint::Tcp { host, port } => {
            let address =
                resolve_tcp_address(host, *port).map_err(|source| TransportError::Resolve {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
            let stream = TcpStream::connect_timeout(&address, timeout).map_err(|source| {
                TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                }
            })?;
            if let Err(error) = stream.set_nodelay(true) {
                debug!(target: TRANSPORT_TARGET, error = %error, "could not disable Nagle");
            }
            Ok(Connection::Tcp(stream))
        }
        SocketEndpoint::Unix { path } => {
            #[cfg(unix)]
            {
                connect_unix(path, timeout).map_err(|source| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })
            }

            #[cfg(not(unix))]
            {
                let _ = path;
                Err(TransportError::UnsupportedUnixTransport(endpoint.to_string()))
            }
        }
    }
}

/// Reads the client id the proxy sends before its first frame.
///
/// The read is bounded by `timeout` so a silent proxy cannot stall
/// connection setup.
///
/// # Errors
///
/// Returns [`TransportError::Handshake`] if the id cannot be read.
pub fn handshake(
    connection: &mut Connection,
    endpoint: &SocketEndpoint,
    timeout: Duration,
) -> Result<ClientId, TransportError> {
    let handshake_error = |source| TransportError::Handshake {
        endpoint: endpoint.to_string(),
        source,
    };
    let bounded = (!timeout.is_zero()).then_some(timeout);
    connection.set_read_timeout(bounded).map_err(handshake_error)?;
    let raw = framing::read_u32(connection).map_err(handshake_error)?;
    connection.set_read_timeout(None).map_err(handshake_error)?;
    Ok(ClientId::new(raw))
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

#[cfg(unix)]
fn connect_unix(path: &str, timeout: Duration) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, timeout)?;
    let stream = UnixStream::from(OwnedFd::from(socket));
    Ok(Connection::Unix(stream))
}
