//! Length-prefixed frame codec.
//!
//! Each frame is a `u32` big-endian payload length followed by that many bytes
//! of UTF-8 JSON.

use std::io::{self, Read, Write};

use super::TransportError;

const PREFIX_LEN: usize = 4;

/// Outcome of reading one frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// A complete payload.
    Payload(Vec<u8>),
    /// A payload longer than the configured limit; its bytes were discarded.
    Oversize {
        /// Length announced by the prefix.
        len: u32,
    },
    /// The stream ended cleanly on a frame boundary.
    End,
}

/// Reads the next frame from `reader`.
///
/// A stream that ends inside a prefix or payload yields
/// [`io::ErrorKind::UnexpectedEof`].
///
/// # Errors
///
/// Returns any I/O error raised by `reader`.
pub fn read_frame<R: Read>(reader: &mut R, max_frame_bytes: u32) -> io::Result<Frame> {
    let Some(len) = read_prefix(reader)? else {
        return Ok(Frame::End);
    };
    if len > max_frame_bytes {
        discard(reader, len)?;
        return Ok(Frame::Oversize { len });
    }
    let size = usize::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "frame exceeds address space"))?;
    let mut payload = vec![0_u8; size];
    reader.read_exact(&mut payload)?;
    Ok(Frame::Payload(payload))
}

/// Writes `payload` as one frame and flushes.
///
/// # Errors
///
/// Returns [`TransportError::FrameTooLarge`] if the payload length does not
/// fit the prefix, or [`TransportError::Io`] if writing fails.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), TransportError> {
    let len = u32::try_from(payload.len())
        .map_err(|_| TransportError::FrameTooLarge { len: payload.len() })?;
    writer.write_all(&encode_prefix(len))?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads a bare big-endian `u32`, as sent by the proxy during the handshake.
///
/// # Errors
///
/// Returns any I/O error raised by `reader`, including `UnexpectedEof`.
pub fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut prefix = [0_u8; PREFIX_LEN];
    reader.read_exact(&mut prefix)?;
    Ok(decode_prefix(prefix))
}

#[expect(
    clippy::big_endian_bytes,
    reason = "the proxy protocol fixes network byte order"
)]
const fn encode_prefix(len: u32) -> [u8; PREFIX_LEN] {
    len.to_be_bytes()
}

#[expect(
    clippy::big_endian_bytes,
    reason = "the proxy protocol fixes network byte order"
)]
const fn decode_prefix(prefix: [u8; PREFIX_LEN]) -> u32 {
    u32::from_be_bytes(prefix)
}

/// Returns `None` when the stream ends before the first prefix byte.
fn read_prefix<R: Read>(reader: &mut R) -> io::Result<Option<u32>> {
    let mut prefix = [0_u8; PREFIX_LEN];
    let mut filled = 0;
    while let Some(rest) = prefix.get_mut(filled..) {
        if rest.is_empty() {
            break;
        }
        match reader.read(rest) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a frame prefix",
                ));
            }
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(Some(decode_prefix(prefix)))
}

fn discard<R: Read>(reader: &mut R, len: u32) -> io::Result<()> {
    let expected = u64::from(len);
    let skipped = io::copy(&mut reader.by_ref().take(expected), &mut io::sink())?;
    if skipped < expected {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stream ended inside an oversize frame",
        ));
    }
    Ok(())
}
