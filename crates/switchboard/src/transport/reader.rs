//! Inbound half of a proxy connection.
//!
//! The reader owns the read side of the socket. It decodes frames one at a
//! time and hands each message to the dispatcher's [`Inbox`]. The end of the
//! stream, in any form, closes the inbox so the dispatcher can release its
//! listeners.

use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, trace, warn};

use super::TRANSPORT_TARGET;
use super::framing::{Frame, read_frame};
use crate::dispatch::Inbox;
use crate::message::Message;

/// Consecutive non-fatal read failures tolerated before the stream is
/// treated as dead.
const MAX_CONSECUTIVE_FAILURES: u32 = 8;

/// Whether the reader should keep going after handing over a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Handoff {
    Continue,
    Stop,
}

/// Starts a thread that reads frames from `stream` until it ends.
///
/// # Errors
///
/// Returns the I/O error raised when the thread cannot be spawned.
pub fn spawn_socket_reader<R>(
    stream: R,
    inbox: Inbox,
    max_frame_bytes: u32,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("switchboard-reader".to_owned())
        .spawn(move || read_until_closed(stream, &inbox, max_frame_bytes))
}

/// Reads frames from `stream` and delivers them until the stream ends or the
/// dispatcher stops. Always closes `inbox` before returning.
pub fn read_until_closed<R: Read>(mut stream: R, inbox: &Inbox, max_frame_bytes: u32) {
    let mut failures = 0_u32;
    loop {
        match read_frame(&mut stream, max_frame_bytes) {
            Ok(Frame::Payload(payload)) => {
                failures = 0;
                if hand_off(inbox, &payload) == Handoff::Stop {
                    break;
                }
            }
            Ok(Frame::Oversize { len }) => {
                failures = 0;
                warn!(
                    target: TRANSPORT_TARGET,
                    len,
                    limit = max_frame_bytes,
                    "discarded oversize frame"
                );
            }
            Ok(Frame::End) => {
                info!(target: TRANSPORT_TARGET, "proxy closed the stream");
                break;
            }
            Err(read_error) if is_terminal(&read_error) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    error = %read_error,
                    "proxy stream ended"
                );
                break;
            }
            Err(read_error) => {
                failures += 1;
                error!(
                    target: TRANSPORT_TARGET,
                    error = %read_error,
                    failures,
                    "failed to read frame; message dropped"
                );
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    warn!(target: TRANSPORT_TARGET, "giving up on proxy stream");
                    break;
                }
            }
        }
    }
    inbox.close();
}

/// Decodes `payload` and delivers it. Malformed payloads are logged and
/// skipped.
pub(super) fn hand_off(inbox: &Inbox, payload: &[u8]) -> Handoff {
    match Message::from_slice(payload) {
        Ok(message) => {
            trace!(
                target: TRANSPORT_TARGET,
                kind = message.message_kind().unwrap_or_default(),
                "received message"
            );
            if inbox.deliver(message).is_err() {
                debug!(target: TRANSPORT_TARGET, "dispatcher stopped; reader exiting");
                return Handoff::Stop;
            }
        }
        Err(decode_error) => {
            error!(
                target: TRANSPORT_TARGET,
                error = %decode_error,
                len = payload.len(),
                "skipping undecodable frame"
            );
        }
    }
    Handoff::Continue
}

/// Read errors that mean the peer is gone, including an EOF partway through a
/// frame. These close the stream the same way a clean EOF does. Any other
/// error is retried until `MAX_CONSECUTIVE_FAILURES` in a row end it too.
fn is_terminal(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
    )
}
