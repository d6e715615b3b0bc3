//! Outbound half of a proxy connection.

use std::io::Write;
use std::sync::Mutex;

use super::{TransportError, framing};

/// Destination for encoded outbound messages.
///
/// Implementations must serialise concurrent calls so that frames never
/// interleave on the wire.
pub trait FrameSink: Send + Sync {
    /// Transmits one encoded JSON object.
    ///
    /// # Errors
    ///
    /// Returns the transport failure; the payload was not delivered.
    fn send_frame(&self, payload: &[u8]) -> Result<(), TransportError>;
}

/// Writes length-prefixed frames to a stream under a mutex.
#[derive(Debug)]
pub struct FrameWriter<W> {
    stream: Mutex<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Wraps `stream`.
    #[must_use]
    pub const fn new(stream: W) -> Self {
        Self {
            stream: Mutex::new(stream),
        }
    }

    /// Unwraps the stream.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if a writer panicked mid-frame.
    pub fn into_inner(self) -> Result<W, TransportError> {
        self.stream.into_inner().map_err(|_| TransportError::Closed)
    }
}

impl<W: Write + Send> FrameSink for FrameWriter<W> {
    fn send_frame(&self, payload: &[u8]) -> Result<(), TransportError> {
        // A poisoned lock means a frame may be half written.
        let mut stream = self.stream.lock().map_err(|_| TransportError::Closed)?;
        framing::write_frame(&mut *stream, payload)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;
    use std::thread;

    use rstest::rstest;

    use super::*;
    use crate::transport::{Frame, read_frame};

    #[rstest]
    fn concurrent_frames_never_interleave() {
        let writer = Arc::new(FrameWriter::new(Vec::new()));
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let shared = Arc::clone(&writer);
                thread::spawn(move || {
                    let payload = format!(r#"{{"worker":{worker},"pad":"{}"}}"#, "x".repeat(512));
                    for _ in 0..16 {
                        shared.send_frame(payload.as_bytes()).expect("send frame");
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker thread");
        }

        let bytes = Arc::into_inner(writer)
            .expect("sole owner")
            .into_inner()
            .expect("unpoisoned");
        let mut reader = Cursor::new(bytes);
        let mut frames = 0;
        while let Frame::Payload(payload) = read_frame(&mut reader, u32::MAX).expect("frame") {
            serde_json::from_slice::<serde_json::Value>(&payload).expect("whole JSON object");
            frames += 1;
        }
        assert_eq!(frames, 8 * 16);
    }
}
