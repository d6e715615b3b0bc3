//! Native event sources that deliver JSON text instead of framed bytes.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::reader::{Handoff, hand_off};
use super::{SourceError, TRANSPORT_TARGET};
use crate::dispatch::Inbox;

/// How long each poll may block before the reader checks for shutdown.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A pull-based producer of JSON-encoded messages.
pub trait EventSource: Send {
    /// Waits up to `timeout` for the next event.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    ///
    /// # Errors
    ///
    /// [`SourceError::Closed`] ends the stream; any other error is logged and
    /// polling continues.
    fn poll(&mut self, timeout: Duration) -> Result<Option<String>, SourceError>;
}

/// Cooperative stop signal for a source reader.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Asks the reader to stop after its current poll.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`StopFlag::stop`] has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Starts a thread that polls `source` until it closes or `stop` is raised.
///
/// # Errors
///
/// Returns the I/O error raised when the thread cannot be spawned.
pub fn spawn_source_reader<S>(source: S, inbox: Inbox, stop: StopFlag) -> io::Result<JoinHandle<()>>
where
    S: EventSource + 'static,
{
    thread::Builder::new()
        .name("switchboard-source".to_owned())
        .spawn(move || poll_until_closed(source, &inbox, &stop))
}

/// Polls `source` and delivers each event. Always closes `inbox` before
/// returning.
pub fn poll_until_closed<S: EventSource>(mut source: S, inbox: &Inbox, stop: &StopFlag) {
    while !stop.is_stopped() {
        match source.poll(POLL_INTERVAL) {
            Ok(Some(event)) => {
                if hand_off(inbox, event.as_bytes()) == Handoff::Stop {
                    break;
                }
            }
            Ok(None) => {}
            Err(SourceError::Closed) => {
                info!(target: TRANSPORT_TARGET, "event source closed");
                break;
            }
            Err(SourceError::Failed(reason)) => {
                warn!(target: TRANSPORT_TARGET, reason = %reason, "event source poll failed");
            }
        }
    }
    if stop.is_stopped() {
        debug!(target: TRANSPORT_TARGET, "event source reader stopped");
    }
    inbox.close();
}
