//! Bridging the asynchronous message stream to callers that block for a reply.
//!
//! [`correlate`] builds a one-shot listener that matches a single token and
//! hands the matching message to a [`PendingReply`] through a single-slot
//! rendezvous. A reply that arrives after the waiter gave up goes to the
//! fallback sink instead.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tracing::warn;

use crate::dispatch::UnhandledSink;
use crate::listener::OnceListener;
use crate::message::{ClientId, Message};
use crate::token::CorrelationToken;

const CORRELATION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::correlation");

/// Sending half of the rendezvous; `None` once the waiter has abandoned it.
type ReplySlot = Mutex<Option<SyncSender<Arc<Message>>>>;

/// Why a [`PendingReply`] finished without a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The deadline elapsed first.
    TimedOut,
    /// The listener was dropped before it matched.
    Disconnected,
}

/// The receiving side of a correlated request.
#[derive(Debug)]
pub struct PendingReply {
    token: CorrelationToken,
    slot: Receiver<Arc<Message>>,
    sender: Weak<ReplySlot>,
}

impl PendingReply {
    /// Token the reply is expected to carry in `@extra`.
    #[must_use]
    pub const fn token(&self) -> &CorrelationToken {
        &self.token
    }

    /// Blocks until the reply arrives, the deadline elapses, or the listener
    /// is dropped. `None` waits without a deadline.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::TimedOut`] or [`WaitError::Disconnected`].
    pub fn wait(&self, deadline: Option<Duration>) -> Result<Arc<Message>, WaitError> {
        deadline.map_or_else(
            || self.slot.recv().map_err(|_| WaitError::Disconnected),
            |timeout| {
                self.slot.recv_timeout(timeout).map_err(|error| match error {
                    RecvTimeoutError::Timeout => WaitError::TimedOut,
                    RecvTimeoutError::Disconnected => WaitError::Disconnected,
                })
            },
        )
    }

    /// Stops waiting. Returns a reply that slipped into the slot before the
    /// waiter let go; anything matching afterwards goes to the fallback sink.
    #[must_use]
    pub fn abandon(self) -> Option<Arc<Message>> {
        if let Some(shared) = self.sender.upgrade() {
            drop(shared.lock().unwrap_or_else(PoisonError::into_inner).take());
        }
        self.slot.try_recv().ok()
    }
}

/// Builds the listener and rendezvous for a reply to `token` on `client_id`.
///
/// The listener must be registered before the request is written. Replies
/// matched after [`PendingReply::abandon`] or a dropped waiter are handed to
/// `fallback`.
#[must_use]
pub fn correlate(
    client_id: ClientId,
    token: CorrelationToken,
    fallback: Arc<dyn UnhandledSink>,
) -> (OnceListener, PendingReply) {
    let (slot_tx, slot) = mpsc::sync_channel(1);
    let shared: Arc<ReplySlot> = Arc::new(Mutex::new(Some(slot_tx)));
    let sender = Arc::downgrade(&shared);
    let listener = OnceListener::correlated(client_id, &token, move |reply| {
        if let Some(message) = offer(&shared, reply) {
            warn!(
                target: CORRELATION_TARGET,
                extra = message.extra().unwrap_or("<none>"),
                "reply arrived after the waiter gave up"
            );
            fallback.accept(message);
        }
    });
    (listener, PendingReply { token, slot, sender })
}

/// Puts `reply` in the slot, returning it when nobody is waiting any more.
fn offer(slot: &ReplySlot, reply: Arc<Message>) -> Option<Arc<Message>> {
    let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(waiter) = guard.as_ref() else {
        return Some(reply);
    };
    waiter.try_send(reply).err().map(|error| match error {
        TrySendError::Full(message) | TrySendError::Disconnected(message) => message,
    })
}
