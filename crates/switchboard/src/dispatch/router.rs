//! Ordered listener table and the routing scan.

use std::sync::Arc;

use tracing::trace;

use super::{DISPATCH_TARGET, ListenerId, UnhandledSink};
use crate::listener::{Listener, Verdict};
use crate::message::Message;

/// Result of routing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A listener stopped the scan.
    Claimed {
        /// The listener that handled the message.
        listener: ListenerId,
        /// Whether that listener was retired.
        retired: bool,
    },
    /// No listener stopped the scan; the message went to the fallback sink.
    Unhandled,
}

struct Entry {
    id: ListenerId,
    listener: Box<dyn Listener>,
}

/// Chain of listeners tested in registration order.
///
/// The first listener that stops the scan wins; later listeners never see
/// that message. The router is owned by exactly one thread.
pub struct Router {
    entries: Vec<Entry>,
    sink: Arc<dyn UnhandledSink>,
}

impl Router {
    /// Creates an empty router that sends unclaimed messages to `sink`.
    #[must_use]
    pub const fn new(sink: Arc<dyn UnhandledSink>) -> Self {
        Self {
            entries: Vec::new(),
            sink,
        }
    }

    /// Appends a listener to the end of the chain.
    pub fn register(&mut self, id: ListenerId, listener: Box<dyn Listener>) {
        trace!(
            target: DISPATCH_TARGET,
            listener = %id,
            kind = listener.label(),
            position = self.entries.len(),
            "listener registered"
        );
        self.entries.push(Entry { id, listener });
    }

    /// Removes the listener registered as `id`. Returns whether it was present.
    pub fn deregister(&mut self, id: ListenerId) -> bool {
        let Some(position) = self.entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        self.entries.remove(position);
        trace!(target: DISPATCH_TARGET, listener = %id, "listener deregistered");
        true
    }

    /// Offers `message` to each listener in order until one stops the scan.
    pub fn route(&mut self, message: Arc<Message>) -> RouteOutcome {
        for position in 0..self.entries.len() {
            let Some(entry) = self.entries.get_mut(position) else {
                break;
            };
            let id = entry.id;
            match entry.listener.process(&message) {
                Verdict::Continue => {}
                Verdict::StopKeep => {
                    trace!(target: DISPATCH_TARGET, listener = %id, "message claimed");
                    return RouteOutcome::Claimed {
                        listener: id,
                        retired: false,
                    };
                }
                Verdict::StopRemove => {
                    self.entries.remove(position);
                    trace!(
                        target: DISPATCH_TARGET,
                        listener = %id,
                        "message claimed, listener retired"
                    );
                    return RouteOutcome::Claimed {
                        listener: id,
                        retired: true,
                    };
                }
            }
        }

        trace!(
            target: DISPATCH_TARGET,
            kind = message.message_kind().unwrap_or("<none>"),
            "message unhandled"
        );
        self.sink.accept(message);
        RouteOutcome::Unhandled
    }

    /// Drops every registered listener.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered listener ids in scan order.
    #[must_use]
    pub fn listener_ids(&self) -> Vec<ListenerId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }
}
