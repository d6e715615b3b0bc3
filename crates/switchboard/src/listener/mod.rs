//! Predicate-gated listeners and their routing contract.
//!
//! A listener is offered each inbound message by the dispatcher and answers
//! with a [`Verdict`]. Listeners that match hand the message to their handler
//! on a separate thread, so a slow or panicking handler never holds up
//! routing.

use std::sync::Arc;

use crate::message::Message;

mod execution;
mod predicate;
mod variants;

pub use self::predicate::Predicate;
pub use self::variants::{KindListener, OnceListener, PersistentListener};

const HANDLER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::listener");

/// Routing outcome reported by a listener for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The message is not of interest; offer it to the next listener.
    Continue,
    /// The message was handled; stop the scan and keep this listener.
    StopKeep,
    /// The message was handled; stop the scan and retire this listener.
    StopRemove,
}

impl Verdict {
    /// Whether the verdict ends the scan for the current message.
    #[must_use]
    pub const fn stops(self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// A unit of registered interest.
///
/// Implementations must not block: any work triggered by a match belongs on
/// another thread. The dispatcher is the only caller, so `process` may mutate
/// the listener freely.
pub trait Listener: Send {
    /// Tests `message` and, on a match, schedules the handler.
    fn process(&mut self, message: &Arc<Message>) -> Verdict;

    /// Short label used in log events.
    fn label(&self) -> &'static str {
        "listener"
    }
}

/// Handler shared by listeners that fire repeatedly.
pub type MessageHandler = Arc<dyn Fn(Arc<Message>) + Send + Sync>;

/// Handler consumed by a listener that fires once.
pub type OnceHandler = Box<dyn FnOnce(Arc<Message>) + Send>;

/// Handler of a kind listener; receives the matched `@type` as well.
pub type KindHandler = Arc<dyn Fn(&str, Arc<Message>) + Send + Sync>;
