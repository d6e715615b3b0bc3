//! The dispatch engine.
//!
//! A single thread owns the ordered listener table ([`Router`]) and handles
//! one event at a time: a registration, a deregistration, an inbound message,
//! or the end of the inbound stream. Producers never touch the table; they
//! enqueue events through a [`Registrar`] or an [`Inbox`]. Because each event
//! is handled to completion before the next is taken, a registration lands
//! either wholly before or wholly after any given message's scan.

mod actor;
mod errors;
mod router;
mod unhandled;

use std::fmt;

pub use self::actor::{Dispatcher, Inbox, Registrar};
pub use self::errors::DispatchError;
pub use self::router::{RouteOutcome, Router};
pub use self::unhandled::{LogUnhandled, UnhandledQueue, UnhandledSink};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Identifier assigned to a listener when it is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "listener-{}", self.0)
    }
}
