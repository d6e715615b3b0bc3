//! Client-side message routing for a length-prefixed JSON proxy.
//!
//! The proxy delivers an unordered stream of JSON objects, each tagged with a
//! `@type`. A [`Client`] forwards every inbound message to a single dispatcher
//! thread, which offers it to registered [`Listener`]s in registration order
//! until one claims it. Unclaimed messages land in an [`UnhandledQueue`].
//!
//! Request/reply is layered on top: [`Client::send_and_wait`] attaches a
//! [`CorrelationToken`] to the outbound message, registers a one-shot listener
//! for that token, and blocks until the proxy echoes the token back.
//!
//! ```no_run
//! use switchboard::{Client, ClientOptions, Message};
//!
//! # fn main() -> Result<(), switchboard::ClientError> {
//! let client = Client::connect(&ClientOptions::default())?;
//! client.on_kinds(["updateA", "updateB"], |kind, message| {
//!     tracing::info!(kind, fields = message.as_map().len(), "update");
//! })?;
//! let reply = client.send_and_wait(Message::kind("ping"))?;
//! assert!(reply.is_kind("pong"));
//! client.shutdown()
//! # }
//! ```

pub mod client;
pub mod correlation;
pub mod dispatch;
pub mod listener;
pub mod message;
pub mod token;
pub mod transport;

pub use client::{Client, ClientError, ClientOptions};
pub use dispatch::{DispatchError, ListenerId, UnhandledQueue, UnhandledSink};
pub use listener::{KindListener, Listener, OnceListener, PersistentListener, Predicate, Verdict};
pub use message::{ClientId, FieldError, Message};
pub use token::CorrelationToken;
pub use transport::{EventSource, FrameSink, SourceError, TransportError};

#[cfg(test)]
mod tests;
