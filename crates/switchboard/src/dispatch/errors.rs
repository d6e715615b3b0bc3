//! Error types for the dispatch engine.

use std::io;

use thiserror::Error;

/// Errors surfaced while starting or talking to the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The dispatcher thread has exited; the event was not accepted.
    #[error("dispatcher has stopped")]
    Stopped,
    /// The dispatcher thread could not be started.
    #[error("failed to spawn dispatcher thread: {0}")]
    Spawn(#[source] io::Error),
    /// The dispatcher thread panicked.
    #[error("dispatcher thread panicked")]
    ThreadPanic,
}
