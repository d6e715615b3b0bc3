//! Shared helpers for the behavioural suites.

mod fake_proxy;

use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

pub(crate) use fake_proxy::{FakeProxy, Responder, reply_to};

/// Generous upper bound for anything a test waits on.
pub(crate) const WAIT: Duration = Duration::from_secs(5);

/// Grace period used when asserting that nothing else happens.
pub(crate) const QUIET: Duration = Duration::from_millis(100);

/// Receives until `count` items arrived or `WAIT` elapsed.
pub(crate) fn collect<T>(receiver: &Receiver<T>, count: usize) -> Vec<T> {
    let deadline = Instant::now() + WAIT;
    let mut items = Vec::with_capacity(count);
    while items.len() < count {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok(item) => items.push(item),
            Err(_) => break,
        }
    }
    items
}
