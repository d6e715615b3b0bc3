//! Destinations for messages no listener claimed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use super::DISPATCH_TARGET;
use crate::message::Message;

/// Receives messages that fell through every listener.
///
/// Called on the dispatcher thread, so implementations must return promptly
/// and must never block.
pub trait UnhandledSink: Send + Sync {
    /// Accepts one unclaimed message.
    fn accept(&self, message: Arc<Message>);
}

impl<T> UnhandledSink for Arc<T>
where
    T: UnhandledSink + ?Sized,
{
    fn accept(&self, message: Arc<Message>) {
        (**self).accept(message);
    }
}

/// Sink that records unclaimed messages with `tracing` and discards them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogUnhandled;

impl UnhandledSink for LogUnhandled {
    fn accept(&self, message: Arc<Message>) {
        debug!(
            target: DISPATCH_TARGET,
            kind = message.message_kind().unwrap_or("<none>"),
            extra = message.extra().unwrap_or("<none>"),
            "discarding unhandled message"
        );
    }
}

/// Bounded queue of unclaimed messages.
///
/// When the queue is full the oldest entry is dropped to make room, so the
/// dispatcher never waits on a slow consumer. Dropped entries are counted.
#[derive(Debug)]
pub struct UnhandledQueue {
    capacity: usize,
    entries: Mutex<VecDeque<Arc<Message>>>,
    available: Condvar,
    dropped: AtomicU64,
}

impl UnhandledQueue {
    /// Creates a queue retaining at most `capacity` messages (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let bounded = capacity.max(1);
        Self {
            capacity: bounded,
            entries: Mutex::new(VecDeque::with_capacity(bounded)),
            available: Condvar::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Maximum number of retained messages.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of messages currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of messages discarded because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Removes the oldest queued message without waiting.
    #[must_use]
    pub fn try_pop(&self) -> Option<Arc<Message>> {
        self.lock().pop_front()
    }

    /// Removes the oldest queued message, waiting up to `timeout` for one.
    #[must_use]
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Arc<Message>> {
        let limit = Instant::now().checked_add(timeout);
        let mut entries = self.lock();
        loop {
            if let Some(message) = entries.pop_front() {
                return Some(message);
            }
            let Some(deadline) = limit else {
                entries = self
                    .available
                    .wait(entries)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, _) = self
                .available
                .wait_timeout(entries, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            entries = guard;
        }
    }

    /// Removes and returns every queued message, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<Arc<Message>> {
        self.lock().drain(..).collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<Message>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UnhandledSink for UnhandledQueue {
    fn accept(&self, message: Arc<Message>) {
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            if let Some(evicted) = entries.pop_front() {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    target: DISPATCH_TARGET,
                    kind = evicted.message_kind().unwrap_or("<none>"),
                    dropped = total,
                    "unhandled queue full, dropping oldest message"
                );
            }
        }
        entries.push_back(message);
        drop(entries);
        self.available.notify_one();
    }
}
