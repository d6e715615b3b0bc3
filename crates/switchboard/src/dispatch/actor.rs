//! The dispatcher thread and its producer-side handles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info};

use super::{DISPATCH_TARGET, DispatchError, ListenerId, RouteOutcome, Router, UnhandledSink};
use crate::listener::Listener;
use crate::message::Message;

enum DispatchEvent {
    Register {
        id: ListenerId,
        listener: Box<dyn Listener>,
    },
    Deregister(ListenerId),
    Deliver(Arc<Message>),
    InboundClosed,
}

/// Handle used to add and remove listeners.
///
/// Registrations are applied in the order they are submitted.
#[derive(Clone)]
pub struct Registrar {
    events: Sender<DispatchEvent>,
    next_id: Arc<AtomicU64>,
}

impl Registrar {
    /// Queues `listener` for registration at the end of the chain.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Stopped`] when the dispatcher has exited.
    pub fn register(&self, listener: Box<dyn Listener>) -> Result<ListenerId, DispatchError> {
        let id = ListenerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.events
            .send(DispatchEvent::Register { id, listener })
            .map_err(|_| DispatchError::Stopped)?;
        Ok(id)
    }

    /// Queues removal of the listener registered as `id`. Removing a listener
    /// that already retired is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Stopped`] when the dispatcher has exited.
    pub fn deregister(&self, id: ListenerId) -> Result<(), DispatchError> {
        self.events
            .send(DispatchEvent::Deregister(id))
            .map_err(|_| DispatchError::Stopped)
    }
}

/// Handle used by transport readers to hand over decoded messages.
#[derive(Clone)]
pub struct Inbox {
    events: Sender<DispatchEvent>,
}

impl Inbox {
    /// Queues `message` for routing.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Stopped`] when the dispatcher has exited.
    pub fn deliver(&self, message: Message) -> Result<(), DispatchError> {
        self.events
            .send(DispatchEvent::Deliver(Arc::new(message)))
            .map_err(|_| DispatchError::Stopped)
    }

    /// Signals that the inbound stream has ended. The dispatcher drops every
    /// listener and exits once the events queued before this one are handled.
    pub fn close(&self) {
        if self.events.send(DispatchEvent::InboundClosed).is_err() {
            debug!(target: DISPATCH_TARGET, "inbound closed after dispatcher stopped");
        }
    }
}

/// Owner of the dispatcher thread.
pub struct Dispatcher {
    registrar: Registrar,
    inbox: Inbox,
    handle: thread::JoinHandle<()>,
}

impl Dispatcher {
    /// Starts the dispatcher thread with an empty listener chain.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Spawn`] if the thread cannot be created.
    pub fn spawn(sink: Arc<dyn UnhandledSink>) -> Result<Self, DispatchError> {
        let (events, receiver) = mpsc::channel();
        let router = Router::new(sink);
        let handle = thread::Builder::new()
            .name("switchboard-dispatch".to_owned())
            .spawn(move || run_dispatch_loop(&receiver, router))
            .map_err(DispatchError::Spawn)?;
        Ok(Self {
            registrar: Registrar {
                events: events.clone(),
                next_id: Arc::new(AtomicU64::new(1)),
            },
            inbox: Inbox { events },
            handle,
        })
    }

    /// A handle for registering listeners.
    #[must_use]
    pub fn registrar(&self) -> Registrar {
        self.registrar.clone()
    }

    /// A handle for delivering messages.
    #[must_use]
    pub fn inbox(&self) -> Inbox {
        self.inbox.clone()
    }

    /// Whether the dispatcher thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the dispatcher thread to exit.
    ///
    /// The thread exits after [`Inbox::close`] or once every handle has been
    /// dropped; handles still held elsewhere keep it alive.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ThreadPanic`] if the thread panicked.
    pub fn join(self) -> Result<(), DispatchError> {
        let Self {
            registrar,
            inbox,
            handle,
        } = self;
        drop(registrar);
        drop(inbox);
        handle.join().map_err(|_| DispatchError::ThreadPanic)
    }
}

fn run_dispatch_loop(events: &Receiver<DispatchEvent>, mut router: Router) {
    debug!(target: DISPATCH_TARGET, "dispatcher started");
    let mut routed: u64 = 0;
    let mut unhandled: u64 = 0;

    while let Ok(event) = events.recv() {
        match event {
            DispatchEvent::Register { id, listener } => router.register(id, listener),
            DispatchEvent::Deregister(id) => {
                router.deregister(id);
            }
            DispatchEvent::Deliver(message) => {
                routed += 1;
                if router.route(message) == RouteOutcome::Unhandled {
                    unhandled += 1;
                }
            }
            DispatchEvent::InboundClosed => {
                info!(
                    target: DISPATCH_TARGET,
                    listeners = router.len(),
                    "inbound stream closed, releasing listeners"
                );
                router.clear();
                break;
            }
        }
    }

    debug!(
        target: DISPATCH_TARGET,
        routed,
        unhandled,
        "dispatcher stopped"
    );
}
