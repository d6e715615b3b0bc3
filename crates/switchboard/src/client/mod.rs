//! The client facade.
//!
//! A [`Client`] owns one proxy session: a dispatcher thread, a reader thread
//! feeding it, and a serialised outbound sink. Every method is callable from
//! any thread, including from inside listener handlers.

mod errors;
mod options;

use std::net::Shutdown;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

pub use self::errors::ClientError;
pub use self::options::ClientOptions;
use crate::correlation::{WaitError, correlate};
use crate::dispatch::{
    DispatchError, Dispatcher, ListenerId, Registrar, UnhandledQueue, UnhandledSink,
};
use crate::listener::{KindListener, Listener, OnceListener, PersistentListener, Predicate};
use crate::message::{ClientId, Message};
use crate::token::CorrelationToken;
use crate::transport::{
    self, EventSource, FrameSink, FrameWriter, StopFlag, spawn_socket_reader, spawn_source_reader,
};

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Handle used to end the inbound stream.
enum Inbound {
    Socket(transport::Connection),
    Source(StopFlag),
}

impl Inbound {
    fn stop(&self) {
        match self {
            Self::Socket(connection) => {
                if let Err(error) = connection.shutdown(Shutdown::Both) {
                    debug!(target: CLIENT_TARGET, error = %error, "socket already closed");
                }
            }
            Self::Source(flag) => flag.stop(),
        }
    }
}

/// A session with the message proxy.
pub struct Client {
    client_id: ClientId,
    options: ClientOptions,
    registrar: Registrar,
    sink: Arc<dyn FrameSink>,
    unhandled: Arc<UnhandledQueue>,
    inbound: Inbound,
    reader: Option<JoinHandle<()>>,
    dispatcher: Option<Dispatcher>,
}

impl Client {
    /// Connects to the proxy at `options.endpoint` and reads the session's
    /// client id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the connection or handshake
    /// fails, or [`ClientError::Dispatch`] if a thread cannot be started.
    pub fn connect(options: &ClientOptions) -> Result<Self, ClientError> {
        let mut connection = transport::connect(&options.endpoint, options.connect_timeout)?;
        let client_id =
            transport::handshake(&mut connection, &options.endpoint, options.connect_timeout)?;
        let read_half = connection.try_clone().map_err(transport::TransportError::Io)?;
        let control = connection.try_clone().map_err(transport::TransportError::Io)?;
        info!(
            target: CLIENT_TARGET,
            endpoint = %options.endpoint,
            client_id = %client_id,
            "connected to proxy"
        );

        let unhandled = Arc::new(UnhandledQueue::new(options.unhandled_capacity));
        let dispatcher = Dispatcher::spawn(unhandled.clone())?;
        let reader = spawn_socket_reader(read_half, dispatcher.inbox(), options.max_frame_bytes)
            .map_err(DispatchError::Spawn)?;

        Ok(Self {
            client_id,
            options: options.clone(),
            registrar: dispatcher.registrar(),
            sink: Arc::new(FrameWriter::new(connection)),
            unhandled,
            inbound: Inbound::Socket(control),
            reader: Some(reader),
            dispatcher: Some(dispatcher),
        })
    }

    /// Builds a session on a native event source. `sink` carries outbound
    /// messages and `client_id` is the identity the source was opened with.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Dispatch`] if a thread cannot be started.
    pub fn with_event_source<S>(
        source: S,
        sink: Arc<dyn FrameSink>,
        client_id: ClientId,
        options: &ClientOptions,
    ) -> Result<Self, ClientError>
    where
        S: EventSource + 'static,
    {
        let unhandled = Arc::new(UnhandledQueue::new(options.unhandled_capacity));
        let dispatcher = Dispatcher::spawn(unhandled.clone())?;
        let stop = StopFlag::default();
        let reader = spawn_source_reader(source, dispatcher.inbox(), stop.clone())
            .map_err(DispatchError::Spawn)?;
        debug!(target: CLIENT_TARGET, client_id = %client_id, "event source session started");

        Ok(Self {
            client_id,
            options: options.clone(),
            registrar: dispatcher.registrar(),
            sink,
            unhandled,
            inbound: Inbound::Source(stop),
            reader: Some(reader),
            dispatcher: Some(dispatcher),
        })
    }

    /// Identity assigned to this session.
    #[must_use]
    pub const fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Options the session was created with.
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Messages no listener claimed.
    #[must_use]
    pub const fn unhandled(&self) -> &Arc<UnhandledQueue> {
        &self.unhandled
    }

    /// Sends `message` without waiting for a reply.
    ///
    /// A fresh correlation token is written to `@extra` and returned.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Encode`] or [`ClientError::Transport`].
    pub fn send(&self, mut message: Message) -> Result<CorrelationToken, ClientError> {
        let token = CorrelationToken::generate();
        message.set_extra(&token);
        let payload = message.to_vec()?;
        self.sink.send_frame(&payload)?;
        Ok(token)
    }

    /// Sends `message` and blocks until the proxy replies to it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ReplyTimeout`] when the configured deadline
    /// passes and [`ClientError::Disconnected`] when the connection closes
    /// first. Encoding and transport failures are returned before waiting.
    pub fn send_and_wait(&self, mut message: Message) -> Result<Arc<Message>, ClientError> {
        let token = CorrelationToken::generate();
        message.set_extra(&token);
        let payload = message.to_vec()?;

        let (listener, pending) = correlate(self.client_id, token, self.unhandled.clone());
        let id = self.registrar.register(Box::new(listener))?;
        if let Err(error) = self.sink.send_frame(&payload) {
            self.retire(id);
            return Err(error.into());
        }

        match pending.wait(self.options.reply_timeout) {
            Ok(reply) => Ok(reply),
            Err(WaitError::TimedOut) => {
                self.retire(id);
                let token = pending.token().clone();
                if let Some(late) = pending.abandon() {
                    self.unhandled.accept(late);
                }
                let timeout_ms = self
                    .options
                    .reply_timeout
                    .map_or(0, |timeout| u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
                warn!(
                    target: CLIENT_TARGET,
                    %token,
                    timeout_ms,
                    "reply deadline elapsed"
                );
                Err(ClientError::ReplyTimeout { token, timeout_ms })
            }
            Err(WaitError::Disconnected) => Err(ClientError::Disconnected {
                token: pending.token().clone(),
            }),
        }
    }

    /// Sends a message holding only `@type = kind` and waits for the reply.
    ///
    /// # Errors
    ///
    /// As for [`Client::send_and_wait`].
    pub fn request(&self, kind: &str) -> Result<Arc<Message>, ClientError> {
        self.send_and_wait(Message::kind(kind))
    }

    /// Appends `listener` to the end of the chain.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Dispatch`] once the session has closed.
    pub fn add_listener(&self, listener: Box<dyn Listener>) -> Result<ListenerId, ClientError> {
        Ok(self.registrar.register(listener)?)
    }

    /// Registers a listener that handles every message passing `predicates`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Dispatch`] once the session has closed.
    pub fn add_persistent_listener<F>(
        &self,
        predicates: Vec<Predicate>,
        handler: F,
    ) -> Result<ListenerId, ClientError>
    where
        F: Fn(Arc<Message>) + Send + Sync + 'static,
    {
        self.add_listener(Box::new(PersistentListener::new(predicates, handler)))
    }

    /// Registers a persistent listener for this session's messages whose
    /// `@type` is one of `kinds`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Dispatch`] once the session has closed.
    pub fn on_kinds<I, S, F>(&self, kinds: I, handler: F) -> Result<ListenerId, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, Arc<Message>) + Send + Sync + 'static,
    {
        self.add_listener(Box::new(KindListener::new(self.client_id, kinds, handler)))
    }

    /// Registers a one-shot listener for the reply carrying `token`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Dispatch`] once the session has closed.
    pub fn add_correlated_once_listener<F>(
        &self,
        token: &CorrelationToken,
        handler: F,
    ) -> Result<ListenerId, ClientError>
    where
        F: FnOnce(Arc<Message>) + Send + 'static,
    {
        self.add_listener(Box::new(OnceListener::correlated(
            self.client_id,
            token,
            handler,
        )))
    }

    /// Removes a listener. Listeners that already retired are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Dispatch`] once the session has closed.
    pub fn remove_listener(&self, id: ListenerId) -> Result<(), ClientError> {
        Ok(self.registrar.deregister(id)?)
    }

    /// Closes the inbound stream and waits for the reader and dispatcher
    /// threads to finish. Pending requests fail with
    /// [`ClientError::Disconnected`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Dispatch`] if either thread panicked.
    pub fn shutdown(mut self) -> Result<(), ClientError> {
        self.inbound.stop();
        if let Some(reader) = self.reader.take() {
            reader.join().map_err(|_| DispatchError::ThreadPanic)?;
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.join()?;
        }
        info!(target: CLIENT_TARGET, client_id = %self.client_id, "session closed");
        Ok(())
    }

    fn retire(&self, id: ListenerId) {
        if let Err(error) = self.registrar.deregister(id) {
            debug!(target: CLIENT_TARGET, listener = %id, error = %error, "listener already gone");
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if self.reader.is_some() {
            self.inbound.stop();
        }
    }
}
