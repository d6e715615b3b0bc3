//! A scripted stand-in for the message proxy.
//!
//! The proxy accepts one connection, announces a client id, records every
//! frame it receives, and answers each request with whatever its responder
//! returns. Tests can also push unsolicited frames or hang up.

use std::io::{self, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use switchboard_config::SocketEndpoint;

use crate::message::{CLIENT_ID_FIELD, ClientId, EXTRA_FIELD, Message};
use crate::transport::{Frame, read_frame, write_frame};

const ACCEPT_DEADLINE: Duration = Duration::from_secs(5);
const WAIT_STEP: Duration = Duration::from_millis(5);

/// Maps one received request to the frames sent back.
pub(crate) type Responder = Box<dyn FnMut(&Message) -> Vec<Message> + Send>;

type SharedStream = Arc<Mutex<Option<TcpStream>>>;

pub(crate) struct FakeProxy {
    port: u16,
    client_id: ClientId,
    stream: SharedStream,
    received: Arc<Mutex<Vec<Message>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeProxy {
    pub(crate) fn spawn(client_id: ClientId, responder: Responder) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake proxy")?;
        listener
            .set_nonblocking(true)
            .context("fake proxy nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let stream: SharedStream = Arc::new(Mutex::new(None));
        let received = Arc::new(Mutex::new(Vec::new()));
        let serve_stream = Arc::clone(&stream);
        let serve_received = Arc::clone(&received);
        let handle = thread::spawn(move || {
            serve(&listener, client_id, &serve_stream, &serve_received, responder)
        });
        Ok(Self {
            port,
            client_id,
            stream,
            received,
            handle: Some(handle),
        })
    }

    /// A proxy that never answers.
    pub(crate) fn silent(client_id: ClientId) -> Result<Self> {
        Self::spawn(client_id, Box::new(|_| Vec::new()))
    }

    pub(crate) fn endpoint(&self) -> SocketEndpoint {
        SocketEndpoint::tcp("127.0.0.1", self.port)
    }

    pub(crate) const fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Sends `message` as an unsolicited frame.
    pub(crate) fn push(&self, message: &Message) -> Result<()> {
        let payload = message.to_vec().context("encode pushed message")?;
        self.push_raw(&payload)
    }

    /// Sends `payload` as a frame without validating it.
    pub(crate) fn push_raw(&self, payload: &[u8]) -> Result<()> {
        let mut guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        let stream = guard.as_mut().ok_or_else(|| anyhow!("no client connected"))?;
        write_frame(stream, payload).context("write pushed frame")
    }

    /// Blocks until at least `count` frames arrived, returning them all.
    pub(crate) fn wait_for_requests(&self, count: usize) -> Result<Vec<Message>> {
        let deadline = Instant::now() + ACCEPT_DEADLINE;
        loop {
            let snapshot = self
                .received
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if snapshot.len() >= count {
                return Ok(snapshot);
            }
            if Instant::now() >= deadline {
                return Err(anyhow!(
                    "expected {count} requests, proxy saw {}",
                    snapshot.len()
                ));
            }
            thread::sleep(WAIT_STEP);
        }
    }

    /// Closes the connection in both directions.
    pub(crate) fn hang_up(&self) -> Result<()> {
        let guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        let stream = guard.as_ref().ok_or_else(|| anyhow!("no client connected"))?;
        match stream.shutdown(Shutdown::Both) {
            Err(error) if error.kind() != io::ErrorKind::NotConnected => {
                Err(error).context("shut down proxy stream")
            }
            _ => Ok(()),
        }
    }

    /// Waits for the serving thread and reports its outcome.
    pub(crate) fn finish(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("fake proxy thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for FakeProxy {
    fn drop(&mut self) {
        // Ends the serving thread if the test left the client connected.
        drop(self.hang_up());
        drop(self.finish());
    }
}

/// Builds a reply of `kind` that answers `request`.
pub(crate) fn reply_to(request: &Message, client_id: ClientId, kind: &str) -> Message {
    let reply = Message::kind(kind).with(CLIENT_ID_FIELD, client_id.get());
    match request.extra() {
        Some(token) => reply.with(EXTRA_FIELD, token),
        None => reply,
    }
}

fn serve(
    listener: &TcpListener,
    client_id: ClientId,
    shared: &SharedStream,
    received: &Mutex<Vec<Message>>,
    mut responder: Responder,
) -> Result<()> {
    let Some(mut reader) = accept(listener)? else {
        return Ok(());
    };
    reader
        .set_nonblocking(false)
        .context("fake proxy blocking stream")?;
    *shared.lock().unwrap_or_else(PoisonError::into_inner) =
        Some(reader.try_clone().context("clone proxy stream")?);
    announce(&mut reader, client_id).context("write client id")?;

    loop {
        let payload = match read_frame(&mut reader, u32::MAX) {
            Ok(Frame::Payload(payload)) => payload,
            Ok(Frame::Oversize { .. }) => continue,
            Ok(Frame::End) => return Ok(()),
            Err(error) if is_disconnect(&error) => return Ok(()),
            Err(error) => return Err(error).context("read client frame"),
        };
        let request = Message::from_slice(&payload).context("decode client frame")?;
        received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let replies = responder(&request);
        let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(stream) = guard.as_mut() else {
            return Ok(());
        };
        for reply in replies {
            let bytes = reply.to_vec().context("encode reply")?;
            write_frame(stream, &bytes).context("write reply")?;
        }
    }
}

#[expect(
    clippy::big_endian_bytes,
    reason = "the proxy announces the client id in network byte order"
)]
fn announce(stream: &mut TcpStream, client_id: ClientId) -> io::Result<()> {
    stream.write_all(&client_id.get().to_be_bytes())?;
    stream.flush()
}

fn accept(listener: &TcpListener) -> Result<Option<TcpStream>> {
    let deadline = Instant::now() + ACCEPT_DEADLINE;
    loop {
        match listener.accept() {
            Ok((stream, _)) => return Ok(Some(stream)),
            Err(ref error)
                if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
            {
                thread::sleep(WAIT_STEP);
            }
            Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(error) => return Err(error).context("accept client"),
        }
    }
}

fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    )
}
