//! A single-connection proxy stand-in for driving the binary's runtime.
//!
//! After announcing the client id the proxy optionally pushes a burst of
//! messages, then answers every `ping` with a `pong` until the client hangs
//! up.

use std::io::{self, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use switchboard::Message;
use switchboard::message::{CLIENT_ID_FIELD, EXTRA_FIELD};
use switchboard::transport::{Frame, read_frame, write_frame};
use switchboard_config::SocketEndpoint;

const ACCEPT_DEADLINE: Duration = Duration::from_secs(5);
const WAIT_STEP: Duration = Duration::from_millis(5);
/// Gives the command time to register its listeners before pushes arrive.
const PUSH_DELAY: Duration = Duration::from_millis(300);

/// What the proxy does once a client connects.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProxyScript {
    pub(crate) answer_pings: bool,
    pub(crate) pushes: Vec<Message>,
    pub(crate) hang_up_after_pushes: bool,
}

pub(crate) struct FakeProxy {
    port: u16,
    received: Arc<Mutex<Vec<Message>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeProxy {
    pub(crate) fn spawn(client_id: u32, script: ProxyScript) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake proxy")?;
        listener
            .set_nonblocking(true)
            .context("fake proxy nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let serve_received = Arc::clone(&received);
        let handle =
            thread::spawn(move || serve(&listener, client_id, &script, &serve_received));
        Ok(Self {
            port,
            received,
            handle: Some(handle),
        })
    }

    pub(crate) fn endpoint(&self) -> SocketEndpoint {
        SocketEndpoint::tcp("127.0.0.1", self.port)
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
                    "expected {count} frames, proxy saw {}",
                    snapshot.len()
                ));
            }
            thread::sleep(WAIT_STEP);
        }
    }
}

impl Drop for FakeProxy {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}

fn serve(
    listener: &TcpListener,
    client_id: u32,
    script: &ProxyScript,
    received: &Mutex<Vec<Message>>,
) -> Result<()> {
    let Some(mut stream) = accept(listener)? else {
        return Ok(());
    };
    stream
        .set_nonblocking(false)
        .context("fake proxy blocking stream")?;
    announce(&mut stream, client_id).context("write client id")?;

    if !script.pushes.is_empty() {
        thread::sleep(PUSH_DELAY);
        for message in &script.pushes {
            write_frame(&mut stream, &message.to_vec()?).context("push frame")?;
        }
    }
    if script.hang_up_after_pushes {
        return stream.shutdown(Shutdown::Both).context("hang up");
    }

    loop {
        let payload = match read_frame(&mut stream, u32::MAX) {
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
        if script.answer_pings && request.is_kind("ping") {
            let mut pong = Message::kind("pong").with(CLIENT_ID_FIELD, client_id);
            if let Some(token) = request.extra() {
                pong.insert(EXTRA_FIELD, token);
            }
            write_frame(&mut stream, &pong.to_vec()?).context("write pong")?;
        }
    }
}

#[expect(
    clippy::big_endian_bytes,
    reason = "the proxy announces the client id in network byte order"
)]
fn announce(stream: &mut TcpStream, client_id: u32) -> io::Result<()> {
    stream.write_all(&client_id.to_be_bytes())?;
    stream.flush()
}

fn accept(listener: &TcpListener) -> Result<Option<TcpStream>> {
    let deadline = Instant::now() + ACCEPT_DEADLINE;
    loop {
        match listener.accept() {
            Ok((stream, _)) => return Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                thread::sleep(WAIT_STEP);
            }
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
            | io::ErrorKind::BrokenPipe
    )
}
