use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use url::{Host, Url};

use crate::buffer::ByteBuffer;
use crate::config::{Config, Limits};
use crate::connection::fragmenter::Fragmenter;
use crate::connection::framed::{FrameReader, FrameWriter};
use crate::connection::state::SharedState;
use crate::connection::upgrade::{client_handshake, server_handshake};
use crate::connection::{ConnectionState, Role};
use crate::error::{Error, Result};
use crate::message::{CloseCode, CloseFrame, Message};
use crate::protocol::{Frame, HandshakeRequest, MessageAssembler, OpCode};

/// An open WebSocket connection over a transport `S`.
///
/// Reading and writing are independent: [`Connection::split`] hands them to
/// different tasks, and [`Connection::into_channel`] runs the read side as
/// its own task. Writes from any number of [`MessageSender`] clones are
/// serialized so that frames never interleave on the wire.
///
/// ## Example
///
/// ```rust,no_run
/// use wsframe::{Config, Connection, Message};
///
/// # async fn run() -> wsframe::Result<()> {
/// let mut conn = Connection::connect("ws://127.0.0.1:9001/echo", Config::client()).await?;
/// conn.send(Message::text("Hello")).await?;
/// if let Some(reply) = conn.recv().await? {
///     println!("{reply:?}");
/// }
/// conn.close(wsframe::CloseCode::NORMAL, "done").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Connection<S> {
    reader: MessageReader<S>,
    sender: MessageSender<S>,
    request: Option<HandshakeRequest>,
}

impl Connection<TcpStream> {
    /// Dial a `ws://` URL over TCP and perform the client handshake.
    ///
    /// `wss://` needs a TLS stream supplied by the caller through
    /// [`Connection::client`].
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUrl` / `Error::UnsupportedScheme` for a bad target
    /// - `Error::Io` if the TCP connection fails
    /// - `Error::Timeout` if connecting and upgrading exceed the handshake
    ///   timeout
    /// - any error of [`client_handshake`]
    pub async fn connect(url: &str, config: Config) -> Result<Self> {
        let url = Url::parse(url)?;
        if url.scheme() != "ws" {
            return Err(Error::UnsupportedScheme(url.scheme().to_string()));
        }
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(Error::InvalidUrl(format!("{url} has no host"))),
        };
        let port = url.port_or_known_default().unwrap_or(80);

        let limit = config.timeouts.handshake;
        let stream = tokio::time::timeout(limit, TcpStream::connect((host.as_str(), port)))
            .await
            .map_err(|_| Error::Timeout(format!("connecting to {host}:{port}")))??;
        stream.set_nodelay(true)?;
        log::debug!("connected to {host}:{port}");
        Connection::client(stream, &url, config).await
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Run the client handshake for `url` over an established transport.
    ///
    /// # Errors
    ///
    /// Any error of [`client_handshake`]; the transport is shut down first.
    pub async fn client(mut stream: S, url: &Url, config: Config) -> Result<Self> {
        let origin = config.origin.as_deref();
        let leftover = client_handshake(&mut stream, url, origin, &config).await?;
        Ok(Self::from_upgraded(stream, Role::Client, &config, leftover, None))
    }

    /// Run the server handshake over an accepted transport.
    ///
    /// # Errors
    ///
    /// Any error of [`server_handshake`]; the transport is shut down first.
    pub async fn accept(mut stream: S, config: Config) -> Result<Self> {
        let (request, leftover) = server_handshake(&mut stream, &config).await?;
        Ok(Self::from_upgraded(
            stream,
            Role::Server,
            &config,
            leftover,
            Some(request),
        ))
    }

    /// Wrap a transport whose handshake already completed.
    ///
    /// `leftover` holds bytes read past the end of the HTTP head.
    #[must_use]
    pub fn from_upgraded(
        stream: S,
        role: Role,
        config: &Config,
        leftover: ByteBuffer,
        request: Option<HandshakeRequest>,
    ) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let state = SharedState::new(ConnectionState::Open);
        let sender = MessageSender {
            writer: Arc::new(Mutex::new(FrameWriter::new(write_half, role, config))),
            state: state.clone(),
            fragment_size: config.fragment_size.max(1),
            limits: config.limits.clone(),
            close: Arc::new(CloseHandshake::new(config.timeouts.close)),
        };
        let reader = MessageReader {
            frames: FrameReader::new(read_half, leftover, role, config),
            assembler: MessageAssembler::new(config.limits.clone()),
            sender: sender.clone(),
            state,
            role,
            delivery_timeout: config.timeouts.delivery,
        };
        Self {
            reader,
            sender,
            request,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.sender.state()
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.reader.role
    }

    /// The upgrade request this server connection was opened with.
    #[must_use]
    pub fn request(&self) -> Option<&HandshakeRequest> {
        self.request.as_ref()
    }

    /// A handle for sending from other tasks.
    #[must_use]
    pub fn sender(&self) -> MessageSender<S> {
        self.sender.clone()
    }

    /// # Errors
    ///
    /// See [`MessageSender::send`].
    pub async fn send(&self, message: Message) -> Result<()> {
        self.sender.send(message).await
    }

    /// # Errors
    ///
    /// See [`MessageSender::send_message`].
    pub async fn send_message(&self, opcode: OpCode, payload: impl Into<Bytes>) -> Result<()> {
        self.sender.send_message(opcode, payload).await
    }

    /// # Errors
    ///
    /// See [`MessageSender::ping`].
    pub async fn ping(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.sender.ping(payload).await
    }

    /// # Errors
    ///
    /// See [`MessageReader::recv`].
    pub async fn recv(&mut self) -> Result<Option<Message>> {
        self.reader.recv().await
    }

    /// Receive the next message as its opcode and raw payload.
    ///
    /// # Errors
    ///
    /// `Error::ConnectionClosed` once no more messages will arrive, plus the
    /// errors of [`MessageReader::recv`].
    pub async fn receive_message(&mut self) -> Result<(OpCode, Vec<u8>)> {
        match self.reader.recv().await? {
            Some(message) => Ok(message.into_parts()),
            None => Err(Error::ConnectionClosed(None)),
        }
    }

    /// Run the close handshake: send a close frame, then read until the
    /// peer's echo arrives, the stream ends or the close timeout expires.
    ///
    /// Data messages that arrive in the meantime are discarded.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCloseCode` / `Error::ControlFrameTooLarge` for an
    ///   unsendable close frame
    /// - `Error::ConnectionClosed` if the connection is already closed
    /// - transport errors while sending the close frame
    pub async fn close(&mut self, code: CloseCode, reason: &str) -> Result<()> {
        self.sender.close(code, reason).await?;
        loop {
            match self.reader.recv().await {
                Ok(Some(Message::Close(_)) | None) => return Ok(()),
                Ok(Some(message)) => {
                    log::debug!("discarding {} message received while closing", message.opcode());
                }
                Err(err) if self.state().is_closed() => {
                    log::debug!("connection failed while closing: {err}");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Separate the read and write directions.
    #[must_use]
    pub fn split(self) -> (MessageReader<S>, MessageSender<S>) {
        (self.reader, self.sender)
    }
}

/// The write direction of a connection. Cheap to clone; all clones share one
/// writer lock.
pub struct MessageSender<S> {
    writer: Arc<Mutex<FrameWriter<WriteHalf<S>>>>,
    state: SharedState,
    fragment_size: usize,
    limits: Limits,
    close: Arc<CloseHandshake>,
}

/// Close handshake bookkeeping shared by both directions.
#[derive(Debug)]
struct CloseHandshake {
    timeout: Duration,
    /// Set once, when the connection starts closing. Every read made while
    /// closing is bounded by this one deadline.
    deadline: std::sync::Mutex<Option<Instant>>,
    /// A close frame was received, so the handshake ran to completion.
    completed: AtomicBool,
    /// Wakes a reader blocked in an open-state read.
    started: Notify,
}

impl CloseHandshake {
    fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: std::sync::Mutex::new(None),
            completed: AtomicBool::new(false),
            started: Notify::new(),
        }
    }

    fn start(&self) {
        *self.deadline.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Instant::now() + self.timeout);
        self.started.notify_one();
    }

    fn deadline(&self) -> Instant {
        let deadline = self.deadline.lock().unwrap_or_else(PoisonError::into_inner);
        deadline.unwrap_or_else(|| Instant::now() + self.timeout)
    }
}

impl<S> Clone for MessageSender<S> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            state: self.state.clone(),
            fragment_size: self.fragment_size,
            limits: self.limits.clone(),
            close: Arc::clone(&self.close),
        }
    }
}

impl<S> std::fmt::Debug for MessageSender<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSender")
            .field("state", &self.state.get())
            .field("fragment_size", &self.fragment_size)
            .finish_non_exhaustive()
    }
}

impl<S> MessageSender<S> {
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Move `Open -> Closing` and start the close timeout. False if the
    /// connection was not open.
    fn begin_closing(&self) -> bool {
        if !self
            .state
            .transition(ConnectionState::Open, ConnectionState::Closing)
        {
            return false;
        }
        self.close.start();
        true
    }
}

impl<S> MessageSender<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Send one message. Text and binary payloads longer than the fragment
    /// size go out as several frames, written without interruption.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` unless the connection is open
    /// - `Error::MessageTooLarge` past `max_message_size`
    /// - close frame errors of [`MessageSender::close`]
    /// - transport errors, after which the connection is closed
    pub async fn send(&self, message: Message) -> Result<()> {
        match message {
            Message::Close(None) => self.send_close(Frame::close(None, "")).await,
            Message::Close(Some(frame)) => self.close(frame.code, &frame.reason).await,
            Message::Text(text) => self.send_data(OpCode::Text, Bytes::from(text)).await,
            Message::Binary(data) => self.send_data(OpCode::Binary, Bytes::from(data)).await,
        }
    }

    /// Send a payload under any opcode that may start a message or is a
    /// control frame.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUtf8` for a text payload that is not UTF-8
    /// - `Error::InvalidContinuation` for [`OpCode::Continuation`]
    /// - the errors of [`MessageSender::send`]
    pub async fn send_message(&self, opcode: OpCode, payload: impl Into<Bytes>) -> Result<()> {
        let payload = payload.into();
        match opcode {
            OpCode::Text => {
                std::str::from_utf8(&payload)?;
                self.send_data(opcode, payload).await
            }
            OpCode::Binary => self.send_data(opcode, payload).await,
            OpCode::Ping => self.ping(payload).await,
            OpCode::Pong => self.pong(payload).await,
            OpCode::Close => match CloseFrame::parse(&payload)? {
                Some(frame) => self.close(frame.code, &frame.reason).await,
                None => self.send_close(Frame::close(None, "")).await,
            },
            OpCode::Continuation => Err(Error::InvalidContinuation(
                "continuation frames are produced by fragmentation only".into(),
            )),
        }
    }

    /// # Errors
    ///
    /// `Error::ControlFrameTooLarge` past 125 bytes, `Error::ConnectionClosed`
    /// unless open, or a transport error.
    pub async fn ping(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.ensure_open()?;
        self.write(vec![Frame::ping(payload)]).await
    }

    /// # Errors
    ///
    /// As [`MessageSender::ping`].
    pub async fn pong(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.ensure_open()?;
        self.write(vec![Frame::pong(payload)]).await
    }

    /// Start the close handshake. Further sends fail; the read direction
    /// keeps running until the peer's echo arrives.
    ///
    /// Calling this while already closing, or after the peer's close frame
    /// was received, does nothing.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCloseCode` for a reserved or out-of-range code
    /// - `Error::ControlFrameTooLarge` for a reason over 123 bytes
    /// - `Error::ConnectionClosed` if the connection failed or was shut down
    ///   without a close handshake
    pub async fn close(&self, code: CloseCode, reason: &str) -> Result<()> {
        let frame = CloseFrame::new(code, reason);
        frame.validate()?;
        self.send_close(Frame::close(Some(code.as_u16()), &frame.reason))
            .await
    }

    async fn send_close(&self, frame: Frame) -> Result<()> {
        if !self.begin_closing() {
            return match self.state.get() {
                ConnectionState::Closing => Ok(()),
                ConnectionState::Closed if self.close.completed.load(Ordering::Acquire) => {
                    Ok(())
                }
                _ => Err(Error::ConnectionClosed(None)),
            };
        }
        log::debug!("sending close frame");
        self.write(vec![frame]).await
    }

    async fn send_data(&self, opcode: OpCode, payload: Bytes) -> Result<()> {
        self.ensure_open()?;
        self.limits.check_message_size(payload.len())?;
        self.write(Fragmenter::new(opcode, payload, self.fragment_size))
            .await
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.get().can_send() {
            Ok(())
        } else {
            Err(Error::ConnectionClosed(None))
        }
    }

    /// Write frames under the writer lock. A transport failure closes the
    /// connection.
    async fn write<I>(&self, frames: I) -> Result<()>
    where
        I: IntoIterator<Item = Frame>,
    {
        let result = self.writer.lock().await.write_frames(frames).await;
        if let Err(Error::Io(reason)) = &result {
            log::warn!("write failed, closing connection: {reason}");
            self.state.set(ConnectionState::Closed);
        }
        result
    }

    /// Write a frame the protocol requires regardless of the send state
    /// (pong replies, close echoes).
    async fn write_control(&self, frame: Frame) -> Result<()> {
        if self.state.get().is_closed() {
            return Err(Error::ConnectionClosed(None));
        }
        self.write(vec![frame]).await
    }

    async fn shutdown(&self) {
        if let Err(err) = self.writer.lock().await.shutdown().await {
            log::debug!("transport shutdown failed: {err}");
        }
    }
}

/// The read direction of a connection.
pub struct MessageReader<S> {
    frames: FrameReader<ReadHalf<S>>,
    assembler: MessageAssembler,
    sender: MessageSender<S>,
    state: SharedState,
    role: Role,
    pub(crate) delivery_timeout: Duration,
}

impl<S> std::fmt::Debug for MessageReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageReader")
            .field("role", &self.role)
            .field("state", &self.state.get())
            .field("assembler", &self.assembler)
            .finish_non_exhaustive()
    }
}

impl<S> MessageReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Receive the next complete message.
    ///
    /// Pings are answered and pongs swallowed here. A close frame from the
    /// peer is echoed (when we did not close first), the transport is shut
    /// down and the close is returned as [`Message::Close`]; after that, and
    /// whenever the stream ends during the close handshake, `Ok(None)` is
    /// returned.
    ///
    /// # Errors
    ///
    /// - protocol errors: a close frame with the matching status code is
    ///   sent and the connection closed before the error is returned
    /// - `Error::ConnectionClosed` if the stream ends while open
    /// - transport errors
    pub async fn recv(&mut self) -> Result<Option<Message>> {
        loop {
            if !self.state.get().can_receive() {
                return Ok(None);
            }
            let frame = match self.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => return self.stream_ended().await,
                Err(Error::Timeout(reason)) => {
                    log::warn!("{reason}; shutting the transport down");
                    self.release().await;
                    return Ok(None);
                }
                Err(err) => return Err(self.fail(err).await),
            };

            match frame.opcode {
                OpCode::Ping => {
                    log::debug!("ping received ({} bytes)", frame.len());
                    if self.state.get().can_send() {
                        let pong = Frame::pong(frame.into_payload());
                        if let Err(err) = self.sender.write_control(pong).await {
                            return Err(self.fail(err).await);
                        }
                    }
                }
                OpCode::Pong => log::debug!("pong received ({} bytes)", frame.len()),
                OpCode::Close => return self.on_close(&frame).await,
                _ => match self.assembler.push(frame) {
                    Ok(Some(message)) => return Ok(Some(message)),
                    Ok(None) => {}
                    Err(err) => return Err(self.fail(err).await),
                },
            }
        }
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.state.get() == ConnectionState::Open {
            // Reading is cancel safe, so a close started elsewhere can cut
            // the wait short and put it under the close deadline.
            tokio::select! {
                read = self.frames.read_frame() => return read,
                () = self.sender.close.started.notified() => {}
            }
        }
        let deadline = self.sender.close.deadline();
        match tokio::time::timeout_at(deadline, self.frames.read_frame()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "no close echo within {:?}",
                self.sender.close.timeout
            ))),
        }
    }

    async fn on_close(&mut self, frame: &Frame) -> Result<Option<Message>> {
        let close = match CloseFrame::parse(frame.payload()) {
            Ok(close) => close,
            Err(err) => return Err(self.fail(err).await),
        };
        let code = close.as_ref().map(|c| c.code);
        self.sender.close.completed.store(true, Ordering::Release);
        if self.sender.begin_closing() {
            log::debug!("peer closed the connection ({code:?}), echoing");
            let echo = Frame::close(code.map(CloseCode::as_u16), "");
            if let Err(err) = self.sender.write_control(echo).await {
                log::debug!("close echo failed: {err}");
            }
        } else {
            log::debug!("close handshake complete ({code:?})");
        }
        self.release().await;
        Ok(Some(Message::Close(close)))
    }

    async fn stream_ended(&mut self) -> Result<Option<Message>> {
        let prev = self.state.set(ConnectionState::Closed);
        self.sender.shutdown().await;
        if prev == ConnectionState::Closing {
            Ok(None)
        } else {
            Err(Error::ConnectionClosed(None))
        }
    }

    /// Shut the transport down and mark the connection closed.
    async fn release(&mut self) {
        self.sender.shutdown().await;
        self.state.set(ConnectionState::Closed);
        self.assembler.reset();
    }

    /// Fail the connection with `err`. Protocol errors are reported to the
    /// peer in a close frame first.
    pub(crate) async fn fail(&mut self, err: Error) -> Error {
        if err.is_protocol_error() {
            log::warn!("protocol error, failing connection: {err}");
            self.abort(err.close_code()).await;
        } else {
            log::debug!("connection failed: {err}");
            self.release().await;
        }
        err
    }

    /// Send a close frame with `code` if none was sent yet, then release the
    /// transport.
    pub(crate) async fn abort(&mut self, code: u16) {
        if self.sender.begin_closing() {
            if let Err(err) = self.sender.write_control(Frame::close(Some(code), "")).await {
                log::debug!("failed to send close frame {code}: {err}");
            }
        }
        self.release().await;
    }
}
