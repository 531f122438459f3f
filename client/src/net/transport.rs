//! Websocket transport between a session store and the relay.
//!
//! The socket lives on its own tokio task. Callers talk to it through a
//! cloneable [`Transport`] handle and read [`TransportEvent`]s from the
//! receiver returned by [`Transport::spawn`].
//!
//! LIFECYCLE
//! =========
//! - Frames emitted while a connection attempt is in flight are queued and
//!   flushed, in order, once the socket opens.
//! - An unexpected drop or failed connect is retried with exponential
//!   backoff. Exhausting [`ReconnectPolicy::max_retries`] emits
//!   [`TransportEvent::Failed`] and parks the task until [`Transport::connect`].
//! - [`Transport::disconnect`] is intentional and never retried. Frames
//!   emitted while parked are dropped.
//! - After an unexpected drop the new socket starts held: only frames sent
//!   with [`Transport::emit_first`] go out. The backlog waits for
//!   [`Transport::release`] or [`Transport::discard`], so nothing reaches the
//!   relay ahead of the join that re-registers this socket.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::collections::VecDeque;

use frames::{Frame, decode_frame, decode_text_frame, encode_frame};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, base_delay: DEFAULT_BASE_DELAY }
    }
}

impl ReconnectPolicy {
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries, ..Self::default() }
    }

    /// Backoff before retry `attempt` (1-based): `base * 2^(attempt - 1)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

/// Connection lifecycle and inbound traffic, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    Connected,
    Frame(Frame),
    /// Retry `attempt` of the reconnect budget is about to start.
    Reconnecting { attempt: u32 },
    /// Retries exhausted. Terminal until [`Transport::connect`].
    Failed { reason: String },
    /// Closed on request.
    Closed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport task has stopped")]
    Stopped,
}

enum Command {
    Emit(Frame),
    EmitFirst(Frame),
    Release,
    Discard,
    Disconnect,
    Connect,
}

/// Handle to a running transport task. Dropping every handle shuts it down.
#[derive(Clone, Debug)]
pub struct Transport {
    commands: mpsc::UnboundedSender<Command>,
}

impl Transport {
    /// Start connecting to `url` on a new task.
    #[must_use]
    pub fn spawn(url: impl Into<String>, policy: ReconnectPolicy) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let worker = Worker {
            url: url.into(),
            policy,
            commands: command_rx,
            events: event_tx,
            pending: VecDeque::new(),
            urgent: VecDeque::new(),
            held: false,
        };
        tokio::spawn(worker.run());
        (Self { commands: command_tx }, event_rx)
    }

    /// Queue a frame for sending. Fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Stopped`] if the task has exited.
    pub fn emit(&self, frame: Frame) -> Result<(), TransportError> {
        self.send(Command::Emit(frame))
    }

    /// Send ahead of the backlog, even while it is held. Used for the join
    /// that re-registers a reconnected socket.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Stopped`] if the task has exited.
    pub fn emit_first(&self, frame: Frame) -> Result<(), TransportError> {
        self.send(Command::EmitFirst(frame))
    }

    /// Stop holding and flush the backlog in order.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Stopped`] if the task has exited.
    pub fn release(&self) -> Result<(), TransportError> {
        self.send(Command::Release)
    }

    /// Stop holding and drop the backlog.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Stopped`] if the task has exited.
    pub fn discard(&self) -> Result<(), TransportError> {
        self.send(Command::Discard)
    }

    /// Close the socket on purpose. No reconnect follows.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Stopped`] if the task has exited.
    pub fn disconnect(&self) -> Result<(), TransportError> {
        self.send(Command::Disconnect)
    }

    /// Resume after [`Transport::disconnect`] or a terminal failure.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Stopped`] if the task has exited.
    pub fn connect(&self) -> Result<(), TransportError> {
        self.send(Command::Connect)
    }

    fn send(&self, command: Command) -> Result<(), TransportError> {
        self.commands
            .send(command)
            .map_err(|_| TransportError::Stopped)
    }
}

// =============================================================================
// WORKER
// =============================================================================

enum Establish {
    Open(Box<WsStream>),
    Failed(String),
    Disconnect,
    Shutdown,
}

enum PumpExit {
    Disconnect,
    Dropped,
    Shutdown,
}

struct Worker {
    url: String,
    policy: ReconnectPolicy,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<TransportEvent>,
    pending: VecDeque<Frame>,
    urgent: VecDeque<Frame>,
    /// Backlog waits for a release after an unexpected drop.
    held: bool,
}

impl Worker {
    async fn run(mut self) {
        // 0 is the first attempt of a cycle and runs without delay.
        let mut attempt = 0;
        loop {
            match self.establish(attempt).await {
                Establish::Open(stream) => {
                    info!(url = %self.url, "transport connected");
                    attempt = 0;
                    self.publish(TransportEvent::Connected);
                    match self.pump(*stream).await {
                        PumpExit::Dropped => {
                            warn!(url = %self.url, "transport dropped; reconnecting");
                            self.held = true;
                            attempt = 1;
                            self.publish(TransportEvent::Reconnecting { attempt });
                        }
                        PumpExit::Disconnect => {
                            self.publish(TransportEvent::Closed);
                            if !self.park().await {
                                return;
                            }
                        }
                        PumpExit::Shutdown => return,
                    }
                }
                Establish::Failed(reason) => {
                    if attempt >= self.policy.max_retries {
                        warn!(url = %self.url, %reason, "transport failed; giving up");
                        self.clear_queues();
                        self.publish(TransportEvent::Failed { reason });
                        if !self.park().await {
                            return;
                        }
                        attempt = 0;
                    } else {
                        debug!(url = %self.url, %reason, attempt, "connect failed");
                        attempt += 1;
                        self.publish(TransportEvent::Reconnecting { attempt });
                    }
                }
                Establish::Disconnect => {
                    self.clear_queues();
                    self.publish(TransportEvent::Closed);
                    if !self.park().await {
                        return;
                    }
                    attempt = 0;
                }
                Establish::Shutdown => return,
            }
        }
    }

    fn clear_queues(&mut self) {
        self.pending.clear();
        self.urgent.clear();
        self.held = false;
    }

    fn publish(&self, event: TransportEvent) {
        // The store may have gone away; the task ends when its handles do.
        let _ = self.events.send(event);
    }

    /// Wait out an intentional disconnect or terminal failure. Returns false
    /// when every handle has been dropped.
    async fn park(&mut self) -> bool {
        loop {
            match self.commands.recv().await {
                Some(Command::Connect) => return true,
                Some(Command::Emit(frame) | Command::EmitFirst(frame)) => {
                    debug!(event = %frame.event, "dropping frame while disconnected");
                }
                Some(Command::Release | Command::Discard | Command::Disconnect) => {}
                None => return false,
            }
        }
    }

    async fn establish(&mut self, attempt: u32) -> Establish {
        let delay = if attempt == 0 { Duration::ZERO } else { self.policy.delay_for(attempt) };
        let url = self.url.clone();
        let connecting = async move {
            tokio::time::sleep(delay).await;
            connect_async(url).await
        };
        tokio::pin!(connecting);

        loop {
            tokio::select! {
                result = &mut connecting => {
                    return match result {
                        Ok((stream, _)) => Establish::Open(Box::new(stream)),
                        Err(e) => Establish::Failed(e.to_string()),
                    };
                }
                command = self.commands.recv() => match command {
                    Some(Command::Emit(frame)) => self.pending.push_back(frame),
                    Some(Command::EmitFirst(frame)) => self.urgent.push_back(frame),
                    Some(Command::Release) => self.held = false,
                    Some(Command::Discard) => {
                        self.pending.clear();
                        self.held = false;
                    }
                    Some(Command::Connect) => {}
                    Some(Command::Disconnect) => return Establish::Disconnect,
                    None => return Establish::Shutdown,
                },
            }
        }
    }

    /// Send urgent frames, then the backlog unless it is held.
    async fn flush(&mut self, stream: &mut WsStream) -> bool {
        if !drain(stream, &mut self.urgent).await {
            return false;
        }
        self.held || drain(stream, &mut self.pending).await
    }

    async fn pump(&mut self, mut stream: WsStream) -> PumpExit {
        if !self.flush(&mut stream).await {
            return PumpExit::Dropped;
        }

        loop {
            tokio::select! {
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Binary(bytes))) => self.deliver(decode_frame(&bytes)),
                    Some(Ok(Message::Text(text))) => self.deliver(decode_text_frame(&text)),
                    Some(Ok(Message::Close(_))) | None => return PumpExit::Dropped,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket read failed");
                        return PumpExit::Dropped;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Emit(frame)) if self.held => {
                        debug!(event = %frame.event, "holding frame until release");
                        self.pending.push_back(frame);
                    }
                    Some(Command::Emit(frame)) => {
                        if let Err(e) = stream.send(binary(&frame)).await {
                            warn!(error = %e, event = %frame.event, "websocket send failed");
                            self.pending.push_back(frame);
                            return PumpExit::Dropped;
                        }
                    }
                    Some(Command::EmitFirst(frame)) => {
                        if let Err(e) = stream.send(binary(&frame)).await {
                            warn!(error = %e, event = %frame.event, "websocket send failed");
                            self.urgent.push_back(frame);
                            return PumpExit::Dropped;
                        }
                    }
                    Some(Command::Release) => {
                        self.held = false;
                        if !self.flush(&mut stream).await {
                            return PumpExit::Dropped;
                        }
                    }
                    Some(Command::Discard) => {
                        debug!(frames = self.pending.len(), "discarding held frames");
                        self.pending.clear();
                        self.held = false;
                    }
                    Some(Command::Connect) => {}
                    Some(Command::Disconnect) => {
                        let _ = stream.close(None).await;
                        return PumpExit::Disconnect;
                    }
                    None => {
                        let _ = stream.close(None).await;
                        return PumpExit::Shutdown;
                    }
                },
            }
        }
    }

    fn deliver(&self, decoded: Result<Frame, frames::CodecError>) {
        match decoded {
            Ok(frame) => self.publish(TransportEvent::Frame(frame)),
            Err(e) => warn!(error = %e, "dropping undecodable frame"),
        }
    }
}

/// Send a queue front to back. A frame that fails goes back on the front.
async fn drain(stream: &mut WsStream, queue: &mut VecDeque<Frame>) -> bool {
    while let Some(frame) = queue.pop_front() {
        if let Err(e) = stream.send(binary(&frame)).await {
            warn!(error = %e, event = %frame.event, "flush failed");
            queue.push_front(frame);
            return false;
        }
    }
    true
}

fn binary(frame: &Frame) -> Message {
    Message::Binary(encode_frame(frame).into())
}
