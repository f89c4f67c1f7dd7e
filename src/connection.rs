//! Request dispatch and reply correlation over one shared connection.
//!
//! Callers hand encoded frames to a single writer task. For every frame the
//! writer first appends a pending slot to the request queue and then writes the
//! bytes, so the queue is always in write order. A single reader task decodes
//! replies off the inbound stream and resolves the oldest slot with each one.
//!
//! A slot leaves the queue only when its reply arrives or the connection
//! fails. Callers that time out or stop waiting leave their slot in place and
//! the reply is discarded when it shows up, which keeps every later reply
//! matched to the right caller.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::protocol::{self, ReplyDecoder, RespValue};
use crate::stats::ConnectionStats;

pub const DEFAULT_QUEUE_SIZE: usize = 1024;

const READ_BUFFER_SIZE: usize = 16 * 1024;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Draining,
    Closed,
}

#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Applied to every call made through `execute`.
    pub command_timeout: Option<Duration>,
    /// Frames that may wait for the writer before callers are held back.
    pub queue_size: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            command_timeout: None,
            queue_size: DEFAULT_QUEUE_SIZE,
        }
    }
}

type Completion = oneshot::Sender<Result<RespValue>>;

struct Outbound {
    id: u64,
    command: String,
    frame: Bytes,
    completion: Completion,
}

struct PendingRequest {
    id: u64,
    command: String,
    submitted_at: Instant,
    completion: Completion,
}

struct Slots {
    state: ConnectionState,
    queue: VecDeque<PendingRequest>,
    failure: Option<Error>,
}

struct Shared {
    id: u64,
    slots: Mutex<Slots>,
    closed: Notify,
    next_request_id: AtomicU64,
    stats: ConnectionStats,
}

impl Shared {
    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the request as pending and hands back the bytes to write, or
    /// rejects it when the connection no longer accepts work.
    fn enqueue(&self, request: Outbound) -> Option<Bytes> {
        let mut slots = self.slots();
        if slots.state != ConnectionState::Connected {
            let error = slots.failure.clone().unwrap_or(Error::NotConnected);
            drop(slots);
            let _ = request.completion.send(Err(error));
            return None;
        }
        slots.queue.push_back(PendingRequest {
            id: request.id,
            command: request.command,
            submitted_at: Instant::now(),
            completion: request.completion,
        });
        Some(request.frame)
    }

    /// Hands a reply to the oldest pending request.
    fn resolve(&self, reply: RespValue) -> Result<()> {
        let pending = {
            let mut slots = self.slots();
            if slots.state != ConnectionState::Connected {
                return Ok(());
            }
            slots.queue.pop_front()
        };

        let Some(pending) = pending else {
            warn!(connection_id = self.id, reply = reply.kind(), "unsolicited reply");
            return Err(Error::Protocol(
                "received a reply with no pending request".to_string(),
            ));
        };

        self.stats.on_reply();
        let elapsed_ms = pending.submitted_at.elapsed().as_millis() as u64;
        if pending.completion.send(Ok(reply)).is_err() {
            self.stats.on_discarded();
            debug!(
                connection_id = self.id,
                request_id = pending.id,
                command = %pending.command,
                elapsed_ms,
                "reply discarded, caller stopped waiting"
            );
        } else {
            debug!(
                connection_id = self.id,
                request_id = pending.id,
                command = %pending.command,
                elapsed_ms,
                "reply received"
            );
        }
        Ok(())
    }

    /// Moves to `Draining`, resolves every pending request with `error` in
    /// queue order, then settles in `Closed`. Only the first call has effect.
    fn fail(&self, error: Error) {
        let drained = {
            let mut slots = self.slots();
            if matches!(
                slots.state,
                ConnectionState::Draining | ConnectionState::Closed
            ) {
                return;
            }
            slots.state = ConnectionState::Draining;
            slots.failure = Some(error.clone());
            std::mem::take(&mut slots.queue)
        };

        if drained.is_empty() {
            debug!(connection_id = self.id, reason = %error, "connection closing");
        } else {
            warn!(
                connection_id = self.id,
                pending = drained.len(),
                error = %error,
                "connection failed with requests in flight"
            );
        }
        self.stats.on_failed(drained.len());
        for pending in drained {
            let _ = pending.completion.send(Err(error.clone()));
        }

        self.slots().state = ConnectionState::Closed;
        self.closed.notify_one();
    }
}

/// Handle to a multiplexed connection. Clones share the same connection; it
/// closes when `close` is called, the stream fails, or the last handle drops.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
    outbound: mpsc::Sender<Outbound>,
    command_timeout: Option<Duration>,
}

impl Connection {
    /// Takes ownership of an established stream and starts the reader and
    /// writer tasks. Must be called from within a tokio runtime.
    pub fn new<S>(stream: S, options: ConnectionOptions) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::from_parts(reader, writer, options)
    }

    pub fn from_parts<R, W>(reader: R, writer: W, options: ConnectionOptions) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let shared = Arc::new(Shared {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            slots: Mutex::new(Slots {
                state: ConnectionState::Disconnected,
                queue: VecDeque::new(),
                failure: None,
            }),
            closed: Notify::new(),
            next_request_id: AtomicU64::new(1),
            stats: ConnectionStats::new(),
        });
        let (outbound, requests) = mpsc::channel(options.queue_size.max(1));

        shared.slots().state = ConnectionState::Connected;
        let reader_task = tokio::spawn(read_loop(reader, shared.clone()));
        tokio::spawn(write_loop(writer, requests, shared.clone(), reader_task));
        debug!(connection_id = shared.id, "connection started");

        Self {
            shared,
            outbound,
            command_timeout: options.command_timeout,
        }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.slots().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Requests written or queued for writing that have no reply yet.
    pub fn pending_requests(&self) -> usize {
        self.shared.slots().queue.len()
    }

    /// The error that closed the connection, if it has closed.
    pub fn last_error(&self) -> Option<Error> {
        self.shared.slots().failure.clone()
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.shared.stats
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout
    }

    /// Sends `command` and waits for its reply. Error replies come back as
    /// `Error::Server`.
    pub async fn execute(&self, command: Command) -> Result<RespValue> {
        self.dispatch(command, self.command_timeout).await
    }

    /// Like `execute` with a timeout for this call only.
    pub async fn execute_with_timeout(
        &self,
        command: Command,
        timeout: Duration,
    ) -> Result<RespValue> {
        self.dispatch(command, Some(timeout)).await
    }

    /// Fails every pending request and stops accepting new ones.
    pub fn close(&self) {
        self.shared
            .fail(Error::connection_closed("connection closed by client"));
    }

    async fn dispatch(&self, command: Command, timeout: Option<Duration>) -> Result<RespValue> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let id = self.shared.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (completion, reply) = oneshot::channel();
        let request = Outbound {
            id,
            command: command.name().to_string(),
            frame: protocol::encode_command(&command),
            completion,
        };

        // The deadline covers waiting for queue space as well as the reply.
        let exchange = async {
            if self.outbound.send(request).await.is_err() {
                return Err(Error::NotConnected);
            }
            self.shared.stats.on_command(command.name());
            reply.await.unwrap_or(Err(Error::NotConnected))
        };

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.shared.stats.on_timeout();
                    debug!(
                        connection_id = self.shared.id,
                        request_id = id,
                        command = command.name(),
                        timeout_ms = limit.as_millis() as u64,
                        "command timed out"
                    );
                    return Err(Error::Timeout(limit));
                }
            },
            None => exchange.await,
        };

        match outcome? {
            RespValue::Error(message) => {
                self.shared.stats.on_server_error();
                Err(Error::Server(message))
            }
            reply => Ok(reply),
        }
    }
}

async fn write_loop<W>(
    writer: W,
    mut requests: mpsc::Receiver<Outbound>,
    shared: Arc<Shared>,
    reader_task: JoinHandle<()>,
) where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);

    let outcome: std::io::Result<()> = 'run: loop {
        let first = tokio::select! {
            _ = shared.closed.notified() => break Ok(()),
            request = requests.recv() => match request {
                Some(request) => request,
                None => break Ok(()),
            },
        };

        // Write everything already waiting, then flush once. A stalled peer
        // must not keep the writer from noticing the connection has failed.
        let mut next = Some(first);
        while let Some(request) = next {
            if let Some(frame) = shared.enqueue(request) {
                let written = tokio::select! {
                    result = writer.write_all(&frame) => result,
                    _ = shared.closed.notified() => break 'run Ok(()),
                };
                if let Err(e) = written {
                    break 'run Err(e);
                }
            }
            next = requests.try_recv().ok();
        }
        let flushed = tokio::select! {
            result = writer.flush() => result,
            _ = shared.closed.notified() => break Ok(()),
        };
        if let Err(e) = flushed {
            break Err(e);
        }
    };

    match outcome {
        Ok(()) => shared.fail(Error::connection_closed("connection closed")),
        Err(e) => {
            warn!(connection_id = shared.id, error = %e, "write failed");
            shared.fail(Error::from(e));
        }
    }

    // Requests handed over before the failure still get the failure itself.
    requests.close();
    let failure = shared
        .slots()
        .failure
        .clone()
        .unwrap_or_else(|| Error::connection_closed("connection closed"));
    while let Ok(request) = requests.try_recv() {
        shared.stats.on_failed(1);
        let _ = request.completion.send(Err(failure.clone()));
    }

    let _ = writer.shutdown().await;
    reader_task.abort();
    debug!(connection_id = shared.id, "connection closed");
}

async fn read_loop<R>(mut reader: R, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let mut decoder = ReplyDecoder::new();

    let error = loop {
        if let Err(e) = drain_replies(&mut buf, &mut decoder, &shared) {
            break e;
        }
        if buf.capacity() - buf.len() < READ_BUFFER_SIZE / 4 {
            buf.reserve(READ_BUFFER_SIZE);
        }
        match reader.read_buf(&mut buf).await {
            Ok(0) if buf.is_empty() && !decoder.in_progress() => {
                break Error::connection_closed("connection closed by peer");
            }
            Ok(0) => {
                break Error::connection_closed("connection closed by peer mid-reply");
            }
            Ok(_) => {}
            Err(e) => break Error::from(e),
        }
    };

    if shared.slots().state == ConnectionState::Connected {
        warn!(connection_id = shared.id, error = %error, "read failed");
    }
    shared.fail(error);
}

fn drain_replies(
    buf: &mut BytesMut,
    decoder: &mut ReplyDecoder,
    shared: &Shared,
) -> Result<()> {
    loop {
        let (reply, used) = decoder.decode(buf)?;
        buf.advance(used);
        match reply {
            Some(reply) => shared.resolve(reply)?,
            None => return Ok(()),
        }
    }
}
