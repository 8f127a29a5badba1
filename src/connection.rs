//! Connection engine and client handle
//!
//! One spawned task per connection owns the socket, the parser, and the
//! dispatch registries; everything else talks to it through a mailbox. The
//! engine authenticates, routes replies to their waiters, background-job
//! results to their originators, and events to filtered subscribers, and
//! reconnects with bounded retries when the transport drops.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    command::{Command, EventFormat},
    constants::*,
    error::{EslError, EslResult},
    job::JobRegistry,
    packet::{Packet, PacketType},
    parser::PacketParser,
    subscriber::{EventFilter, SubscriberId, SubscriberRegistry},
};

fn default_max_retries() -> u32 {
    MAX_CONNECT_RETRIES
}

fn default_retry_interval_ms() -> u64 {
    RETRY_INTERVAL_MS
}

/// Engine configuration.
///
/// Deserializable so embedding applications can load it from their own
/// config files; the ready-notification channel is runtime-only.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Consecutive connect failures tolerated before the engine stops
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Pause between reconnect attempts
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// Receives `()` after every successful authentication
    #[serde(skip)]
    pub ready_tx: Option<mpsc::UnboundedSender<()>>,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
            max_retries: MAX_CONNECT_RETRIES,
            retry_interval_ms: RETRY_INTERVAL_MS,
            ready_tx: None,
        }
    }

    fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Why the engine reached its terminal state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The server rejected `auth`, or sent an unexpected packet during the
    /// handshake
    AuthFailed(String),
    /// Consecutive connect failures reached the retry limit
    MaxRetryExceeded,
    /// Explicit shutdown, or every client handle was dropped
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::AuthFailed(reason) => write!(f, "authentication failed: {}", reason),
            StopReason::MaxRetryExceeded => write!(f, "connect retry limit exceeded"),
            StopReason::Shutdown => write!(f, "shutdown requested"),
        }
    }
}

/// Connection state observable through [`EslClient::status`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Socket opening or open, authentication not finished
    Connecting,
    /// Authenticated and accepting commands
    Connected,
    /// Waiting out the retry interval after a failed connect
    Reconnecting { attempt: u32 },
    /// Terminal; the engine no longer accepts requests
    Stopped(StopReason),
}

/// Engine introspection counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    pub subscribers: usize,
    pub pending_jobs: usize,
    pub pending_replies: usize,
}

enum EngineRequest {
    Command {
        line: String,
        reply_tx: oneshot::Sender<EslResult<Packet>>,
    },
    Background {
        line: String,
        job_id: String,
        result_tx: oneshot::Sender<Packet>,
        ack_tx: oneshot::Sender<EslResult<()>>,
    },
    Subscribe {
        sender: mpsc::UnboundedSender<Arc<Packet>>,
        filter: EventFilter,
        id_tx: oneshot::Sender<SubscriberId>,
    },
    Unsubscribe {
        id: SubscriberId,
    },
    Stats {
        stats_tx: oneshot::Sender<EngineStats>,
    },
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connecting,
    Connected,
}

enum SessionEnd {
    /// Transport dropped; reconnect
    Lost,
    /// Unrecoverable; stop the engine
    Fatal(StopReason),
    /// Shutdown requested or all handles gone
    Shutdown,
}

struct Engine {
    config: ClientConfig,
    status_tx: watch::Sender<ConnectionStatus>,
    parser: PacketParser,
    pending_replies: VecDeque<oneshot::Sender<EslResult<Packet>>>,
    jobs: JobRegistry,
    subscribers: SubscriberRegistry,
    failure_count: u32,
}

impl Engine {
    async fn run(mut self, mut requests: mpsc::UnboundedReceiver<EngineRequest>) {
        loop {
            let stream = match self.establish(&mut requests).await {
                Ok(stream) => stream,
                Err(reason) => return self.finish(reason),
            };
            match self.session(stream, &mut requests).await {
                SessionEnd::Lost => {
                    info!("session lost, attempting reconnect");
                }
                SessionEnd::Fatal(reason) => return self.finish(reason),
                SessionEnd::Shutdown => return self.finish(StopReason::Shutdown),
            }
        }
    }

    /// Open the TCP connection, retrying until it succeeds, the retry
    /// budget is spent, or a shutdown arrives.
    async fn establish(
        &mut self,
        requests: &mut mpsc::UnboundedReceiver<EngineRequest>,
    ) -> Result<TcpStream, StopReason> {
        loop {
            self.publish(if self.failure_count == 0 {
                ConnectionStatus::Connecting
            } else {
                ConnectionStatus::Reconnecting {
                    attempt: self.failure_count,
                }
            });

            match TcpStream::connect((self.config.host.as_str(), self.config.port)).await {
                Ok(stream) => {
                    info!(
                        host = self.config.host.as_str(),
                        port = self.config.port,
                        "tcp connection established"
                    );
                    self.failure_count = 0;
                    return Ok(stream);
                }
                Err(error) => {
                    self.failure_count += 1;
                    warn!(
                        %error,
                        attempt = self.failure_count,
                        max = self.config.max_retries,
                        "connect attempt failed"
                    );
                    if self.failure_count >= self.config.max_retries {
                        return Err(StopReason::MaxRetryExceeded);
                    }
                    if !self.idle_wait(requests).await {
                        return Err(StopReason::Shutdown);
                    }
                }
            }
        }
    }

    /// Sleep out the retry interval while still answering the mailbox.
    /// Returns `false` when the engine should shut down instead.
    async fn idle_wait(&mut self, requests: &mut mpsc::UnboundedReceiver<EngineRequest>) -> bool {
        let wait = sleep(self.config.retry_interval());
        tokio::pin!(wait);
        loop {
            tokio::select! {
                _ = &mut wait => return true,
                request = requests.recv() => match request {
                    Some(request) => {
                        if !self.handle_disconnected_request(request) {
                            return false;
                        }
                    }
                    None => return false,
                },
            }
        }
    }

    /// Mailbox handling while no socket exists. Returns `false` on shutdown.
    fn handle_disconnected_request(&mut self, request: EngineRequest) -> bool {
        match request {
            EngineRequest::Command { reply_tx, .. } => {
                let _ = reply_tx.send(Err(EslError::NotConnected));
            }
            EngineRequest::Background { ack_tx, .. } => {
                let _ = ack_tx.send(Err(EslError::NotConnected));
            }
            EngineRequest::Subscribe {
                sender,
                filter,
                id_tx,
            } => {
                let id = self.subscribers.insert(sender, filter);
                let _ = id_tx.send(id);
            }
            EngineRequest::Unsubscribe { id } => {
                self.subscribers.remove(id);
            }
            EngineRequest::Stats { stats_tx } => {
                let _ = stats_tx.send(self.stats());
            }
            EngineRequest::Shutdown => return false,
        }
        true
    }

    /// Drive one authenticated session until the transport drops or the
    /// engine is told to stop.
    async fn session(
        &mut self,
        mut stream: TcpStream,
        requests: &mut mpsc::UnboundedReceiver<EngineRequest>,
    ) -> SessionEnd {
        self.parser.reset();
        let mut phase = Phase::Connecting;
        let mut auth_sent = false;
        let mut read_buf = vec![0u8; SOCKET_BUF_SIZE];

        loop {
            loop {
                match self.parser.next_packet() {
                    Ok(Some(packet)) => {
                        if let Some(end) = self
                            .on_packet(&mut stream, &mut phase, &mut auth_sent, packet)
                            .await
                        {
                            return end;
                        }
                    }
                    Ok(None) => break,
                    Err(error) => {
                        warn!(%error, "dropping desynced session");
                        return self.lose_session();
                    }
                }
            }

            tokio::select! {
                read = stream.read(&mut read_buf) => match read {
                    Ok(0) => {
                        info!("server closed the connection");
                        return self.lose_session();
                    }
                    Ok(n) => {
                        if let Err(error) = self.parser.feed(&read_buf[..n]) {
                            warn!(%error, "dropping desynced session");
                            return self.lose_session();
                        }
                    }
                    Err(error) => {
                        warn!(%error, "socket read failed");
                        return self.lose_session();
                    }
                },
                request = requests.recv() => match request {
                    Some(request) => {
                        if let Some(end) = self.on_request(&mut stream, phase, request).await {
                            return end;
                        }
                    }
                    None => return SessionEnd::Shutdown,
                },
            }
        }
    }

    async fn on_packet(
        &mut self,
        stream: &mut TcpStream,
        phase: &mut Phase,
        auth_sent: &mut bool,
        packet: Packet,
    ) -> Option<SessionEnd> {
        match *phase {
            Phase::Connecting => match &packet.packet_type {
                PacketType::AuthRequest if !*auth_sent => {
                    debug!("auth requested, sending credentials");
                    let line = Command::Auth {
                        password: self.config.password.clone(),
                    }
                    .to_wire_format();
                    if let Err(error) = stream.write_all(line.as_bytes()).await {
                        warn!(%error, "failed to write auth command");
                        return Some(self.lose_session());
                    }
                    *auth_sent = true;
                    None
                }
                PacketType::CommandReply if packet.success() => {
                    info!("authenticated");
                    *phase = Phase::Connected;
                    self.publish(ConnectionStatus::Connected);
                    if let Some(ready_tx) = &self.config.ready_tx {
                        let _ = ready_tx.send(());
                    }
                    None
                }
                PacketType::CommandReply => {
                    let reason = packet
                        .header(HEADER_REPLY_TEXT)
                        .unwrap_or("authentication rejected")
                        .to_string();
                    Some(SessionEnd::Fatal(StopReason::AuthFailed(reason)))
                }
                other => Some(SessionEnd::Fatal(StopReason::AuthFailed(format!(
                    "unexpected {} packet during handshake",
                    other
                )))),
            },
            Phase::Connected => {
                self.dispatch(packet);
                None
            }
        }
    }

    /// Route one inbound packet: synchronous reply waiter first, then the
    /// job registry, then event fan-out.
    fn dispatch(&mut self, packet: Packet) {
        if packet.packet_type.is_reply() && packet.job_uuid().is_none() {
            match self.pending_replies.pop_front() {
                Some(reply_tx) => {
                    if reply_tx.send(Ok(packet)).is_err() {
                        debug!("reply discarded, caller cancelled");
                    }
                }
                None => debug!("unsolicited reply dropped"),
            }
            return;
        }

        if let Some(job_id) = packet.job_uuid().map(str::to_owned) {
            if let Some(waiter) = self.jobs.resolve(&job_id) {
                debug!(job_id = job_id.as_str(), "routing background job result");
                if waiter.send(packet).is_err() {
                    debug!(job_id = job_id.as_str(), "job result discarded, caller gone");
                }
                return;
            }
            debug!(job_id = job_id.as_str(), "result for unknown job");
        }

        match &packet.packet_type {
            PacketType::Unknown(content_type) => {
                debug!(content_type = content_type.as_str(), "dropping unknown packet");
            }
            _ => {
                if packet.packet_type == PacketType::DisconnectNotice {
                    info!("disconnect notice received");
                }
                self.subscribers.dispatch(&Arc::new(packet));
            }
        }
    }

    async fn on_request(
        &mut self,
        stream: &mut TcpStream,
        phase: Phase,
        request: EngineRequest,
    ) -> Option<SessionEnd> {
        match request {
            EngineRequest::Command { line, reply_tx } => {
                if phase != Phase::Connected {
                    let _ = reply_tx.send(Err(EslError::NotConnected));
                    return None;
                }
                if let Err(error) = stream.write_all(line.as_bytes()).await {
                    warn!(%error, "socket write failed");
                    let _ = reply_tx.send(Err(EslError::ConnectionClosed));
                    return Some(self.lose_session());
                }
                self.pending_replies.push_back(reply_tx);
                None
            }
            EngineRequest::Background {
                line,
                job_id,
                result_tx,
                ack_tx,
            } => {
                if phase != Phase::Connected {
                    let _ = ack_tx.send(Err(EslError::NotConnected));
                    return None;
                }
                if let Err(error) = stream.write_all(line.as_bytes()).await {
                    warn!(%error, "socket write failed");
                    let _ = ack_tx.send(Err(EslError::ConnectionClosed));
                    return Some(self.lose_session());
                }
                self.jobs.register(job_id, result_tx);
                let _ = ack_tx.send(Ok(()));
                None
            }
            EngineRequest::Subscribe {
                sender,
                filter,
                id_tx,
            } => {
                let id = self.subscribers.insert(sender, filter);
                let _ = id_tx.send(id);
                None
            }
            EngineRequest::Unsubscribe { id } => {
                self.subscribers.remove(id);
                None
            }
            EngineRequest::Stats { stats_tx } => {
                let _ = stats_tx.send(self.stats());
                None
            }
            EngineRequest::Shutdown => Some(SessionEnd::Shutdown),
        }
    }

    /// Fail everything tied to the current session; subscriptions persist.
    fn lose_session(&mut self) -> SessionEnd {
        for reply_tx in self.pending_replies.drain(..) {
            let _ = reply_tx.send(Err(EslError::ConnectionClosed));
        }
        let abandoned = self.jobs.clear();
        if abandoned > 0 {
            debug!(abandoned, "background jobs abandoned on disconnect");
        }
        SessionEnd::Lost
    }

    fn finish(&mut self, reason: StopReason) {
        for reply_tx in self.pending_replies.drain(..) {
            let _ = reply_tx.send(Err(EslError::Stopped {
                reason: reason.clone(),
            }));
        }
        let abandoned = self.jobs.clear();
        if abandoned > 0 {
            debug!(abandoned, "background jobs abandoned at stop");
        }
        info!(%reason, "engine stopped");
        self.publish(ConnectionStatus::Stopped(reason));
    }

    fn publish(&self, status: ConnectionStatus) {
        let _ = self.status_tx.send(status);
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            subscribers: self.subscribers.len(),
            pending_jobs: self.jobs.len(),
            pending_replies: self.pending_replies.len(),
        }
    }
}

/// Handle to a running connection engine.
///
/// Cheap to clone; every clone talks to the same engine task. The engine
/// stops when [`shutdown`](Self::shutdown) is called or every handle is
/// dropped.
#[derive(Clone)]
pub struct EslClient {
    request_tx: mpsc::UnboundedSender<EngineRequest>,
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl EslClient {
    /// Spawn the engine and return immediately; it connects and
    /// authenticates in the background. Use [`wait_ready`](Self::wait_ready)
    /// or the config's `ready_tx` to learn when commands will be accepted.
    pub fn start(config: ClientConfig) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
        let engine = Engine {
            config,
            status_tx,
            parser: PacketParser::new(),
            pending_replies: VecDeque::new(),
            jobs: JobRegistry::new(),
            subscribers: SubscriberRegistry::new(),
            failure_count: 0,
        };
        tokio::spawn(engine.run(request_rx));
        Self {
            request_tx,
            status_rx,
        }
    }

    /// Start an engine with default retry settings and wait for the first
    /// successful authentication.
    pub async fn connect(host: &str, port: u16, password: &str) -> EslResult<Self> {
        let client = Self::start(ClientConfig::new(host, port, password));
        client.wait_ready().await?;
        Ok(client)
    }

    /// Wait until the engine is connected, or return the terminal error.
    pub async fn wait_ready(&self) -> EslResult<()> {
        let mut status_rx = self.status_rx.clone();
        loop {
            let status = status_rx.borrow_and_update().clone();
            match status {
                ConnectionStatus::Connected => return Ok(()),
                ConnectionStatus::Stopped(StopReason::AuthFailed(reason)) => {
                    return Err(EslError::auth_failed(reason))
                }
                ConnectionStatus::Stopped(reason) => return Err(EslError::Stopped { reason }),
                ConnectionStatus::Connecting | ConnectionStatus::Reconnecting { .. } => {}
            }
            if status_rx.changed().await.is_err() {
                return Err(EslError::ConnectionClosed);
            }
        }
    }

    /// Current engine state.
    pub fn status(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.status(), ConnectionStatus::Connected)
    }

    /// Ask the engine to stop. Idempotent; pending commands fail with
    /// [`EslError::Stopped`].
    pub fn shutdown(&self) {
        let _ = self.request_tx.send(EngineRequest::Shutdown);
    }

    /// Engine introspection counters.
    pub async fn stats(&self) -> EslResult<EngineStats> {
        let (stats_tx, stats_rx) = oneshot::channel();
        self.request_tx
            .send(EngineRequest::Stats { stats_tx })
            .map_err(|_| self.engine_gone())?;
        stats_rx.await.map_err(|_| self.engine_gone())
    }

    /// Send a formatted command and wait for the matching reply.
    ///
    /// The reply comes back as a value even when the server answered
    /// `-ERR`; inspect [`Packet::success`].
    pub async fn send_command(&self, command: Command) -> EslResult<Packet> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request_tx
            .send(EngineRequest::Command {
                line: command.to_wire_format(),
                reply_tx,
            })
            .map_err(|_| self.engine_gone())?;
        match reply_rx.await {
            Ok(reply) => reply,
            Err(_) => Err(self.engine_gone()),
        }
    }

    /// Execute an API command synchronously.
    pub async fn api(&self, command: &str, args: &str) -> EslResult<Packet> {
        self.send_command(Command::Api {
            command: command.to_string(),
            args: args.to_string(),
        })
        .await
    }

    /// Execute an API command in the background. Returns once the command
    /// is on the wire; the result arrives through the returned job handle.
    pub async fn bgapi(&self, command: &str, args: &str) -> EslResult<BackgroundJob> {
        let job_id = Uuid::new_v4().to_string();
        let line = Command::Bgapi {
            command: command.to_string(),
            args: args.to_string(),
            job_uuid: job_id.clone(),
        }
        .to_wire_format();

        let (result_tx, result_rx) = oneshot::channel();
        let (ack_tx, ack_rx) = oneshot::channel();
        self.request_tx
            .send(EngineRequest::Background {
                line,
                job_id: job_id.clone(),
                result_tx,
                ack_tx,
            })
            .map_err(|_| self.engine_gone())?;

        match ack_rx.await {
            Ok(Ok(())) => Ok(BackgroundJob { job_id, result_rx }),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(self.engine_gone()),
        }
    }

    /// Register a subscriber receiving every dispatched event.
    pub async fn start_listening(&self) -> EslResult<EventSubscription> {
        self.start_listening_with(|_| true).await
    }

    /// Register a subscriber with a filter predicate. Only packets the
    /// predicate accepts are delivered.
    pub async fn start_listening_with<F>(&self, filter: F) -> EslResult<EventSubscription>
    where
        F: Fn(&Packet) -> bool + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (id_tx, id_rx) = oneshot::channel();
        self.request_tx
            .send(EngineRequest::Subscribe {
                sender,
                filter: Arc::new(filter),
                id_tx,
            })
            .map_err(|_| self.engine_gone())?;
        let id = id_rx.await.map_err(|_| self.engine_gone())?;
        Ok(EventSubscription {
            id,
            receiver,
            request_tx: self.request_tx.clone(),
        })
    }

    /// `event <format> <list>` — subscribe server-side to an event list.
    pub async fn event(&self, format: EventFormat, events: &str) -> EslResult<Packet> {
        self.send_command(Command::Event {
            format,
            events: events.to_string(),
        })
        .await
    }

    /// `myevents <format> <uuid>` — restrict events to one channel.
    pub async fn myevents(&self, format: EventFormat, uuid: &str) -> EslResult<Packet> {
        self.send_command(Command::Myevents {
            format,
            uuid: uuid.to_string(),
        })
        .await
    }

    /// `divert_events on|off`.
    pub async fn divert_events(&self, enabled: bool) -> EslResult<Packet> {
        self.send_command(Command::DivertEvents { enabled }).await
    }

    /// `filter <header> <value>` — add a server-side event filter.
    pub async fn filter(&self, header: &str, value: &str) -> EslResult<Packet> {
        self.send_command(Command::Filter {
            header: header.to_string(),
            value: value.to_string(),
        })
        .await
    }

    /// `filter delete <header> <value>`.
    pub async fn filter_delete(&self, header: &str, value: &str) -> EslResult<Packet> {
        self.send_command(Command::FilterDelete {
            header: header.to_string(),
            value: value.to_string(),
        })
        .await
    }

    /// `sendevent <name>` with a header block and optional body.
    pub async fn sendevent(
        &self,
        name: &str,
        headers: IndexMap<String, String>,
        body: Option<String>,
    ) -> EslResult<Packet> {
        self.send_command(Command::SendEvent {
            name: name.to_string(),
            headers,
            body,
        })
        .await
    }

    /// `sendmsg [<uuid>]` with a header block and optional body.
    pub async fn sendmsg(
        &self,
        uuid: Option<&str>,
        headers: IndexMap<String, String>,
        body: Option<String>,
    ) -> EslResult<Packet> {
        self.send_command(Command::SendMsg {
            uuid: uuid.map(str::to_string),
            headers,
            body,
        })
        .await
    }

    pub async fn linger(&self) -> EslResult<Packet> {
        self.send_command(Command::Linger).await
    }

    pub async fn nolinger(&self) -> EslResult<Packet> {
        self.send_command(Command::Nolinger).await
    }

    /// `log <level>` — ask the server for log lines.
    pub async fn log(&self, level: &str) -> EslResult<Packet> {
        self.send_command(Command::Log {
            level: level.to_string(),
        })
        .await
    }

    pub async fn nolog(&self) -> EslResult<Packet> {
        self.send_command(Command::Nolog).await
    }

    /// `nixevent <list>` — unsubscribe from specific events.
    pub async fn nixevent(&self, events: &str) -> EslResult<Packet> {
        self.send_command(Command::Nixevent {
            events: events.to_string(),
        })
        .await
    }

    pub async fn noevents(&self) -> EslResult<Packet> {
        self.send_command(Command::Noevents).await
    }

    /// `exit` — ask the server to close the session. The engine treats the
    /// resulting close as a transport loss and reconnects; use
    /// [`shutdown`](Self::shutdown) to stop the engine itself.
    pub async fn exit(&self) -> EslResult<Packet> {
        self.send_command(Command::Exit).await
    }

    fn engine_gone(&self) -> EslError {
        match self.status() {
            ConnectionStatus::Stopped(reason) => EslError::Stopped { reason },
            _ => EslError::ConnectionClosed,
        }
    }
}

/// Pending `bgapi` result.
#[derive(Debug)]
pub struct BackgroundJob {
    job_id: String,
    result_rx: oneshot::Receiver<Packet>,
}

impl BackgroundJob {
    /// The client-generated identifier the server echoes in `Job-UUID`.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Wait for the result packet. Fails if the session was lost before
    /// the result arrived.
    pub async fn result(self) -> EslResult<Packet> {
        self.result_rx
            .await
            .map_err(|_| EslError::ConnectionClosed)
    }
}

/// Live event subscription. Dropping it unregisters the subscriber.
pub struct EventSubscription {
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<Arc<Packet>>,
    request_tx: mpsc::UnboundedSender<EngineRequest>,
}

impl EventSubscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event, in receive order. `None` once the engine has stopped.
    pub async fn recv(&mut self) -> Option<Arc<Packet>> {
        self.receiver.recv().await
    }

    /// Unregister. Equivalent to dropping the subscription.
    pub fn stop(self) {}
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        let _ = self.request_tx.send(EngineRequest::Unsubscribe { id: self.id });
    }
}
