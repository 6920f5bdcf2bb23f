//! The connection manager: owns the one logical connection to the relay.
//!
//! All connection state lives inside a single spawned task; the
//! [`ConnectionManager`] handle is a cheap clone that talks to it over a
//! command channel. Observers watch status through a [`watch`] channel
//! and receive inbound envelopes through a [`broadcast`] channel, so no
//! caller ever touches the socket directly.
//!
//! A lost connection is never fatal: the task reschedules itself with
//! the configured backoff and keeps trying until an explicit disconnect
//! or until the last handle is dropped.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use classline_protocol::{Codec, Envelope, JsonCodec};
use classline_transport::{Connection, Connector, TransportError};

use crate::{ClasslineError, ReconnectConfig};

const COMMAND_BUFFER: usize = 32;
const INBOUND_BUFFER: usize = 256;

/// Lifecycle state of the logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport, and no attempt in flight.
    Closed,
    /// A connect attempt is in flight.
    Connecting,
    /// The transport is up; sends are accepted.
    Open,
    /// An orderly shutdown is in progress.
    Closing,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
        };
        f.write_str(s)
    }
}

/// A point-in-time view of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Consecutive failed attempts since the last successful open.
    pub retry_count: u32,
}

enum Command {
    Connect {
        endpoint: String,
        done: oneshot::Sender<()>,
    },
    Disconnect {
        done: oneshot::Sender<()>,
    },
    Send {
        envelope: Envelope,
        reply: oneshot::Sender<Result<(), ClasslineError>>,
    },
}

/// What the reader task reports back to the actor.
///
/// Events are stamped with the generation of the connection they came
/// from; the actor drops anything from a superseded generation, so a
/// reader that lingers past its connection cannot corrupt state.
enum ConnEvent {
    Inbound { generation: u64, data: Vec<u8> },
    Dropped {
        generation: u64,
        error: Option<TransportError>,
    },
}

/// Handle to the connection task. Clone freely.
#[derive(Clone)]
pub struct ConnectionManager {
    commands: mpsc::Sender<Command>,
    status_rx: watch::Receiver<ConnectionStatus>,
    inbound_tx: broadcast::Sender<Envelope>,
}

impl ConnectionManager {
    /// Spawns the connection task and returns its handle.
    ///
    /// The task starts in [`ConnectionState::Closed`] and does nothing
    /// until [`connect`](Self::connect) is called. It shuts down, closing
    /// any open transport, when every handle has been dropped.
    pub fn spawn<C: Connector>(connector: C, config: ReconnectConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus {
            state: ConnectionState::Closed,
            retry_count: 0,
        });
        let (inbound_tx, _) = broadcast::channel(INBOUND_BUFFER);
        let (event_tx, events) = mpsc::unbounded_channel();

        let actor = ManagerActor {
            connector,
            codec: JsonCodec,
            config: config.validated(),
            endpoint: None,
            conn: None,
            reader: None,
            generation: 0,
            retry_count: 0,
            reconnect_at: None,
            status_tx,
            inbound_tx: inbound_tx.clone(),
            commands: commands_rx,
            events,
            event_tx,
        };
        tokio::spawn(actor.run());

        Self {
            commands: commands_tx,
            status_rx,
            inbound_tx,
        }
    }

    /// Starts connecting to `endpoint`.
    ///
    /// Resolves once the first attempt has finished, whether it opened
    /// the transport or scheduled a retry; either way the manager now
    /// owns the endpoint and keeps pursuing it. Ignored if a connection
    /// is already open or in flight.
    pub async fn connect(
        &self,
        endpoint: impl Into<String>,
    ) -> Result<(), ClasslineError> {
        let (done, done_rx) = oneshot::channel();
        self.commands
            .send(Command::Connect {
                endpoint: endpoint.into(),
                done,
            })
            .await
            .map_err(|_| ClasslineError::ManagerStopped)?;
        done_rx.await.map_err(|_| ClasslineError::ManagerStopped)
    }

    /// Closes the connection and cancels any pending reconnect.
    ///
    /// Idempotent; disconnecting an already-closed manager is a no-op.
    pub async fn disconnect(&self) -> Result<(), ClasslineError> {
        let (done, done_rx) = oneshot::channel();
        self.commands
            .send(Command::Disconnect { done })
            .await
            .map_err(|_| ClasslineError::ManagerStopped)?;
        done_rx.await.map_err(|_| ClasslineError::ManagerStopped)
    }

    /// Sends one envelope over the open connection.
    ///
    /// Fails with [`ClasslineError::NotConnected`] when no connection is
    /// open; nothing is queued for later.
    pub async fn send(&self, envelope: Envelope) -> Result<(), ClasslineError> {
        let (reply, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Send { envelope, reply })
            .await
            .map_err(|_| ClasslineError::ManagerStopped)?;
        reply_rx.await.map_err(|_| ClasslineError::ManagerStopped)?
    }

    /// The current status snapshot.
    pub fn status(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    /// A receiver that yields every status change.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// Subscribes to decoded inbound envelopes.
    ///
    /// Every subscriber sees every envelope; a subscriber that falls
    /// more than the buffer behind observes a lag error, not blocked
    /// ingestion.
    pub fn inbound(&self) -> broadcast::Receiver<Envelope> {
        self.inbound_tx.subscribe()
    }
}

struct ManagerActor<C: Connector> {
    connector: C,
    codec: JsonCodec,
    config: ReconnectConfig,
    endpoint: Option<String>,
    conn: Option<Arc<C::Connection>>,
    reader: Option<JoinHandle<()>>,
    generation: u64,
    retry_count: u32,
    reconnect_at: Option<Instant>,
    status_tx: watch::Sender<ConnectionStatus>,
    inbound_tx: broadcast::Sender<Envelope>,
    commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedReceiver<ConnEvent>,
    // Kept so the events channel never closes between connections.
    event_tx: mpsc::UnboundedSender<ConnEvent>,
}

impl<C: Connector> ManagerActor<C> {
    async fn run(mut self) {
        loop {
            let deadline = self.reconnect_at;
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    // Last handle dropped.
                    None => break,
                },
                Some(event) = self.events.recv() => self.handle_event(event),
                _ = tokio::time::sleep_until(
                    deadline.unwrap_or_else(Instant::now)
                ), if deadline.is_some() => {
                    self.reconnect_at = None;
                    self.attempt_connect().await;
                }
            }
        }
        self.teardown().await;
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { endpoint, done } => {
                let state = self.status_tx.borrow().state;
                if matches!(
                    state,
                    ConnectionState::Connecting | ConnectionState::Open
                ) {
                    tracing::debug!(%state, "connect ignored, already active");
                } else {
                    self.endpoint = Some(endpoint);
                    self.reconnect_at = None;
                    self.retry_count = 0;
                    self.attempt_connect().await;
                }
                let _ = done.send(());
            }
            Command::Disconnect { done } => {
                self.disconnect().await;
                let _ = done.send(());
            }
            Command::Send { envelope, reply } => {
                let _ = reply.send(self.send_envelope(envelope).await);
            }
        }
    }

    async fn attempt_connect(&mut self) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };
        self.set_status(ConnectionState::Connecting);
        tracing::debug!(
            %endpoint,
            attempt = self.retry_count + 1,
            "connecting"
        );
        match self.connector.connect(&endpoint).await {
            Ok(conn) => {
                self.retry_count = 0;
                self.generation += 1;
                let conn = Arc::new(conn);
                self.spawn_reader(Arc::clone(&conn));
                self.conn = Some(conn);
                self.set_status(ConnectionState::Open);
                tracing::info!(%endpoint, "connection open");
            }
            Err(e) => {
                self.retry_count += 1;
                tracing::warn!(
                    %endpoint,
                    error = %e,
                    retry_count = self.retry_count,
                    "connect failed"
                );
                self.set_status(ConnectionState::Closed);
                self.schedule_reconnect();
            }
        }
    }

    fn spawn_reader(&mut self, conn: Arc<C::Connection>) {
        let generation = self.generation;
        let events = self.event_tx.clone();
        self.reader = Some(tokio::spawn(async move {
            loop {
                match conn.recv().await {
                    Ok(Some(data)) => {
                        if events
                            .send(ConnEvent::Inbound { generation, data })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Ok(None) => {
                        let _ = events
                            .send(ConnEvent::Dropped { generation, error: None });
                        break;
                    }
                    Err(e) => {
                        let _ = events.send(ConnEvent::Dropped {
                            generation,
                            error: Some(e),
                        });
                        break;
                    }
                }
            }
        }));
    }

    fn handle_event(&mut self, event: ConnEvent) {
        match event {
            ConnEvent::Inbound { generation, data } => {
                if generation != self.generation {
                    return;
                }
                match self.codec.decode::<Envelope>(&data) {
                    // A send error only means nobody is subscribed.
                    Ok(envelope) => {
                        let _ = self.inbound_tx.send(envelope);
                    }
                    Err(e) => {
                        tracing::debug!(
                            error = %e,
                            "dropping undecodable frame"
                        );
                    }
                }
            }
            ConnEvent::Dropped { generation, error } => {
                if generation != self.generation {
                    return;
                }
                match &error {
                    Some(e) => {
                        tracing::warn!(error = %e, "connection dropped")
                    }
                    None => tracing::info!("connection closed by peer"),
                }
                self.retry_count += 1;
                self.conn = None;
                self.reader = None;
                self.set_status(ConnectionState::Closed);
                self.schedule_reconnect();
            }
        }
    }

    async fn send_envelope(
        &mut self,
        envelope: Envelope,
    ) -> Result<(), ClasslineError> {
        let Some(conn) = self.conn.as_ref().map(Arc::clone) else {
            return Err(ClasslineError::NotConnected);
        };
        let bytes = self.codec.encode(&envelope)?;
        if let Err(e) = conn.send(&bytes).await {
            // The transport is gone; don't wait for the reader to notice.
            tracing::warn!(error = %e, "send failed, dropping connection");
            self.retry_count += 1;
            self.generation += 1;
            if let Some(reader) = self.reader.take() {
                reader.abort();
            }
            self.conn = None;
            self.set_status(ConnectionState::Closed);
            self.schedule_reconnect();
            return Err(ClasslineError::Transport(e));
        }
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.reconnect_at = None;
        self.endpoint = None;
        self.retry_count = 0;
        // Events from the old reader are stale from here on.
        self.generation += 1;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(conn) = self.conn.take() {
            self.set_status(ConnectionState::Closing);
            if let Err(e) = conn.close().await {
                tracing::debug!(error = %e, "close failed during disconnect");
            }
            tracing::info!("disconnected");
        }
        self.set_status(ConnectionState::Closed);
    }

    fn schedule_reconnect(&mut self) {
        // Every caller has already counted the failure, so the count is
        // at least 1 here.
        let delay = self.config.delay_for(self.retry_count);
        self.reconnect_at = Some(Instant::now() + delay);
        tracing::debug!(
            delay_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );
    }

    fn set_status(&self, state: ConnectionState) {
        let _ = self.status_tx.send(ConnectionStatus {
            state,
            retry_count: self.retry_count,
        });
    }

    async fn teardown(&mut self) {
        self.reconnect_at = None;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(conn) = self.conn.take() {
            let _ = conn.close().await;
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
