//! Client for the hint-service websocket.
//!
//! One supervisor task owns the socket for the life of the connection. It
//! multiplexes queued outbound frames and inbound reads with `select!`, and
//! when the connection drops it either stops (the default) or runs the
//! configured backoff schedule, reusing the same outbound queue so callers
//! keep their handle across reconnects. Lifecycle transitions and parsed
//! inbound frames fan out over a broadcast channel.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::protocol::{self, InboundMessage, OutboundMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type EventTx = broadcast::Sender<ChannelEvent>;
/// Receiver half handed to subscribers of [`HintClient::events`].
pub type EventRx = broadcast::Receiver<ChannelEvent>;
type SharedState = Arc<Mutex<ConnectionState>>;

/// Capacity of the outbound queue and the event fan-out.
const DEFAULT_CAPACITY: usize = 1024;

/// Where the connection currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected (or the last connect attempt failed outright).
    Idle,
    Open,
    /// Lost the socket; the backoff schedule is running.
    Reconnecting,
    /// Lost or closed the socket with no retry pending.
    Disconnected,
}

/// Lifecycle transitions and inbound traffic, in arrival order.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The websocket handshake completed (fires again after a reconnect).
    Opened,
    /// A frame arrived and was parsed.
    Message(InboundMessage),
    /// The transport failed on a live connection. A `Closed` follows; a
    /// clean close raises no `Error`.
    Error(String),
    /// The connection went away; `reason` carries the close frame's text if
    /// the peer sent one.
    Closed { reason: Option<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("hint channel is not connected")]
    NotConnected,
    #[error("hint channel is already connected")]
    AlreadyConnected,
    #[error("websocket handshake with hint service failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to serialize outbound frame: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What to do when an established connection drops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Stay down until `connect` is called again.
    #[default]
    None,
    /// Retry on a doubling delay schedule.
    Backoff(Backoff),
}

/// Shape of the retry schedule: `initial`, then doubling per attempt, capped
/// at `max`, giving up after `max_attempts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub max_attempts: u32,
}

impl Backoff {
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Connection settings for [`HintClient`].
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub endpoint: String,
    pub reconnect: ReconnectPolicy,
    pub capacity: usize,
}

impl ChannelConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect: ReconnectPolicy::default(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Handle to one hint-service connection.
///
/// [`close`](Self::close) or dropping the client disposes of it: the
/// supervisor notices the outbound queue closing, performs the websocket
/// close handshake and ends.
pub struct HintClient {
    config: ChannelConfig,
    out_tx: Option<mpsc::Sender<String>>,
    events: EventTx,
    state: SharedState,
}

impl HintClient {
    /// Creates an unconnected client. The event channel exists from here on,
    /// so subscriptions taken before [`connect`](Self::connect) observe the
    /// first `Opened`.
    pub fn new(config: ChannelConfig) -> Self {
        let (events, _) = broadcast::channel(config.capacity);
        Self {
            config,
            out_tx: None,
            events,
            state: Arc::new(Mutex::new(ConnectionState::Idle)),
        }
    }

    /// Performs the websocket handshake and starts the supervisor task.
    ///
    /// On failure the client stays unconnected and `connect` may be called
    /// again; an already-live connection is refused instead of replaced.
    pub async fn connect(&mut self) -> Result<(), ChannelError> {
        match self.state() {
            ConnectionState::Open | ConnectionState::Reconnecting => {
                return Err(ChannelError::AlreadyConnected);
            }
            ConnectionState::Idle | ConnectionState::Disconnected => {}
        }

        let (ws, _) = connect_async(&self.config.endpoint).await?;
        tracing::info!("connected to hint service at {}", self.config.endpoint);

        set_state(&self.state, ConnectionState::Open);
        self.emit(ChannelEvent::Opened);

        let (out_tx, out_rx) = mpsc::channel(self.config.capacity);
        self.out_tx = Some(out_tx);

        tokio::spawn(supervise(
            ws,
            out_rx,
            self.events.clone(),
            self.state.clone(),
            self.config.reconnect.clone(),
            self.config.endpoint.clone(),
        ));
        Ok(())
    }

    /// Queues one frame for the socket writer. Fails fast with
    /// [`ChannelError::NotConnected`] unless the connection is open right
    /// now; nothing is buffered for later.
    pub async fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError> {
        if self.state() != ConnectionState::Open {
            return Err(ChannelError::NotConnected);
        }
        let frame = serde_json::to_string(message)?;
        match &self.out_tx {
            Some(out_tx) => out_tx.send(frame).await.map_err(|_| ChannelError::NotConnected),
            None => Err(ChannelError::NotConnected),
        }
    }

    /// Starts a graceful local shutdown. The supervisor finishes any queued
    /// frames, runs the websocket close handshake and emits `Closed`; watch
    /// the event stream to observe completion. Calling this twice, or on a
    /// client that never connected, is a no-op. Dropping the client does the
    /// same thing.
    pub fn close(&mut self) {
        self.out_tx = None;
    }

    /// Subscribes to lifecycle events and inbound frames. Each subscriber
    /// gets every event from the point of subscription on.
    pub fn events(&self) -> EventRx {
        self.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        // A poisoned lock means the supervisor panicked; report the
        // connection as gone rather than propagating the panic.
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(ConnectionState::Disconnected)
    }

    fn emit(&self, event: ChannelEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("no subscribers for channel event");
        }
    }
}

/// How one spin of the socket loop ended.
enum ConnectionEnd {
    /// The client handle was dropped; we closed the socket ourselves.
    LocalShutdown,
    /// The peer closed or the transport failed.
    Dropped { reason: Option<String> },
}

async fn supervise(
    mut ws: WsStream,
    mut out_rx: mpsc::Receiver<String>,
    events: EventTx,
    state: SharedState,
    policy: ReconnectPolicy,
    endpoint: String,
) {
    loop {
        let end = drive(ws, &mut out_rx, &events).await;
        let reason = match end {
            ConnectionEnd::LocalShutdown => {
                set_state(&state, ConnectionState::Disconnected);
                emit(&events, ChannelEvent::Closed { reason: None });
                return;
            }
            ConnectionEnd::Dropped { reason } => reason,
        };

        match &policy {
            ReconnectPolicy::None => {
                set_state(&state, ConnectionState::Disconnected);
                emit(&events, ChannelEvent::Closed { reason });
                return;
            }
            ReconnectPolicy::Backoff(backoff) => {
                set_state(&state, ConnectionState::Reconnecting);
                emit(&events, ChannelEvent::Closed { reason });
                match reestablish(&endpoint, backoff).await {
                    Some(fresh) => {
                        set_state(&state, ConnectionState::Open);
                        emit(&events, ChannelEvent::Opened);
                        ws = fresh;
                    }
                    None => {
                        set_state(&state, ConnectionState::Disconnected);
                        return;
                    }
                }
            }
        }
    }
}

/// Runs one established connection until it ends, pumping queued outbound
/// frames into the writer and parsed inbound frames out to subscribers.
async fn drive(ws: WsStream, out_rx: &mut mpsc::Receiver<String>, events: &EventTx) -> ConnectionEnd {
    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            queued = out_rx.recv() => match queued {
                Some(frame) => {
                    if let Err(e) = write.send(Message::Text(frame)).await {
                        tracing::error!("failed to send frame to hint service: {e}");
                        emit(events, ChannelEvent::Error(e.to_string()));
                        return ConnectionEnd::Dropped { reason: Some(e.to_string()) };
                    }
                }
                None => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        tracing::debug!("close handshake failed: {e}");
                    }
                    return ConnectionEnd::LocalShutdown;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    emit(events, ChannelEvent::Message(protocol::parse_inbound(&text)));
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                    return ConnectionEnd::Dropped { reason };
                }
                Some(Ok(Message::Binary(bytes))) => {
                    tracing::warn!("ignoring unexpected binary frame ({} bytes)", bytes.len());
                }
                // Pings are answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!("failed to read from hint service: {e}");
                    emit(events, ChannelEvent::Error(e.to_string()));
                    return ConnectionEnd::Dropped { reason: Some(e.to_string()) };
                }
                None => return ConnectionEnd::Dropped { reason: None },
            },
        }
    }
}

/// Walks the backoff schedule until a handshake succeeds or attempts run
/// out.
async fn reestablish(endpoint: &str, backoff: &Backoff) -> Option<WsStream> {
    for attempt in 0..backoff.max_attempts {
        let delay = backoff.delay_for(attempt);
        tracing::info!(
            "reconnecting to hint service in {delay:?} (attempt {}/{})",
            attempt + 1,
            backoff.max_attempts
        );
        tokio::time::sleep(delay).await;
        match connect_async(endpoint).await {
            Ok((ws, _)) => {
                tracing::info!("reconnected to hint service");
                return Some(ws);
            }
            Err(e) => tracing::warn!("reconnect attempt {} failed: {e}", attempt + 1),
        }
    }
    tracing::error!(
        "giving up on hint service after {} reconnect attempts",
        backoff.max_attempts
    );
    None
}

fn set_state(state: &SharedState, value: ConnectionState) {
    match state.lock() {
        Ok(mut guard) => *guard = value,
        Err(_) => tracing::error!("connection state lock poisoned"),
    }
}

fn emit(events: &EventTx, event: ChannelEvent) {
    if events.send(event).is_err() {
        tracing::debug!("no subscribers for channel event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};

    #[test]
    fn backoff_doubles_and_clamps() {
        let backoff = Backoff {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(4),
            max_attempts: 10,
        };
        assert_eq!(backoff.delay_for(0), Duration::from_millis(500));
        assert_eq!(backoff.delay_for(1), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(9), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn send_requires_an_open_connection() {
        let client = HintClient::new(ChannelConfig::new("ws://127.0.0.1:9"));
        assert_eq!(client.state(), ConnectionState::Idle);
        let err = client
            .send(&OutboundMessage::Chat("hi".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConnected));
    }

    #[tokio::test]
    async fn connect_failure_leaves_the_client_idle() {
        // Bind then drop so the port is known to refuse connections.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut client = HintClient::new(ChannelConfig::new(format!("ws://{addr}")));
        assert!(matches!(client.connect().await, Err(ChannelError::Connect(_))));
        assert_eq!(client.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn round_trips_frames_with_a_live_socket() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let frame = match ws.next().await {
                Some(Ok(Message::Text(text))) => text,
                other => panic!("expected a text frame, got {other:?}"),
            };
            let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(parsed["type"], "problem_description");
            assert_eq!(parsed["content"], "Two Sum");
            ws.send(Message::Text(
                r#"{"type": "system", "message": "hello"}"#.into(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        });

        let mut client = HintClient::new(ChannelConfig::new(format!("ws://{addr}")));
        let mut events = client.events();
        client.connect().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Open);
        assert!(matches!(events.recv().await.unwrap(), ChannelEvent::Opened));

        client
            .send(&OutboundMessage::ProblemDescription("Two Sum".into()))
            .await
            .unwrap();

        match events.recv().await.unwrap() {
            ChannelEvent::Message(InboundMessage::System { message, .. }) => {
                assert_eq!(message, "hello");
            }
            other => panic!("expected the greeting frame, got {other:?}"),
        }
        assert!(matches!(
            events.recv().await.unwrap(),
            ChannelEvent::Closed { .. }
        ));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(matches!(
            client.send(&OutboundMessage::Chat("late".into())).await,
            Err(ChannelError::NotConnected)
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn reconnects_after_a_dropped_connection() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            // First connection: accept, then drop the socket outright.
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            drop(ws);
            // Second connection: greet, then hold the socket until the
            // client goes away.
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(
                r#"{"type": "system", "message": "back"}"#.into(),
            ))
            .await
            .unwrap();
            while let Some(Ok(message)) = ws.next().await {
                if matches!(message, Message::Close(_)) {
                    break;
                }
            }
        });

        let config =
            ChannelConfig::new(format!("ws://{addr}")).with_reconnect(ReconnectPolicy::Backoff(Backoff {
                initial: Duration::from_millis(10),
                max: Duration::from_millis(10),
                max_attempts: 5,
            }));
        let mut client = HintClient::new(config);
        let mut events = client.events();
        client.connect().await.unwrap();

        assert!(matches!(events.recv().await.unwrap(), ChannelEvent::Opened));
        // An abrupt drop raises a transport error and then the close.
        assert!(matches!(events.recv().await.unwrap(), ChannelEvent::Error(_)));
        assert!(matches!(
            events.recv().await.unwrap(),
            ChannelEvent::Closed { .. }
        ));
        assert!(matches!(events.recv().await.unwrap(), ChannelEvent::Opened));
        match events.recv().await.unwrap() {
            ChannelEvent::Message(InboundMessage::System { message, .. }) => {
                assert_eq!(message, "back");
            }
            other => panic!("expected the greeting after reconnect, got {other:?}"),
        }
        assert_eq!(client.state(), ConnectionState::Open);

        client.close();
        assert!(matches!(
            events.recv().await.unwrap(),
            ChannelEvent::Closed { reason: None }
        ));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        server.await.unwrap();
    }
}
