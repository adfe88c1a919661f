//! Live push channel to the board backend.
//!
//! The backend emits `tasksUpdated` over Socket.IO after every persisted
//! mutation. [`PushChannel`] keeps a WebSocket open to that endpoint and
//! turns each notification into [`BoardEvent::Invalidate`] on the event bus;
//! it never carries task data itself.
//!
//! Lost connections are re-established with exponential backoff. Each
//! successful reconnect publishes one extra invalidation, since
//! notifications sent while disconnected are gone.
//!
//! [`BoardEvent::Invalidate`]: crate::events::BoardEvent::Invalidate

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use taskboard_proto::push::{
    self, DEFAULT_NAMESPACE, PushFrame, SOCKET_IO_PATH, SOCKET_IO_QUERY,
};

use crate::config::ReconnectConfig;
use crate::events::{EventBus, InvalidationSource};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSender = futures_util::stream::SplitSink<WsStream, Message>;
type WsReader = futures_util::stream::SplitStream<WsStream>;

/// Default timeout for the WebSocket connect plus Socket.IO handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from establishing the push connection.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The configured URL cannot address a Socket.IO endpoint.
    #[error("invalid push url {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Connect or handshake did not finish in time.
    #[error("push connection timed out")]
    Timeout,

    /// Nothing is listening at the push URL.
    #[error("push server unreachable: {0}")]
    Unreachable(String),

    /// WebSocket-level failure.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// The server refused or botched the Socket.IO handshake.
    #[error("socket.io handshake failed: {0}")]
    Handshake(String),

    /// The server closed the connection.
    #[error("push connection closed")]
    ConnectionClosed,
}

/// Connection settings for [`PushChannel`].
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Backend URL; `http`/`https` are mapped to `ws`/`wss`.
    pub url: String,
    /// Limit for connect plus handshake, per attempt.
    pub connect_timeout: Duration,
    /// Backoff applied after the connection drops.
    pub reconnect: ReconnectConfig,
}

impl PushConfig {
    /// Settings for `url` with default timeout and backoff.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Builds the Socket.IO WebSocket URL for a backend address.
///
/// `http://host:5000` becomes
/// `ws://host:5000/socket.io/?EIO=4&transport=websocket`. An explicit path
/// or query is kept as given.
///
/// # Errors
///
/// Returns [`PushError::InvalidUrl`] for unparseable URLs or schemes other
/// than `http`, `https`, `ws` and `wss`.
pub fn socket_io_url(raw: &str) -> Result<Url, PushError> {
    let invalid = |reason: &str| PushError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let mut url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid("scheme must be http, https, ws or wss")),
    };
    url.set_scheme(scheme)
        .map_err(|()| invalid("cannot switch to a websocket scheme"))?;

    if url.path().is_empty() || url.path() == "/" {
        url.set_path(SOCKET_IO_PATH);
    }
    if url.query().is_none() {
        url.set_query(Some(SOCKET_IO_QUERY));
    }
    Ok(url)
}

/// Handle to the background push connection.
///
/// Dropping the handle also stops the connection, at the next frame or
/// backoff tick.
#[derive(Debug)]
pub struct PushChannel {
    url: Url,
    connected: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    supervisor: tokio::task::JoinHandle<()>,
}

impl PushChannel {
    /// Connects, joins the default namespace and starts relaying
    /// notifications to `bus`.
    ///
    /// The first connection must succeed; later drops are retried in the
    /// background according to `config.reconnect`.
    ///
    /// # Errors
    ///
    /// Returns [`PushError`] if the URL is invalid or the first connect or
    /// handshake fails.
    pub async fn connect(config: &PushConfig, bus: EventBus) -> Result<Self, PushError> {
        let url = socket_io_url(&config.url)?;
        let conn = open(&url, config.connect_timeout).await?;

        let connected = Arc::new(AtomicBool::new(true));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let supervisor = tokio::spawn(supervise(
            Supervisor {
                url: url.clone(),
                connect_timeout: config.connect_timeout,
                reconnect: config.reconnect.clone(),
                bus,
                connected: Arc::clone(&connected),
                shutdown: shutdown_rx,
            },
            conn,
        ));

        Ok(Self {
            url,
            connected,
            shutdown,
            supervisor,
        })
    }

    /// The resolved Socket.IO URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Whether a connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Whether the background task has given up or been stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }

    /// Stops the channel and waits for the background task to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.supervisor.await {
            tracing::warn!(err = %e, "push supervisor task failed");
        }
        tracing::info!("push channel stopped");
    }
}

/// An open, handshaken connection.
struct Connection {
    sender: WsSender,
    reader: WsReader,
    /// How long the server may stay silent before the link counts as dead.
    liveness: Option<Duration>,
}

struct Supervisor {
    url: Url,
    connect_timeout: Duration,
    reconnect: ReconnectConfig,
    bus: EventBus,
    connected: Arc<AtomicBool>,
    shutdown: watch::Receiver<bool>,
}

enum SessionEnd {
    Shutdown,
    Lost,
}

async fn supervise(mut sup: Supervisor, first: Connection) {
    let mut conn = first;
    loop {
        let end = run_session(conn, &sup.bus, &mut sup.shutdown).await;
        sup.connected.store(false, Ordering::Relaxed);
        if matches!(end, SessionEnd::Shutdown) {
            break;
        }

        let Some(next) = reconnect(&mut sup).await else {
            break;
        };
        sup.connected.store(true, Ordering::Relaxed);
        // Anything emitted while we were away is lost; refetch once.
        sup.bus.invalidate(InvalidationSource::Startup);
        conn = next;
    }
    tracing::debug!("push supervisor exiting");
}

/// Retries until connected, shut down, or out of attempts.
async fn reconnect(sup: &mut Supervisor) -> Option<Connection> {
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        if sup
            .reconnect
            .max_attempts
            .is_some_and(|max| attempt > max)
        {
            tracing::warn!(
                attempts = attempt - 1,
                "push reconnect attempts exhausted, giving up"
            );
            return None;
        }

        let delay = sup.reconnect.delay_for(attempt);
        tracing::info!(attempt, ?delay, "push reconnecting");
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = wait_for_shutdown(&mut sup.shutdown) => return None,
        }

        match open(&sup.url, sup.connect_timeout).await {
            Ok(conn) => {
                tracing::info!(attempt, url = %sup.url, "push channel reconnected");
                return Some(conn);
            }
            Err(e) => {
                tracing::warn!(attempt, err = %e, "push reconnect failed");
            }
        }
    }
}

/// Resolves once shutdown is requested or the handle is dropped.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Reads frames until the connection ends, answering pings and publishing
/// invalidations.
async fn run_session(
    conn: Connection,
    bus: &EventBus,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let Connection {
        mut sender,
        mut reader,
        liveness,
    } = conn;

    loop {
        let next = tokio::select! {
            () = wait_for_shutdown(shutdown) => {
                let _ = sender.send(text(&PushFrame::Close)).await;
                let _ = sender.close().await;
                return SessionEnd::Shutdown;
            }
            next = next_message(&mut reader, liveness) => next,
        };

        let frame = match next {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(err = %e, "push connection lost");
                return SessionEnd::Lost;
            }
        };

        match frame {
            PushFrame::Ping => {
                if let Err(e) = sender.send(text(&PushFrame::Pong)).await {
                    tracing::warn!(err = %e, "failed to answer push ping");
                    return SessionEnd::Lost;
                }
            }
            ref event if event.is_tasks_updated() => {
                tracing::debug!("tasksUpdated received");
                bus.invalidate(InvalidationSource::Push);
            }
            PushFrame::Event { name, .. } => {
                tracing::debug!(event = %name, "ignoring push event");
            }
            PushFrame::Close | PushFrame::Disconnect { .. } => {
                tracing::info!("push server closed the session");
                return SessionEnd::Lost;
            }
            other => {
                tracing::trace!(?other, "push frame");
            }
        }
    }
}

/// Reads one frame. `Ok(None)` means "nothing to act on" (control frames,
/// malformed text); an error means the connection is gone.
async fn next_message(
    reader: &mut WsReader,
    liveness: Option<Duration>,
) -> Result<Option<PushFrame>, PushError> {
    let msg = match liveness {
        Some(limit) => tokio::time::timeout(limit, reader.next())
            .await
            .map_err(|_| PushError::Timeout)?,
        None => reader.next().await,
    };

    match msg {
        Some(Ok(Message::Text(body))) => match push::decode_frame(body.as_str()) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                tracing::warn!(err = %e, "malformed push frame, skipping");
                Ok(None)
            }
        },
        Some(Ok(Message::Close(_))) | None => Err(PushError::ConnectionClosed),
        Some(Ok(_)) => Ok(None),
        Some(Err(e)) => Err(PushError::WebSocket(e.to_string())),
    }
}

fn text(frame: &PushFrame) -> Message {
    Message::text(push::encode_frame(frame))
}

/// Connects and completes the Engine.IO open plus Socket.IO namespace join.
async fn open(url: &Url, timeout: Duration) -> Result<Connection, PushError> {
    tokio::time::timeout(timeout, handshake(url))
        .await
        .map_err(|_| {
            tracing::warn!(url = %url, "push connect timed out");
            PushError::Timeout
        })?
}

async fn handshake(url: &Url) -> Result<Connection, PushError> {
    let (ws_stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
        tracing::warn!(url = %url, err = %e, "push WebSocket connect failed");
        map_ws_connect_error(e)
    })?;
    let (mut sender, mut reader) = ws_stream.split();

    let mut liveness = None;
    let mut joined = false;
    loop {
        let Some(frame) = next_message(&mut reader, None).await? else {
            continue;
        };
        match frame {
            PushFrame::Open(params) => {
                if params.ping_interval > 0 {
                    liveness = Some(Duration::from_millis(
                        params.ping_interval.saturating_add(params.ping_timeout),
                    ));
                }
                tracing::debug!(sid = %params.sid, "engine.io session opened");
                let join = PushFrame::Connect {
                    namespace: DEFAULT_NAMESPACE.to_string(),
                };
                sender
                    .send(text(&join))
                    .await
                    .map_err(|e| PushError::WebSocket(e.to_string()))?;
                joined = true;
            }
            PushFrame::Ping => {
                sender
                    .send(text(&PushFrame::Pong))
                    .await
                    .map_err(|e| PushError::WebSocket(e.to_string()))?;
            }
            PushFrame::Connect { .. } if joined => {
                tracing::info!(url = %url, "push channel connected");
                return Ok(Connection {
                    sender,
                    reader,
                    liveness,
                });
            }
            PushFrame::ConnectError { message, .. } => {
                return Err(PushError::Handshake(message));
            }
            PushFrame::Close | PushFrame::Disconnect { .. } => {
                return Err(PushError::ConnectionClosed);
            }
            other => {
                tracing::debug!(?other, "push frame before namespace join, skipping");
            }
        }
    }
}

fn map_ws_connect_error(err: tokio_tungstenite::tungstenite::Error) -> PushError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(io_err)
            if matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::AddrNotAvailable
            ) =>
        {
            PushError::Unreachable(io_err.to_string())
        }
        WsError::Http(response) => PushError::Handshake(format!(
            "server answered HTTP {}",
            response.status()
        )),
        other => PushError::WebSocket(other.to_string()),
    }
}
