//! Realtime connection.
//!
//! A [`RealtimeConnection`] owns one cable socket. A background driver task
//! pumps frames in both directions, sends heartbeats and reconnects after
//! socket loss. The wrapper itself is stable: reconnects swap the socket
//! behind it, so holders never need to re-acquire.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::config::CableConfig;
use super::error::WsError;
use super::identifier::Identifier;
use super::messages::{CableCommand, FrameKind, IncomingFrame};
use super::subscriptions::{SubscriptionJoin, SubscriptionRegistry};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Global connection ID counter.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Events emitted by a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The socket reopened after a loss.
    Connected,
    /// The socket dropped; a reconnect may follow.
    Disconnected,
    /// A frame arrived.
    Message(IncomingFrame),
    /// Something went wrong that did not close the connection by itself.
    Error(String),
    /// The connection ended for good. Always the last event.
    Closed,
}

/// One shared cable socket.
///
/// Cloning yields another handle to the same connection; equality is
/// identity.
#[derive(Debug, Clone)]
pub struct RealtimeConnection {
    inner: Arc<ConnectionInner>,
}

#[derive(Debug)]
struct ConnectionInner {
    id: u64,
    url: String,
    ready: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    outgoing: mpsc::UnboundedSender<Message>,
    events: broadcast::Sender<ConnectionEvent>,
    shutdown: watch::Sender<bool>,
    subscriptions: Arc<SubscriptionRegistry>,
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

impl PartialEq for RealtimeConnection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for RealtimeConnection {}

impl RealtimeConnection {
    /// Opens a connection and waits until the socket is open.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the socket cannot
    /// be opened within the connect timeout.
    pub async fn open(url: &str, config: &CableConfig) -> Result<Self, WsError> {
        config.validate()?;
        super::config::validate_url(url)?;

        let stream = dial(&config.connection_url(url), config.connect_timeout).await?;

        let id = CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let ready = Arc::new(AtomicBool::new(true));
        let closed = Arc::new(AtomicBool::new(false));
        let subscriptions = Arc::new(SubscriptionRegistry::default());

        let driver = Driver {
            id,
            url: url.to_string(),
            config: config.clone(),
            ready: Arc::clone(&ready),
            closed: Arc::clone(&closed),
            outgoing_rx,
            events: events.clone(),
            shutdown_rx,
            subscriptions: Arc::clone(&subscriptions),
            reconnect_allowed: true,
        };
        tokio::spawn(driver.run(stream));

        info!(connection = id, url, "cable connection opened");

        Ok(Self {
            inner: Arc::new(ConnectionInner {
                id,
                url: url.to_string(),
                ready,
                closed,
                outgoing,
                events,
                shutdown,
                subscriptions,
            }),
        })
    }

    /// Returns the connection ID.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Returns the URL this connection was opened for.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns true if the socket is currently open.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Returns true if the connection was closed or gave up reconnecting.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Subscribes to connection events.
    ///
    /// Only events emitted after this call are received.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }

    /// Queues a frame for sending.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` while the socket is down, `Closed` after the
    /// connection ended, or a serialization error.
    pub fn send(&self, command: &CableCommand) -> Result<(), WsError> {
        if self.is_closed() {
            return Err(WsError::Closed);
        }
        if !self.is_ready() {
            return Err(WsError::NotConnected);
        }

        let json = command.to_json()?;
        debug!(connection = self.inner.id, frame = %json, "sending frame");

        self.inner
            .outgoing
            .send(Message::Text(json.into()))
            .map_err(|_| WsError::Closed)
    }

    /// Registers a holder of `identifier` on this socket.
    ///
    /// Returns [`SubscriptionJoin::First`] if the caller must send
    /// `subscribe`.
    #[must_use]
    pub fn join_subscription(&self, identifier: &Identifier) -> SubscriptionJoin {
        self.inner.subscriptions.join(identifier.as_str())
    }

    /// Re-attaches a holder of `identifier`, e.g. after a reconnect.
    #[must_use]
    pub fn resume_subscription(&self, identifier: &Identifier) -> SubscriptionJoin {
        self.inner.subscriptions.resume(identifier.as_str())
    }

    /// Drops a holder of `identifier`. Returns true if it was the last one,
    /// in which case the caller sends `unsubscribe`.
    pub fn leave_subscription(&self, identifier: &Identifier) -> bool {
        self.inner.subscriptions.leave(identifier.as_str())
    }

    /// Records the server's confirmation of `identifier`.
    pub fn confirm_subscription(&self, identifier: &Identifier) {
        self.inner.subscriptions.confirm(identifier.as_str());
    }

    /// Marks `identifier` as not subscribed on the current socket.
    pub fn reset_subscription(&self, identifier: &Identifier) {
        self.inner.subscriptions.reset(identifier.as_str());
    }

    /// Returns how many holders share `identifier`.
    #[must_use]
    pub fn subscription_holders(&self, identifier: &Identifier) -> usize {
        self.inner.subscriptions.holders(identifier.as_str())
    }

    /// Closes the connection. Idempotent.
    pub fn close(&self) {
        let already = self.inner.closed.swap(true, Ordering::AcqRel);
        self.inner.ready.store(false, Ordering::Release);
        self.inner.shutdown.send_replace(true);
        if !already {
            info!(connection = self.inner.id, url = %self.inner.url, "cable connection closed");
        }
    }
}

async fn dial(url: &str, timeout: Duration) -> Result<WsStream, WsError> {
    match tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url)).await {
        Ok(Ok((stream, _))) => Ok(stream),
        Ok(Err(e)) => Err(WsError::Connection(e.to_string())),
        Err(_) => Err(WsError::Timeout(
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}

/// Why a socket session ended.
enum SessionEnd {
    Shutdown,
    Lost(String),
}

/// Background task state for one connection.
struct Driver {
    id: u64,
    url: String,
    config: CableConfig,
    ready: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    outgoing_rx: mpsc::UnboundedReceiver<Message>,
    events: broadcast::Sender<ConnectionEvent>,
    shutdown_rx: watch::Receiver<bool>,
    subscriptions: Arc<SubscriptionRegistry>,
    reconnect_allowed: bool,
}

impl Driver {
    async fn run(mut self, mut stream: WsStream) {
        // Holders of the initial socket subscribe on their own after `open`.
        loop {
            match self.pump(stream).await {
                SessionEnd::Shutdown => break,
                SessionEnd::Lost(reason) => {
                    self.ready.store(false, Ordering::Release);
                    self.subscriptions.reset_all();
                    warn!(connection = self.id, url = %self.url, %reason, "cable socket lost");
                    self.emit(ConnectionEvent::Disconnected);
                }
            }

            match self.reconnect().await {
                Some(next) => {
                    stream = next;
                    self.ready.store(true, Ordering::Release);
                    info!(connection = self.id, url = %self.url, "cable socket reconnected");
                    self.emit(ConnectionEvent::Connected);
                }
                None => break,
            }
        }

        let was_ready = self.ready.swap(false, Ordering::AcqRel);
        self.closed.store(true, Ordering::Release);
        if was_ready {
            self.emit(ConnectionEvent::Disconnected);
        }
        self.emit(ConnectionEvent::Closed);
        debug!(connection = self.id, "connection driver stopped");
    }

    fn emit(&self, event: ConnectionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    async fn pump(&mut self, stream: WsStream) -> SessionEnd {
        let (mut sink, mut source) = stream.split();

        let tick = self
            .config
            .heartbeat_interval
            .or(self.config.stale_timeout)
            .unwrap_or(Duration::from_secs(3600));
        let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ticking =
            self.config.heartbeat_interval.is_some() || self.config.stale_timeout.is_some();
        let mut last_activity = Instant::now();

        if self.shutdown_requested() {
            self.close_session(&mut sink).await;
            return SessionEnd::Shutdown;
        }

        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    self.close_session(&mut sink).await;
                    return SessionEnd::Shutdown;
                }

                outgoing = self.outgoing_rx.recv() => {
                    let Some(msg) = outgoing else {
                        let _ = sink.send(Message::Close(None)).await;
                        return SessionEnd::Shutdown;
                    };
                    if let Err(e) = sink.send(msg).await {
                        return SessionEnd::Lost(format!("send failed: {e}"));
                    }
                }

                incoming = source.next() => {
                    last_activity = Instant::now();
                    match incoming {
                        Some(Ok(Message::Text(text))) => match IncomingFrame::parse(&text) {
                            Ok(frame) => {
                                debug!(connection = self.id, frame = %text.as_str(), "received frame");
                                if let FrameKind::Disconnect { reconnect: false, reason } = frame.kind() {
                                    info!(
                                        connection = self.id,
                                        reason = reason.unwrap_or("unspecified"),
                                        "server forbids reconnecting"
                                    );
                                    self.reconnect_allowed = false;
                                }
                                self.emit(ConnectionEvent::Message(frame));
                            }
                            Err(e) => {
                                warn!(connection = self.id, error = %e, "malformed frame skipped");
                                self.emit(ConnectionEvent::Error(e.to_string()));
                            }
                        },
                        Some(Ok(Message::Close(_))) => {
                            return SessionEnd::Lost("closed by server".to_string());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                        None => return SessionEnd::Lost("stream ended".to_string()),
                    }
                }

                _ = ticker.tick(), if ticking => {
                    if let Some(stale) = self.config.stale_timeout {
                        if last_activity.elapsed() > stale {
                            return SessionEnd::Lost(format!(
                                "no traffic for {}s",
                                last_activity.elapsed().as_secs()
                            ));
                        }
                    }
                    if self.config.heartbeat_interval.is_some() {
                        if let Err(e) = sink.send(Message::Ping(Default::default())).await {
                            return SessionEnd::Lost(format!("heartbeat failed: {e}"));
                        }
                    }
                }
            }
        }
    }

    /// Flushes queued frames (final unsubscribes) and closes the socket.
    async fn close_session(&mut self, sink: &mut SplitSink<WsStream, Message>) {
        while let Ok(msg) = self.outgoing_rx.try_recv() {
            if sink.send(msg).await.is_err() {
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    }

    async fn reconnect(&mut self) -> Option<WsStream> {
        if !self.config.reconnect || !self.reconnect_allowed || self.shutdown_requested() {
            return None;
        }

        let mut attempt: u32 = 0;
        loop {
            if let Some(max) = self.config.max_reconnect_attempts {
                if attempt >= max {
                    error!(
                        connection = self.id,
                        url = %self.url,
                        attempts = attempt,
                        "giving up on cable reconnect"
                    );
                    self.emit(ConnectionEvent::Error(format!(
                        "reconnect failed after {attempt} attempts"
                    )));
                    return None;
                }
            }
            attempt = attempt.saturating_add(1);

            let delay = self.config.backoff(attempt);
            info!(
                connection = self.id,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "reconnecting cable socket"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown_rx.changed() => return None,
            }

            let url = self.config.connection_url(&self.url);
            tokio::select! {
                result = dial(&url, self.config.connect_timeout) => match result {
                    Ok(stream) => return Some(stream),
                    Err(e) => {
                        warn!(connection = self.id, attempt, error = %e, "reconnect attempt failed");
                        self.emit(ConnectionEvent::Error(e.to_string()));
                    }
                },
                _ = self.shutdown_rx.changed() => return None,
            }
        }
    }
}
