//! Entity channels.
//!
//! A channel is one logical subscription, multiplexed over a pooled
//! connection, delivering snapshots of a single server-side entity to a
//! callback. Every entity channel is a [`CableChannel`] parameterised by a
//! [`ChannelKind`], so they share one state machine:
//!
//! ```text
//! Uninitialized -> Subscribing -> Subscribed
//!                      |   ^          |
//!                      |   +----------+  (socket dropped / reconnected)
//!                      +-> Rejected | Failed
//! any -> Disconnected
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use codecamp_sdk::channels::TestRunChannel;
//! use codecamp_sdk::ws::{CableConfig, ConnectionPool};
//!
//! let pool = ConnectionPool::new(CableConfig::from_env()?);
//! let channel = TestRunChannel::new(&pool, "submission-uuid".to_string(), |run| {
//!     println!("test run is {}", run.status);
//! });
//!
//! // later, on unmount
//! channel.disconnect();
//! ```

pub mod ai_help_records;
pub mod iteration;
pub mod latest_iteration_status;
pub mod mentor_request;
pub mod metrics;
pub mod reputation;
pub mod solution;
pub mod solution_with_latest_iteration;
pub mod test_run;

pub use ai_help_records::{AiHelpRecordsChannel, AiHelpRecordsKind};
pub use iteration::{IterationChannel, IterationKind};
pub use latest_iteration_status::{LatestIterationStatusChannel, LatestIterationStatusKind};
pub use mentor_request::{MentorRequestChannel, MentorRequestKind};
pub use metrics::{MetricsChannel, MetricsKind};
pub use reputation::{ReputationChannel, ReputationKind};
pub use solution::{SolutionChannel, SolutionKind};
pub use solution_with_latest_iteration::{
    SolutionWithLatestIterationChannel, SolutionWithLatestIterationKind,
};
pub use test_run::{TestRunChannel, TestRunKind};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::{Map, Value};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::case::snakeize;
use crate::types::Snapshot;
use crate::ws::{
    CableCommand, ConnectionEvent, ConnectionLease, ConnectionPool, FrameKind, Identifier,
    IncomingFrame, RealtimeConnection, SubscriptionJoin, WsError,
};

/// Global subscriber ID counter.
static SUBSCRIBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Describes one kind of entity channel.
pub trait ChannelKind: Send + Sync + 'static {
    /// Server-side channel class name.
    const NAME: &'static str;

    /// Entity key the channel is opened for.
    type Key: Clone + fmt::Debug + Send + Sync + 'static;

    /// Snapshot type delivered to the callback.
    type Payload: Snapshot;

    /// Builds the subscription identifier for `key`.
    fn identifier(key: &Self::Key) -> Identifier;
}

/// Snapshot callback.
pub type Callback<P> = Arc<dyn Fn(P) + Send + Sync>;

/// Lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Created, subscribe not started.
    Uninitialized,
    /// Waiting for the server to confirm.
    Subscribing,
    /// Confirmed; updates flow and actions are allowed.
    Subscribed,
    /// The server refused the subscription.
    Rejected,
    /// No connection could be obtained.
    Failed,
    /// Torn down by `disconnect()`.
    Disconnected,
}

impl ChannelState {
    /// Returns true once the subscribe attempt has an outcome.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Uninitialized | Self::Subscribing)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Subscribing => write!(f, "subscribing"),
            Self::Subscribed => write!(f, "subscribed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Failed => write!(f, "failed"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// A live subscription to one entity.
///
/// Cloning yields another handle to the same subscription. Dropping the last
/// handle releases its pooled connection.
pub struct CableChannel<K: ChannelKind> {
    shared: Arc<Shared<K>>,
}

impl<K: ChannelKind> Clone for CableChannel<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K: ChannelKind> fmt::Debug for CableChannel<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CableChannel")
            .field("channel", &K::NAME)
            .field("key", &self.shared.key)
            .field("subscriber_id", &self.shared.subscriber_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct Shared<K: ChannelKind> {
    key: K::Key,
    identifier: Identifier,
    subscriber_id: String,
    url: String,
    pool: Arc<ConnectionPool>,
    callback: Callback<K::Payload>,
    state: watch::Sender<ChannelState>,
    link: Mutex<Link>,
}

/// The channel's hold on its connection.
#[derive(Default)]
struct Link {
    lease: Option<ConnectionLease>,
    listener: Option<JoinHandle<()>>,
}

impl<K: ChannelKind> CableChannel<K> {
    /// Creates a channel and starts subscribing in the background.
    ///
    /// Must be called within a tokio runtime. Subscribe failures are logged;
    /// use [`CableChannel::connect`] to observe them.
    pub fn new<F>(pool: &Arc<ConnectionPool>, key: K::Key, callback: F) -> Self
    where
        F: Fn(K::Payload) + Send + Sync + 'static,
    {
        let channel = Self::detached(pool, key, callback);
        if channel.shared.begin_subscribe() {
            let shared = Arc::clone(&channel.shared);
            tokio::spawn(async move {
                if let Err(e) = shared.run_subscribe().await {
                    error!(
                        channel = K::NAME,
                        identifier = %shared.identifier,
                        error = %e,
                        "subscribe failed"
                    );
                }
            });
        }
        channel
    }

    /// Creates a channel and waits until the subscribe command is sent.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection could be obtained.
    pub async fn connect<F>(
        pool: &Arc<ConnectionPool>,
        key: K::Key,
        callback: F,
    ) -> Result<Self, WsError>
    where
        F: Fn(K::Payload) + Send + Sync + 'static,
    {
        let channel = Self::detached(pool, key, callback);
        channel.subscribe().await?;
        Ok(channel)
    }

    /// Creates a channel without subscribing.
    pub(crate) fn detached<F>(pool: &Arc<ConnectionPool>, key: K::Key, callback: F) -> Self
    where
        F: Fn(K::Payload) + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(ChannelState::Uninitialized);
        let subscriber_id = format!(
            "{}:{}",
            K::NAME,
            SUBSCRIBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
        );

        Self {
            shared: Arc::new(Shared {
                identifier: K::identifier(&key),
                key,
                subscriber_id,
                url: pool.url().to_string(),
                pool: Arc::clone(pool),
                callback: Arc::new(callback),
                state,
                link: Mutex::new(Link::default()),
            }),
        }
    }

    /// Subscribes (or re-subscribes after a rejection or failure).
    ///
    /// A no-op while already subscribing or subscribed.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if the channel was disconnected, or the pool error
    /// if no connection could be obtained.
    pub async fn subscribe(&self) -> Result<(), WsError> {
        if !self.shared.begin_subscribe() {
            return match self.state() {
                ChannelState::Disconnected => Err(WsError::Cancelled),
                _ => Ok(()),
            };
        }
        self.shared.run_subscribe().await
    }

    /// Unsubscribes and releases the pooled connection. Idempotent.
    pub fn disconnect(&self) {
        self.shared.disconnect();
    }

    /// Returns true if the server confirmed the subscription.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == ChannelState::Subscribed
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.shared.state.borrow()
    }

    /// Returns a receiver observing state changes.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ChannelState> {
        self.shared.state.subscribe()
    }

    /// Waits until the current subscribe attempt has an outcome.
    pub async fn wait_until_settled(&self) -> ChannelState {
        let mut changes = self.state_changes();
        let settled = changes
            .wait_for(ChannelState::is_settled)
            .await
            .map(|state| *state);
        settled.unwrap_or(ChannelState::Disconnected)
    }

    /// Returns the entity key.
    #[must_use]
    pub fn key(&self) -> &K::Key {
        &self.shared.key
    }

    /// Returns the subscription identifier.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.shared.identifier
    }

    /// Returns the ID this channel holds its pooled connection under.
    #[must_use]
    pub fn subscriber_id(&self) -> &str {
        &self.shared.subscriber_id
    }

    /// Invokes a server-side channel action.
    ///
    /// `data` keys are converted to snake_case before sending.
    ///
    /// # Errors
    ///
    /// Returns `NotSubscribed` unless the channel is active, or a send error.
    pub fn perform(&self, action: &str, data: Map<String, Value>) -> Result<(), WsError> {
        let not_subscribed = || WsError::NotSubscribed(K::NAME.to_string());

        if !self.is_active() {
            return Err(not_subscribed());
        }
        let connection = self.shared.connection().ok_or_else(not_subscribed)?;

        let data = match snakeize(Value::Object(data)) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        connection.send(&CableCommand::action(&self.shared.identifier, action, data))?;

        debug!(channel = K::NAME, action, "channel action sent");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn inject(&self, event: ConnectionEvent) {
        self.shared.handle_event(event);
    }
}

impl<K: ChannelKind> Shared<K> {
    fn link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connection(&self) -> Option<RealtimeConnection> {
        self.link()
            .lease
            .as_ref()
            .map(|lease| lease.connection().clone())
    }

    /// Moves to `Subscribing` if a subscribe attempt may start.
    fn begin_subscribe(&self) -> bool {
        self.state.send_if_modified(|state| match state {
            ChannelState::Uninitialized | ChannelState::Rejected | ChannelState::Failed => {
                *state = ChannelState::Subscribing;
                true
            }
            _ => false,
        })
    }

    fn fail_subscribe(&self) {
        self.state.send_if_modified(|state| {
            if *state == ChannelState::Subscribing {
                *state = ChannelState::Failed;
                true
            } else {
                false
            }
        });
    }

    async fn run_subscribe(self: &Arc<Self>) -> Result<(), WsError> {
        if let Some(connection) = self.connection() {
            if !connection.is_closed() {
                let join = connection.resume_subscription(&self.identifier);
                return self.start_subscription(&connection, join);
            }
            self.release_closed_lease();
        }

        let lease = match self
            .pool
            .acquire(&self.url, self.subscriber_id.clone())
            .await
        {
            Ok(lease) => lease,
            Err(e) => {
                self.fail_subscribe();
                return Err(e);
            }
        };
        let connection = lease.connection().clone();

        let join = {
            let mut link = self.link();
            if *self.state.borrow() == ChannelState::Disconnected {
                drop(link);
                lease.release();
                debug!(
                    channel = K::NAME,
                    identifier = %self.identifier,
                    "subscribe abandoned after disconnect"
                );
                return Err(WsError::Cancelled);
            }

            // Listen before subscribing so the confirmation cannot be missed.
            let events = connection.events();
            link.listener = Some(tokio::spawn(listen(Arc::downgrade(self), events)));
            link.lease = Some(lease);
            connection.join_subscription(&self.identifier)
        };

        // A `Closed` event sent before the listener existed is not replayed.
        if connection.is_closed() {
            self.connection_closed();
            return Err(WsError::Closed);
        }
        self.start_subscription(&connection, join)
    }

    /// Lets go of a connection that closed before its listener saw `Closed`.
    fn release_closed_lease(&self) {
        let (lease, listener) = {
            let mut link = self.link();
            (link.lease.take(), link.listener.take())
        };
        if let Some(listener) = listener {
            listener.abort();
        }
        if let Some(lease) = lease {
            lease.release();
        }
    }

    fn start_subscription(
        &self,
        connection: &RealtimeConnection,
        join: SubscriptionJoin,
    ) -> Result<(), WsError> {
        match join {
            SubscriptionJoin::First => self.send_subscribe(connection),
            SubscriptionJoin::Pending => {
                debug!(
                    channel = K::NAME,
                    identifier = %self.identifier,
                    "subscribe already in flight on this socket"
                );
                Ok(())
            }
            SubscriptionJoin::Confirmed => {
                self.mark_confirmed();
                Ok(())
            }
        }
    }

    fn send_subscribe(&self, connection: &RealtimeConnection) -> Result<(), WsError> {
        match connection.send(&CableCommand::subscribe(&self.identifier)) {
            Ok(()) => {
                info!(
                    channel = K::NAME,
                    identifier = %self.identifier,
                    connection = connection.id(),
                    "subscribe sent"
                );
                Ok(())
            }
            Err(WsError::NotConnected) => {
                // Re-sent when the connection reports `Connected`.
                connection.reset_subscription(&self.identifier);
                warn!(
                    channel = K::NAME,
                    identifier = %self.identifier,
                    "socket down, subscribe deferred until reconnect"
                );
                Ok(())
            }
            Err(e) => {
                connection.reset_subscription(&self.identifier);
                self.fail_subscribe();
                Err(e)
            }
        }
    }

    fn mark_confirmed(&self) {
        let confirmed = self.state.send_if_modified(|state| match state {
            ChannelState::Disconnected | ChannelState::Subscribed => false,
            _ => {
                *state = ChannelState::Subscribed;
                true
            }
        });
        if confirmed {
            info!(channel = K::NAME, identifier = %self.identifier, "subscription confirmed");
        }
    }

    fn handle_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Message(frame) => self.handle_frame(&frame),
            ConnectionEvent::Connected => self.resubscribe(),
            ConnectionEvent::Disconnected => {
                self.state.send_if_modified(|state| {
                    if *state == ChannelState::Subscribed {
                        *state = ChannelState::Subscribing;
                        true
                    } else {
                        false
                    }
                });
                debug!(channel = K::NAME, identifier = %self.identifier, "connection dropped");
            }
            ConnectionEvent::Error(reason) => {
                debug!(channel = K::NAME, %reason, "connection error");
            }
            ConnectionEvent::Closed => self.connection_closed(),
        }
    }

    fn resubscribe(&self) {
        let resubscribing = self.state.send_if_modified(|state| match state {
            ChannelState::Subscribing | ChannelState::Subscribed => {
                *state = ChannelState::Subscribing;
                true
            }
            _ => false,
        });
        if !resubscribing {
            return;
        }

        if let Some(connection) = self.connection() {
            let join = connection.resume_subscription(&self.identifier);
            match self.start_subscription(&connection, join) {
                Ok(()) => {
                    info!(channel = K::NAME, identifier = %self.identifier, "resubscribed after reconnect");
                }
                Err(e) => warn!(channel = K::NAME, error = %e, "resubscribe failed"),
            }
        }
    }

    /// The connection gave up; drop it so `subscribe()` can pick a new one.
    fn connection_closed(&self) {
        let lease = {
            let mut link = self.link();
            self.state.send_if_modified(|state| match state {
                ChannelState::Subscribing | ChannelState::Subscribed => {
                    *state = ChannelState::Failed;
                    true
                }
                _ => false,
            });
            // The listener is the task running this; it stops after `Closed`.
            drop(link.listener.take());
            link.lease.take()
        };

        if let Some(lease) = lease {
            warn!(
                channel = K::NAME,
                identifier = %self.identifier,
                connection = lease.connection().id(),
                "cable connection closed, channel failed"
            );
            lease.release();
        }
    }

    fn handle_frame(&self, frame: &IncomingFrame) {
        if !frame.is_for(&self.identifier) {
            return;
        }
        if *self.state.borrow() == ChannelState::Disconnected {
            return;
        }

        match frame.kind() {
            FrameKind::Welcome | FrameKind::Ping | FrameKind::Ignored => {}
            FrameKind::Confirm => {
                if let Some(connection) = self.connection() {
                    connection.confirm_subscription(&self.identifier);
                }
                self.mark_confirmed();
            }
            FrameKind::Reject => {
                if let Some(connection) = self.connection() {
                    connection.reset_subscription(&self.identifier);
                }
                self.state.send_if_modified(|state| {
                    if *state == ChannelState::Disconnected {
                        false
                    } else {
                        *state = ChannelState::Rejected;
                        true
                    }
                });
                error!(channel = K::NAME, identifier = %self.identifier, "subscription rejected");
            }
            FrameKind::Disconnect { reason, reconnect } => {
                warn!(
                    channel = K::NAME,
                    reason = reason.unwrap_or("unspecified"),
                    reconnect,
                    "server is disconnecting"
                );
            }
            FrameKind::Broadcast(payload) => self.dispatch(payload),
        }
    }

    fn dispatch(&self, payload: &Value) {
        match K::Payload::from_wire(payload) {
            Ok(snapshot) => (self.callback)(snapshot),
            Err(e) => {
                warn!(
                    channel = K::NAME,
                    identifier = %self.identifier,
                    error = %e,
                    "dropping invalid payload"
                );
            }
        }
    }

    fn disconnect(&self) {
        let (lease, listener) = {
            let mut link = self.link();
            if self.state.send_replace(ChannelState::Disconnected) == ChannelState::Disconnected {
                return;
            }
            (link.lease.take(), link.listener.take())
        };

        if let Some(listener) = listener {
            listener.abort();
        }
        if let Some(lease) = lease {
            leave_subscription(lease.connection(), &self.identifier);
            lease.release();
        }

        info!(channel = K::NAME, identifier = %self.identifier, "channel disconnected");
    }
}

impl<K: ChannelKind> Drop for Shared<K> {
    fn drop(&mut self) {
        let link = self.link.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(listener) = link.listener.take() {
            listener.abort();
        }
        if let Some(lease) = link.lease.take() {
            leave_subscription(lease.connection(), &self.identifier);
        }
    }
}

/// Sends `unsubscribe` if no other channel on the socket holds `identifier`.
fn leave_subscription(connection: &RealtimeConnection, identifier: &Identifier) {
    if !connection.leave_subscription(identifier) {
        debug!(%identifier, "identifier still held on this socket, unsubscribe skipped");
        return;
    }
    if let Err(e) = connection.send(&CableCommand::unsubscribe(identifier)) {
        debug!(%identifier, error = %e, "unsubscribe not sent");
    }
}

async fn listen<K: ChannelKind>(
    shared: Weak<Shared<K>>,
    mut events: broadcast::Receiver<ConnectionEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(channel = K::NAME, skipped, "channel listener lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let Some(shared) = shared.upgrade() else {
            break;
        };
        let closed = matches!(event, ConnectionEvent::Closed);
        shared.handle_event(event);
        if closed {
            break;
        }
    }
}

/// Builds an identifier with a single key parameter.
pub(crate) fn keyed_identifier(channel: &str, field: &str, value: &str) -> Identifier {
    Identifier::new(channel).with_param(field, value)
}
