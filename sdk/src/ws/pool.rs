//! Connection pool.
//!
//! Shares one [`RealtimeConnection`] per URL between any number of
//! subscribers. A connection is opened lazily for the first subscriber and
//! closed when the last one releases it. Concurrent acquisitions for the same
//! URL wait on a shared cell, so they converge on a single socket.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::config::CableConfig;
use super::connection::RealtimeConnection;
use super::error::WsError;

type Slot = Arc<OnceCell<RealtimeConnection>>;

/// Registry entry for one URL.
#[derive(Debug)]
struct PoolEntry {
    slot: Slot,
    subscribers: HashSet<String>,
}

impl PoolEntry {
    fn new() -> Self {
        Self {
            slot: Arc::new(OnceCell::new()),
            subscribers: HashSet::new(),
        }
    }
}

/// Pool of shared cable connections keyed by URL.
#[derive(Debug)]
pub struct ConnectionPool {
    config: CableConfig,
    entries: Mutex<HashMap<String, PoolEntry>>,
}

impl ConnectionPool {
    /// Creates a pool whose connections use `config`.
    #[must_use]
    pub fn new(config: CableConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the pool configuration.
    #[must_use]
    pub fn config(&self) -> &CableConfig {
        &self.config
    }

    /// Returns the default cable URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, PoolEntry>> {
        // The map is left consistent by every critical section.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `subscriber_id` on `url` and returns the shared connection,
    /// opening it if needed.
    ///
    /// # Errors
    ///
    /// Returns the open error if the socket cannot be opened (the subscriber
    /// is unregistered again), or `Cancelled` if the subscriber was released
    /// while the socket was opening.
    pub async fn get_connection(
        &self,
        url: &str,
        subscriber_id: &str,
    ) -> Result<RealtimeConnection, WsError> {
        let slot = {
            let mut entries = self.entries();
            let entry = entries.entry(url.to_string()).or_insert_with(PoolEntry::new);
            if entry.slot.get().is_some_and(RealtimeConnection::is_closed) {
                debug!(url, "replacing closed cable connection");
                entry.slot = Arc::new(OnceCell::new());
            }
            entry.subscribers.insert(subscriber_id.to_string());
            Arc::clone(&entry.slot)
        };

        let opened = slot
            .get_or_try_init(|| RealtimeConnection::open(url, &self.config))
            .await
            .cloned();

        match opened {
            Ok(connection) => self.confirm(url, subscriber_id, &slot, connection),
            Err(e) => {
                warn!(url, subscriber_id, error = %e, "failed to open cable connection");
                self.forget(url, subscriber_id, &slot);
                Err(e)
            }
        }
    }

    /// Checks the subscriber still holds the entry the connection was opened
    /// for.
    fn confirm(
        &self,
        url: &str,
        subscriber_id: &str,
        slot: &Slot,
        connection: RealtimeConnection,
    ) -> Result<RealtimeConnection, WsError> {
        let held = self
            .entries()
            .get(url)
            .filter(|entry| Arc::ptr_eq(&entry.slot, slot))
            .map(|entry| entry.subscribers.contains(subscriber_id));

        match held {
            Some(true) => {
                debug!(url, subscriber_id, "cable connection acquired");
                Ok(connection)
            }
            Some(false) => Err(WsError::Cancelled),
            None => {
                // Every subscriber left while the socket was opening.
                connection.close();
                Err(WsError::Cancelled)
            }
        }
    }

    fn forget(&self, url: &str, subscriber_id: &str, slot: &Slot) {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(url) else {
            return;
        };
        if !Arc::ptr_eq(&entry.slot, slot) {
            return;
        }
        entry.subscribers.remove(subscriber_id);
        if entry.subscribers.is_empty() {
            entries.remove(url);
        }
    }

    /// Unregisters `subscriber_id` from `url`.
    ///
    /// Closes and removes the connection when its last subscriber leaves.
    /// Returns false if the subscriber was not registered.
    pub fn release_connection(&self, url: &str, subscriber_id: &str) -> bool {
        let closing = {
            let mut entries = self.entries();
            let Some(entry) = entries.get_mut(url) else {
                return false;
            };
            if !entry.subscribers.remove(subscriber_id) {
                return false;
            }
            debug!(
                url,
                subscriber_id,
                subscribers = entry.subscribers.len(),
                "cable connection released"
            );
            if !entry.subscribers.is_empty() {
                return true;
            }
            entries.remove(url).and_then(|e| e.slot.get().cloned())
        };

        if let Some(connection) = closing {
            info!(url, "last subscriber left, closing cable connection");
            connection.close();
        }
        true
    }

    /// Acquires a connection wrapped in a lease that releases it on drop.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectionPool::get_connection`].
    pub async fn acquire(
        self: &Arc<Self>,
        url: &str,
        subscriber_id: impl Into<String>,
    ) -> Result<ConnectionLease, WsError> {
        let subscriber_id = subscriber_id.into();
        let connection = self.get_connection(url, &subscriber_id).await?;
        Ok(ConnectionLease {
            pool: Arc::clone(self),
            url: url.to_string(),
            subscriber_id,
            connection,
            released: false,
        })
    }

    /// Returns true if the pool holds an entry for `url`.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.entries().contains_key(url)
    }

    /// Returns the number of subscribers registered on `url`.
    #[must_use]
    pub fn subscriber_count(&self, url: &str) -> usize {
        self.entries()
            .get(url)
            .map_or(0, |entry| entry.subscribers.len())
    }

    /// Returns the number of URLs with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns true if the pool holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Closes every connection and forgets all subscribers.
    pub fn close_all(&self) {
        let drained: Vec<PoolEntry> = self.entries().drain().map(|(_, e)| e).collect();
        for entry in drained {
            if let Some(connection) = entry.slot.get() {
                connection.close();
            }
        }
    }
}

/// A subscriber's hold on a pooled connection.
///
/// Dropping the lease releases it.
#[derive(Debug)]
pub struct ConnectionLease {
    pool: Arc<ConnectionPool>,
    url: String,
    subscriber_id: String,
    connection: RealtimeConnection,
    released: bool,
}

impl ConnectionLease {
    /// Returns the leased connection.
    #[must_use]
    pub fn connection(&self) -> &RealtimeConnection {
        &self.connection
    }

    /// Returns the subscriber ID holding the lease.
    #[must_use]
    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// Returns the URL of the leased connection.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Releases the lease now.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.pool
                .release_connection(&self.url, &self.subscriber_id);
        }
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        self.release_once();
    }
}
