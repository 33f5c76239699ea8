//! Cable connection configuration.
//!
//! Provides configuration options for pooled cable connections.

use std::time::Duration;

use super::error::WsError;

/// Environment variable holding the WebSocket origin.
pub const WS_URL_ENV: &str = "NEXT_PUBLIC_WS_URL";

/// Default WebSocket origin.
pub const DEFAULT_WS_ORIGIN: &str = "ws://localhost:3000";

/// Path of the cable endpoint on the origin.
pub const CABLE_PATH: &str = "/cable";

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Default reconnect delay in seconds.
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 1;

/// Maximum reconnect delay in seconds.
pub const MAX_RECONNECT_DELAY_SECS: u64 = 30;

/// Default maximum reconnection attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default per-connection event buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Cable connection configuration.
#[derive(Debug, Clone)]
pub struct CableConfig {
    /// Cable endpoint URL.
    pub url: String,

    /// Heartbeat interval (None = no heartbeat).
    pub heartbeat_interval: Option<Duration>,

    /// Whether to reconnect after the socket drops.
    pub reconnect: bool,

    /// Initial reconnect delay.
    pub reconnect_delay: Duration,

    /// Maximum reconnect delay.
    pub max_reconnect_delay: Duration,

    /// Maximum reconnection attempts per outage (None = unlimited).
    pub max_reconnect_attempts: Option<u32>,

    /// Timeout for opening a socket.
    pub connect_timeout: Duration,

    /// Drop the socket after this long without inbound traffic.
    pub stale_timeout: Option<Duration>,

    /// Events buffered per listener before it starts lagging.
    pub event_capacity: usize,

    /// Optional session token sent as a query parameter.
    pub token: Option<String>,
}

impl Default for CableConfig {
    fn default() -> Self {
        Self {
            url: cable_url(DEFAULT_WS_ORIGIN),
            heartbeat_interval: Some(Duration::from_secs(DEFAULT_HEARTBEAT_SECS)),
            reconnect: true,
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            max_reconnect_delay: Duration::from_secs(MAX_RECONNECT_DELAY_SECS),
            max_reconnect_attempts: Some(DEFAULT_MAX_RECONNECT_ATTEMPTS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            stale_timeout: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            token: None,
        }
    }
}

/// Appends the cable path to a WebSocket origin.
///
/// ```
/// use codecamp_sdk::ws::config::cable_url;
///
/// assert_eq!(cable_url("wss://example.com/"), "wss://example.com/cable");
/// assert_eq!(cable_url("wss://example.com/cable"), "wss://example.com/cable");
/// ```
#[must_use]
pub fn cable_url(origin: &str) -> String {
    let origin = origin.trim().trim_end_matches('/');
    if origin.ends_with(CABLE_PATH) {
        origin.to_string()
    } else {
        format!("{origin}{CABLE_PATH}")
    }
}

impl CableConfig {
    /// Creates a new configuration with the given cable URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Builds a configuration from the process environment.
    ///
    /// Reads [`WS_URL_ENV`], falling back to [`DEFAULT_WS_ORIGIN`], and
    /// appends [`CABLE_PATH`].
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self, WsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let origin = lookup(WS_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WS_ORIGIN.to_string());

        let config = Self::new(cable_url(&origin));
        config.validate()?;
        Ok(config)
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Disables heartbeats.
    #[must_use]
    pub fn without_heartbeat(mut self) -> Self {
        self.heartbeat_interval = None;
        self
    }

    /// Enables or disables automatic reconnection.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Sets the initial reconnect delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the maximum reconnect delay.
    #[must_use]
    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay = delay;
        self
    }

    /// Sets the maximum reconnection attempts.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Removes the reconnection attempt limit.
    #[must_use]
    pub fn with_unlimited_reconnects(mut self) -> Self {
        self.max_reconnect_attempts = None;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the stale-connection timeout.
    #[must_use]
    pub fn with_stale_timeout(mut self, timeout: Duration) -> Self {
        self.stale_timeout = Some(timeout);
        self
    }

    /// Sets the per-listener event buffer.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Sets the session token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Returns `url` with the token appended if set.
    #[must_use]
    pub fn connection_url(&self, url: &str) -> String {
        match &self.token {
            Some(token) => {
                if url.contains('?') {
                    format!("{}&token={}", url, token)
                } else {
                    format!("{}?token={}", url, token)
                }
            }
            None => url.to_string(),
        }
    }

    /// Returns the reconnect delay before the given attempt (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.reconnect_delay
            .saturating_mul(factor)
            .min(self.max_reconnect_delay)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), WsError> {
        validate_url(&self.url)?;

        if self.event_capacity == 0 {
            return Err(WsError::InvalidConfig(
                "event_capacity must be greater than zero".to_string(),
            ));
        }

        if self.heartbeat_interval.is_some_and(|d| d.is_zero()) {
            return Err(WsError::InvalidConfig(
                "heartbeat_interval must be greater than zero".to_string(),
            ));
        }

        if self.reconnect_delay > self.max_reconnect_delay {
            return Err(WsError::InvalidConfig(
                "reconnect_delay cannot exceed max_reconnect_delay".to_string(),
            ));
        }

        Ok(())
    }
}

/// Checks that `url` is a WebSocket URL.
///
/// # Errors
///
/// Returns an error if the URL is empty or has a non-WebSocket scheme.
pub fn validate_url(url: &str) -> Result<(), WsError> {
    if url.is_empty() {
        return Err(WsError::InvalidConfig("url cannot be empty".to_string()));
    }

    if !url.starts_with("ws://") && !url.starts_with("wss://") {
        return Err(WsError::InvalidConfig(
            "url must start with ws:// or wss://".to_string(),
        ));
    }

    Ok(())
}
