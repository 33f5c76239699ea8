//! Cable error types.
//!
//! Provides error types for connection, pool and channel operations.

/// Cable errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WsError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Opening the socket took too long.
    #[error("connection timed out after {0} ms")]
    Timeout(u64),

    /// WebSocket protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Failed to serialize a frame.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Failed to deserialize a frame.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The socket is not open.
    #[error("not connected")]
    NotConnected,

    /// The connection was closed for good.
    #[error("connection closed")]
    Closed,

    /// Action attempted on a channel that is not subscribed.
    #[error("Not subscribed to {0} channel")]
    NotSubscribed(String),

    /// The server rejected the subscription.
    #[error("subscription rejected: {0}")]
    SubscriptionRejected(String),

    /// The operation was abandoned because the subscriber went away.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for WsError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<serde_json::Error> for WsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
