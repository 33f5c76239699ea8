//! Pooled cable connections.
//!
//! This module provides the transport half of the SDK: one shared WebSocket
//! per cable URL, reference counted by subscriber, speaking the
//! ActionCable-style subscribe/unsubscribe/message protocol.
//!
//! # Example
//!
//! ```rust,ignore
//! use codecamp_sdk::ws::{CableConfig, ConnectionPool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = ConnectionPool::new(CableConfig::from_env()?);
//!
//!     // Both leases share one socket.
//!     let first = pool.acquire(pool.url(), "widget-1").await?;
//!     let second = pool.acquire(pool.url(), "widget-2").await?;
//!     assert_eq!(first.connection(), second.connection());
//!
//!     // The socket closes once both are released.
//!     drop(first);
//!     drop(second);
//!     assert!(pool.is_empty());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod identifier;
pub mod messages;
pub mod pool;
pub mod subscriptions;

pub use config::CableConfig;
pub use connection::{ConnectionEvent, RealtimeConnection};
pub use error::WsError;
pub use identifier::Identifier;
pub use messages::{CableCommand, Command, FrameKind, FrameType, IncomingFrame};
pub use pool::{ConnectionLease, ConnectionPool};
pub use subscriptions::SubscriptionJoin;
