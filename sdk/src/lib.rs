//! Codecamp SDK - realtime channel client for the Codecamp learning platform.
//!
//! This crate keeps UI state in sync with server-side entities (test runs,
//! iterations, solutions, mentoring requests, reputation, metrics, AI help
//! records) by subscribing to an ActionCable-style cable server.
//!
//! # Layers
//!
//! - [`ws`]: pooled WebSocket connections and the cable wire protocol
//! - [`channels`]: one subscription per entity, delivering validated
//!   snapshots to a callback
//! - [`types`]: entity snapshots and their validators
//! - [`case`]: snake_case / camelCase key conversion
//!
//! # Example
//!
//! ```rust,ignore
//! use codecamp_sdk::channels::TestRunChannel;
//! use codecamp_sdk::ws::{CableConfig, ConnectionPool};
//!
//! let pool = ConnectionPool::new(CableConfig::from_env()?);
//! let channel = TestRunChannel::connect(&pool, submission_uuid, |run| {
//!     render(run);
//! })
//! .await?;
//!
//! if channel.is_active() {
//!     channel.cancel_test_run()?;
//! }
//! channel.disconnect();
//! ```

pub mod case;
pub mod channels;
pub mod error;
pub mod types;
pub mod ws;

pub use channels::{
    AiHelpRecordsChannel, CableChannel, ChannelKind, ChannelState, IterationChannel,
    LatestIterationStatusChannel, MentorRequestChannel, MetricsChannel, ReputationChannel,
    SolutionChannel, SolutionWithLatestIterationChannel, TestRunChannel,
};
pub use error::SdkError;
pub use types::{
    AiHelpRecord, Iteration, IterationStatus, LatestIterationStatus, MentorRequestStatus,
    MentorSessionRequest, Metric, MetricType, ReputationToken, ReputationUpdate, Snapshot,
    Solution, SolutionWithLatestIteration, TestResult, TestRun, TestRunStatus,
};
pub use ws::{CableConfig, ConnectionPool, RealtimeConnection, WsError};
