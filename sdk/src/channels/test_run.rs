//! Test run channel.
//!
//! Streams the test run of one submission and lets the student cancel it.

use serde_json::Map;

use super::{keyed_identifier, CableChannel, ChannelKind};
use crate::types::TestRun;
use crate::ws::{Identifier, WsError};

/// Test runs of one submission, keyed by submission UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestRunKind;

impl ChannelKind for TestRunKind {
    const NAME: &'static str = "TestRunChannel";
    type Key = String;
    type Payload = TestRun;

    fn identifier(submission_uuid: &String) -> Identifier {
        keyed_identifier(Self::NAME, "submission_uuid", submission_uuid)
    }
}

/// Channel delivering [`TestRun`] snapshots.
pub type TestRunChannel = CableChannel<TestRunKind>;

impl CableChannel<TestRunKind> {
    /// Returns the submission UUID.
    #[must_use]
    pub fn submission_uuid(&self) -> &str {
        self.key()
    }

    /// Asks the server to cancel the running tests.
    ///
    /// # Errors
    ///
    /// Returns `NotSubscribed` unless the channel is active.
    pub fn cancel_test_run(&self) -> Result<(), WsError> {
        self.perform("cancel_test_run", Map::new())
    }
}
