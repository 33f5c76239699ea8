//! Mentor request channel.

use serde_json::Map;

use super::{keyed_identifier, CableChannel, ChannelKind};
use crate::types::MentorSessionRequest;
use crate::ws::{Identifier, WsError};

/// One mentoring request, keyed by request UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MentorRequestKind;

impl ChannelKind for MentorRequestKind {
    const NAME: &'static str = "MentorRequestChannel";
    type Key = String;
    type Payload = MentorSessionRequest;

    fn identifier(uuid: &String) -> Identifier {
        keyed_identifier(Self::NAME, "uuid", uuid)
    }
}

/// Channel delivering [`MentorSessionRequest`] snapshots.
pub type MentorRequestChannel = CableChannel<MentorRequestKind>;

impl CableChannel<MentorRequestKind> {
    /// Withdraws the mentoring request.
    ///
    /// # Errors
    ///
    /// Returns `NotSubscribed` unless the channel is active.
    pub fn cancel_request(&self) -> Result<(), WsError> {
        self.perform("cancel_request", Map::new())
    }
}
