//! Latest iteration status channel.

use super::{keyed_identifier, CableChannel, ChannelKind};
use crate::types::LatestIterationStatus;
use crate::ws::Identifier;

/// Status of a solution's newest iteration, keyed by solution UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestIterationStatusKind;

impl ChannelKind for LatestIterationStatusKind {
    const NAME: &'static str = "LatestIterationStatusChannel";
    type Key = String;
    type Payload = LatestIterationStatus;

    fn identifier(uuid: &String) -> Identifier {
        keyed_identifier(Self::NAME, "uuid", uuid)
    }
}

/// Channel delivering [`LatestIterationStatus`] updates.
pub type LatestIterationStatusChannel = CableChannel<LatestIterationStatusKind>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::channels::test_support::{frame, idle_pool, recorder};
    use crate::types::IterationStatus;

    #[test]
    fn test_status_update() {
        let pool = idle_pool();
        let (seen, callback) = recorder();
        let channel = LatestIterationStatusChannel::detached(&pool, "sol-1".to_string(), callback);

        channel.inject(frame(json!({
            "message": {"status": "no_automated_feedback", "latest_iteration_uuid": "it-4"}
        })));
        channel.inject(frame(json!({"message": {"status": "exploded"}})));

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].status, IterationStatus::NoAutomatedFeedback);
        assert_eq!(seen[0].latest_iteration_uuid.as_deref(), Some("it-4"));
    }
}
