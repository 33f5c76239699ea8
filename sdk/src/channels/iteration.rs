//! Iteration channel.

use super::{keyed_identifier, CableChannel, ChannelKind};
use crate::types::Iteration;
use crate::ws::Identifier;

/// One iteration, keyed by iteration UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationKind;

impl ChannelKind for IterationKind {
    const NAME: &'static str = "IterationChannel";
    type Key = String;
    type Payload = Iteration;

    fn identifier(uuid: &String) -> Identifier {
        keyed_identifier(Self::NAME, "uuid", uuid)
    }
}

/// Channel delivering [`Iteration`] snapshots.
pub type IterationChannel = CableChannel<IterationKind>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::channels::test_support::{frame, idle_pool, recorder};

    #[test]
    fn test_iteration_update_and_invalid_idx() {
        let pool = idle_pool();
        let (seen, callback) = recorder();
        let channel = IterationChannel::detached(&pool, "it-1".to_string(), callback);

        channel.inject(frame(json!({
            "message": {"uuid": "it-1", "idx": 1, "status": "analyzing"}
        })));
        channel.inject(frame(json!({
            "message": {"uuid": "it-1", "idx": 0, "status": "analyzing"}
        })));

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert!(seen[0].status.is_processing());
    }
}
