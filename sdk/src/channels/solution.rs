//! Solution channel.

use super::{keyed_identifier, CableChannel, ChannelKind};
use crate::types::Solution;
use crate::ws::Identifier;

/// One solution, keyed by solution UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolutionKind;

impl ChannelKind for SolutionKind {
    const NAME: &'static str = "SolutionChannel";
    type Key = String;
    type Payload = Solution;

    fn identifier(uuid: &String) -> Identifier {
        keyed_identifier(Self::NAME, "uuid", uuid)
    }
}

/// Channel delivering [`Solution`] snapshots.
pub type SolutionChannel = CableChannel<SolutionKind>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::channels::test_support::{frame, idle_pool, recorder};
    use crate::types::MentoringStatus;

    #[test]
    fn test_solution_update() {
        let pool = idle_pool();
        let (seen, callback) = recorder();
        let channel = SolutionChannel::detached(&pool, "sol-1".to_string(), callback);

        channel.inject(frame(json!({
            "identifier": r#"{"channel":"SolutionChannel","uuid":"sol-1"}"#,
            "message": {
                "uuid": "sol-1",
                "status": "iterated",
                "mentoring_status": "requested",
                "num_iterations": 2
            }
        })));

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].mentoring_status, MentoringStatus::Requested);
        assert_eq!(seen[0].num_iterations, 2);
    }

    #[test]
    fn test_missing_uuid_dropped() {
        let pool = idle_pool();
        let (seen, callback) = recorder();
        let channel = SolutionChannel::detached(&pool, "sol-1".to_string(), callback);

        channel.inject(frame(json!({
            "message": {"status": "iterated", "mentoring_status": "none"}
        })));

        assert!(seen.lock().expect("lock").is_empty());
    }
}
