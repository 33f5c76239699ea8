//! Reputation channel.

use super::{CableChannel, ChannelKind};
use crate::types::ReputationUpdate;
use crate::ws::Identifier;

/// The signed-in user's reputation. Has no key; the server scopes it to the
/// connection's user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReputationKind;

impl ChannelKind for ReputationKind {
    const NAME: &'static str = "ReputationChannel";
    type Key = ();
    type Payload = ReputationUpdate;

    fn identifier(_: &()) -> Identifier {
        Identifier::new(Self::NAME)
    }
}

/// Channel delivering [`ReputationUpdate`]s.
pub type ReputationChannel = CableChannel<ReputationKind>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::channels::test_support::{frame, idle_pool, recorder};

    #[test]
    fn test_reputation_update() {
        let pool = idle_pool();
        let (seen, callback) = recorder();
        let channel = ReputationChannel::detached(&pool, (), callback);

        channel.inject(frame(json!({
            "message": {
                "reputation": 120,
                "has_unseen_reputation_tokens": true,
                "latest_token": {"uuid": "tok-1", "value": 12, "text": "Published", "seen": false}
            }
        })));
        channel.inject(frame(json!({"message": {"reputation": "lots"}})));

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].reputation, 120);
        assert!(seen[0].has_unseen_reputation_tokens);
        assert_eq!(seen[0].latest_token.as_ref().map(|t| t.value), Some(12));
    }
}
