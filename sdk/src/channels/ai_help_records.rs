//! AI help records channel.

use super::{keyed_identifier, CableChannel, ChannelKind};
use crate::types::AiHelpRecord;
use crate::ws::Identifier;

/// Advice generated for one submission, keyed by submission UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiHelpRecordsKind;

impl ChannelKind for AiHelpRecordsKind {
    const NAME: &'static str = "AIHelpRecordsChannel";
    type Key = String;
    type Payload = AiHelpRecord;

    fn identifier(submission_uuid: &String) -> Identifier {
        keyed_identifier(Self::NAME, "submission_uuid", submission_uuid)
    }
}

/// Channel delivering [`AiHelpRecord`]s.
pub type AiHelpRecordsChannel = CableChannel<AiHelpRecordsKind>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::channels::test_support::{frame, idle_pool, recorder};

    #[test]
    fn test_record_delivered() {
        let pool = idle_pool();
        let (seen, callback) = recorder();
        let channel = AiHelpRecordsChannel::detached(&pool, "sub-1".to_string(), callback);
        assert_eq!(
            channel.identifier().as_str(),
            r#"{"channel":"AIHelpRecordsChannel","submission_uuid":"sub-1"}"#
        );

        channel.inject(frame(json!({
            "message": {
                "uuid": "ai-1",
                "submission_uuid": "sub-1",
                "source": "gpt",
                "advice": "Try an iterator."
            }
        })));

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].advice, "Try an iterator.");
    }
}
