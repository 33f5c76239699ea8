//! AI help record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::{require_non_empty, Snapshot};
use crate::error::SdkError;

/// Advice generated for a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiHelpRecord {
    /// Record UUID.
    pub uuid: String,

    /// Submission the advice is about.
    pub submission_uuid: String,

    /// Model or service that produced the advice.
    pub source: String,

    /// The advice, as markdown.
    pub advice: String,

    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Snapshot for AiHelpRecord {
    const KIND: &'static str = "AiHelpRecord";

    fn check(&self) -> Result<(), SdkError> {
        require_non_empty(Self::KIND, "uuid", &self.uuid)?;
        require_non_empty(Self::KIND, "submissionUuid", &self.submission_uuid)
    }
}

/// Returns true if `payload` is a valid wire AI help record.
#[must_use]
pub fn is_valid_ai_help_record(payload: &Value) -> bool {
    AiHelpRecord::is_valid(payload)
}
