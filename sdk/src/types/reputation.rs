//! Reputation types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::{require_non_empty, Snapshot};
use crate::error::SdkError;

/// A single reputation award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationToken {
    /// Token UUID.
    pub uuid: String,

    /// Points awarded (may be negative).
    pub value: i64,

    /// Human readable reason.
    pub text: String,

    /// Whether the user has seen it.
    pub seen: bool,
}

/// Pushed whenever the user's reputation changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationUpdate {
    /// Total reputation.
    pub reputation: i64,

    /// Whether there are tokens the user has not seen.
    pub has_unseen_reputation_tokens: bool,

    /// The token that triggered this update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_token: Option<ReputationToken>,
}

impl Snapshot for ReputationUpdate {
    const KIND: &'static str = "ReputationUpdate";

    fn check(&self) -> Result<(), SdkError> {
        match &self.latest_token {
            Some(token) => require_non_empty(Self::KIND, "latestToken.uuid", &token.uuid),
            None => Ok(()),
        }
    }
}

/// Returns true if `payload` is a valid wire reputation update.
#[must_use]
pub fn is_valid_reputation_update(payload: &Value) -> bool {
    ReputationUpdate::is_valid(payload)
}
