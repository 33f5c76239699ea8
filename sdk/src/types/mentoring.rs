//! Mentoring request types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::{require_non_empty, Snapshot};
use crate::error::SdkError;

/// Lifecycle status of a mentor session request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentorRequestStatus {
    /// Waiting for a mentor.
    Pending,
    /// A mentor picked up the request.
    Fulfilled,
    /// The student withdrew the request.
    Cancelled,
    /// Nobody picked it up in time.
    Expired,
}

impl MentorRequestStatus {
    /// Returns true if the request can still be cancelled.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// A student's request for a mentoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorSessionRequest {
    /// Request UUID.
    pub uuid: String,

    /// Current status.
    pub status: MentorRequestStatus,

    /// Track the exercise belongs to.
    pub track_slug: String,

    /// Exercise slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_slug: Option<String>,

    /// Handle of the requesting student.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_handle: Option<String>,

    /// The student's note to mentors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Last server-side change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot for MentorSessionRequest {
    const KIND: &'static str = "MentorSessionRequest";

    fn check(&self) -> Result<(), SdkError> {
        require_non_empty(Self::KIND, "uuid", &self.uuid)?;
        require_non_empty(Self::KIND, "trackSlug", &self.track_slug)
    }
}

/// Returns true if `payload` is a valid wire mentor session request.
#[must_use]
pub fn is_valid_mentor_session_request(payload: &Value) -> bool {
    MentorSessionRequest::is_valid(payload)
}
