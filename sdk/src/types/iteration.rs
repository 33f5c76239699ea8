//! Iteration types.
//!
//! An iteration is one submitted version of a solution. Its status moves
//! through testing and automated analysis.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::{require_non_empty, Snapshot};
use crate::error::SdkError;

/// Processing status of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationStatus {
    /// Tests have not run yet.
    Untested,
    /// Tests are running.
    Testing,
    /// Tests passed.
    TestsPassed,
    /// Tests failed.
    TestsFailed,
    /// The test run errored.
    TestsErrored,
    /// Automated analysis is running.
    Analyzing,
    /// Analysis left essential feedback.
    EssentialAutomatedFeedback,
    /// Analysis left actionable feedback.
    ActionableAutomatedFeedback,
    /// Analysis left celebratory feedback.
    CelebratoryAutomatedFeedback,
    /// Analysis left non-actionable feedback.
    NonActionableAutomatedFeedback,
    /// Analysis found nothing to say.
    NoAutomatedFeedback,
    /// The iteration was deleted.
    Deleted,
}

impl IterationStatus {
    /// Returns true while the server is still processing the iteration.
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(self, Self::Untested | Self::Testing | Self::Analyzing)
    }
}

/// An iteration snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    /// Iteration UUID.
    pub uuid: String,

    /// 1-based position within the solution.
    pub idx: u32,

    /// Processing status.
    pub status: IterationStatus,

    /// Submission the iteration was created from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_uuid: Option<String>,

    /// Essential automated comments.
    #[serde(default)]
    pub num_essential_automated_comments: u32,

    /// Actionable automated comments.
    #[serde(default)]
    pub num_actionable_automated_comments: u32,

    /// Non-actionable automated comments.
    #[serde(default)]
    pub num_non_actionable_automated_comments: u32,

    /// Whether this iteration is published.
    #[serde(default)]
    pub is_published: bool,
}

impl Iteration {
    /// Total automated comments.
    #[must_use]
    pub fn automated_comment_count(&self) -> u32 {
        self.num_essential_automated_comments
            .saturating_add(self.num_actionable_automated_comments)
            .saturating_add(self.num_non_actionable_automated_comments)
    }
}

impl Snapshot for Iteration {
    const KIND: &'static str = "Iteration";

    fn check(&self) -> Result<(), SdkError> {
        require_non_empty(Self::KIND, "uuid", &self.uuid)?;
        if self.idx == 0 {
            return Err(SdkError::InvalidPayload {
                kind: Self::KIND,
                reason: "idx must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Status of the newest iteration of a solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestIterationStatus {
    /// Processing status.
    pub status: IterationStatus,

    /// UUID of the iteration the status refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_iteration_uuid: Option<String>,
}

impl Snapshot for LatestIterationStatus {
    const KIND: &'static str = "LatestIterationStatus";
}

/// Returns true if `payload` is a valid wire iteration.
#[must_use]
pub fn is_valid_iteration(payload: &Value) -> bool {
    Iteration::is_valid(payload)
}

/// Returns true if `payload` is a valid wire latest-iteration status.
#[must_use]
pub fn is_valid_latest_iteration_status(payload: &Value) -> bool {
    LatestIterationStatus::is_valid(payload)
}
