//! Solution types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::iteration::Iteration;
use super::snapshot::{require_non_empty, Snapshot};
use crate::error::SdkError;

/// Progress of a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    /// Exercise started, nothing submitted.
    Started,
    /// At least one iteration submitted.
    Iterated,
    /// Marked as complete.
    Completed,
    /// Published to the community.
    Published,
}

/// Mentoring progress of a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentoringStatus {
    /// No mentoring requested.
    None,
    /// Waiting for a mentor.
    Requested,
    /// Discussion ongoing.
    InProgress,
    /// Discussion finished.
    Finished,
}

/// Head-test status of the published iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadTestsStatus {
    /// Not queued yet.
    NotQueued,
    /// Queued.
    Queued,
    /// Passed.
    Passed,
    /// Failed.
    Failed,
    /// Errored.
    Errored,
    /// Raised an exception in the runner.
    Exceptioned,
    /// Cancelled.
    Cancelled,
}

/// A solution snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    /// Solution UUID.
    pub uuid: String,

    /// Progress.
    pub status: SolutionStatus,

    /// Mentoring progress.
    pub mentoring_status: MentoringStatus,

    /// Number of iterations submitted.
    #[serde(default)]
    pub num_iterations: u32,

    /// Head-test status of the published iteration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_iteration_head_tests_status: Option<HeadTestsStatus>,

    /// Last server-side change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot for Solution {
    const KIND: &'static str = "Solution";

    fn check(&self) -> Result<(), SdkError> {
        require_non_empty(Self::KIND, "uuid", &self.uuid)
    }
}

/// A solution together with its newest iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionWithLatestIteration {
    /// The solution.
    pub solution: Solution,

    /// Its newest iteration, absent before the first submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<Iteration>,
}

impl Snapshot for SolutionWithLatestIteration {
    const KIND: &'static str = "SolutionWithLatestIteration";

    fn check(&self) -> Result<(), SdkError> {
        self.solution.check()?;
        match &self.iteration {
            Some(iteration) => iteration.check(),
            None => Ok(()),
        }
    }
}

/// Returns true if `payload` is a valid wire solution.
#[must_use]
pub fn is_valid_solution(payload: &Value) -> bool {
    Solution::is_valid(payload)
}

/// Returns true if `payload` is a valid wire solution with latest iteration.
#[must_use]
pub fn is_valid_solution_with_latest_iteration(payload: &Value) -> bool {
    SolutionWithLatestIteration::is_valid(payload)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_solution_from_wire() {
        let wire = json!({
            "uuid": "sol-1",
            "status": "published",
            "mentoring_status": "in_progress",
            "num_iterations": 4,
            "published_iteration_head_tests_status": "not_queued"
        });
        let solution = Solution::from_wire(&wire).expect("valid");

        assert_eq!(solution.mentoring_status, MentoringStatus::InProgress);
        assert_eq!(
            solution.published_iteration_head_tests_status,
            Some(HeadTestsStatus::NotQueued)
        );
        assert_eq!(solution.num_iterations, 4);
    }

    #[test]
    fn test_solution_missing_mentoring_status() {
        let wire = json!({"uuid": "sol-1", "status": "started"});
        assert!(!is_valid_solution(&wire));
    }

    #[test]
    fn test_solution_with_iteration() {
        let wire = json!({
            "solution": {"uuid": "sol-1", "status": "iterated", "mentoring_status": "none"},
            "iteration": {"uuid": "it-1", "idx": 1, "status": "testing"}
        });
        let both = SolutionWithLatestIteration::from_wire(&wire).expect("valid");
        assert_eq!(both.iteration.map(|i| i.idx), Some(1));
    }

    #[test]
    fn test_solution_with_invalid_iteration() {
        let wire = json!({
            "solution": {"uuid": "sol-1", "status": "iterated", "mentoring_status": "none"},
            "iteration": {"uuid": "", "idx": 1, "status": "testing"}
        });
        assert!(!is_valid_solution_with_latest_iteration(&wire));
    }
}
