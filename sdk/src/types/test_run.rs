//! Test run types.
//!
//! A test run is the result of executing a submission against the exercise's
//! test suite. Runs are pushed repeatedly while they progress from `queued`
//! to a terminal status.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::{require_non_empty, Snapshot};
use crate::error::SdkError;

/// Overall status of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestRunStatus {
    /// Waiting for a runner.
    Queued,
    /// Currently executing.
    Running,
    /// All tests passed.
    Passed,
    /// At least one test failed.
    Failed,
    /// The run could not complete.
    Errored,
    /// The run was cancelled.
    Cancelled,
}

impl TestRunStatus {
    /// Returns true if the run will not change status again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Running)
    }
}

impl fmt::Display for TestRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Errored => write!(f, "errored"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Status of a single test within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// Test passed.
    Pass,
    /// Test assertion failed.
    Fail,
    /// Test raised an error.
    Error,
}

/// One test result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Test name.
    pub name: String,

    /// Result status.
    pub status: TestStatus,

    /// Source of the test, if the runner reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_code: Option<String>,

    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Expected value for failed assertions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// Captured output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// A test run snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    /// Test run UUID.
    pub uuid: String,

    /// UUID of the submission under test.
    pub submission_uuid: String,

    /// Overall status.
    pub status: TestRunStatus,

    /// Individual results (empty until the run finishes).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestResult>,

    /// Runner message, typically set for errored runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Raw runner output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Test runner interface version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl TestRun {
    /// Returns the number of passing tests.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.tests
            .iter()
            .filter(|t| t.status == TestStatus::Pass)
            .count()
    }

    /// Returns the first non-passing test, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&TestResult> {
        self.tests.iter().find(|t| t.status != TestStatus::Pass)
    }
}

impl Snapshot for TestRun {
    const KIND: &'static str = "TestRun";

    fn check(&self) -> Result<(), SdkError> {
        require_non_empty(Self::KIND, "uuid", &self.uuid)?;
        require_non_empty(Self::KIND, "submissionUuid", &self.submission_uuid)
    }
}

/// Returns true if `payload` is a valid wire test run.
#[must_use]
pub fn is_valid_test_run(payload: &Value) -> bool {
    TestRun::is_valid(payload)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_minimal_test_run_is_camelized() {
        let wire = json!({"uuid": "t1", "submission_uuid": "abc", "status": "passed"});
        let run = TestRun::from_wire(&wire).expect("valid");

        assert_eq!(run.uuid, "t1");
        assert_eq!(run.submission_uuid, "abc");
        assert_eq!(run.status, TestRunStatus::Passed);
        assert!(run.tests.is_empty());
        assert_eq!(
            serde_json::to_value(&run).expect("serialize"),
            json!({"uuid": "t1", "submissionUuid": "abc", "status": "passed"})
        );
    }

    #[test]
    fn test_every_status_accepted() {
        for status in ["queued", "running", "passed", "failed", "errored", "cancelled"] {
            let wire = json!({"uuid": "t1", "submission_uuid": "abc", "status": status});
            assert!(is_valid_test_run(&wire), "{status} should be valid");
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        let wire = json!({"uuid": "t1", "submission_uuid": "abc", "status": "bogus"});
        assert!(!is_valid_test_run(&wire));
    }

    #[test]
    fn test_missing_submission_uuid_rejected() {
        let wire = json!({"uuid": "t1", "status": "bogus"});
        let err = TestRun::from_wire(&wire).expect_err("invalid");
        assert_eq!(err.kind(), "TestRun");
        assert!(!is_valid_test_run(&json!({"uuid": "t1", "status": "passed"})));
    }

    #[test]
    fn test_empty_uuid_rejected() {
        let wire = json!({"uuid": "", "submission_uuid": "abc", "status": "queued"});
        assert_eq!(
            TestRun::from_wire(&wire),
            Err(SdkError::EmptyField {
                kind: "TestRun",
                field: "uuid"
            })
        );
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(
            TestRun::from_wire(&json!("t1")),
            Err(SdkError::NotAnObject { kind: "TestRun" })
        );
    }

    #[test]
    fn test_results_and_helpers() {
        let wire = json!({
            "uuid": "t1",
            "submission_uuid": "abc",
            "status": "failed",
            "version": 3,
            "tests": [
                {"name": "adds", "status": "pass"},
                {"name": "subtracts", "status": "fail", "test_code": "assert_eq!(sub(2, 1), 1)", "message": "left: 3"}
            ]
        });
        let run = TestRun::from_wire(&wire).expect("valid");

        assert_eq!(run.passed_count(), 1);
        let failure = run.first_failure().expect("failure");
        assert_eq!(failure.name, "subtracts");
        assert_eq!(failure.test_code.as_deref(), Some("assert_eq!(sub(2, 1), 1)"));
        assert!(run.status.is_terminal());
        assert_eq!(run.version, Some(3));
    }

    #[test]
    fn test_bad_nested_status_rejected() {
        let wire = json!({
            "uuid": "t1",
            "submission_uuid": "abc",
            "status": "failed",
            "tests": [{"name": "adds", "status": "skipped"}]
        });
        assert!(!is_valid_test_run(&wire));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TestRunStatus::Cancelled.to_string(), "cancelled");
        assert!(!TestRunStatus::Running.is_terminal());
    }
}
