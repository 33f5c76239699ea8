//! Entity snapshot types for the Codecamp SDK.
//!
//! Each type mirrors one server-side entity pushed over a channel, together
//! with its wire validator.

pub mod ai_help;
pub mod iteration;
pub mod mentoring;
pub mod metric;
pub mod reputation;
pub mod snapshot;
pub mod solution;
pub mod test_run;

pub use ai_help::{is_valid_ai_help_record, AiHelpRecord};
pub use iteration::{
    is_valid_iteration, is_valid_latest_iteration_status, Iteration, IterationStatus,
    LatestIterationStatus,
};
pub use mentoring::{is_valid_mentor_session_request, MentorRequestStatus, MentorSessionRequest};
pub use metric::{is_valid_metric, Metric, MetricType};
pub use reputation::{is_valid_reputation_update, ReputationToken, ReputationUpdate};
pub use snapshot::Snapshot;
pub use solution::{
    is_valid_solution, is_valid_solution_with_latest_iteration, HeadTestsStatus, MentoringStatus,
    Solution, SolutionStatus, SolutionWithLatestIteration,
};
pub use test_run::{is_valid_test_run, TestResult, TestRun, TestRunStatus, TestStatus};
