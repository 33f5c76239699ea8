//! Site activity metrics.
//!
//! Metrics flow both ways on the metrics channel: the server broadcasts
//! community activity and clients report their own via `send_metric`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::Snapshot;
use crate::error::SdkError;

/// Kind of activity a metric records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// A student started an exercise.
    StartSolution,
    /// A student submitted code.
    SubmitSubmission,
    /// A student completed an exercise.
    CompleteSolution,
    /// A student published a solution.
    PublishSolution,
    /// A student asked for mentoring.
    RequestMentoring,
    /// A mentoring discussion finished.
    FinishMentoring,
    /// A contributor opened a pull request.
    OpenPullRequest,
    /// A pull request was merged.
    MergePullRequest,
    /// A new user signed up.
    SignUp,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StartSolution => "start_solution",
            Self::SubmitSubmission => "submit_submission",
            Self::CompleteSolution => "complete_solution",
            Self::PublishSolution => "publish_solution",
            Self::RequestMentoring => "request_mentoring",
            Self::FinishMentoring => "finish_mentoring",
            Self::OpenPullRequest => "open_pull_request",
            Self::MergePullRequest => "merge_pull_request",
            Self::SignUp => "sign_up",
        };
        f.write_str(name)
    }
}

/// One activity metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    /// Activity kind.
    #[serde(rename = "type")]
    pub metric_type: MetricType,

    /// When it happened.
    pub occurred_at: DateTime<Utc>,

    /// Track, if the activity is track-specific.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_slug: Option<String>,

    /// Acting user, if public.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,

    /// Approximate `[latitude, longitude]` of the actor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[f64; 2]>,
}

impl Metric {
    /// Creates a metric of the given type at the current time.
    #[must_use]
    pub fn now(metric_type: MetricType) -> Self {
        Self {
            metric_type,
            occurred_at: Utc::now(),
            track_slug: None,
            user_handle: None,
            coordinates: None,
        }
    }

    /// Sets the track.
    #[must_use]
    pub fn with_track(mut self, track_slug: impl Into<String>) -> Self {
        self.track_slug = Some(track_slug.into());
        self
    }

    /// Sets the coordinates.
    #[must_use]
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some([latitude, longitude]);
        self
    }
}

impl Snapshot for Metric {
    const KIND: &'static str = "Metric";

    fn check(&self) -> Result<(), SdkError> {
        if let Some([lat, lng]) = self.coordinates {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                return Err(SdkError::InvalidPayload {
                    kind: Self::KIND,
                    reason: format!("coordinates out of range: [{lat}, {lng}]"),
                });
            }
        }
        Ok(())
    }
}

/// Returns true if `payload` is a valid wire metric.
#[must_use]
pub fn is_valid_metric(payload: &Value) -> bool {
    Metric::is_valid(payload)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_metric_from_wire() {
        let wire = json!({
            "type": "publish_solution",
            "occurred_at": "2024-05-10T08:30:00Z",
            "track_slug": "elixir",
            "coordinates": [52.37, 4.89]
        });
        let metric = Metric::from_wire(&wire).expect("valid");

        assert_eq!(metric.metric_type, MetricType::PublishSolution);
        assert_eq!(metric.track_slug.as_deref(), Some("elixir"));
        assert_eq!(metric.coordinates, Some([52.37, 4.89]));
    }

    #[test]
    fn test_metric_unknown_type() {
        let wire = json!({"type": "page_view", "occurred_at": "2024-05-10T08:30:00Z"});
        assert!(!is_valid_metric(&wire));
    }

    #[test]
    fn test_metric_coordinates_out_of_range() {
        let wire = json!({
            "type": "sign_up",
            "occurred_at": "2024-05-10T08:30:00Z",
            "coordinates": [123.0, 4.0]
        });
        assert!(!is_valid_metric(&wire));
    }

    #[test]
    fn test_metric_builder() {
        let metric = Metric::now(MetricType::SubmitSubmission)
            .with_track("rust")
            .with_coordinates(1.0, 2.0);
        assert_eq!(metric.track_slug.as_deref(), Some("rust"));
        assert_eq!(metric.coordinates, Some([1.0, 2.0]));
        assert_eq!(metric.metric_type.to_string(), "submit_submission");
    }
}
