//! SDK error types.
//!
//! Provides error types for payload validation.

/// SDK errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    /// Payload does not match the entity schema.
    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload {
        /// Entity kind being validated.
        kind: &'static str,
        /// Why the payload was rejected.
        reason: String,
    },

    /// A required key field is present but empty.
    #[error("invalid {kind} payload: field `{field}` must not be empty")]
    EmptyField {
        /// Entity kind being validated.
        kind: &'static str,
        /// Offending field (camelCase).
        field: &'static str,
    },

    /// Payload is not a JSON object.
    #[error("invalid {kind} payload: expected a JSON object")]
    NotAnObject {
        /// Entity kind being validated.
        kind: &'static str,
    },
}

impl SdkError {
    /// Returns the entity kind the error refers to.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPayload { kind, .. }
            | Self::EmptyField { kind, .. }
            | Self::NotAnObject { kind } => kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SdkError::InvalidPayload {
            kind: "TestRun",
            reason: "missing field `submissionUuid`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid TestRun payload: missing field `submissionUuid`"
        );
    }

    #[test]
    fn test_error_empty_field() {
        let err = SdkError::EmptyField {
            kind: "Solution",
            field: "uuid",
        };
        assert_eq!(
            err.to_string(),
            "invalid Solution payload: field `uuid` must not be empty"
        );
        assert_eq!(err.kind(), "Solution");
    }
}
