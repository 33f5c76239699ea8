//! Entity snapshot validation.
//!
//! Every payload pushed by the cable server is a snapshot of one entity.
//! [`Snapshot`] is the single schema check applied to it: camelize the wire
//! keys, deserialize into the typed entity (required fields, types and enum
//! membership), then run the entity's own invariants.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::case::camelize;
use crate::error::SdkError;

/// A typed entity snapshot received over a channel.
pub trait Snapshot: DeserializeOwned + Serialize + Send + Sync + 'static {
    /// Entity name used in logs and errors.
    const KIND: &'static str;

    /// Checks invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot violates an invariant.
    fn check(&self) -> Result<(), SdkError> {
        Ok(())
    }

    /// Parses a snake_case wire payload into a validated snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not an object, does not match the
    /// entity schema, or fails [`Snapshot::check`].
    fn from_wire(payload: &Value) -> Result<Self, SdkError> {
        if !payload.is_object() {
            return Err(SdkError::NotAnObject { kind: Self::KIND });
        }

        let snapshot: Self =
            serde_json::from_value(camelize(payload.clone())).map_err(|e| {
                SdkError::InvalidPayload {
                    kind: Self::KIND,
                    reason: e.to_string(),
                }
            })?;

        snapshot.check()?;
        Ok(snapshot)
    }

    /// Returns true if the wire payload is a valid snapshot.
    fn is_valid(payload: &Value) -> bool {
        Self::from_wire(payload).is_ok()
    }
}

/// Fails with [`SdkError::EmptyField`] if `value` is blank.
pub(crate) fn require_non_empty(
    kind: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), SdkError> {
    if value.trim().is_empty() {
        return Err(SdkError::EmptyField { kind, field });
    }
    Ok(())
}
