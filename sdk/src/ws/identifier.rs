//! Subscription identifiers.
//!
//! An identifier is the JSON string naming one logical subscription on a
//! shared socket, e.g. `{"channel":"TestRunChannel","submission_uuid":"abc"}`.
//! The server echoes it on every frame for that subscription.

use std::fmt;

use serde_json::Value;

/// Identifier of one logical subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    channel: String,
    params: Vec<(String, String)>,
    encoded: String,
}

impl Identifier {
    /// Creates an identifier for a channel with no parameters.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        let channel = channel.into();
        let encoded = encode(&channel, &[]);
        Self {
            channel,
            params: Vec::new(),
            encoded,
        }
    }

    /// Adds a parameter, replacing any existing value for `key`.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
        self.encoded = encode(&self.channel, &self.params);
        self
    }

    /// Returns the channel class name.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Returns the value of a parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the JSON encoding sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Returns true if `raw` names this subscription.
    ///
    /// Accepts the exact encoding or any JSON object with the same members,
    /// so servers that reorder keys are still routed correctly.
    #[must_use]
    pub fn matches(&self, raw: &str) -> bool {
        if raw == self.encoded {
            return true;
        }

        match (
            serde_json::from_str::<Value>(raw),
            serde_json::from_str::<Value>(&self.encoded),
        ) {
            (Ok(theirs), Ok(ours)) => theirs == ours,
            _ => false,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

fn encode(channel: &str, params: &[(String, String)]) -> String {
    let mut members = Vec::with_capacity(params.len() + 1);
    members.push(format!("\"channel\":{}", Value::from(channel)));
    for (key, value) in params {
        members.push(format!("{}:{}", Value::from(key.as_str()), Value::from(value.as_str())));
    }
    format!("{{{}}}", members.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_encoding_order() {
        let id = Identifier::new("TestRunChannel").with_param("submission_uuid", "abc");
        assert_eq!(
            id.as_str(),
            r#"{"channel":"TestRunChannel","submission_uuid":"abc"}"#
        );
        assert_eq!(id.to_string(), id.as_str());
        assert_eq!(id.channel(), "TestRunChannel");
        assert_eq!(id.param("submission_uuid"), Some("abc"));
    }

    #[test]
    fn test_identifier_without_params() {
        let id = Identifier::new("MetricsChannel");
        assert_eq!(id.as_str(), r#"{"channel":"MetricsChannel"}"#);
        assert!(id.param("uuid").is_none());
    }

    #[test]
    fn test_identifier_escapes_values() {
        let id = Identifier::new("SolutionChannel").with_param("uuid", "a\"b");
        let parsed: Value = serde_json::from_str(id.as_str()).expect("json");
        assert_eq!(parsed["uuid"], "a\"b");
    }

    #[test]
    fn test_identifier_param_replaced() {
        let id = Identifier::new("SolutionChannel")
            .with_param("uuid", "one")
            .with_param("uuid", "two");
        assert_eq!(id.as_str(), r#"{"channel":"SolutionChannel","uuid":"two"}"#);
    }

    #[test]
    fn test_identifier_matches_reordered() {
        let id = Identifier::new("IterationChannel").with_param("uuid", "it-1");
        assert!(id.matches(r#"{"channel":"IterationChannel","uuid":"it-1"}"#));
        assert!(id.matches(r#"{ "uuid": "it-1", "channel": "IterationChannel" }"#));
        assert!(!id.matches(r#"{"channel":"IterationChannel","uuid":"it-2"}"#));
        assert!(!id.matches("not json"));
    }
}
