//! Cable wire frames.
//!
//! Defines the JSON frames exchanged with an ActionCable-style server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::WsError;
use super::identifier::Identifier;

/// Outbound command names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Open a logical subscription.
    Subscribe,
    /// Close a logical subscription.
    Unsubscribe,
    /// Invoke a channel action.
    Message,
}

/// Client-to-server frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CableCommand {
    /// Command name.
    pub command: Command,

    /// Subscription identifier (JSON string).
    pub identifier: String,

    /// Action payload (JSON string) for `message` commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl CableCommand {
    /// Creates a `subscribe` command.
    #[must_use]
    pub fn subscribe(identifier: &Identifier) -> Self {
        Self {
            command: Command::Subscribe,
            identifier: identifier.as_str().to_string(),
            data: None,
        }
    }

    /// Creates an `unsubscribe` command.
    #[must_use]
    pub fn unsubscribe(identifier: &Identifier) -> Self {
        Self {
            command: Command::Unsubscribe,
            identifier: identifier.as_str().to_string(),
            data: None,
        }
    }

    /// Creates a `message` command invoking `action` with extra members.
    ///
    /// An `action` key inside `data` is overwritten.
    #[must_use]
    pub fn action(identifier: &Identifier, action: &str, data: Map<String, Value>) -> Self {
        let mut body = data;
        body.insert("action".to_string(), Value::from(action));

        Self {
            command: Command::Message,
            identifier: identifier.as_str().to_string(),
            data: Some(Value::Object(body).to_string()),
        }
    }

    /// Serializes the frame to JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, WsError> {
        serde_json::to_string(self).map_err(|e| WsError::Serialization(e.to_string()))
    }
}

/// Server frame types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    /// Sent once after the socket opens.
    Welcome,
    /// Server keepalive.
    Ping,
    /// Subscription accepted.
    ConfirmSubscription,
    /// Subscription refused.
    RejectSubscription,
    /// Server is closing the connection.
    Disconnect,
    /// Anything this client does not know.
    #[serde(other)]
    Unknown,
}

/// Server-to-client frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IncomingFrame {
    /// Frame type (absent on broadcasts).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub frame_type: Option<FrameType>,

    /// Subscription the frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Broadcast payload, or the timestamp on pings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,

    /// Reason on `disconnect` frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Whether the server allows reconnecting, on `disconnect` frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<bool>,
}

/// What an incoming frame means to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameKind<'a> {
    /// Connection greeting.
    Welcome,
    /// Keepalive.
    Ping,
    /// Subscription accepted.
    Confirm,
    /// Subscription refused.
    Reject,
    /// Server closing the connection.
    Disconnect {
        /// Reason given by the server.
        reason: Option<&'a str>,
        /// Whether reconnecting is allowed.
        reconnect: bool,
    },
    /// Entity payload.
    Broadcast(&'a Value),
    /// Nothing actionable.
    Ignored,
}

impl IncomingFrame {
    /// Parses a frame from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid frame.
    pub fn parse(text: &str) -> Result<Self, WsError> {
        serde_json::from_str(text).map_err(|e| WsError::Deserialization(e.to_string()))
    }

    /// Creates a broadcast frame for `identifier`.
    #[must_use]
    pub fn broadcast(identifier: &Identifier, message: Value) -> Self {
        Self {
            identifier: Some(identifier.as_str().to_string()),
            message: Some(message),
            ..Self::default()
        }
    }

    /// Classifies the frame.
    #[must_use]
    pub fn kind(&self) -> FrameKind<'_> {
        match self.frame_type {
            Some(FrameType::Welcome) => FrameKind::Welcome,
            Some(FrameType::Ping) => FrameKind::Ping,
            Some(FrameType::ConfirmSubscription) => FrameKind::Confirm,
            Some(FrameType::RejectSubscription) => FrameKind::Reject,
            Some(FrameType::Disconnect) => FrameKind::Disconnect {
                reason: self.reason.as_deref(),
                reconnect: self.reconnect.unwrap_or(true),
            },
            Some(FrameType::Unknown) => FrameKind::Ignored,
            None => match &self.message {
                Some(message) => FrameKind::Broadcast(message),
                None => FrameKind::Ignored,
            },
        }
    }

    /// Returns true if the frame is addressed to `identifier`.
    ///
    /// Frames without an identifier are connection-wide and match every
    /// subscription.
    #[must_use]
    pub fn is_for(&self, identifier: &Identifier) -> bool {
        match &self.identifier {
            Some(raw) => identifier.matches(raw),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_run_id() -> Identifier {
        Identifier::new("TestRunChannel").with_param("submission_uuid", "abc")
    }

    #[test]
    fn test_subscribe_serialize() {
        let json = CableCommand::subscribe(&test_run_id())
            .to_json()
            .expect("serialize");
        let parsed: Value = serde_json::from_str(&json).expect("json");

        assert_eq!(parsed["command"], "subscribe");
        assert_eq!(
            parsed["identifier"],
            r#"{"channel":"TestRunChannel","submission_uuid":"abc"}"#
        );
        assert!(parsed.get("data").is_none());
    }

    #[test]
    fn test_unsubscribe_serialize() {
        let cmd = CableCommand::unsubscribe(&test_run_id());
        assert_eq!(cmd.command, Command::Unsubscribe);
        assert!(cmd.to_json().expect("serialize").contains("\"unsubscribe\""));
    }

    #[test]
    fn test_action_data_is_json_string() {
        let mut data = Map::new();
        data.insert("reason".to_string(), json!("user_request"));
        data.insert("action".to_string(), json!("ignored"));

        let cmd = CableCommand::action(&test_run_id(), "cancel_test_run", data);
        assert_eq!(cmd.command, Command::Message);

        let inner: Value =
            serde_json::from_str(cmd.data.as_deref().expect("data")).expect("data json");
        assert_eq!(
            inner,
            json!({"action": "cancel_test_run", "reason": "user_request"})
        );
    }

    #[test]
    fn test_parse_control_frames() {
        let welcome = IncomingFrame::parse(r#"{"type":"welcome"}"#).expect("parse");
        assert_eq!(welcome.kind(), FrameKind::Welcome);

        let ping = IncomingFrame::parse(r#"{"type":"ping","message":1706640000}"#).expect("parse");
        assert_eq!(ping.kind(), FrameKind::Ping);

        let confirm = IncomingFrame::parse(
            r#"{"type":"confirm_subscription","identifier":"{\"channel\":\"TestRunChannel\",\"submission_uuid\":\"abc\"}"}"#,
        )
        .expect("parse");
        assert_eq!(confirm.kind(), FrameKind::Confirm);
        assert!(confirm.is_for(&test_run_id()));

        let reject = IncomingFrame::parse(r#"{"type":"reject_subscription"}"#).expect("parse");
        assert_eq!(reject.kind(), FrameKind::Reject);
    }

    #[test]
    fn test_parse_disconnect() {
        let frame = IncomingFrame::parse(
            r#"{"type":"disconnect","reason":"unauthorized","reconnect":false}"#,
        )
        .expect("parse");
        assert_eq!(
            frame.kind(),
            FrameKind::Disconnect {
                reason: Some("unauthorized"),
                reconnect: false
            }
        );
    }

    #[test]
    fn test_parse_unknown_type() {
        let frame = IncomingFrame::parse(r#"{"type":"something_new"}"#).expect("parse");
        assert_eq!(frame.kind(), FrameKind::Ignored);
    }

    #[test]
    fn test_broadcast_frame() {
        let frame = IncomingFrame::parse(r#"{"message":{"uuid":"t1","status":"queued"}}"#)
            .expect("parse");
        assert_eq!(
            frame.kind(),
            FrameKind::Broadcast(&json!({"uuid": "t1", "status": "queued"}))
        );
        assert!(frame.is_for(&test_run_id()));
    }

    #[test]
    fn test_broadcast_for_other_subscription() {
        let other = Identifier::new("TestRunChannel").with_param("submission_uuid", "zzz");
        let frame = IncomingFrame::broadcast(&other, json!({"uuid": "t1"}));
        assert!(!frame.is_for(&test_run_id()));
        assert!(frame.is_for(&other));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(IncomingFrame::parse("not json").is_err());
        assert!(IncomingFrame::parse("[1,2]").is_err());
    }
}
