//! Wire frame codec for the chat WebSocket.
//!
//! Every frame is a JSON object discriminated by its `type` field. Inbound
//! frames decode into [`InboundEvent`]; the only outbound command is
//! [`OutboundCommand::SendMessage`].
//!
//! ```text
//! client -> server   {"type":"message","content":"..."}
//! server -> client   {"type":"assistant","content":"..."}
//!                    {"type":"tool_call","content":"...","metadata":{"tool_name":"...","server_name":"...","args":...}}
//!                    {"type":"tool_result","content":"...","metadata":{"tool_name":"...","result":"...","error":"..."}}
//!                    {"type":"complete"}
//!                    {"type":"error","content":"..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

/// Frame `type` values this client understands.
const KNOWN_TYPES: &[&str] = &["error", "complete", "assistant", "tool_call", "tool_result"];

// =============================================================================
// Wire Types
// =============================================================================

/// Server -> Client: frames as they appear on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// The backend failed while producing a response.
    Error {
        /// Human-readable error text.
        content: String,
    },
    /// The response cycle has finished.
    Complete {},
    /// A fragment of assistant text.
    Assistant {
        /// Text fragment to append.
        content: String,
    },
    /// The model asked for a tool to be invoked.
    ToolCall {
        /// Display text for the invocation.
        content: String,
        /// Tool invocation details.
        metadata: ToolCallMetadata,
    },
    /// A tool produced output, or failed.
    ToolResult {
        /// Display text for the result.
        content: String,
        /// Result details.
        #[serde(default)]
        metadata: ToolResultMetadata,
    },
}

/// Metadata attached to a `tool_call` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallMetadata {
    /// Name of the tool being invoked.
    pub tool_name: String,
    /// Server exposing the tool, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// Raw tool arguments. The backend may send a partial JSON string here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

/// Metadata attached to a `tool_result` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    /// Name of the tool. Absent when the backend failed before resolving it.
    #[serde(default)]
    pub tool_name: String,
    /// Server executing the tool, sent with the "Executing ..." notice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// Successful tool output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Tool failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// =============================================================================
// Decoded Events
// =============================================================================

/// An inbound event, ready for the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Upstream error, surfaced to the user.
    Error {
        /// Error text.
        content: String,
    },
    /// End of the current response cycle.
    Complete,
    /// Streaming assistant text.
    AssistantDelta {
        /// Text fragment.
        content: String,
    },
    /// Tool invocation.
    ToolCall {
        /// Display text.
        content: String,
        /// Tool name.
        tool_name: String,
        /// Owning server, when known.
        server_name: Option<String>,
        /// Raw arguments.
        args: Option<Value>,
    },
    /// Tool output.
    ToolResult {
        /// Display text.
        content: String,
        /// Tool name, empty when the backend did not report one.
        tool_name: String,
        /// Server executing the tool, when reported.
        server_name: Option<String>,
        /// Output on success.
        result: Option<String>,
        /// Failure description.
        error: Option<String>,
    },
}

impl InboundEvent {
    /// Wire name of the frame this event came from.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::Complete => "complete",
            Self::AssistantDelta { .. } => "assistant",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
        }
    }

    /// Whether this event ends the current response cycle.
    #[must_use]
    pub const fn ends_cycle(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Complete)
    }
}

impl From<ServerFrame> for InboundEvent {
    fn from(frame: ServerFrame) -> Self {
        match frame {
            ServerFrame::Error { content } => Self::Error { content },
            ServerFrame::Complete {} => Self::Complete,
            ServerFrame::Assistant { content } => Self::AssistantDelta { content },
            ServerFrame::ToolCall { content, metadata } => Self::ToolCall {
                content,
                tool_name: metadata.tool_name,
                server_name: metadata.server_name,
                args: metadata.args,
            },
            ServerFrame::ToolResult { content, metadata } => Self::ToolResult {
                content,
                tool_name: metadata.tool_name,
                server_name: metadata.server_name,
                result: metadata.result,
                error: metadata.error,
            },
        }
    }
}

// =============================================================================
// Outbound Commands
// =============================================================================

/// Client -> Server: commands sent over the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundCommand {
    /// Send a user message to the backend.
    #[serde(rename = "message")]
    SendMessage {
        /// Message text.
        content: String,
    },
}

// =============================================================================
// Codec
// =============================================================================

/// Decode a raw text frame into an [`InboundEvent`].
///
/// Extra fields are ignored; the backend attaches an empty `content` to
/// `complete` frames, for example.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the text is not a JSON object, has no string
/// `type`, names an unknown type, or has a body that does not match its type.
pub fn decode(raw: &str) -> Result<InboundEvent, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(DecodeError::InvalidJson)?;

    let kind = match value.as_object() {
        None => return Err(DecodeError::NotAnObject),
        Some(obj) => match obj.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(DecodeError::MissingType),
        },
    };

    if !KNOWN_TYPES.contains(&kind.as_str()) {
        return Err(DecodeError::UnknownType(kind));
    }

    let frame: ServerFrame = serde_json::from_value(value)
        .map_err(|source| DecodeError::Malformed { kind, source })?;

    Ok(frame.into())
}

/// Encode an outbound command as wire text.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn encode(command: &OutboundCommand) -> serde_json::Result<String> {
    serde_json::to_string(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_assistant_delta() {
        let event = decode(r#"{"type":"assistant","content":"Hel"}"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::AssistantDelta {
                content: "Hel".to_string()
            }
        );
    }

    #[test]
    fn decodes_complete_with_trailing_content() {
        let event = decode(r#"{"type":"complete","content":""}"#).unwrap();
        assert_eq!(event, InboundEvent::Complete);
        assert!(event.ends_cycle());
    }

    #[test]
    fn decodes_bare_complete() {
        assert_eq!(decode(r#"{"type":"complete"}"#).unwrap(), InboundEvent::Complete);
    }

    #[test]
    fn decodes_error() {
        let event = decode(r#"{"type":"error","content":"rate limited"}"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::Error {
                content: "rate limited".to_string()
            }
        );
    }

    #[test]
    fn decodes_tool_call_with_string_args() {
        let raw = json!({
            "type": "tool_call",
            "content": "Calling tool: fs__list_files",
            "metadata": {"tool_name": "fs__list_files", "args": "{\"path\":"}
        })
        .to_string();

        match decode(&raw).unwrap() {
            InboundEvent::ToolCall {
                tool_name,
                server_name,
                args,
                ..
            } => {
                assert_eq!(tool_name, "fs__list_files");
                assert_eq!(server_name, None);
                assert_eq!(args, Some(json!("{\"path\":")));
            }
            other => panic!("Expected ToolCall, got {other:?}"),
        }
    }

    #[test]
    fn decodes_tool_call_with_server() {
        let raw = r#"{"type":"tool_call","content":"Calling ls","metadata":{"tool_name":"list_files","server_name":"fs","args":{"path":"."}}}"#;
        match decode(raw).unwrap() {
            InboundEvent::ToolCall {
                server_name, args, ..
            } => {
                assert_eq!(server_name.as_deref(), Some("fs"));
                assert_eq!(args.unwrap()["path"], ".");
            }
            other => panic!("Expected ToolCall, got {other:?}"),
        }
    }

    #[test]
    fn decodes_tool_result_server_name() {
        let raw = r#"{"type":"tool_result","content":"Executing list_files on fs...","metadata":{"tool_name":"list_files","server_name":"fs"}}"#;
        match decode(raw).unwrap() {
            InboundEvent::ToolResult {
                tool_name,
                server_name,
                result,
                ..
            } => {
                assert_eq!(tool_name, "list_files");
                assert_eq!(server_name.as_deref(), Some("fs"));
                assert_eq!(result, None);
            }
            other => panic!("Expected ToolResult, got {other:?}"),
        }
    }

    #[test]
    fn decodes_tool_result_without_tool_name() {
        let raw = r#"{"type":"tool_result","content":"Error executing tool x: boom","metadata":{"error":"boom"}}"#;
        match decode(raw).unwrap() {
            InboundEvent::ToolResult {
                tool_name,
                result,
                error,
                ..
            } => {
                assert_eq!(tool_name, "");
                assert_eq!(result, None);
                assert_eq!(error.as_deref(), Some("boom"));
            }
            other => panic!("Expected ToolResult, got {other:?}"),
        }
    }

    #[test]
    fn tool_call_without_metadata_is_malformed() {
        let err = decode(r#"{"type":"tool_call","content":"x"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ref kind, .. } if kind == "tool_call"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = decode(r#"{"type":"cleared"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType(ref t) if t == "cleared"));
    }

    #[test]
    fn missing_type_is_rejected() {
        assert!(matches!(
            decode(r#"{"content":"hi"}"#).unwrap_err(),
            DecodeError::MissingType
        ));
        assert!(matches!(
            decode(r#"{"type":3}"#).unwrap_err(),
            DecodeError::MissingType
        ));
    }

    #[test]
    fn non_object_and_garbage_are_rejected() {
        assert!(matches!(decode("[1,2]").unwrap_err(), DecodeError::NotAnObject));
        assert!(matches!(decode("not json").unwrap_err(), DecodeError::InvalidJson(_)));
    }

    #[test]
    fn assistant_without_content_is_malformed() {
        assert!(matches!(
            decode(r#"{"type":"assistant"}"#).unwrap_err(),
            DecodeError::Malformed { .. }
        ));
    }

    #[test]
    fn send_message_encodes_to_wire_shape() {
        let text = encode(&OutboundCommand::SendMessage {
            content: "list my files".to_string(),
        })
        .unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!({"type": "message", "content": "list my files"}));
    }

    #[test]
    fn server_frame_complete_serializes_without_fields() {
        let text = serde_json::to_string(&ServerFrame::Complete {}).unwrap();
        assert_eq!(text, r#"{"type":"complete"}"#);
    }
}
