//! Error types for the chat core.
//!
//! Decode failures are dropped and logged by the caller; the reducer never
//! sees them. Dispatch failures are precondition violations on user input.

use thiserror::Error;

/// An inbound frame that cannot be turned into an event.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The frame is JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The frame has no string `type` field.
    #[error("frame has no `type` field")]
    MissingType,

    /// The frame names a type this client does not handle.
    #[error("unknown frame type: {0:?}")]
    UnknownType(String),

    /// The frame type is known but its body does not match.
    #[error("malformed {kind} frame: {source}")]
    Malformed {
        /// The frame's `type` value.
        kind: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// User input rejected before reaching the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The input is empty after trimming whitespace.
    #[error("message is empty")]
    EmptyInput,
}
