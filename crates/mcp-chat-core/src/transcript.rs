//! Transcript data model.
//!
//! A [`ChatState`] holds the ordered entries, the streaming cursor and the
//! streaming flag. Entries are only ever appended; an entry's content only
//! ever grows by suffix while it is the open cursor.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::EntryId;

// =============================================================================
// Entries
// =============================================================================

/// What a transcript entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A message typed by the user.
    User,
    /// Model reasoning shown separately from the answer.
    Thinking,
    /// A tool invocation requested by the model.
    ToolCall,
    /// Output (or failure) of a tool invocation.
    ToolResult,
    /// Assistant text, possibly still streaming.
    Assistant,
}

impl EntryKind {
    /// Wire-style name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Thinking => "thinking",
            Self::ToolCall => "tool_call",
            Self::ToolResult => "tool_result",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool details attached to `tool_call` and `tool_result` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryAttributes {
    /// Tool name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Server exposing the tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// Raw invocation arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    /// Tool output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Tool failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One entry in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    id: EntryId,
    kind: EntryKind,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<EntryAttributes>,
    created_at: DateTime<Utc>,
}

impl TranscriptEntry {
    /// Entry identifier.
    #[must_use]
    pub const fn id(&self) -> EntryId {
        self.id
    }

    /// Entry kind.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Current content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Tool details, if any.
    #[must_use]
    pub const fn attributes(&self) -> Option<&EntryAttributes> {
        self.attributes.as_ref()
    }

    /// Arrival time of the event that created the entry.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the tool result carries an error.
    #[must_use]
    pub fn is_tool_error(&self) -> bool {
        self.kind == EntryKind::ToolResult
            && self.attributes.as_ref().is_some_and(|a| a.error.is_some())
    }
}

// =============================================================================
// Cursor Policy
// =============================================================================

/// How tool events interact with an open streaming cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorPolicy {
    /// Tool events leave the cursor open; later deltas keep extending the
    /// assistant entry even though tool entries now follow it.
    #[default]
    Preserve,
    /// Tool events close the cursor; later deltas start a new assistant entry.
    CloseOnTool,
}

impl CursorPolicy {
    /// Configuration name of the policy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Preserve => "preserve",
            Self::CloseOnTool => "close-on-tool",
        }
    }
}

impl fmt::Display for CursorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CursorPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(Self::Preserve),
            "close-on-tool" => Ok(Self::CloseOnTool),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// An unrecognized cursor policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cursor policy {0:?} (expected \"preserve\" or \"close-on-tool\")")]
pub struct ParsePolicyError(String);

// =============================================================================
// Chat State
// =============================================================================

/// Transcript, streaming cursor and streaming flag, updated as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    entries: Vec<TranscriptEntry>,
    cursor: Option<EntryId>,
    streaming: bool,
    next_id: EntryId,
    policy: CursorPolicy,
}

impl ChatState {
    /// Create an empty state with the given cursor policy.
    #[must_use]
    pub fn new(policy: CursorPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Entries in arrival order.
    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Look up an entry by ID.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> Option<&TranscriptEntry> {
        self.position(id).map(|i| &self.entries[i])
    }

    /// The most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The assistant entry currently receiving deltas, if any.
    #[must_use]
    pub const fn open_cursor(&self) -> Option<EntryId> {
        self.cursor
    }

    /// Whether a response cycle is in progress.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Active cursor policy.
    #[must_use]
    pub const fn policy(&self) -> CursorPolicy {
        self.policy
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        // IDs are strictly increasing along the vector.
        self.entries.binary_search_by_key(&id, |e| e.id).ok()
    }

    pub(crate) fn push_entry(
        &mut self,
        kind: EntryKind,
        content: String,
        attributes: Option<EntryAttributes>,
        created_at: DateTime<Utc>,
    ) -> EntryId {
        let id = self.next_id;
        self.next_id = id.next();
        self.entries.push(TranscriptEntry {
            id,
            kind,
            content,
            attributes,
            created_at,
        });
        id
    }

    /// Append `suffix` to the entry's content. Returns `false` if the entry
    /// does not exist.
    pub(crate) fn append_to(&mut self, id: EntryId, suffix: &str) -> bool {
        match self.position(id) {
            Some(i) => {
                self.entries[i].content.push_str(suffix);
                true
            }
            None => false,
        }
    }

    pub(crate) fn open_cursor_at(&mut self, id: EntryId) {
        self.cursor = Some(id);
    }

    pub(crate) fn close_cursor(&mut self) -> Option<EntryId> {
        self.cursor.take()
    }

    pub(crate) fn set_streaming(&mut self, streaming: bool) {
        self.streaming = streaming;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn push_assigns_increasing_ids() {
        let mut state = ChatState::default();
        let a = state.push_entry(EntryKind::User, "hi".into(), None, at());
        let b = state.push_entry(EntryKind::Assistant, "yo".into(), None, at());
        assert!(b > a);
        assert_eq!(state.len(), 2);
        assert_eq!(state.entry(b).unwrap().content(), "yo");
    }

    #[test]
    fn append_grows_content_by_suffix() {
        let mut state = ChatState::default();
        let id = state.push_entry(EntryKind::Assistant, "Hi".into(), None, at());
        assert!(state.append_to(id, " there"));
        assert_eq!(state.entry(id).unwrap().content(), "Hi there");
        assert!(!state.append_to(id.next(), "x"));
    }

    #[test]
    fn tool_error_detection() {
        let mut state = ChatState::default();
        let attrs = EntryAttributes {
            error: Some("boom".into()),
            ..EntryAttributes::default()
        };
        let id = state.push_entry(EntryKind::ToolResult, "failed".into(), Some(attrs), at());
        assert!(state.entry(id).unwrap().is_tool_error());
    }

    #[test]
    fn cursor_policy_parses() {
        assert_eq!("preserve".parse::<CursorPolicy>().unwrap(), CursorPolicy::Preserve);
        assert_eq!(
            "close-on-tool".parse::<CursorPolicy>().unwrap(),
            CursorPolicy::CloseOnTool
        );
        assert!("sometimes".parse::<CursorPolicy>().is_err());
        assert_eq!(CursorPolicy::default(), CursorPolicy::Preserve);
    }

    #[test]
    fn entry_kind_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&EntryKind::ToolCall).unwrap(), "\"tool_call\"");
        assert_eq!(EntryKind::ToolResult.to_string(), "tool_result");
    }
}
