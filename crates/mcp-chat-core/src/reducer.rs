//! Event reducer.
//!
//! `reduce` folds one inbound event into the chat state and returns the new
//! state. It performs no I/O and reads no clock; the arrival time is passed in
//! by the caller. Events are applied strictly in the order they are handed
//! over, with no batching or reordering.
//!
//! | Event            | Transcript                              | Cursor          | Flag  |
//! |------------------|-----------------------------------------|-----------------|-------|
//! | `Error`          | new `assistant` entry `"Error: …"`      | closed          | false |
//! | `Complete`       | unchanged                               | closed          | false |
//! | `AssistantDelta` | append to cursor, or new `assistant`    | open            | true  |
//! | `ToolCall`       | new `tool_call` entry                   | per policy      | true  |
//! | `ToolResult`     | new `tool_result` entry                 | per policy      | true  |

use chrono::{DateTime, Utc};

use crate::frame::InboundEvent;
use crate::transcript::{ChatState, CursorPolicy, EntryAttributes, EntryKind};

/// Prefix for upstream errors shown in the transcript.
pub const ERROR_PREFIX: &str = "Error: ";

/// Apply one inbound event.
#[must_use]
pub fn reduce(mut state: ChatState, event: InboundEvent, at: DateTime<Utc>) -> ChatState {
    match event {
        InboundEvent::Error { content } => {
            state.push_entry(
                EntryKind::Assistant,
                format!("{ERROR_PREFIX}{content}"),
                None,
                at,
            );
            state.close_cursor();
            state.set_streaming(false);
        }
        InboundEvent::Complete => {
            state.close_cursor();
            state.set_streaming(false);
        }
        InboundEvent::AssistantDelta { content } => {
            let appended = state
                .open_cursor()
                .is_some_and(|id| state.append_to(id, &content));
            if !appended {
                let id = state.push_entry(EntryKind::Assistant, content, None, at);
                state.open_cursor_at(id);
            }
            state.set_streaming(true);
        }
        InboundEvent::ToolCall {
            content,
            tool_name,
            server_name,
            args,
        } => {
            close_for_tool(&mut state);
            let attributes = EntryAttributes {
                tool_name: Some(tool_name),
                server_name,
                args,
                ..EntryAttributes::default()
            };
            state.push_entry(EntryKind::ToolCall, content, Some(attributes), at);
            state.set_streaming(true);
        }
        InboundEvent::ToolResult {
            content,
            tool_name,
            server_name,
            result,
            error,
        } => {
            close_for_tool(&mut state);
            let attributes = EntryAttributes {
                tool_name: Some(tool_name),
                server_name,
                result,
                error,
                ..EntryAttributes::default()
            };
            state.push_entry(EntryKind::ToolResult, content, Some(attributes), at);
            state.set_streaming(true);
        }
    }
    state
}

/// Apply a sequence of events, all stamped with the same arrival time.
#[must_use]
pub fn reduce_all<I>(state: ChatState, events: I, at: DateTime<Utc>) -> ChatState
where
    I: IntoIterator<Item = InboundEvent>,
{
    events
        .into_iter()
        .fold(state, |state, event| reduce(state, event, at))
}

/// Reset streaming after the channel closed.
///
/// If a response was in flight the loss is recorded like an upstream error;
/// otherwise only the cursor and flag are reset.
#[must_use]
pub fn connection_lost(mut state: ChatState, reason: &str, at: DateTime<Utc>) -> ChatState {
    if state.is_streaming() {
        return reduce(
            state,
            InboundEvent::Error {
                content: reason.to_string(),
            },
            at,
        );
    }
    state.close_cursor();
    state.set_streaming(false);
    state
}

fn close_for_tool(state: &mut ChatState) {
    if state.policy() == CursorPolicy::CloseOnTool {
        state.close_cursor();
    }
}
