//! Dispatch gate: turns typed input into an outbound command.
//!
//! Every accepted submission appends exactly one `user` entry, whether or not
//! a frame is actually sent. The frame is only produced when the transport is
//! ready and no response is already in flight.

use chrono::{DateTime, Utc};

use crate::error::DispatchError;
use crate::frame::OutboundCommand;
use crate::transcript::{ChatState, EntryKind};

/// Why a submission did or did not produce an outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The message should be sent; the flag is now set.
    Sent,
    /// A response is already streaming; the message was only echoed locally.
    Busy,
    /// The transport is not open; the message was only echoed locally and the
    /// flag was cleared.
    NotReady,
}

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    /// Frame to send, if any.
    pub outbound: Option<OutboundCommand>,
    /// What happened.
    pub outcome: DispatchOutcome,
}

/// Submit user input.
///
/// Returns the new state alongside the submission result. A blank `text`
/// is rejected with [`DispatchError::EmptyInput`] and the state comes back
/// unchanged.
#[must_use]
pub fn submit(
    mut state: ChatState,
    text: &str,
    transport_ready: bool,
    at: DateTime<Utc>,
) -> (ChatState, Result<Submitted, DispatchError>) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return (state, Err(DispatchError::EmptyInput));
    }

    state.push_entry(EntryKind::User, trimmed.to_string(), None, at);

    let outcome = if !transport_ready {
        state.close_cursor();
        state.set_streaming(false);
        DispatchOutcome::NotReady
    } else if state.is_streaming() {
        DispatchOutcome::Busy
    } else {
        state.close_cursor();
        state.set_streaming(true);
        DispatchOutcome::Sent
    };

    let outbound = (outcome == DispatchOutcome::Sent).then(|| OutboundCommand::SendMessage {
        content: text.to_string(),
    });

    (state, Ok(Submitted { outbound, outcome }))
}

/// Roll back the flag after an accepted message could not be written.
///
/// The user entry stays; the exchange is treated as if the transport had
/// not been ready.
#[must_use]
pub fn send_failed(mut state: ChatState) -> ChatState {
    state.close_cursor();
    state.set_streaming(false);
    state
}
