//! Core of the MCP chat client.
//!
//! This crate holds everything about a chat session that does not touch the
//! network or the terminal:
//!
//! - **Frames**: decoding server frames into events, encoding user commands
//! - **Transcript**: the entry list, streaming cursor and streaming flag
//! - **Reducer**: the pure transition applied for each inbound event
//! - **Dispatch**: the gate that decides whether user input is sent
//! - **Store**: the single owner of the state, handing out snapshots
//! - **Registry**: server and tool descriptors published by the backend
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use mcp_chat_core::{decode, CursorPolicy, TranscriptStore};
//!
//! let mut store = TranscriptStore::new(CursorPolicy::Preserve);
//! let submitted = store.submit("hello", true, Utc::now()).unwrap();
//! assert!(submitted.outbound.is_some());
//!
//! for raw in [
//!     r#"{"type":"assistant","content":"Hi"}"#,
//!     r#"{"type":"assistant","content":" there"}"#,
//!     r#"{"type":"complete"}"#,
//! ] {
//!     store.apply_event(decode(raw).unwrap(), Utc::now());
//! }
//!
//! assert_eq!(store.entries()[1].content(), "Hi there");
//! assert!(!store.is_streaming());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod dispatch;
pub mod error;
pub mod frame;
pub mod ids;
pub mod reducer;
pub mod registry;
pub mod store;
pub mod transcript;

pub use dispatch::{send_failed, submit, DispatchOutcome, Submitted};
pub use error::{DecodeError, DispatchError};
pub use frame::{decode, encode, InboundEvent, OutboundCommand, ServerFrame};
pub use ids::EntryId;
pub use reducer::{connection_lost, reduce, reduce_all};
pub use registry::{ListServersResponse, ServerDescriptor, ToolDescriptor};
pub use store::TranscriptStore;
pub use transcript::{ChatState, CursorPolicy, EntryAttributes, EntryKind, TranscriptEntry};
