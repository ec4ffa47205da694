//! Terminal client for an MCP tool-calling chat backend.
//!
//! This crate wires the pure transcript logic in `mcp-chat-core` to the
//! outside world: a WebSocket [`transport`] for the chat stream, an HTTP
//! [`registry`] client for the MCP server list, and two front ends (the
//! ratatui [`ui`] and the [`headless`] commands).
//!
//! # Architecture
//!
//! ```text
//!   crossterm keys ──► App ──► ChatSession ──► Transport (WsChannel)
//!                       │          │                 │
//!                       │          ▼                 ▼
//!                       │   TranscriptStore   reader/writer tasks
//!                       │          ▲                 │
//!                       ▼          └── decode ◄──────┘ TransportEvent
//!                  ui::render
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use mcp_chat_cli::session::ChatSession;
//! use mcp_chat_cli::transport::connect;
//! use mcp_chat_cli::ClientConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::default();
//! let (channel, mut events) = connect(&config.ws_url, config.request_timeout()).await?;
//! let mut session = ChatSession::with_transport(config.cursor_policy, channel);
//!
//! mcp_chat_cli::headless::ask(&mut session, &mut events, "Hello", &mut std::io::stdout()).await?;
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod app;
pub mod config;
pub mod headless;
pub mod markdown;
pub mod registry;
pub mod session;
pub mod transport;
pub mod ui;
pub mod view;

pub use app::{App, Connection};
pub use config::ClientConfig;
pub use registry::{HttpRegistry, Registry, RegistryError};
pub use session::{ChatSession, SessionUpdate};
pub use transport::{Transport, TransportError, TransportEvent, WsChannel};
