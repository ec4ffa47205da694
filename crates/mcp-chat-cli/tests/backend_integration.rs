//! Integration tests against a running MCP chat backend.
//!
//! These tests require the backend to be listening on localhost:8000 with an
//! LLM configured. Run with:
//!   cargo test -p mcp-chat-cli --test backend_integration -- --ignored --nocapture
//!
//! `MCP_CHAT_WS_URL` and `MCP_CHAT_API_URL` override the endpoints.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use mcp_chat_cli::registry::{HttpRegistry, Registry};
use mcp_chat_cli::session::{ChatSession, SessionUpdate};
use mcp_chat_cli::transport;
use mcp_chat_core::{CursorPolicy, DispatchOutcome, EntryKind};

/// Default chat stream endpoint.
const WS_URL: &str = "ws://localhost:8000/ws";

/// Default REST endpoint.
const API_URL: &str = "http://localhost:8000";

/// Timeout for a full response cycle.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for the handshake and registry calls.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn ws_url() -> String {
    std::env::var("MCP_CHAT_WS_URL").unwrap_or_else(|_| WS_URL.to_string())
}

fn api_url() -> String {
    std::env::var("MCP_CHAT_API_URL").unwrap_or_else(|_| API_URL.to_string())
}

// =============================================================================
// Wire types (self-contained so the test checks the raw protocol)
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
}

// =============================================================================
// Integration Tests
// =============================================================================

/// The backend answers a raw `message` frame with deltas and one terminal frame.
#[tokio::test]
#[ignore = "Requires the chat backend running on localhost:8000"]
async fn raw_protocol_round_trip() {
    let url = ws_url();
    let (ws, _) = timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
        .await
        .expect("Connection timed out")
        .expect("Failed to connect");
    println!("✓ WebSocket handshake with {url}");

    let (mut write, mut read) = ws.split();
    write
        .send(Message::Text(
            r#"{"type":"message","content":"Say hello in one word."}"#.to_string(),
        ))
        .await
        .expect("Failed to send");

    let mut kinds = Vec::new();
    loop {
        match timeout(RESPONSE_TIMEOUT, read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                let frame: RawFrame = serde_json::from_str(&text)
                    .unwrap_or_else(|e| panic!("Unparseable frame {text}: {e}"));
                let terminal = frame.kind == "complete" || frame.kind == "error";
                if frame.kind == "error" {
                    println!("backend error: {:?}", frame.content);
                }
                kinds.push(frame.kind);
                if terminal {
                    break;
                }
            }
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(e))) => panic!("WebSocket error: {e}"),
            Ok(None) => panic!("Connection closed before the response completed"),
            Err(_) => panic!("Timed out after {}s", RESPONSE_TIMEOUT.as_secs()),
        }
    }

    println!("✓ Received frames: {kinds:?}");
    let last = kinds.last().expect("no frames");
    assert!(last == "complete" || last == "error");
    assert_eq!(
        kinds.iter().filter(|k| *k == "complete" || *k == "error").count(),
        1
    );
    let _ = write.send(Message::Close(None)).await;
}

/// A full cycle through the session glue ends with the flag cleared.
#[tokio::test]
#[ignore = "Requires the chat backend running on localhost:8000"]
async fn session_cycle_against_backend() {
    let (channel, mut events) = transport::connect(&ws_url(), CONNECT_TIMEOUT)
        .await
        .expect("Failed to connect");
    let mut session = ChatSession::with_transport(CursorPolicy::Preserve, channel);

    let opened = events.recv().await.expect("no events");
    assert_eq!(session.handle_transport_event(opened), SessionUpdate::Opened);

    let outcome = session.submit("What is 2 + 2?").await.expect("rejected");
    assert_eq!(outcome, DispatchOutcome::Sent);
    assert!(session.store().is_streaming());

    let ended = timeout(RESPONSE_TIMEOUT, async {
        while let Some(event) = events.recv().await {
            match session.handle_transport_event(event) {
                SessionUpdate::Applied {
                    ends_cycle: true, ..
                } => return true,
                SessionUpdate::Closed { .. } => return false,
                _ => {}
            }
        }
        false
    })
    .await
    .expect("Timed out waiting for the response");

    assert!(ended, "Connection closed before the response completed");
    assert!(!session.store().is_streaming());
    assert!(session.store().open_cursor().is_none());

    let entries = session.store().entries();
    assert_eq!(entries[0].kind(), EntryKind::User);
    assert!(entries.len() >= 2);
    for entry in entries {
        println!("{:?}: {}", entry.kind(), entry.content());
    }

    session.shutdown().await;
}

/// The registry endpoints answer with the documented shapes.
#[tokio::test]
#[ignore = "Requires the chat backend running on localhost:8000"]
async fn registry_endpoints() {
    let registry = HttpRegistry::new(api_url(), CONNECT_TIMEOUT).expect("client");

    let health = registry.health().await.expect("health failed");
    assert_eq!(health.status, "ok");
    println!("✓ Health: {}", health.message);

    let servers = registry.fetch_servers().await.expect("list failed");
    for server in &servers {
        println!("✓ {} ({} tools)", server.name, server.tools.len());
    }

    let ack = registry
        .remove_server("definitely-not-registered")
        .await
        .expect("remove failed");
    assert_eq!(ack.status, "disconnected");
    assert_eq!(ack.server, "definitely-not-registered");
    println!("✓ Remove acknowledged");
}
