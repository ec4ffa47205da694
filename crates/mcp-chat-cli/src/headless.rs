//! Headless front end: one-shot `ask` and plain-text registry reports.

use std::io::Write;

use anyhow::{bail, Context};
use mcp_chat_core::registry::find_tool_server;
use mcp_chat_core::{DispatchOutcome, EntryKind, ServerDescriptor, TranscriptEntry};
use tokio::sync::mpsc;

use crate::registry::{HealthStatus, Registry, ServerAck, ServerLaunch};
use crate::session::{ChatSession, SessionUpdate};
use crate::transport::{Transport, TransportEvent};
use crate::view::{format_args, preview, TOOL_PREVIEW_LINES};

// =============================================================================
// Ask
// =============================================================================

/// Send one message and print the response as entries finalize.
///
/// Entries are printed in transcript order; an entry still receiving deltas
/// holds back everything after it. The user's own entry is not echoed.
///
/// # Errors
///
/// Returns an error if the connection never opens, the message cannot be
/// sent, the connection drops before the response completes, or writing to
/// `out` fails.
pub async fn ask<T: Transport, W: Write>(
    session: &mut ChatSession<T>,
    events: &mut mpsc::Receiver<TransportEvent>,
    text: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    while !session.is_ready() {
        match events.recv().await {
            Some(event) => {
                if let SessionUpdate::Closed { reason } = session.handle_transport_event(event) {
                    bail!("Connection closed before it opened: {reason}");
                }
            }
            None => bail!("Connection closed before it opened"),
        }
    }

    match session.submit(text).await? {
        DispatchOutcome::Sent => {}
        DispatchOutcome::Busy => bail!("A response is already streaming"),
        DispatchOutcome::NotReady => bail!("Message could not be sent"),
    }

    let mut printed = session.store().entries().len();
    loop {
        let Some(event) = events.recv().await else {
            bail!("Connection closed during the response");
        };
        let update = session.handle_transport_event(event);
        printed = flush_entries(session, printed, out)?;

        match update {
            SessionUpdate::Applied { kind, ends_cycle: true } => {
                if kind == "error" {
                    bail!("The backend reported an error");
                }
                return Ok(());
            }
            SessionUpdate::Closed { reason } => bail!("Connection closed: {reason}"),
            _ => {}
        }
    }
}

/// Print finalized entries from index `from`. Returns the next index to print.
fn flush_entries<T: Transport, W: Write>(
    session: &ChatSession<T>,
    from: usize,
    out: &mut W,
) -> anyhow::Result<usize> {
    let store = session.store();
    let servers = store.servers();
    let cursor = store.open_cursor();
    let mut next = from;

    for entry in &store.entries()[from..] {
        if cursor == Some(entry.id()) {
            break;
        }
        if entry.kind() != EntryKind::User {
            writeln!(out, "{}", format_entry(entry, &servers)).context("Failed to write output")?;
        }
        next += 1;
    }
    Ok(next)
}

/// Plain-text rendering of one transcript entry.
#[must_use]
pub fn format_entry(entry: &TranscriptEntry, servers: &[ServerDescriptor]) -> String {
    let attrs = entry.attributes().cloned().unwrap_or_default();
    let tool = attrs.tool_name.clone().filter(|t| !t.is_empty());

    match entry.kind() {
        EntryKind::User => format!("> {}", entry.content()),
        EntryKind::Assistant => entry.content().to_string(),
        EntryKind::Thinking => format!("(thinking) {}", entry.content()),
        EntryKind::ToolCall => {
            let name = tool.unwrap_or_else(|| "tool".to_string());
            let mut text = match attrs
                .server_name
                .as_deref()
                .or_else(|| find_tool_server(servers, &name))
            {
                Some(server) => format!("[tool] {name} on {server}"),
                None => format!("[tool] {name}"),
            };
            if let Some(args) = attrs.args.as_ref().and_then(format_args) {
                text.push('\n');
                text.push_str(&args);
            }
            text
        }
        EntryKind::ToolResult => {
            let mut name = tool.unwrap_or_else(|| "tool".to_string());
            if let Some(server) = &attrs.server_name {
                name = format!("{name} on {server}");
            }
            match attrs.error {
                Some(error) => format!("[error] {name}: {error}"),
                None => {
                    let body = attrs.result.unwrap_or_else(|| entry.content().to_string());
                    format!("[result] {name}\n{}", preview(&body, TOOL_PREVIEW_LINES))
                }
            }
        }
    }
}

// =============================================================================
// Registry reports
// =============================================================================

/// Plain-text listing of servers and their tools.
#[must_use]
pub fn format_servers(servers: &[ServerDescriptor]) -> String {
    if servers.is_empty() {
        return "No MCP servers registered.".to_string();
    }
    let mut out = String::new();
    for server in servers {
        let state = if server.connected { "connected" } else { "disconnected" };
        out.push_str(&format!("{} ({state}, {} tools)\n", server.name, server.tools.len()));
        for tool in &server.tools {
            if tool.description.is_empty() {
                out.push_str(&format!("  - {}\n", tool.name));
            } else {
                out.push_str(&format!("  - {}: {}\n", tool.name, tool.description));
            }
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// One-line report of an add or remove acknowledgement.
#[must_use]
pub fn format_ack(ack: &ServerAck) -> String {
    format!("{}: {}", ack.server, ack.status)
}

/// One-line report of the backend health check.
#[must_use]
pub fn format_health(health: &HealthStatus) -> String {
    if health.message.is_empty() {
        health.status.clone()
    } else {
        format!("{}: {}", health.status, health.message)
    }
}

/// Print the registered servers.
///
/// # Errors
///
/// Returns an error if the registry request or the write fails.
pub async fn list_servers<W: Write>(registry: &dyn Registry, out: &mut W) -> anyhow::Result<()> {
    let servers = registry.fetch_servers().await.context("Failed to list servers")?;
    writeln!(out, "{}", format_servers(&servers))?;
    Ok(())
}

/// Register a server and print the acknowledgement.
///
/// # Errors
///
/// Returns an error if the registry request or the write fails.
pub async fn add_server<W: Write>(
    registry: &dyn Registry,
    name: &str,
    launch: &ServerLaunch,
    out: &mut W,
) -> anyhow::Result<()> {
    let ack = registry
        .add_server(name, launch)
        .await
        .with_context(|| format!("Failed to add server '{name}'"))?;
    writeln!(out, "{}", format_ack(&ack))?;
    Ok(())
}

/// Remove a server and print the acknowledgement.
///
/// # Errors
///
/// Returns an error if the registry request or the write fails.
pub async fn remove_server<W: Write>(
    registry: &dyn Registry,
    name: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    let ack = registry
        .remove_server(name)
        .await
        .with_context(|| format!("Failed to remove server '{name}'"))?;
    writeln!(out, "{}", format_ack(&ack))?;
    Ok(())
}

/// Print the backend health.
///
/// # Errors
///
/// Returns an error if the registry request or the write fails.
pub async fn health<W: Write>(registry: &dyn Registry, out: &mut W) -> anyhow::Result<()> {
    let health = registry.health().await.context("Health check failed")?;
    writeln!(out, "{}", format_health(&health))?;
    Ok(())
}
