//! Transcript entries as display lines.
//!
//! Pure functions from a state snapshot to styled text, shared by the TUI.
//! Nothing here mutates the transcript.

use mcp_chat_core::registry::find_tool_server;
use mcp_chat_core::{ChatState, EntryKind, ServerDescriptor, TranscriptEntry};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use serde_json::Value;

use crate::markdown::{render_code, render_markdown};

/// Tool output lines shown before the rest is elided.
pub const TOOL_PREVIEW_LINES: usize = 20;

/// Character shown at the end of the entry that is still streaming.
pub const STREAM_CURSOR: &str = "▌";

const LABEL: Modifier = Modifier::BOLD;

/// Inputs for rendering the transcript.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptView<'a> {
    /// State snapshot.
    pub state: &'a ChatState,
    /// Registry snapshot, used to attribute tool calls to servers.
    pub servers: &'a [ServerDescriptor],
    /// Spinner frame shown while waiting for the first delta.
    pub spinner: &'a str,
    /// Available width in columns.
    pub width: usize,
}

impl TranscriptView<'_> {
    /// Build the display lines for the whole transcript.
    #[must_use]
    pub fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let cursor = self.state.open_cursor();

        for entry in self.state.entries() {
            let streaming = cursor == Some(entry.id());
            match entry.kind() {
                EntryKind::User => user_lines(&mut lines, entry),
                EntryKind::Assistant => self.assistant_lines(&mut lines, entry, streaming),
                EntryKind::Thinking => thinking_lines(&mut lines, entry),
                EntryKind::ToolCall => self.tool_call_lines(&mut lines, entry),
                EntryKind::ToolResult => self.tool_result_lines(&mut lines, entry),
            }
            lines.push(Line::default());
        }

        if self.state.is_streaming() && cursor.is_none() {
            lines.push(label("[Assistant]", Color::Green));
            lines.push(Line::from(vec![
                Span::styled(self.spinner.to_string(), Style::default().fg(Color::Yellow)),
                Span::styled(" thinking...", Style::default().fg(Color::DarkGray)),
            ]));
        }

        lines
    }

    fn assistant_lines(&self, lines: &mut Vec<Line<'static>>, entry: &TranscriptEntry, streaming: bool) {
        lines.push(label("[Assistant]", Color::Green));
        let mut body = render_markdown(entry.content(), self.width);
        if streaming {
            match body.last_mut() {
                Some(last) => last.spans.push(Span::styled(STREAM_CURSOR, Style::default().fg(Color::Yellow))),
                None => body.push(Line::from(STREAM_CURSOR)),
            }
        }
        lines.extend(body);
    }

    fn tool_call_lines(&self, lines: &mut Vec<Line<'static>>, entry: &TranscriptEntry) {
        let attrs = entry.attributes().cloned().unwrap_or_default();
        let tool = attrs.tool_name.unwrap_or_default();
        let server = attrs
            .server_name
            .or_else(|| find_tool_server(self.servers, &tool).map(str::to_string));

        let mut header = vec![
            Span::styled("🔧 ", Style::default()),
            Span::styled(tool, Style::default().fg(Color::Cyan).add_modifier(LABEL)),
        ];
        if let Some(server) = server {
            header.push(Span::styled(format!(" on {server}"), Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(header));

        if !entry.content().is_empty() {
            lines.push(Line::from(Span::styled(
                entry.content().to_string(),
                Style::default().fg(Color::DarkGray),
            )));
        }
        if let Some(args) = attrs.args.as_ref().and_then(format_args) {
            lines.extend(render_code(&args, "json", self.width));
        }
    }

    fn tool_result_lines(&self, lines: &mut Vec<Line<'static>>, entry: &TranscriptEntry) {
        let attrs = entry.attributes().cloned().unwrap_or_default();
        let tool = attrs.tool_name.filter(|t| !t.is_empty());
        let (icon, color, body) = match attrs.error {
            Some(error) => ("❌ ", Color::Red, error),
            None => (
                "✅ ",
                Color::Green,
                attrs.result.unwrap_or_else(|| entry.content().to_string()),
            ),
        };

        let mut header = vec![
            Span::raw(icon),
            Span::styled(
                tool.unwrap_or_else(|| "tool".to_string()),
                Style::default().fg(color).add_modifier(LABEL),
            ),
        ];
        if let Some(server) = attrs.server_name {
            header.push(Span::styled(format!(" on {server}"), Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(header));
        if !body.trim().is_empty() {
            lines.extend(render_code(&preview(&body, TOOL_PREVIEW_LINES), "", self.width));
        }
    }
}

fn label(text: &'static str, color: Color) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(color).add_modifier(LABEL)))
}

fn user_lines(lines: &mut Vec<Line<'static>>, entry: &TranscriptEntry) {
    let mut rows = entry.content().lines();
    let first = rows.next().unwrap_or_default().to_string();
    lines.push(Line::from(vec![
        Span::styled("[You] ", Style::default().fg(Color::Cyan).add_modifier(LABEL)),
        Span::styled(first, Style::default().fg(Color::White)),
    ]));
    for row in rows {
        lines.push(Line::from(Span::styled(
            format!("      {row}"),
            Style::default().fg(Color::White),
        )));
    }
}

fn thinking_lines(lines: &mut Vec<Line<'static>>, entry: &TranscriptEntry) {
    let style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC);
    lines.push(Line::from(Span::styled("[Thinking]", style)));
    for row in entry.content().lines() {
        lines.push(Line::from(Span::styled(row.to_string(), style)));
    }
}

/// Pretty-print tool arguments. The backend may send a raw (possibly
/// partial) JSON string, which is shown as-is when it does not parse.
#[must_use]
pub fn format_args(args: &Value) -> Option<String> {
    let parsed;
    let value = match args {
        Value::Null => return None,
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => {
                parsed = value;
                &parsed
            }
            Err(_) => return (!raw.trim().is_empty()).then(|| raw.clone()),
        },
        other => other,
    };
    match value {
        Value::Object(map) if map.is_empty() => None,
        value => serde_json::to_string_pretty(value).ok(),
    }
}

/// Keep the first `max_lines` lines of `text`, noting how many were cut.
#[must_use]
pub fn preview(text: &str, max_lines: usize) -> String {
    let text = text.trim_end();
    let total = text.lines().count();
    if total <= max_lines {
        return text.to_string();
    }
    let head: Vec<&str> = text.lines().take(max_lines).collect();
    format!("{}\n... ({} more lines)", head.join("\n"), total - max_lines)
}
