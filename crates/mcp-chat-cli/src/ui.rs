//! UI rendering with ratatui.
//!
//! Two columns under a header bar: the MCP servers and their tools on the
//! left, the transcript and input line on the right.

use mcp_chat_core::ServerDescriptor;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
    Wrap,
};
use ratatui::Frame;

use crate::app::{App, Connection};
use crate::transport::Transport;
use crate::view::TranscriptView;

/// Horizontal padding for chat content.
const CHAT_PADDING: u16 = 2;

const INPUT_PROMPT: &str = "> ";

/// Render the UI.
pub fn render<T: Transport>(frame: &mut Frame, app: &App<T>) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header bar
            Constraint::Min(5),    // Servers + chat
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header_bar(frame, app, main_layout[0]);

    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(main_layout[1]);

    render_servers_panel(frame, &app.session().store().servers(), content_layout[0]);
    render_chat_column(frame, app, content_layout[1]);
    render_status_bar(frame, app, main_layout[2]);
}

/// Truncate a string in the middle with an ellipsis if it exceeds `max_len`
/// characters.
fn truncate_middle(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        return s.to_string();
    }
    if max_len < 5 {
        return s.chars().take(max_len).collect();
    }
    let keep = (max_len - 3) / 2;
    let start: String = s.chars().take(keep).collect();
    let end: String = s.chars().skip(len - keep).collect();
    format!("{start}...{end}")
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn render_header_bar<T: Transport>(frame: &mut Frame, app: &App<T>, area: Rect) {
    let status_text = app.connection.label();
    let status_style = match app.connection {
        Connection::Open => Style::default().fg(Color::Green),
        Connection::Connecting => Style::default().fg(Color::Yellow),
        Connection::Closed(_) | Connection::Failed(_) => Style::default().fg(Color::Red),
    };

    let title = "MCP CHAT";
    let max_url_width = (usize::from(area.width) / 2).saturating_sub(15);
    let display_url = truncate_middle(&app.endpoint, max_url_width);
    let right_width = display_url.chars().count() + status_text.len() + 3;
    let gap = usize::from(area.width).saturating_sub(title.len() + right_width);

    let line = Line::from(vec![
        Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(gap)),
        Span::raw(display_url),
        Span::raw(" ["),
        Span::styled(status_text, status_style),
        Span::raw("]"),
    ]);

    frame.render_widget(Paragraph::new(line).style(Style::default().bg(Color::DarkGray)), area);
}

fn render_servers_panel(frame: &mut Frame, servers: &[ServerDescriptor], area: Rect) {
    let block = Block::default()
        .title(" Servers ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    if servers.is_empty() {
        let empty = Paragraph::new("No MCP servers")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let mut items: Vec<ListItem> = Vec::new();
    for server in servers {
        let (marker, style) = if server.connected {
            ("● ", Style::default().fg(Color::Green))
        } else {
            ("○ ", Style::default().fg(Color::Red))
        };
        items.push(ListItem::new(Line::from(vec![
            Span::styled(marker, style),
            Span::styled(server.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!(" ({})", server.tools.len()), Style::default().fg(Color::DarkGray)),
        ])));
        for tool in &server.tools {
            items.push(ListItem::new(Line::from(Span::styled(
                format!("  {}", tool.name),
                Style::default().fg(Color::Gray),
            ))));
        }
    }

    frame.render_widget(List::new(items).block(block), area);
}

fn render_chat_column<T: Transport>(frame: &mut Frame, app: &App<T>, area: Rect) {
    let block = Block::default()
        .title(" Chat ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Transcript
            Constraint::Length(1), // Separator line
            Constraint::Length(1), // Input line
        ])
        .split(inner_area);

    let chat_area_full = inner_layout[0];
    let chat_area = Rect::new(
        chat_area_full.x + CHAT_PADDING,
        chat_area_full.y,
        chat_area_full.width.saturating_sub(CHAT_PADDING * 2 + 1), // +1 for scrollbar
        chat_area_full.height,
    );

    let store = app.session().store();
    let snapshot = store.snapshot();

    if snapshot.is_empty() && !snapshot.is_streaming() {
        let help = if app.session().is_ready() {
            "Type a message and press Enter to send"
        } else {
            "Not connected; messages stay local"
        };
        let text = Paragraph::new(help)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
        frame.render_widget(text, chat_area);
    } else {
        let content_width = usize::from(chat_area.width);
        let servers = store.servers();
        let lines = TranscriptView {
            state: &snapshot,
            servers: &servers,
            spinner: app.spinner_char(),
            width: content_width,
        }
        .lines();

        let text = Text::from(lines);
        let visible_lines = usize::from(chat_area.height);
        let total_wrapped_lines = calculate_wrapped_line_count(&text, content_width);
        let max_scroll = total_wrapped_lines.saturating_sub(visible_lines);

        // chat_scroll counts up from the bottom; Paragraph skips from the top.
        let effective_scroll = app.chat_scroll.min(max_scroll);
        let scroll_offset = max_scroll.saturating_sub(effective_scroll);

        let paragraph = Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .scroll((to_u16(scroll_offset), 0));
        frame.render_widget(paragraph, chat_area);

        if total_wrapped_lines > visible_lines {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::new(total_wrapped_lines)
                .position(scroll_offset)
                .viewport_content_length(visible_lines);
            frame.render_stateful_widget(scrollbar, chat_area_full, &mut scrollbar_state);
        }
    }

    render_input_line(frame, app, inner_layout[1], inner_layout[2]);
}

fn render_input_line<T: Transport>(
    frame: &mut Frame,
    app: &App<T>,
    separator_area: Rect,
    input_area: Rect,
) {
    let separator = Paragraph::new("─".repeat(usize::from(separator_area.width)))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(separator, separator_area);

    let prompt_style = if app.session().is_ready() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    // Keep the cursor on screen for long input.
    let available = usize::from(input_area.width).saturating_sub(INPUT_PROMPT.len() + 1);
    let skip = app.cursor_position.saturating_sub(available);
    let visible: String = app.input.chars().skip(skip).collect();
    let before_cursor: String = app
        .input
        .chars()
        .skip(skip)
        .take(app.cursor_position - skip)
        .collect();

    let input_line = Line::from(vec![
        Span::styled(INPUT_PROMPT, prompt_style),
        Span::styled(visible, Style::default().fg(Color::White)),
    ]);
    frame.render_widget(Paragraph::new(input_line), input_area);

    let cursor_x = INPUT_PROMPT.len() + Span::raw(before_cursor).width();
    frame.set_cursor_position((input_area.x + to_u16(cursor_x), input_area.y));
}

fn render_status_bar<T: Transport>(frame: &mut Frame, app: &App<T>, area: Rect) {
    let mode_indicator = if app.is_streaming() {
        Span::styled(" STREAMING ", Style::default().fg(Color::Black).bg(Color::Yellow))
    } else {
        Span::styled(" READY ", Style::default().fg(Color::Black).bg(Color::Green))
    };

    let status = if let Some(ref error) = app.error_message {
        Line::from(vec![
            mode_indicator,
            Span::styled(" ERROR: ", Style::default().fg(Color::Red).bold()),
            Span::styled(error.as_str(), Style::default().fg(Color::Red)),
        ])
    } else if let Some(ref status) = app.status_message {
        Line::from(vec![
            mode_indicator,
            Span::styled(format!(" {status}"), Style::default().fg(Color::Green)),
        ])
    } else {
        Line::from(vec![
            mode_indicator,
            Span::raw(" "),
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(":send "),
            Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)),
            Span::raw(":scroll "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(":quit"),
        ])
    };

    frame.render_widget(Paragraph::new(status).style(Style::default().bg(Color::DarkGray)), area);
}

/// Number of visual lines after wrapping to `available_width`.
fn calculate_wrapped_line_count(text: &Text, available_width: usize) -> usize {
    if available_width == 0 {
        return text.lines.len();
    }
    text.lines
        .iter()
        .map(|line| line.width().div_ceil(available_width).max(1))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ChatSession;
    use crate::transport::{TransportError, TransportEvent};
    use async_trait::async_trait;
    use mcp_chat_core::{CursorPolicy, ToolDescriptor};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use serde_json::json;

    struct OpenTransport;

    #[async_trait]
    impl Transport for OpenTransport {
        fn is_ready(&self) -> bool {
            true
        }

        async fn send(&self, _text: String) -> Result<(), TransportError> {
            Ok(())
        }

        async fn close(&self) {}
    }

    fn draw(app: &App<OpenTransport>, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn app() -> App<OpenTransport> {
        let session = ChatSession::with_transport(CursorPolicy::Preserve, OpenTransport);
        let mut app = App::new(session, Connection::Connecting, "ws://localhost:8000/ws");
        app.handle_transport_event(TransportEvent::Opened);
        app
    }

    #[test]
    fn truncate_middle_keeps_both_ends() {
        assert_eq!(truncate_middle("short", 10), "short");
        assert_eq!(truncate_middle("abcdefghijklmnop", 9), "abc...nop");
        assert_eq!(truncate_middle("abcdef", 3), "abc");
    }

    #[test]
    fn wrapped_line_count_rounds_up() {
        let text = Text::from(vec![Line::from("abcdefghij"), Line::from(""), Line::from("abc")]);
        assert_eq!(calculate_wrapped_line_count(&text, 4), 3 + 1 + 1);
        assert_eq!(calculate_wrapped_line_count(&text, 0), 3);
    }

    #[test]
    fn empty_transcript_shows_help() {
        let screen = draw(&app(), 100, 20);
        assert!(screen.contains("MCP CHAT"));
        assert!(screen.contains("connected"));
        assert!(screen.contains("Type a message"));
        assert!(screen.contains("No MCP servers"));
    }

    #[tokio::test]
    async fn transcript_and_servers_are_drawn() {
        let mut app = app();
        app.install_servers(vec![ServerDescriptor {
            name: "weather".into(),
            connected: true,
            tools: vec![ToolDescriptor {
                name: "forecast".into(),
                description: String::new(),
                input_schema: json!({}),
            }],
        }]);
        app.input = "hello".into();
        app.cursor_position = 5;
        app.submit_input().await;
        app.handle_transport_event(TransportEvent::Frame(
            r#"{"type":"assistant","content":"Sunny today"}"#.into(),
        ));

        let screen = draw(&app, 100, 20);
        assert!(screen.contains("[You] hello"));
        assert!(screen.contains("Sunny today"));
        assert!(screen.contains("weather (1)"));
        assert!(screen.contains("forecast"));
        assert!(screen.contains("STREAMING"));
    }
}
