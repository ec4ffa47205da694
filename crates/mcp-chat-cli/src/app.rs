//! TUI application state.
//!
//! `App` wraps the chat session with everything the terminal front end needs:
//! the input line, scroll position, status line and connection label. Key
//! handling lives here so it can be tested without a terminal.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use mcp_chat_core::{DispatchError, DispatchOutcome, ServerDescriptor};

use crate::session::{ChatSession, SessionUpdate};
use crate::transport::{Transport, TransportEvent};

/// Lines scrolled by PageUp/PageDown.
pub const PAGE_SCROLL: usize = 10;

/// Lines scrolled per mouse wheel notch.
pub const WHEEL_SCROLL: usize = 3;

/// State of the chat connection as shown in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// Handshake done, waiting for the reader to report the socket open.
    Connecting,
    /// Open and ready to send.
    Open,
    /// Closed after having been open.
    Closed(String),
    /// Never opened.
    Failed(String),
}

impl Connection {
    /// Short label for the header.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "connected",
            Self::Closed(_) => "disconnected",
            Self::Failed(_) => "offline",
        }
    }
}

/// Application state.
pub struct App<T> {
    session: ChatSession<T>,
    /// Current input buffer.
    pub input: String,
    /// Cursor position in the input, in characters.
    pub cursor_position: usize,
    /// Lines scrolled up from the bottom of the transcript.
    pub chat_scroll: usize,
    /// Status message to display.
    pub status_message: Option<String>,
    /// Error message to display.
    pub error_message: Option<String>,
    /// Connection state.
    pub connection: Connection,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Backend the transcript is talking to, for the header.
    pub endpoint: String,
    animation_frame: usize,
}

impl<T: Transport> App<T> {
    /// Create the application around a session.
    #[must_use]
    pub fn new(session: ChatSession<T>, connection: Connection, endpoint: impl Into<String>) -> Self {
        Self {
            session,
            input: String::new(),
            cursor_position: 0,
            chat_scroll: 0,
            status_message: None,
            error_message: None,
            connection,
            should_quit: false,
            endpoint: endpoint.into(),
            animation_frame: 0,
        }
    }

    /// The chat session.
    #[must_use]
    pub fn session(&self) -> &ChatSession<T> {
        &self.session
    }

    /// Install the registry snapshot shown in the servers panel.
    pub fn install_servers(&mut self, servers: Vec<ServerDescriptor>) {
        self.session.install_servers(servers);
    }

    /// Whether a response is streaming.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.session.store().is_streaming()
    }

    /// Advance the spinner.
    pub fn tick_animation(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
    }

    /// Current spinner frame.
    #[must_use]
    pub fn spinner_char(&self) -> &'static str {
        const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        SPINNER[self.animation_frame % SPINNER.len()]
    }

    /// Set the status message (also clears any error).
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.error_message = None;
    }

    /// Set the error message.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Apply a transport event. Returns `true` if the screen should redraw.
    pub fn handle_transport_event(&mut self, event: TransportEvent) -> bool {
        match self.session.handle_transport_event(event) {
            SessionUpdate::Opened => {
                self.connection = Connection::Open;
                self.set_status("Connected");
            }
            SessionUpdate::Applied { kind, ends_cycle } => {
                if ends_cycle {
                    self.set_status(if kind == "error" { "Response failed" } else { "Done" });
                } else if kind == "tool_call" {
                    self.set_status("Running tool...");
                }
                self.chat_scroll = 0;
            }
            SessionUpdate::Dropped => return false,
            SessionUpdate::Closed { reason } => {
                self.set_error(format!("Disconnected: {reason}"));
                self.connection = Connection::Closed(reason);
            }
        }
        true
    }

    /// Close the connection.
    pub async fn shutdown(&mut self) {
        self.session.shutdown().await;
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Handle a key press.
    pub async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('u') if ctrl => self.clear_input(),
            KeyCode::Char('a') if ctrl => self.move_cursor_start(),
            KeyCode::Char('e') if ctrl => self.move_cursor_end(),
            KeyCode::Char('w') if ctrl => self.delete_word(),
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Enter => self.submit_input().await,
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Delete => self.delete_char_forward(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Home => self.move_cursor_start(),
            KeyCode::End => self.move_cursor_end(),
            KeyCode::PageUp => self.scroll_chat_up(PAGE_SCROLL),
            KeyCode::PageDown => self.scroll_chat_down(PAGE_SCROLL),
            KeyCode::Up => self.scroll_chat_up(1),
            KeyCode::Down => self.scroll_chat_down(1),
            _ => {}
        }
    }

    /// Submit the input line through the session.
    pub async fn submit_input(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        let text = self.take_input();
        self.chat_scroll = 0;

        match self.session.submit(&text).await {
            Ok(DispatchOutcome::Sent) => self.set_status("Waiting for response..."),
            Ok(DispatchOutcome::Busy) => {
                self.set_status("Still answering; message shown but not sent");
            }
            Ok(DispatchOutcome::NotReady) => {
                self.set_error("Not connected; message shown but not sent");
            }
            Err(DispatchError::EmptyInput) => {}
        }
    }

    // =========================================================================
    // Chat Scrolling
    // =========================================================================

    /// Scroll chat up (view older entries).
    pub fn scroll_chat_up(&mut self, amount: usize) {
        self.chat_scroll = self.chat_scroll.saturating_add(amount);
    }

    /// Scroll chat down (view newer entries).
    pub fn scroll_chat_down(&mut self, amount: usize) {
        self.chat_scroll = self.chat_scroll.saturating_sub(amount);
    }

    // =========================================================================
    // Input Editing
    // =========================================================================

    fn byte_index(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn char_len(&self) -> usize {
        self.input.chars().count()
    }

    /// Insert a character at the cursor position.
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor_position);
        self.input.insert(at, c);
        self.cursor_position += 1;
    }

    /// Delete the character before the cursor.
    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let at = self.byte_index(self.cursor_position);
            self.input.remove(at);
        }
    }

    /// Delete the character at the cursor.
    pub fn delete_char_forward(&mut self) {
        if self.cursor_position < self.char_len() {
            let at = self.byte_index(self.cursor_position);
            self.input.remove(at);
        }
    }

    /// Delete back to the previous word boundary.
    pub fn delete_word(&mut self) {
        while self.cursor_position > 0 && self.char_before_cursor() == Some(' ') {
            self.delete_char();
        }
        while self.cursor_position > 0 && self.char_before_cursor() != Some(' ') {
            self.delete_char();
        }
    }

    fn char_before_cursor(&self) -> Option<char> {
        self.cursor_position
            .checked_sub(1)
            .and_then(|i| self.input.chars().nth(i))
    }

    /// Move cursor left.
    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    /// Move cursor right.
    pub fn move_cursor_right(&mut self) {
        if self.cursor_position < self.char_len() {
            self.cursor_position += 1;
        }
    }

    /// Move cursor to the start.
    pub fn move_cursor_start(&mut self) {
        self.cursor_position = 0;
    }

    /// Move cursor to the end.
    pub fn move_cursor_end(&mut self) {
        self.cursor_position = self.char_len();
    }

    /// Clear the input.
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
    }

    /// Take the current input (clears it).
    pub fn take_input(&mut self) -> String {
        self.cursor_position = 0;
        std::mem::take(&mut self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use mcp_chat_core::{CursorPolicy, EntryKind};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingTransport {
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn is_ready(&self) -> bool {
            true
        }

        async fn send(&self, text: String) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn close(&self) {}
    }

    fn app() -> (App<RecordingTransport>, RecordingTransport) {
        let transport = RecordingTransport::default();
        let session = ChatSession::with_transport(CursorPolicy::Preserve, transport.clone());
        let mut app = App::new(session, Connection::Connecting, "ws://test/ws");
        app.handle_transport_event(TransportEvent::Opened);
        (app, transport)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    async fn type_text(app: &mut App<RecordingTransport>, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c))).await;
        }
    }

    #[tokio::test]
    async fn enter_submits_and_clears_input() {
        let (mut app, transport) = app();
        assert_eq!(app.connection, Connection::Open);

        type_text(&mut app, "hello").await;
        app.handle_key(key(KeyCode::Enter)).await;

        assert!(app.input.is_empty());
        assert_eq!(app.cursor_position, 0);
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
        assert!(app.is_streaming());
        let entries = app.session().store().entries();
        assert_eq!(entries[0].kind(), EntryKind::User);
    }

    #[tokio::test]
    async fn blank_enter_keeps_input() {
        let (mut app, transport) = app();
        type_text(&mut app, "   ").await;
        app.handle_key(key(KeyCode::Enter)).await;

        assert_eq!(app.input, "   ");
        assert!(transport.sent.lock().unwrap().is_empty());
        assert!(app.session().store().entries().is_empty());
    }

    #[tokio::test]
    async fn busy_submit_is_reported() {
        let (mut app, transport) = app();
        type_text(&mut app, "first").await;
        app.handle_key(key(KeyCode::Enter)).await;
        type_text(&mut app, "second").await;
        app.handle_key(key(KeyCode::Enter)).await;

        assert_eq!(transport.sent.lock().unwrap().len(), 1);
        assert_eq!(app.session().store().entries().len(), 2);
        assert!(app.status_message.as_deref().unwrap().contains("not sent"));
    }

    #[tokio::test]
    async fn editing_is_char_safe() {
        let (mut app, _) = app();
        type_text(&mut app, "héllo").await;
        app.handle_key(key(KeyCode::Left)).await;
        app.handle_key(key(KeyCode::Left)).await;
        app.handle_key(key(KeyCode::Left)).await;
        app.handle_key(key(KeyCode::Backspace)).await;
        assert_eq!(app.input, "hllo");
        app.handle_key(key(KeyCode::Char('é'))).await;
        assert_eq!(app.input, "héllo");
        app.handle_key(key(KeyCode::Delete)).await;
        assert_eq!(app.input, "hélo");
        app.handle_key(key(KeyCode::End)).await;
        assert_eq!(app.cursor_position, 4);
    }

    #[tokio::test]
    async fn ctrl_keys_edit_and_quit() {
        let (mut app, _) = app();
        type_text(&mut app, "one two  ").await;
        app.handle_key(ctrl('w')).await;
        assert_eq!(app.input, "one ");
        app.handle_key(ctrl('u')).await;
        assert!(app.input.is_empty());
        assert!(!app.should_quit);
        app.handle_key(ctrl('c')).await;
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn scrolling_saturates_at_bottom() {
        let (mut app, _) = app();
        app.handle_key(key(KeyCode::PageUp)).await;
        assert_eq!(app.chat_scroll, PAGE_SCROLL);
        app.handle_key(key(KeyCode::Down)).await;
        assert_eq!(app.chat_scroll, PAGE_SCROLL - 1);
        app.scroll_chat_down(100);
        assert_eq!(app.chat_scroll, 0);
    }

    #[tokio::test]
    async fn complete_frame_ends_streaming() {
        let (mut app, _) = app();
        type_text(&mut app, "hi").await;
        app.handle_key(key(KeyCode::Enter)).await;

        assert!(app.handle_transport_event(TransportEvent::Frame(
            r#"{"type":"assistant","content":"Hello"}"#.into()
        )));
        assert!(app.handle_transport_event(TransportEvent::Frame(
            r#"{"type":"complete"}"#.into()
        )));
        assert!(!app.is_streaming());
        assert_eq!(app.status_message.as_deref(), Some("Done"));

        assert!(!app.handle_transport_event(TransportEvent::Frame("garbage".into())));
    }

    #[tokio::test]
    async fn close_marks_connection() {
        let (mut app, _) = app();
        app.handle_transport_event(TransportEvent::Closed {
            reason: "bye".into(),
        });
        assert!(matches!(app.connection, Connection::Closed(_)));
        assert!(app.error_message.is_some());
    }
}
