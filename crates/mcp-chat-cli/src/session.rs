//! Session glue between the transport and the transcript store.
//!
//! A [`ChatSession`] owns the store and the outgoing side of the connection.
//! Inbound frames are decoded and reduced in arrival order; user input goes
//! through the dispatch gate before anything is written to the socket.

use chrono::Utc;
use mcp_chat_core::{
    decode, encode, CursorPolicy, DispatchError, DispatchOutcome, ServerDescriptor,
    TranscriptStore,
};

use crate::transport::{Transport, TransportError, TransportEvent};

/// What a transport event did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// The connection is now open.
    Opened,
    /// A decoded event was applied to the transcript.
    Applied {
        /// Frame type of the event.
        kind: &'static str,
        /// Whether the event ended the response cycle.
        ends_cycle: bool,
    },
    /// The frame could not be decoded and was dropped.
    Dropped,
    /// The connection closed.
    Closed {
        /// Reason reported by the transport.
        reason: String,
    },
}

/// One chat session over an injected transport.
pub struct ChatSession<T> {
    store: TranscriptStore,
    transport: Option<T>,
    ready: bool,
}

impl<T: Transport> ChatSession<T> {
    /// Create a session with no connection. Every submission is echoed
    /// locally until a transport is attached.
    #[must_use]
    pub fn new(policy: CursorPolicy) -> Self {
        Self {
            store: TranscriptStore::new(policy),
            transport: None,
            ready: false,
        }
    }

    /// Create a session over `transport`. The session becomes ready once
    /// the transport reports [`TransportEvent::Opened`].
    #[must_use]
    pub fn with_transport(policy: CursorPolicy, transport: T) -> Self {
        Self {
            store: TranscriptStore::new(policy),
            transport: Some(transport),
            ready: false,
        }
    }

    /// The transcript store.
    #[must_use]
    pub fn store(&self) -> &TranscriptStore {
        &self.store
    }

    /// Whether a submission would be sent right now.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready && self.transport.as_ref().is_some_and(|t| t.is_ready())
    }

    /// Install the registry snapshot shown alongside the transcript.
    pub fn install_servers(&mut self, servers: Vec<ServerDescriptor>) {
        self.store.install_servers(servers);
    }

    /// Apply one transport event.
    pub fn handle_transport_event(&mut self, event: TransportEvent) -> SessionUpdate {
        match event {
            TransportEvent::Opened => {
                self.ready = true;
                SessionUpdate::Opened
            }
            TransportEvent::Frame(raw) => match decode(&raw) {
                Ok(event) => {
                    let kind = event.kind();
                    let ends_cycle = event.ends_cycle();
                    self.store.apply_event(event, Utc::now());
                    SessionUpdate::Applied { kind, ends_cycle }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping undecodable frame");
                    SessionUpdate::Dropped
                }
            },
            TransportEvent::Closed { reason } => {
                self.ready = false;
                self.store.connection_lost(&reason, Utc::now());
                SessionUpdate::Closed { reason }
            }
        }
    }

    /// Submit user input.
    ///
    /// A frame that cannot be written is treated as if the transport had not
    /// been ready: the entry stays and the streaming flag is rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::EmptyInput`] for blank input.
    pub async fn submit(&mut self, text: &str) -> Result<DispatchOutcome, DispatchError> {
        let ready = self.is_ready();
        let submitted = self.store.submit(text, ready, Utc::now())?;

        let Some(command) = submitted.outbound else {
            if submitted.outcome == DispatchOutcome::NotReady {
                tracing::warn!(error = %TransportError::NotReady, "Message echoed locally only");
            }
            return Ok(submitted.outcome);
        };

        let result = match (&self.transport, encode(&command)) {
            (Some(transport), Ok(json)) => transport.send(json).await,
            (None, _) => Err(TransportError::NotReady),
            (_, Err(e)) => Err(e.into()),
        };

        match result {
            Ok(()) => Ok(DispatchOutcome::Sent),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send message");
                self.ready = self.transport.as_ref().is_some_and(|t| t.is_ready());
                self.store.send_failed();
                Ok(DispatchOutcome::NotReady)
            }
        }
    }

    /// Close the transport, if any.
    pub async fn shutdown(&mut self) {
        if let Some(transport) = &self.transport {
            transport.close().await;
        }
        self.ready = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcp_chat_core::EntryKind;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeTransport {
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
        fail_sends: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        fn is_ready(&self) -> bool {
            !self.closed.load(Ordering::SeqCst)
        }

        async fn send(&self, text: String) -> Result<(), TransportError> {
            if self.fail_sends.load(Ordering::SeqCst) || !self.is_ready() {
                return Err(TransportError::NotReady);
            }
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn frame(raw: &str) -> TransportEvent {
        TransportEvent::Frame(raw.to_string())
    }

    fn open_session() -> (ChatSession<FakeTransport>, FakeTransport) {
        let transport = FakeTransport::default();
        let mut session = ChatSession::with_transport(CursorPolicy::Preserve, transport.clone());
        assert_eq!(
            session.handle_transport_event(TransportEvent::Opened),
            SessionUpdate::Opened
        );
        (session, transport)
    }

    #[tokio::test]
    async fn submit_sends_wire_command() {
        let (mut session, transport) = open_session();

        let outcome = session.submit("What's the weather?").await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Sent);
        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["content"], "What's the weather?");
        assert!(session.store().is_streaming());
    }

    #[tokio::test]
    async fn not_ready_before_opened() {
        let transport = FakeTransport::default();
        let mut session = ChatSession::with_transport(CursorPolicy::Preserve, transport.clone());

        let outcome = session.submit("early").await.unwrap();

        assert_eq!(outcome, DispatchOutcome::NotReady);
        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(session.store().entries().len(), 1);
    }

    #[tokio::test]
    async fn disconnected_session_echoes_locally() {
        let mut session: ChatSession<FakeTransport> = ChatSession::new(CursorPolicy::Preserve);
        let outcome = session.submit("hello").await.unwrap();
        assert_eq!(outcome, DispatchOutcome::NotReady);
        assert_eq!(session.store().entries()[0].kind(), EntryKind::User);
        assert!(!session.store().is_streaming());
    }

    #[tokio::test]
    async fn failed_send_rolls_back_flag() {
        let (mut session, transport) = open_session();
        transport.fail_sends.store(true, Ordering::SeqCst);

        let outcome = session.submit("hello").await.unwrap();

        assert_eq!(outcome, DispatchOutcome::NotReady);
        assert!(!session.store().is_streaming());
        assert_eq!(session.store().entries().len(), 1);
    }

    #[tokio::test]
    async fn blank_submit_is_rejected() {
        let (mut session, transport) = open_session();
        assert_eq!(session.submit("  ").await, Err(DispatchError::EmptyInput));
        assert!(transport.sent.lock().unwrap().is_empty());
        assert!(session.store().entries().is_empty());
    }

    #[tokio::test]
    async fn frames_flow_into_transcript() {
        let (mut session, _transport) = open_session();
        session.submit("hi").await.unwrap();

        session.handle_transport_event(frame(r#"{"type":"assistant","content":"Hel"}"#));
        session.handle_transport_event(frame(r#"{"type":"assistant","content":"lo"}"#));
        let update = session.handle_transport_event(frame(r#"{"type":"complete","content":""}"#));

        assert_eq!(
            update,
            SessionUpdate::Applied {
                kind: "complete",
                ends_cycle: true
            }
        );
        let entries = session.store().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].content(), "Hello");
        assert!(!session.store().is_streaming());
    }

    #[tokio::test]
    async fn undecodable_frames_are_dropped() {
        let (mut session, _transport) = open_session();
        let revision = session.store().revision();

        for raw in ["not json", r#"{"type":"cleared"}"#, r#"{"content":"x"}"#] {
            assert_eq!(session.handle_transport_event(frame(raw)), SessionUpdate::Dropped);
        }
        assert_eq!(session.store().revision(), revision);
    }

    #[tokio::test]
    async fn close_mid_stream_surfaces_error() {
        let (mut session, _transport) = open_session();
        session.submit("hi").await.unwrap();
        session.handle_transport_event(frame(r#"{"type":"assistant","content":"par"}"#));

        let update = session.handle_transport_event(TransportEvent::Closed {
            reason: "connection reset".into(),
        });

        assert_eq!(
            update,
            SessionUpdate::Closed {
                reason: "connection reset".into()
            }
        );
        assert!(!session.is_ready());
        let last = session.store().entries().last().unwrap();
        assert_eq!(last.content(), "Error: connection reset");
        assert!(!session.store().is_streaming());

        let outcome = session.submit("again").await.unwrap();
        assert_eq!(outcome, DispatchOutcome::NotReady);
    }

    #[tokio::test]
    async fn shutdown_closes_transport() {
        let (mut session, transport) = open_session();
        session.shutdown().await;
        assert!(transport.closed.load(Ordering::SeqCst));
        assert!(!session.is_ready());
    }
}
