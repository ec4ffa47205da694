//! Shared transcript store.
//!
//! The store owns the current [`ChatState`] and the registry snapshot.
//! Writers go through [`TranscriptStore::apply`], which runs a pure
//! transition and swaps the result in. Readers take cheap [`Arc`] snapshots
//! that never change under them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::dispatch::{self, Submitted};
use crate::error::DispatchError;
use crate::frame::InboundEvent;
use crate::ids::EntryId;
use crate::reducer;
use crate::registry::ServerDescriptor;
use crate::transcript::{ChatState, CursorPolicy, TranscriptEntry};

/// Single owner of the chat state.
///
/// Every mutation bumps [`revision`](Self::revision), so a renderer can tell
/// whether its last snapshot is stale.
#[derive(Debug)]
pub struct TranscriptStore {
    state: Arc<ChatState>,
    servers: Arc<[ServerDescriptor]>,
    revision: u64,
}

impl TranscriptStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(policy: CursorPolicy) -> Self {
        Self {
            state: Arc::new(ChatState::new(policy)),
            servers: Arc::from(Vec::new()),
            revision: 0,
        }
    }

    /// Current state. Later mutations do not affect the returned value.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ChatState> {
        Arc::clone(&self.state)
    }

    /// Number of mutations applied so far.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Run a transition against the current state and install its result.
    ///
    /// The state is cloned only when a snapshot is still held elsewhere.
    pub fn apply<R>(&mut self, transition: impl FnOnce(ChatState) -> (ChatState, R)) -> R {
        let current = Arc::unwrap_or_clone(std::mem::take(&mut self.state));
        let (next, output) = transition(current);
        self.state = Arc::new(next);
        self.revision += 1;
        output
    }

    /// Feed one decoded server event through the reducer.
    pub fn apply_event(&mut self, event: InboundEvent, at: DateTime<Utc>) {
        debug!(kind = event.kind(), "Applying inbound event");
        self.apply(|state| (reducer::reduce(state, event, at), ()));
    }

    /// Submit user input through the dispatch gate.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::EmptyInput`] for blank input; the state is
    /// left as it was.
    pub fn submit(
        &mut self,
        text: &str,
        transport_ready: bool,
        at: DateTime<Utc>,
    ) -> Result<Submitted, DispatchError> {
        if text.trim().is_empty() {
            return Err(DispatchError::EmptyInput);
        }
        let result = self.apply(|state| dispatch::submit(state, text, transport_ready, at));
        if let (Ok(submitted), Some(entry)) = (&result, self.state.last()) {
            debug!(outcome = ?submitted.outcome, entry = %entry.id(), "Submitted user message");
        }
        result
    }

    /// Roll back the in-flight flag after a failed send.
    pub fn send_failed(&mut self) {
        self.apply(|state| (dispatch::send_failed(state), ()));
    }

    /// Record that the connection went away.
    pub fn connection_lost(&mut self, reason: &str, at: DateTime<Utc>) {
        debug!(reason, "Connection lost");
        self.apply(|state| (reducer::connection_lost(state, reason, at), ()));
    }

    /// Replace the registry snapshot.
    pub fn install_servers(&mut self, servers: Vec<ServerDescriptor>) {
        debug!(count = servers.len(), "Installing server registry");
        self.servers = Arc::from(servers);
        self.revision += 1;
    }

    /// Registry snapshot.
    #[must_use]
    pub fn servers(&self) -> Arc<[ServerDescriptor]> {
        Arc::clone(&self.servers)
    }

    /// Entries in arrival order.
    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        self.state.entries()
    }

    /// Look up an entry by ID.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> Option<&TranscriptEntry> {
        self.state.entry(id)
    }

    /// Whether a response cycle is in progress.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.state.is_streaming()
    }

    /// The assistant entry currently receiving deltas, if any.
    #[must_use]
    pub fn open_cursor(&self) -> Option<EntryId> {
        self.state.open_cursor()
    }
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new(CursorPolicy::default())
    }
}
