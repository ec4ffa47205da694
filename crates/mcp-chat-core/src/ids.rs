//! Identifier types for transcript entries.
//!
//! Entry IDs are allocated from a per-transcript counter so that two runs over
//! the same event sequence produce the same relative ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a single transcript entry.
///
/// IDs are assigned once, at creation, and are never reused within a
/// transcript. Later entries always carry larger IDs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    /// The first ID handed out by a fresh transcript.
    pub const FIRST: Self = Self(1);

    /// Return the ID that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}
