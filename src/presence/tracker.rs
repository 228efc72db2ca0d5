//! Per-server record of players seen online
//!
//! Membership only ever grows: a player who leaves and comes back is not
//! reported a second time for the life of the process.

use crate::types::PlayerName;
use std::collections::HashSet;

/// Monotonic set of player names observed on one server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceTracker {
    known: HashSet<PlayerName>,
}

impl PresenceTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the candidates not seen before, in order, and remember them.
    ///
    /// A name repeated within `candidates` is reported only once.
    pub fn diff_and_commit(&mut self, candidates: &[PlayerName]) -> Vec<PlayerName> {
        candidates
            .iter()
            .filter(|name| self.known.insert((*name).clone()))
            .cloned()
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Number of distinct players seen so far
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
