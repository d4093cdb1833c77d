//! Hash-chained append-only event log (`spec.md` §3 "Event log").
//!
//! Each [`EventLogEntry`] carries a `prev_hash` pointing at the hash of its
//! predecessor; [`EventChain`] is the in-memory/test-double structure that
//! computes and verifies that chain the way the real repository computes it
//! against stored rows.

use crate::canon::{hash_link, CanonError};
use rfp_core::EventLogEntry;
use std::fmt;

/// Errors detected while verifying an [`EventChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// An entry's `prev_hash` does not match the recomputed hash of its
    /// predecessor.
    BrokenLink {
        /// Index of the entry with the broken link.
        index: usize,
    },
    /// The chain is empty when a non-empty chain was expected.
    EmptyChain,
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrokenLink { index } => write!(f, "broken hash link at index {index}"),
            Self::EmptyChain => write!(f, "chain is empty"),
        }
    }
}

impl std::error::Error for ChainError {}

/// An ordered, hash-chained sequence of event-log entries for one RFP.
#[derive(Debug, Clone, Default)]
pub struct EventChain {
    entries: Vec<EventLogEntry>,
    hashes: Vec<String>,
}

impl EventChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a chain from entries already read back from storage, in
    /// their stored order (oldest first).
    pub fn from_entries(entries: Vec<EventLogEntry>) -> Result<Self, CanonError> {
        let mut chain = Self::new();
        for entry in entries {
            chain.append_stamped(entry)?;
        }
        Ok(chain)
    }

    /// Append a new entry, stamping its `prev_hash` from the current chain
    /// tail and returning the stamped entry ready to persist.
    pub fn push(&mut self, mut entry: EventLogEntry) -> Result<EventLogEntry, CanonError> {
        entry.prev_hash = self.hashes.last().cloned();
        self.append_stamped(entry.clone())?;
        Ok(entry)
    }

    /// Append an entry whose `prev_hash` is already set (e.g. when
    /// replaying rows read back from storage), recomputing its hash.
    fn append_stamped(&mut self, entry: EventLogEntry) -> Result<(), CanonError> {
        let hash = hash_link(entry.prev_hash.as_deref(), &entry)?;
        self.entries.push(entry);
        self.hashes.push(hash);
        Ok(())
    }

    /// Verify every link: each entry's `prev_hash` must equal the hash of
    /// the entry immediately before it (or be `None` for the first entry).
    pub fn verify(&self) -> Result<(), ChainError> {
        if self.entries.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        let mut prev: Option<&str> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.prev_hash.as_deref() != prev {
                return Err(ChainError::BrokenLink { index: i });
            }
            prev = self.hashes.get(i).map(String::as_str);
        }
        Ok(())
    }

    /// Hash of the most recently pushed entry, used to stamp the next one.
    pub fn tail_hash(&self) -> Option<&str> {
        self.hashes.last().map(String::as_str)
    }

    /// Number of entries in the chain.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the entries in chain order.
    pub fn iter(&self) -> std::slice::Iter<'_, EventLogEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(rfp_id: &str, event_type: &str) -> EventLogEntry {
        EventLogEntry::new(rfp_id, event_type, Utc::now())
    }

    #[test]
    fn first_entry_has_no_predecessor_hash() {
        let mut chain = EventChain::new();
        let stamped = chain.push(entry("r1", "tool_call")).unwrap();
        assert!(stamped.prev_hash.is_none());
        assert!(chain.verify().is_ok());
    }

    #[test]
    fn second_entry_links_to_first() {
        let mut chain = EventChain::new();
        chain.push(entry("r1", "tool_call")).unwrap();
        let second = chain.push(entry("r1", "policy_check")).unwrap();
        assert!(second.prev_hash.is_some());
        assert!(chain.verify().is_ok());
    }

    #[test]
    fn tampering_with_a_link_breaks_verification() {
        let mut chain = EventChain::new();
        chain.push(entry("r1", "tool_call")).unwrap();
        chain.push(entry("r1", "policy_check")).unwrap();
        chain.entries[1].prev_hash = Some("deadbeef".to_string());
        assert_eq!(
            chain.verify().unwrap_err(),
            ChainError::BrokenLink { index: 1 }
        );
    }

    #[test]
    fn empty_chain_fails_verification() {
        let chain = EventChain::new();
        assert_eq!(chain.verify().unwrap_err(), ChainError::EmptyChain);
    }

    #[test]
    fn round_trips_through_from_entries() {
        let mut chain = EventChain::new();
        let e1 = chain.push(entry("r1", "tool_call")).unwrap();
        let e2 = chain.push(entry("r1", "policy_check")).unwrap();
        let replayed = EventChain::from_entries(vec![e1, e2]).unwrap();
        assert!(replayed.verify().is_ok());
        assert_eq!(replayed.len(), 2);
    }
}
