//! Event journal
//!
//! Record of published events, numbered from 1. The journal is part of the
//! durable state so sequence numbers survive a restart. With a retention
//! bound set, the oldest entries are dropped once the bound is exceeded;
//! numbering is unaffected.

use serde::{Deserialize, Serialize};
use tessera_core::prelude::*;

/// Default number of entries kept
pub const DEFAULT_JOURNAL_RETENTION: usize = 10_000;

/// One published event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Sequence number, strictly increasing
    pub seq: u64,

    /// Host time of the command that produced it
    pub at: Timestamp,

    pub event: PoolEvent,
}

/// Bounded event log
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventJournal {
    entries: Vec<JournalEntry>,

    /// Highest sequence number ever assigned
    #[serde(default)]
    last_seq: u64,

    /// Maximum entries kept; 0 keeps everything
    #[serde(default)]
    retention: usize,
}

impl EventJournal {
    /// Unbounded journal
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            retention,
            ..Self::default()
        }
    }

    /// Change the bound, pruning immediately if it shrank
    pub fn set_retention(&mut self, retention: usize) {
        self.retention = retention;
        self.prune();
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Append a committed command's events, returning the new entries
    ///
    /// The returned entries are complete even when pruning drops some of
    /// them from the journal right away.
    pub fn append(&mut self, at: Timestamp, events: Vec<PoolEvent>) -> Vec<JournalEntry> {
        let start = self.entries.len();
        for event in events {
            self.last_seq += 1;
            self.entries.push(JournalEntry {
                seq: self.last_seq,
                at,
                event,
            });
        }
        let appended = self.entries[start..].to_vec();
        self.prune();
        appended
    }

    fn prune(&mut self) {
        if self.retention > 0 && self.entries.len() > self.retention {
            let excess = self.entries.len() - self.retention;
            self.entries.drain(..excess);
        }
    }

    /// Sequence number of the newest entry ever appended (0 when none)
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Sequence number of the oldest retained entry
    pub fn first_seq(&self) -> Option<u64> {
        self.entries.first().map(|e| e.seq)
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Retained entries with `seq > after`
    pub fn since(&self, after: u64) -> &[JournalEntry] {
        let start = self.entries.partition_point(|e| e.seq <= after);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
