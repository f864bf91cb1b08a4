use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, TimeDelta, Utc};

use crate::{EntryId, MailingStatus, QueueEntry};

type Key = (DateTime<Utc>, EntryId);

/// In-memory view of the queue shared by every backend
///
/// Keeps two orderings next to the entries themselves: every entry by
/// timestamp (for paged listing) and pending entries only (for the worker).
/// Both sets are keyed on `(timestamp, id)` so ties are broken by id.
#[derive(Debug, Default)]
pub(crate) struct QueueIndex {
    entries: HashMap<EntryId, QueueEntry>,
    by_time: BTreeSet<Key>,
    pending: BTreeSet<Key>,
    last_stamp: Option<DateTime<Utc>>,
}

impl QueueIndex {
    /// Next save timestamp, strictly greater than any handed out before
    pub(crate) fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    pub(crate) fn get(&self, id: &EntryId) -> Option<&QueueEntry> {
        self.entries.get(id)
    }

    pub(crate) fn contains(&self, id: &EntryId) -> bool {
        self.entries.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Insert or replace an entry that already carries an id
    pub(crate) fn upsert(&mut self, id: EntryId, entry: QueueEntry) {
        if let Some(previous) = self.entries.get(&id) {
            let key = (previous.timestamp, id.clone());
            self.by_time.remove(&key);
            self.pending.remove(&key);
        }

        // Entries loaded from disk may carry stamps newer than the clock
        if self.last_stamp.is_none_or(|last| entry.timestamp > last) {
            self.last_stamp = Some(entry.timestamp);
        }

        let key = (entry.timestamp, id.clone());
        if entry.status == MailingStatus::Pending {
            self.pending.insert(key.clone());
        }
        self.by_time.insert(key);
        self.entries.insert(id, entry);
    }

    pub(crate) fn page(&self, skip: usize, limit: usize) -> Vec<QueueEntry> {
        self.by_time
            .iter()
            .rev()
            .skip(skip)
            .take(limit)
            .filter_map(|(_, id)| self.entries.get(id).cloned())
            .collect()
    }

    pub(crate) fn oldest_pending(&self) -> Option<&QueueEntry> {
        self.pending
            .first()
            .and_then(|(_, id)| self.entries.get(id))
    }
}
