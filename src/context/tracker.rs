//! Pending change set shared by every collection of one context.

use crate::error::StoreError;
use crate::store::{Change, ChangeBatch, ChangeOp};
use crate::types::EntityKey;
use std::collections::HashMap;

/// A change as requested by a caller, before collapsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOp {
    Add(Vec<u8>),
    Update(Vec<u8>),
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    state: EntryState,
    value: Vec<u8>,
}

type EntryKey = (&'static str, EntityKey);

/// Staged adds, updates and removes across all entity kinds.
///
/// At most one entry exists per (kind, key); staging the same key again
/// collapses into that entry:
///
/// | existing | add       | update   | remove  |
/// |----------|-----------|----------|---------|
/// | none     | added     | modified | deleted |
/// | added    | error     | added    | dropped |
/// | modified | error     | modified | deleted |
/// | deleted  | modified  | modified | deleted |
#[derive(Debug, Default)]
pub struct ChangeTracker {
    entries: HashMap<EntryKey, Entry>,
    next_seq: u64,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stage(
        &mut self,
        kind: &'static str,
        key: EntityKey,
        op: StageOp,
    ) -> Result<(), StoreError> {
        let existing = self.entries.get(&(kind, key.clone())).map(|e| e.state);
        let next = match (existing, op) {
            (Some(EntryState::Added), StageOp::Add(_))
            | (Some(EntryState::Modified), StageOp::Add(_)) => {
                return Err(StoreError::AlreadyTracked {
                    kind: kind.to_string(),
                    key: key.to_string(),
                });
            }
            (Some(EntryState::Added), StageOp::Remove) => {
                self.entries.remove(&(kind, key));
                return Ok(());
            }
            (None, StageOp::Add(v)) => (EntryState::Added, v),
            (Some(EntryState::Added), StageOp::Update(v)) => (EntryState::Added, v),
            (_, StageOp::Update(v)) | (Some(EntryState::Deleted), StageOp::Add(v)) => {
                (EntryState::Modified, v)
            }
            (_, StageOp::Remove) => (EntryState::Deleted, Vec::new()),
        };
        self.put(kind, key, next.0, next.1);
        Ok(())
    }

    /// Stage several changes; on error nothing from this call stays staged
    pub fn stage_all(
        &mut self,
        changes: Vec<(&'static str, EntityKey, StageOp)>,
    ) -> Result<(), StoreError> {
        let snapshot = (self.entries.clone(), self.next_seq);
        for (kind, key, op) in changes {
            if let Err(e) = self.stage(kind, key, op) {
                (self.entries, self.next_seq) = snapshot;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drain every entry into a batch, in staging order
    pub fn take(&mut self) -> ChangeBatch {
        let mut entries: Vec<(EntryKey, Entry)> = self.entries.drain().collect();
        entries.sort_by_key(|(_, e)| e.seq);
        let changes = entries
            .into_iter()
            .map(|((kind, key), entry)| Change {
                kind,
                key,
                op: match entry.state {
                    EntryState::Added => ChangeOp::Insert(entry.value),
                    EntryState::Modified => ChangeOp::Update(entry.value),
                    EntryState::Deleted => ChangeOp::Delete,
                },
            })
            .collect();
        ChangeBatch::new(changes)
    }

    fn put(&mut self, kind: &'static str, key: EntityKey, state: EntryState, value: Vec<u8>) {
        let seq = match self.entries.get(&(kind, key.clone())) {
            Some(existing) => existing.seq,
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };
        self.entries.insert((kind, key), Entry { seq, state, value });
    }
}
