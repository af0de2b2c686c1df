//! Identity map and change tracking for one context.

use std::collections::HashMap;

use crate::domain::backend::{StoredDocument, WriteKind, WriteOp};
use crate::error::IdentityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Staged for insert; not yet in the backend.
    Added,
    /// Loaded from the backend, no pending change.
    Unchanged,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
struct Entry {
    state: EntryState,
    document: StoredDocument,
    /// Stamp the backend must still hold for the pending replace/delete.
    expected_stamp: Option<String>,
    /// Order in which the entry became pending.
    seq: u64,
}

type EntryKey = (String, String);

#[derive(Debug, Default)]
pub(crate) struct ChangeTracker {
    entries: HashMap<EntryKey, Entry>,
    next_seq: u64,
}

/// What a lookup in the identity map found.
pub(crate) enum Tracked<'a> {
    Untracked,
    Deleted,
    Present(&'a StoredDocument),
}

impl ChangeTracker {
    fn key(collection: &str, id: &str) -> EntryKey {
        (collection.to_owned(), id.to_owned())
    }

    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    pub fn lookup(&self, collection: &str, id: &str) -> Tracked<'_> {
        match self.entries.get(&Self::key(collection, id)) {
            None => Tracked::Untracked,
            Some(entry) if entry.state == EntryState::Deleted => Tracked::Deleted,
            Some(entry) => Tracked::Present(&entry.document),
        }
    }

    pub fn state(&self, collection: &str, id: &str) -> Option<EntryState> {
        self.entries
            .get(&Self::key(collection, id))
            .map(|entry| entry.state)
    }

    /// Track a document read from the backend. An existing entry wins, so
    /// staged edits survive repeated queries.
    pub fn attach(&mut self, collection: &str, document: StoredDocument) {
        let key = Self::key(collection, &document.id);
        if self.entries.contains_key(&key) {
            return;
        }
        let seq = self.bump();
        self.entries.insert(
            key,
            Entry {
                state: EntryState::Unchanged,
                expected_stamp: None,
                document,
                seq,
            },
        );
    }

    pub fn stage_add(
        &mut self,
        collection: &str,
        document: StoredDocument,
    ) -> Result<(), IdentityError> {
        let key = Self::key(collection, &document.id);
        let seq = self.bump();
        match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(
                    key,
                    Entry {
                        state: EntryState::Added,
                        expected_stamp: None,
                        document,
                        seq,
                    },
                );
                Ok(())
            }
            // Re-adding a removed document turns the delete into a replace.
            Some(entry) if entry.state == EntryState::Deleted => {
                entry.state = EntryState::Modified;
                entry.document = document;
                entry.seq = seq;
                Ok(())
            }
            Some(_) => Err(IdentityError::InvalidOperation(format!(
                "document {collection}/{} is already tracked by this context",
                key.1
            ))),
        }
    }

    pub fn stage_update(
        &mut self,
        collection: &str,
        document: StoredDocument,
        expected_stamp: Option<String>,
    ) -> Result<(), IdentityError> {
        let key = Self::key(collection, &document.id);
        let seq = self.bump();
        match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(
                    key,
                    Entry {
                        state: EntryState::Modified,
                        expected_stamp,
                        document,
                        seq,
                    },
                );
            }
            Some(entry) => match entry.state {
                EntryState::Added => {
                    entry.document = document;
                }
                EntryState::Unchanged => {
                    entry.state = EntryState::Modified;
                    entry.expected_stamp = expected_stamp;
                    entry.document = document;
                    entry.seq = seq;
                }
                // The stamp the backend holds is still the one from before
                // the first pending edit.
                EntryState::Modified => {
                    entry.document = document;
                }
                EntryState::Deleted => {
                    return Err(IdentityError::InvalidOperation(format!(
                        "document {collection}/{} was removed from this context",
                        key.1
                    )));
                }
            },
        }
        Ok(())
    }

    pub fn stage_remove(&mut self, collection: &str, id: &str, expected_stamp: Option<String>) {
        let key = Self::key(collection, id);
        let seq = self.bump();
        match self.entries.get(&key).map(|entry| entry.state) {
            Some(EntryState::Added) => {
                self.entries.remove(&key);
            }
            Some(EntryState::Deleted) => {}
            Some(EntryState::Modified) => {
                if let Some(entry) = self.entries.get_mut(&key) {
                    entry.state = EntryState::Deleted;
                    entry.seq = seq;
                }
            }
            Some(EntryState::Unchanged) => {
                if let Some(entry) = self.entries.get_mut(&key) {
                    entry.state = EntryState::Deleted;
                    entry.expected_stamp = expected_stamp;
                    entry.seq = seq;
                }
            }
            None => {
                self.entries.insert(
                    key,
                    Entry {
                        state: EntryState::Deleted,
                        expected_stamp,
                        document: StoredDocument {
                            id: id.to_owned(),
                            body: serde_json::Value::Null,
                            stamp: None,
                        },
                        seq,
                    },
                );
            }
        }
    }

    /// Record an edit made to a document this context already holds.
    ///
    /// Untracked and removed documents are left alone, and an unchanged
    /// document stays unchanged when the edit is a no-op. Returns whether
    /// the edit was staged.
    pub fn stage_tracked(&mut self, collection: &str, document: StoredDocument) -> bool {
        let key = Self::key(collection, &document.id);
        let seq = self.bump();
        let Some(entry) = self.entries.get_mut(&key) else {
            return false;
        };
        match entry.state {
            EntryState::Deleted => false,
            EntryState::Unchanged => {
                if entry.document == document {
                    return false;
                }
                entry.state = EntryState::Modified;
                entry.expected_stamp = entry.document.stamp.clone();
                entry.document = document;
                entry.seq = seq;
                true
            }
            EntryState::Added | EntryState::Modified => {
                entry.document = document;
                true
            }
        }
    }

    /// Pending inserts and replaces of one collection, oldest first.
    pub fn staged(&self, collection: &str) -> Vec<&StoredDocument> {
        let mut staged: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|((c, _), entry)| {
                c == collection
                    && matches!(entry.state, EntryState::Added | EntryState::Modified)
            })
            .map(|(_, entry)| entry)
            .collect();
        staged.sort_by_key(|entry| entry.seq);
        staged.into_iter().map(|entry| &entry.document).collect()
    }

    pub fn has_changes(&self) -> bool {
        self.entries
            .values()
            .any(|entry| entry.state != EntryState::Unchanged)
    }

    /// The pending change set as one write batch, in staging order.
    pub fn pending(&self) -> Vec<WriteOp> {
        let mut pending: Vec<(&EntryKey, &Entry)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.state != EntryState::Unchanged)
            .collect();
        pending.sort_by_key(|(_, entry)| entry.seq);
        pending
            .into_iter()
            .map(|((collection, _), entry)| WriteOp {
                collection: collection.clone(),
                kind: match entry.state {
                    EntryState::Added => WriteKind::Insert(entry.document.clone()),
                    EntryState::Modified => WriteKind::Replace {
                        document: entry.document.clone(),
                        expected_stamp: entry.expected_stamp.clone(),
                    },
                    _ => WriteKind::Delete {
                        id: entry.document.id.clone(),
                        expected_stamp: entry.expected_stamp.clone(),
                    },
                },
            })
            .collect()
    }

    /// Mark everything pending as persisted.
    pub fn accept_all(&mut self) {
        self.entries
            .retain(|_, entry| entry.state != EntryState::Deleted);
        for entry in self.entries.values_mut() {
            entry.state = EntryState::Unchanged;
            entry.expected_stamp = None;
        }
    }

    pub fn detach(&mut self, collection: &str, id: &str) {
        self.entries.remove(&Self::key(collection, id));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
