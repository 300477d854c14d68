use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::{
    db::KeyValueWriter,
    util::{Result, keys::value_or_sentinel},
};

/// One buffered mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl Entry {
    #[inline]
    pub fn key(&self) -> &[u8] {
        match self {
            Entry::Put { key, .. } | Entry::Delete { key } => key,
        }
    }

    #[inline]
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Entry::Put { value, .. } => Some(value.as_slice()),
            Entry::Delete { .. } => None,
        }
    }

    #[inline]
    pub fn is_delete(&self) -> bool {
        matches!(self, Entry::Delete { .. })
    }
}

/// Final operation per key, split into two disjoint sets.
///
/// Each set is in ascending key order; `put_keys` and `put_values` are
/// parallel.
#[derive(Debug, Default)]
pub struct Resolved<'a> {
    pub delete_keys: Vec<&'a [u8]>,
    pub put_keys: Vec<&'a [u8]>,
    pub put_values: Vec<&'a [u8]>,
}

impl<'a> Resolved<'a> {
    /// Walks `entries` from newest to oldest and keeps the first operation
    /// seen for each key, which is the last one the caller issued.
    pub fn from_entries(entries: &'a [Entry]) -> Self {
        let mut last: BTreeMap<&'a [u8], &'a Entry> = BTreeMap::new();
        for entry in entries.iter().rev() {
            last.entry(entry.key()).or_insert(entry);
        }

        let mut resolved = Resolved::default();
        for (key, entry) in last {
            match entry {
                Entry::Put { value, .. } => {
                    resolved.put_keys.push(key);
                    resolved.put_values.push(value);
                },
                Entry::Delete { .. } => resolved.delete_keys.push(key),
            }
        }
        resolved
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.delete_keys.len() + self.put_keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct BufferState {
    writes: Vec<Entry>,
    size: usize,
}

/// Insertion-ordered entries plus the running size counter, behind one
/// reader/writer lock.
#[derive(Default)]
pub struct BatchBuffer {
    state: RwLock<BufferState>,
}

impl BatchBuffer {
    pub fn new() -> Self {
        BatchBuffer::default()
    }

    /// Copies `key` and `value`; a missing value is stored as the sentinel
    /// but counts zero bytes.
    pub fn put(&self, key: &[u8], value: Option<&[u8]>) {
        let mut state = self.state.write();
        state.writes.push(Entry::Put {
            key: key.to_vec(),
            value: value_or_sentinel(value),
        });
        state.size += value.map_or(0, <[u8]>::len);
    }

    pub fn delete(&self, key: &[u8]) {
        let mut state = self.state.write();
        state.writes.push(Entry::Delete { key: key.to_vec() });
        state.size += key.len();
    }

    #[inline]
    pub fn value_size(&self) -> usize {
        self.state.read().size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.state.read().writes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state.read().writes.is_empty()
    }

    /// Copy of the buffered entries in insertion order.
    pub fn entries(&self) -> Vec<Entry> {
        self.state.read().writes.clone()
    }

    pub fn reset(&self) {
        let mut state = self.state.write();
        state.writes.clear();
        state.size = 0;
    }

    /// `sink` must not be this buffer's own batch.
    pub fn replay(&self, sink: &dyn KeyValueWriter) -> Result<()> {
        let state = self.state.read();
        for entry in &state.writes {
            match entry {
                Entry::Delete { key } => sink.delete(key)?,
                Entry::Put { key, value } => sink.put(key, Some(value.as_slice()))?,
            }
        }
        Ok(())
    }

    /// Resolves the buffer and hands the result and the accounted size to
    /// `flush`, holding the write lock until it returns.
    pub fn flush<F>(&self, flush: F) -> Result<()>
    where
        F: FnOnce(&Resolved<'_>, usize) -> Result<()>,
    {
        let state = self.state.write();
        let resolved = Resolved::from_entries(&state.writes);
        flush(&resolved, state.size)
    }
}
