//! Keyed, insertion-ordered store with begin/write/commit transactions.
//!
//! A `KeyedStore` keeps a committed snapshot and at most one open
//! transaction of pending writes. Writes are validated against the snapshot
//! as seen through earlier pending writes, so a transaction either commits
//! fully or is rolled back. Committing yields the `ChangeMessage`s the
//! writes produced.

use crate::delta::ChangeMessage;
use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;
use hashbrown::hash_map::DefaultHashBuilder;
use indexmap::IndexMap;

/// A pending mutation inside an open transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Write<K, V> {
    /// Add a key that must not exist.
    Insert(K, V),
    /// Replace the value of a key that must exist.
    Update(K, V),
    /// Remove a key that must exist.
    Delete(K),
}

impl<K, V> Write<K, V> {
    /// Returns the key this write targets.
    #[inline]
    pub fn key(&self) -> &K {
        match self {
            Write::Insert(key, _) | Write::Update(key, _) | Write::Delete(key) => key,
        }
    }
}

impl<K, V> From<ChangeMessage<K, V>> for Write<K, V> {
    /// Replays a committed change as a write against another store.
    fn from(change: ChangeMessage<K, V>) -> Self {
        match change {
            ChangeMessage::Insert { key, value } => Write::Insert(key, value),
            ChangeMessage::Update { key, value, .. } => Write::Update(key, value),
            ChangeMessage::Delete { key, .. } => Write::Delete(key),
        }
    }
}

/// Errors raised by transaction misuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// `write`/`commit` without `begin`.
    NoActiveTransaction,
    /// `begin` while a transaction is open.
    TransactionInProgress,
    /// Insert of an existing key.
    DuplicateKey,
    /// Update or delete of a missing key.
    KeyNotFound,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NoActiveTransaction => f.write_str("no active transaction"),
            StoreError::TransactionInProgress => f.write_str("transaction already in progress"),
            StoreError::DuplicateKey => f.write_str("duplicate key"),
            StoreError::KeyNotFound => f.write_str("key not found"),
        }
    }
}

/// An insertion-ordered keyed snapshot with transactional writes.
#[derive(Clone, Debug)]
pub struct KeyedStore<K, V> {
    /// Committed entries, in first-insertion order
    entries: IndexMap<K, V, DefaultHashBuilder>,
    /// Writes of the open transaction, if any
    pending: Option<Vec<Write<K, V>>>,
}

impl<K, V> Default for KeyedStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyedStore<K, V>
where
    K: Eq + Hash,
{
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::with_hasher(DefaultHashBuilder::default()),
            pending: None,
        }
    }

    /// Returns the number of committed entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no committed entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the committed value for a key.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Returns true if the key is committed.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates committed entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    /// Iterates committed values in order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    /// Returns the first committed entry.
    #[inline]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.entries.first()
    }

    /// Returns true while a transaction is open.
    #[inline]
    pub fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the number of writes in the open transaction.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.as_ref().map(|p| p.len()).unwrap_or(0)
    }

    /// Opens a transaction.
    pub fn begin(&mut self) -> Result<(), StoreError> {
        if self.pending.is_some() {
            return Err(StoreError::TransactionInProgress);
        }
        self.pending = Some(Vec::new());
        Ok(())
    }

    /// Adds a write to the open transaction.
    ///
    /// The write is checked against the committed entries as modified by the
    /// writes already pending in this transaction.
    pub fn write(&mut self, write: Write<K, V>) -> Result<(), StoreError> {
        let exists = self.exists_after_pending(write.key())?;
        match (&write, exists) {
            (Write::Insert(..), true) => return Err(StoreError::DuplicateKey),
            (Write::Update(..), false) | (Write::Delete(..), false) => {
                return Err(StoreError::KeyNotFound)
            }
            _ => {}
        }
        match self.pending.as_mut() {
            Some(pending) => {
                pending.push(write);
                Ok(())
            }
            None => Err(StoreError::NoActiveTransaction),
        }
    }

    /// Discards the open transaction. Returns false if none was open.
    pub fn rollback(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Clears committed entries and any open transaction.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending = None;
    }

    fn exists_after_pending(&self, key: &K) -> Result<bool, StoreError> {
        let pending = self
            .pending
            .as_ref()
            .ok_or(StoreError::NoActiveTransaction)?;
        let last = pending.iter().rev().find(|w| w.key() == key);
        Ok(match last {
            Some(Write::Insert(..)) | Some(Write::Update(..)) => true,
            Some(Write::Delete(..)) => false,
            None => self.entries.contains_key(key),
        })
    }
}

impl<K, V> KeyedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Applies the open transaction to the snapshot.
    ///
    /// Returns one change message per write, in write order.
    pub fn commit(&mut self) -> Result<Vec<ChangeMessage<K, V>>, StoreError> {
        let pending = self.pending.take().ok_or(StoreError::NoActiveTransaction)?;
        let mut changes = Vec::with_capacity(pending.len());

        for write in pending {
            match write {
                Write::Insert(key, value) => {
                    self.entries.insert(key.clone(), value.clone());
                    changes.push(ChangeMessage::insert(key, value));
                }
                Write::Update(key, value) => {
                    if let Some(previous) = self.entries.insert(key.clone(), value.clone()) {
                        changes.push(ChangeMessage::update(key, previous, value));
                    }
                }
                Write::Delete(key) => {
                    if let Some(previous) = self.entries.shift_remove(&key) {
                        changes.push(ChangeMessage::delete(key, previous));
                    }
                }
            }
        }

        Ok(changes)
    }

    /// Returns the committed entries as owned pairs.
    pub fn snapshot(&self) -> Vec<(K, V)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn committed(store: &KeyedStore<u32, &'static str>) -> Vec<(u32, &'static str)> {
        store.snapshot()
    }

    #[test]
    fn test_store_new() {
        let store: KeyedStore<u32, &str> = KeyedStore::new();
        assert!(store.is_empty());
        assert!(!store.in_transaction());
    }

    #[test]
    fn test_begin_write_commit() {
        let mut store = KeyedStore::new();
        store.begin().unwrap();
        store.write(Write::Insert(1, "a")).unwrap();
        store.write(Write::Insert(2, "b")).unwrap();
        assert_eq!(store.pending_len(), 2);
        assert!(store.is_empty());

        let changes = store.commit().unwrap();
        assert_eq!(
            changes,
            vec![ChangeMessage::insert(1, "a"), ChangeMessage::insert(2, "b")]
        );
        assert_eq!(committed(&store), vec![(1, "a"), (2, "b")]);
        assert!(!store.in_transaction());
    }

    #[test]
    fn test_update_keeps_position() {
        let mut store = KeyedStore::new();
        store.begin().unwrap();
        store.write(Write::Insert(1, "a")).unwrap();
        store.write(Write::Insert(2, "b")).unwrap();
        store.commit().unwrap();

        store.begin().unwrap();
        store.write(Write::Update(1, "z")).unwrap();
        let changes = store.commit().unwrap();

        assert_eq!(changes, vec![ChangeMessage::update(1, "a", "z")]);
        assert_eq!(committed(&store), vec![(1, "z"), (2, "b")]);
    }

    #[test]
    fn test_delete_preserves_order_of_rest() {
        let mut store = KeyedStore::new();
        store.begin().unwrap();
        for (k, v) in [(1, "a"), (2, "b"), (3, "c")] {
            store.write(Write::Insert(k, v)).unwrap();
        }
        store.commit().unwrap();

        store.begin().unwrap();
        store.write(Write::Delete(2)).unwrap();
        let changes = store.commit().unwrap();

        assert_eq!(changes, vec![ChangeMessage::delete(2, "b")]);
        assert_eq!(committed(&store), vec![(1, "a"), (3, "c")]);
    }

    #[test]
    fn test_write_without_begin() {
        let mut store: KeyedStore<u32, &str> = KeyedStore::new();
        assert_eq!(
            store.write(Write::Insert(1, "a")),
            Err(StoreError::NoActiveTransaction)
        );
        assert_eq!(store.commit(), Err(StoreError::NoActiveTransaction));
    }

    #[test]
    fn test_nested_begin() {
        let mut store: KeyedStore<u32, &str> = KeyedStore::new();
        store.begin().unwrap();
        assert_eq!(store.begin(), Err(StoreError::TransactionInProgress));
    }

    #[test]
    fn test_duplicate_and_missing_keys() {
        let mut store = KeyedStore::new();
        store.begin().unwrap();
        store.write(Write::Insert(1, "a")).unwrap();
        assert_eq!(store.write(Write::Insert(1, "b")), Err(StoreError::DuplicateKey));
        assert_eq!(store.write(Write::Update(2, "b")), Err(StoreError::KeyNotFound));
        assert_eq!(store.write(Write::Delete(2)), Err(StoreError::KeyNotFound));

        // Pending delete makes the key insertable again
        store.write(Write::Delete(1)).unwrap();
        store.write(Write::Insert(1, "c")).unwrap();
        store.commit().unwrap();
        assert_eq!(committed(&store), vec![(1, "c")]);
    }

    #[test]
    fn test_rollback() {
        let mut store = KeyedStore::new();
        store.begin().unwrap();
        store.write(Write::Insert(1, "a")).unwrap();
        assert!(store.rollback());
        assert!(store.is_empty());
        assert!(!store.rollback());
    }

    #[test]
    fn test_clear() {
        let mut store = KeyedStore::new();
        store.begin().unwrap();
        store.write(Write::Insert(1, "a")).unwrap();
        store.commit().unwrap();
        store.begin().unwrap();

        store.clear();
        assert!(store.is_empty());
        assert!(!store.in_transaction());
    }

    #[test]
    fn test_first() {
        let mut store = KeyedStore::new();
        assert!(store.first().is_none());
        store.begin().unwrap();
        store.write(Write::Insert(7, "x")).unwrap();
        store.write(Write::Insert(3, "y")).unwrap();
        store.commit().unwrap();
        assert_eq!(store.first(), Some((&7, &"x")));
    }

    #[test]
    fn test_replay_changes_as_writes() {
        let mut source = KeyedStore::new();
        source.begin().unwrap();
        source.write(Write::Insert(1, "a")).unwrap();
        source.write(Write::Insert(2, "b")).unwrap();
        let first = source.commit().unwrap();

        source.begin().unwrap();
        source.write(Write::Update(1, "A")).unwrap();
        source.write(Write::Delete(2)).unwrap();
        let second = source.commit().unwrap();

        let mut mirror = KeyedStore::new();
        for batch in [first, second] {
            mirror.begin().unwrap();
            for change in batch {
                mirror.write(change.into()).unwrap();
            }
            mirror.commit().unwrap();
        }
        assert_eq!(committed(&mirror), committed(&source));
    }
}
