//! Sync protocol between a collection and its data source.
//!
//! When a collection starts syncing it hands its source a [`SyncWriter`].
//! The source loads data in begin/write/commit transactions, reports
//! readiness or failure, and may return a cleanup callback that runs when
//! the collection is cleaned up or dropped.

use crate::collection::{CollectionInner, CollectionKey};
use cynos_core::{CollectionStatus, Error, Result};
use cynos_incremental::Write;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Runs once when the sync that returned it is torn down.
pub type SyncCleanup = Box<dyn FnOnce()>;

/// A data source for a collection.
pub trait SyncSource<K, V> {
    /// Starts syncing into `writer`.
    ///
    /// Called again if the collection restarts after cleanup; each call gets
    /// a fresh writer and the writers of earlier runs stop working.
    fn sync(&self, writer: SyncWriter<K, V>) -> Option<SyncCleanup>;
}

impl<K, V, F> SyncSource<K, V> for F
where
    F: Fn(SyncWriter<K, V>) -> Option<SyncCleanup>,
{
    fn sync(&self, writer: SyncWriter<K, V>) -> Option<SyncCleanup> {
        self(writer)
    }
}

/// Write access handed to a [`SyncSource`].
///
/// Every method fails with [`Error::CleanedUp`] once the sync run the writer
/// belongs to has been torn down.
pub struct SyncWriter<K, V> {
    collection: Weak<CollectionInner<K, V>>,
    epoch: u64,
    id: Rc<str>,
}

impl<K, V> Clone for SyncWriter<K, V> {
    fn clone(&self) -> Self {
        Self {
            collection: Weak::clone(&self.collection),
            epoch: self.epoch,
            id: Rc::clone(&self.id),
        }
    }
}

impl<K: CollectionKey, V: Clone + 'static> SyncWriter<K, V> {
    pub(crate) fn new(collection: Weak<CollectionInner<K, V>>, epoch: u64, id: &str) -> Self {
        Self {
            collection,
            epoch,
            id: Rc::from(id),
        }
    }

    fn target(&self) -> Result<Rc<CollectionInner<K, V>>> {
        match self.collection.upgrade() {
            Some(inner) if inner.epoch() == self.epoch => Ok(inner),
            _ => Err(Error::cleaned_up(&*self.id)),
        }
    }

    /// Returns the ID of the collection being synced.
    #[inline]
    pub fn collection_id(&self) -> &str {
        &self.id
    }

    /// Returns true while this sync run is current.
    pub fn is_live(&self) -> bool {
        self.target().is_ok()
    }

    /// Opens a transaction.
    pub fn begin(&self) -> Result<()> {
        self.target()?.begin()
    }

    /// Adds a write to the open transaction.
    ///
    /// Accepts a [`Write`] or a [`ChangeMessage`](cynos_incremental::ChangeMessage).
    pub fn write(&self, write: impl Into<Write<K, V>>) -> Result<()> {
        self.target()?.write(write.into())
    }

    /// Commits the open transaction and notifies subscribers.
    pub fn commit(&self) -> Result<()> {
        self.target()?.commit()
    }

    /// Discards the open transaction.
    pub fn rollback(&self) -> Result<()> {
        self.target()?.rollback()
    }

    /// Deletes every committed entry.
    pub fn truncate(&self) -> Result<()> {
        self.target()?.truncate()
    }

    /// Marks the first load complete. Idempotent.
    pub fn mark_ready(&self) -> Result<()> {
        self.target()?.mark_ready()
    }

    /// Reports a sync failure.
    pub fn mark_error(&self) -> Result<()> {
        self.target()?.set_status(CollectionStatus::Error)
    }
}

/// Runs `writes` as one transaction, rolling back if any is rejected.
pub fn write_batch<K, V, I>(writer: &SyncWriter<K, V>, writes: I) -> Result<()>
where
    K: CollectionKey,
    V: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Write<K, V>>,
{
    writer.begin()?;
    for write in writes {
        if let Err(error) = writer.write(write) {
            writer.rollback()?;
            return Err(error);
        }
    }
    writer.commit()
}

/// A source that loads a fixed set of entries and marks ready.
#[derive(Clone, Debug)]
pub struct InitialData<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> InitialData<K, V> {
    /// Creates a source from key/value pairs, in load order.
    pub fn new(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

impl<K: CollectionKey, V: Clone + 'static> SyncSource<K, V> for InitialData<K, V> {
    fn sync(&self, writer: SyncWriter<K, V>) -> Option<SyncCleanup> {
        let writes = self
            .entries
            .iter()
            .map(|(k, v)| Write::Insert(k.clone(), v.clone()));
        let loaded = write_batch(&writer, writes).and_then(|_| writer.mark_ready());
        if let Err(error) = loaded {
            tracing::warn!(collection = writer.collection_id(), %error, "initial data rejected");
            let _ = writer.mark_error();
        }
        None
    }
}

struct ManualState<K, V> {
    writer: Option<SyncWriter<K, V>>,
    starts: usize,
    cleanups: usize,
}

/// A source driven by hand.
///
/// Keeps the writer of the current sync run so tests and embedders can push
/// data and status changes whenever they like.
pub struct ManualSync<K, V> {
    state: Rc<RefCell<ManualState<K, V>>>,
}

impl<K, V> Clone for ManualSync<K, V> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<K, V> Default for ManualSync<K, V> {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(ManualState {
                writer: None,
                starts: 0,
                cleanups: 0,
            })),
        }
    }
}

impl<K: CollectionKey, V: Clone + 'static> ManualSync<K, V> {
    /// Creates a source that has not been started.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the writer of the current sync run.
    pub fn writer(&self) -> Result<SyncWriter<K, V>> {
        self.state
            .borrow()
            .writer
            .clone()
            .ok_or_else(|| Error::invalid_operation("sync has not started"))
    }

    /// Returns true while a sync run is active.
    pub fn is_started(&self) -> bool {
        self.state.borrow().writer.is_some()
    }

    /// Returns how many times sync was started.
    pub fn start_count(&self) -> usize {
        self.state.borrow().starts
    }

    /// Returns how many sync runs were torn down.
    pub fn cleanup_count(&self) -> usize {
        self.state.borrow().cleanups
    }

    /// Commits `writes` as one transaction.
    pub fn apply(&self, writes: impl IntoIterator<Item = Write<K, V>>) -> Result<()> {
        write_batch(&self.writer()?, writes)
    }

    /// Inserts one entry.
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        self.apply([Write::Insert(key, value)])
    }

    /// Replaces one entry.
    pub fn update(&self, key: K, value: V) -> Result<()> {
        self.apply([Write::Update(key, value)])
    }

    /// Deletes one entry.
    pub fn delete(&self, key: K) -> Result<()> {
        self.apply([Write::Delete(key)])
    }

    pub fn mark_ready(&self) -> Result<()> {
        self.writer()?.mark_ready()
    }

    pub fn mark_error(&self) -> Result<()> {
        self.writer()?.mark_error()
    }
}

impl<K: CollectionKey, V: Clone + 'static> SyncSource<K, V> for ManualSync<K, V> {
    fn sync(&self, writer: SyncWriter<K, V>) -> Option<SyncCleanup> {
        {
            let mut state = self.state.borrow_mut();
            state.writer = Some(writer);
            state.starts += 1;
        }
        let state = Rc::downgrade(&self.state);
        Some(Box::new(move || {
            if let Some(state) = state.upgrade() {
                let mut state = state.borrow_mut();
                state.writer = None;
                state.cleanups += 1;
            }
        }))
    }
}
