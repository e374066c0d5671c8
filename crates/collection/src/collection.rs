//! Keyed collections with a sync lifecycle.
//!
//! A `Collection` holds an insertion-ordered snapshot of entities. Data
//! arrives through a [`SyncSource`](crate::SyncSource) that writes in
//! begin/write/commit transactions, or through local `insert`/`update`/
//! `delete` calls. Subscribers see every committed batch and every status
//! transition, in subscription order. An event raised by a subscriber
//! while another is being delivered waits until every subscriber has seen
//! the earlier one.

use crate::config::{CollectionConfig, KeyFn};
use crate::gc::{self, GcTarget};
use crate::sync::{SyncCleanup, SyncSource, SyncWriter};
use cynos_core::{CollectionStatus, Error, Result};
use cynos_incremental::{ChangeMessage, KeyedStore, StoreError, Write};
use cynos_reactive::{dispatch, SubscriptionId, SubscriptionManager};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global collection serial counter.
static NEXT_COLLECTION_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Bounds every collection key satisfies.
pub trait CollectionKey: Clone + Eq + Hash + fmt::Debug + 'static {}

impl<T: Clone + Eq + Hash + fmt::Debug + 'static> CollectionKey for T {}

/// An event delivered to change subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionEvent<K, V> {
    /// A non-empty batch was committed.
    Changes(Vec<ChangeMessage<K, V>>),
    /// The lifecycle status moved.
    Status {
        previous: CollectionStatus,
        current: CollectionStatus,
    },
}

impl<K, V> CollectionEvent<K, V> {
    /// Returns the committed changes, if this is a change batch.
    pub fn changes(&self) -> Option<&[ChangeMessage<K, V>]> {
        match self {
            CollectionEvent::Changes(changes) => Some(changes),
            CollectionEvent::Status { .. } => None,
        }
    }

    /// Returns the new status, if this is a status transition.
    pub fn status(&self) -> Option<CollectionStatus> {
        match self {
            CollectionEvent::Status { current, .. } => Some(*current),
            CollectionEvent::Changes(_) => None,
        }
    }
}

struct CollectionState<K, V> {
    status: CollectionStatus,
    store: KeyedStore<K, V>,
    subscribers: SubscriptionManager<CollectionEvent<K, V>>,
    sync_started: bool,
    sync_cleanup: Option<SyncCleanup>,
    /// Set while parked in the GC queue
    gc_deadline: Option<Instant>,
}

pub(crate) struct CollectionInner<K, V> {
    this: Weak<CollectionInner<K, V>>,
    serial: u64,
    id: String,
    get_key: Option<KeyFn<K, V>>,
    sync: Option<Rc<dyn SyncSource<K, V>>>,
    gc_time: Option<Duration>,
    /// Bumped by cleanup; writers handed out before it are rejected
    epoch: Cell<u64>,
    state: RefCell<CollectionState<K, V>>,
    /// True while the outermost emit loop runs
    emitting: Cell<bool>,
    queued: RefCell<VecDeque<CollectionEvent<K, V>>>,
}

impl<K, V> Drop for CollectionInner<K, V> {
    fn drop(&mut self) {
        if let Some(cleanup) = self.state.get_mut().sync_cleanup.take() {
            cleanup();
        }
    }
}

impl<K: CollectionKey, V: Clone + 'static> CollectionInner<K, V> {
    #[inline]
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.get()
    }

    fn status(&self) -> CollectionStatus {
        self.state.borrow().status
    }

    fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }

    fn store_error(&self, error: StoreError, key: Option<&K>) -> Error {
        let key = || key.map(|k| format!("{:?}", k)).unwrap_or_default();
        match error {
            StoreError::NoActiveTransaction => Error::no_active_transaction(self.id.as_str()),
            StoreError::TransactionInProgress => Error::transaction_in_progress(self.id.as_str()),
            StoreError::DuplicateKey => Error::duplicate_key(self.id.as_str(), key()),
            StoreError::KeyNotFound => Error::key_not_found(self.id.as_str(), key()),
        }
    }

    fn emit(&self, event: CollectionEvent<K, V>) {
        self.queued.borrow_mut().push_back(event);
        if self.emitting.replace(true) {
            return;
        }
        loop {
            let next = self.queued.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            let listeners = self.state.borrow().subscribers.snapshot();
            dispatch(&listeners, &event, |id| {
                self.state.borrow().subscribers.contains(id)
            });
        }
        self.emitting.set(false);
    }

    pub(crate) fn set_status(&self, next: CollectionStatus) -> Result<()> {
        let previous = {
            let mut state = self.state.borrow_mut();
            let previous = state.status;
            if previous == next {
                return Ok(());
            }
            if !previous.can_transition_to(next) {
                tracing::warn!(collection = %self.id, from = %previous, to = %next, "rejected status transition");
                return Err(Error::invalid_transition(self.id.as_str(), previous, next));
            }
            state.status = next;
            previous
        };
        tracing::trace!(collection = %self.id, from = %previous, to = %next, "status changed");
        self.emit(CollectionEvent::Status {
            previous,
            current: next,
        });
        Ok(())
    }

    pub(crate) fn mark_ready(&self) -> Result<()> {
        match self.status() {
            CollectionStatus::Idle => self.set_status(CollectionStatus::Loading)?,
            CollectionStatus::Error => {
                self.set_status(CollectionStatus::Idle)?;
                self.set_status(CollectionStatus::Loading)?;
            }
            _ => {}
        }
        self.set_status(CollectionStatus::Ready)
    }

    pub(crate) fn begin(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.store.begin().map_err(|e| self.store_error(e, None))
    }

    pub(crate) fn write(&self, write: Write<K, V>) -> Result<()> {
        let key = write.key().clone();
        let mut state = self.state.borrow_mut();
        state
            .store
            .write(write)
            .map_err(|e| self.store_error(e, Some(&key)))
    }

    pub(crate) fn commit(&self) -> Result<()> {
        let changes = {
            let mut state = self.state.borrow_mut();
            state.store.commit().map_err(|e| self.store_error(e, None))?
        };
        if !changes.is_empty() {
            tracing::trace!(collection = %self.id, changes = changes.len(), "committed");
            self.emit(CollectionEvent::Changes(changes));
        }
        Ok(())
    }

    pub(crate) fn rollback(&self) -> Result<()> {
        if self.state.borrow_mut().store.rollback() {
            Ok(())
        } else {
            Err(Error::no_active_transaction(self.id.as_str()))
        }
    }

    /// Deletes every committed entry in one batch.
    pub(crate) fn truncate(&self) -> Result<()> {
        let changes = {
            let mut state = self.state.borrow_mut();
            if state.store.in_transaction() {
                return Err(Error::transaction_in_progress(self.id.as_str()));
            }
            let changes: Vec<_> = state
                .store
                .snapshot()
                .into_iter()
                .map(|(k, v)| ChangeMessage::delete(k, v))
                .collect();
            state.store.clear();
            changes
        };
        if !changes.is_empty() {
            self.emit(CollectionEvent::Changes(changes));
        }
        Ok(())
    }

    fn apply_local(&self, write: Write<K, V>) -> Result<()> {
        if self.status() == CollectionStatus::CleanedUp {
            return Err(Error::cleaned_up(self.id.as_str()));
        }
        self.begin()?;
        if let Err(error) = self.write(write) {
            self.rollback()?;
            return Err(error);
        }
        self.commit()
    }

    fn start_sync(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.sync_started {
                return;
            }
            state.sync_started = true;
        }
        tracing::debug!(collection = %self.id, "starting sync");
        // Invalid transitions are logged by set_status.
        let _ = self.set_status(CollectionStatus::Loading);

        let Some(source) = self.sync.clone() else {
            let _ = self.mark_ready();
            return;
        };

        let epoch = self.epoch();
        let cleanup = source.sync(SyncWriter::new(self.this.clone(), epoch, &self.id));
        if self.epoch() == epoch {
            self.state.borrow_mut().sync_cleanup = cleanup;
        } else if let Some(cleanup) = cleanup {
            // Cleaned up while the source was starting.
            cleanup();
        }
    }

    fn cleanup(&self) {
        let sync_cleanup = {
            let mut state = self.state.borrow_mut();
            if state.status == CollectionStatus::CleanedUp && !state.sync_started {
                return;
            }
            state.sync_started = false;
            state.gc_deadline = None;
            state.store.clear();
            state.sync_cleanup.take()
        };
        self.epoch.set(self.epoch.get() + 1);
        tracing::debug!(collection = %self.id, "cleaning up");
        if let Some(cleanup) = sync_cleanup {
            cleanup();
        }
        let _ = self.set_status(CollectionStatus::CleanedUp);
    }

    fn subscribe(&self, listener: Box<dyn Fn(&CollectionEvent<K, V>)>) -> ChangeSubscription {
        let id = {
            let mut state = self.state.borrow_mut();
            state.gc_deadline = None;
            state.subscribers.subscribe(listener)
        };
        tracing::debug!(collection = %self.id, subscription = id, "change subscriber added");
        let host: Weak<dyn SubscriberHost> = self.this.clone();
        ChangeSubscription { host, id }
    }

    fn schedule_gc(&self) {
        if self.status() == CollectionStatus::CleanedUp {
            return;
        }
        match self.gc_time {
            None => {}
            Some(delay) if delay.is_zero() => self.cleanup(),
            Some(delay) => {
                let Some(this) = self.this.upgrade() else {
                    return;
                };
                self.state.borrow_mut().gc_deadline = Some(Instant::now() + delay);
                tracing::debug!(collection = %self.id, ?delay, "parked for gc");
                gc::schedule(self.serial, this);
            }
        }
    }
}

/// Lets a type-erased subscription handle find its way back.
pub(crate) trait SubscriberHost {
    fn remove_subscriber(&self, id: SubscriptionId) -> bool;
}

impl<K: CollectionKey, V: Clone + 'static> SubscriberHost for CollectionInner<K, V> {
    fn remove_subscriber(&self, id: SubscriptionId) -> bool {
        let remaining = {
            let mut state = self.state.borrow_mut();
            if !state.subscribers.unsubscribe(id) {
                return false;
            }
            state.subscribers.len()
        };
        tracing::debug!(collection = %self.id, subscription = id, remaining, "change subscriber removed");
        if remaining == 0 {
            self.schedule_gc();
        }
        true
    }
}

impl<K: CollectionKey, V: Clone + 'static> GcTarget for CollectionInner<K, V> {
    fn gc_deadline(&self) -> Option<Instant> {
        self.state.borrow().gc_deadline
    }

    fn collect(&self) -> bool {
        if self.subscriber_count() > 0 || self.gc_deadline().is_none() {
            return false;
        }
        tracing::debug!(collection = %self.id, "collected by gc");
        self.cleanup();
        true
    }
}

/// A live change subscription.
///
/// `unsubscribe` consumes the handle, so a subscription is released at most
/// once. Dropping the handle without unsubscribing leaves the listener
/// attached for the collection's lifetime.
#[must_use = "dropping a ChangeSubscription keeps the listener attached; call unsubscribe()"]
pub struct ChangeSubscription {
    host: Weak<dyn SubscriberHost>,
    id: SubscriptionId,
}

impl ChangeSubscription {
    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Detaches the listener. Returns false if the collection is gone.
    pub fn unsubscribe(self) -> bool {
        match self.host.upgrade() {
            Some(host) => host.remove_subscriber(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("id", &self.id)
            .finish()
    }
}

/// A shared handle to a keyed, synced collection.
///
/// Clones refer to the same collection.
pub struct Collection<K, V> {
    inner: Rc<CollectionInner<K, V>>,
}

impl<K, V> Clone for Collection<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: CollectionKey, V: Clone + 'static> Collection<K, V> {
    /// Creates a collection, starting its sync if the config asks for it.
    pub fn new(config: CollectionConfig<K, V>) -> Self {
        let serial = NEXT_COLLECTION_SERIAL.fetch_add(1, Ordering::Relaxed);
        let CollectionConfig {
            id,
            get_key,
            sync,
            gc_time,
            start_sync,
        } = config;

        let inner = Rc::new_cyclic(|this| CollectionInner {
            this: this.clone(),
            serial,
            id: id.unwrap_or_else(|| format!("collection-{}", serial)),
            get_key,
            sync,
            gc_time,
            epoch: Cell::new(0),
            state: RefCell::new(CollectionState {
                status: CollectionStatus::Idle,
                store: KeyedStore::new(),
                subscribers: SubscriptionManager::new(),
                sync_started: false,
                sync_cleanup: None,
                gc_deadline: None,
            }),
            emitting: Cell::new(false),
            queued: RefCell::new(VecDeque::new()),
        });

        let collection = Self { inner };
        if start_sync {
            collection.start_sync_immediate();
        }
        collection
    }

    /// Returns the collection ID.
    #[inline]
    pub fn id(&self) -> &str {
        self.inner.id()
    }

    /// Returns the current lifecycle status.
    pub fn status(&self) -> CollectionStatus {
        self.inner.status()
    }

    /// Returns the GC delay this collection was configured with.
    #[inline]
    pub fn gc_time(&self) -> Option<Duration> {
        self.inner.gc_time
    }

    /// Returns the committed entries in insertion order.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.inner.state.borrow().store.snapshot()
    }

    /// Returns the committed values in insertion order.
    pub fn values(&self) -> Vec<V> {
        self.inner.state.borrow().store.values().cloned().collect()
    }

    /// Returns the first committed value.
    pub fn first_value(&self) -> Option<V> {
        self.inner
            .state
            .borrow()
            .store
            .first()
            .map(|(_, v)| v.clone())
    }

    /// Returns the committed value for a key.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.state.borrow().store.get(key).cloned()
    }

    /// Returns true if the key is committed.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.state.borrow().store.contains_key(key)
    }

    /// Returns the number of committed entries.
    pub fn len(&self) -> usize {
        self.inner.state.borrow().store.len()
    }

    /// Returns true if there are no committed entries.
    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().store.is_empty()
    }

    /// Subscribes to change batches and status transitions.
    ///
    /// Subscribing cancels a pending GC. The callback is not invoked for the
    /// current contents.
    pub fn subscribe_changes<F>(&self, callback: F) -> ChangeSubscription
    where
        F: Fn(&CollectionEvent<K, V>) + 'static,
    {
        self.inner.subscribe(Box::new(callback))
    }

    /// Returns the number of change subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }

    /// Starts sync if it is not running. Idempotent.
    ///
    /// A cleaned-up collection restarts from `Loading`.
    pub fn start_sync_immediate(&self) {
        self.inner.start_sync();
    }

    /// Stops sync, drops all entries and moves to `CleanedUp`.
    pub fn cleanup(&self) {
        self.inner.cleanup();
    }

    /// Inserts a value under the key the config's `get_key` derives.
    pub fn insert(&self, value: V) -> Result<()> {
        let key = self.key_of(&value)?;
        self.inner.apply_local(Write::Insert(key, value))
    }

    /// Replaces the value stored under the derived key.
    pub fn update(&self, value: V) -> Result<()> {
        let key = self.key_of(&value)?;
        self.inner.apply_local(Write::Update(key, value))
    }

    /// Deletes a key.
    pub fn delete(&self, key: &K) -> Result<()> {
        self.inner.apply_local(Write::Delete(key.clone()))
    }

    /// Returns a weak handle that does not keep the collection alive.
    pub fn downgrade(&self) -> WeakCollection<K, V> {
        WeakCollection {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns true if both handles refer to the same collection.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn key_of(&self, value: &V) -> Result<K> {
        match &self.inner.get_key {
            Some(get_key) => Ok(get_key(value)),
            None => Err(Error::invalid_operation(format!(
                "collection {} has no get_key; local writes need one",
                self.inner.id
            ))),
        }
    }
}

impl<K, V> fmt::Debug for Collection<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("id", &self.inner.id)
            .field("status", &self.inner.state.try_borrow().ok().map(|s| s.status))
            .finish()
    }
}

/// A non-owning collection handle.
pub struct WeakCollection<K, V> {
    inner: Weak<CollectionInner<K, V>>,
}

impl<K, V> Clone for WeakCollection<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<K, V> WeakCollection<K, V> {
    /// Returns the collection if it is still alive.
    pub fn upgrade(&self) -> Option<Collection<K, V>> {
        self.inner.upgrade().map(|inner| Collection { inner })
    }
}
